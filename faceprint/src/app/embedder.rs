#[cfg(feature = "insightface")]
pub mod insightface;
