//! Defines application business models.

/// Stored faces and collection information.
pub mod face;
