use super::{embeddings::FaceEmbedder, vector::VectorDb};
use std::sync::Arc;

pub type VectorDbProvider = Arc<dyn VectorDb + Send + Sync>;
pub type FaceEmbedderProvider = Arc<dyn FaceEmbedder + Send + Sync>;

/// Used to track provider IDs.
pub trait Identity {
    fn id(&self) -> &'static str;
}

/// Holds the concrete implementations of faceprint's external collaborators.
#[derive(Clone)]
pub struct ProviderState {
    /// Vector database.
    pub vector: VectorDbProvider,

    /// Face embedding model.
    pub embedder: FaceEmbedderProvider,
}

impl<T> Identity for Arc<T>
where
    T: Identity,
{
    fn id(&self) -> &'static str {
        <T as Identity>::id(self)
    }
}

macro_rules! impl_identity {
    ($($t:ident),+) => {
        $(
            impl Identity for Arc<dyn $t + Send + Sync> {
                fn id(&self) -> &'static str {
                    <dyn $t as Identity>::id(self.as_ref())
                }
            }
        )+
    };
}

impl_identity!(VectorDb, FaceEmbedder);
