//! Business logic.

pub mod face;

#[derive(Clone)]
pub struct ServiceState {
    pub face: face::FaceService,
}
