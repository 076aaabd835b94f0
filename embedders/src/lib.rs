/// Face detection and recognition with the InsightFace ONNX model pack.
#[cfg(feature = "insightface")]
pub mod insightface;

use serde::{Deserialize, Serialize};

/// Describes a loaded face model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceModel {
    /// Model pack name.
    pub name: String,

    /// Embedding dimensions.
    pub size: usize,

    /// Minimum detection score for a face to be considered.
    pub detection_confidence: f32,
}

/// A face bounding box in source image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl FaceBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Intersection over union of two boxes.
    pub fn iou(&self, other: &FaceBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 {
            return 0.0;
        }

        intersection / union
    }
}

/// The result of processing an image: the embedding of the most confident face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceEmbedding {
    /// L2 normalized embedding.
    pub embedding: Vec<f32>,

    /// Detection score of the embedded face.
    pub confidence: f32,

    /// Where the face was found.
    pub face: FaceBox,

    /// Total number of faces that passed detection.
    pub faces_detected: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("no faces detected in the image")]
    NoFaceDetected,

    #[error("model error: {0}")]
    Model(String),

    #[cfg(feature = "insightface")]
    #[error(transparent)]
    Ort(#[from] ort::Error),
}

#[cfg(feature = "insightface")]
impl From<image::ImageError> for EmbeddingError {
    fn from(value: image::ImageError) -> Self {
        Self::InvalidImage(value.to_string())
    }
}

/// Scale `v` to unit length in place. Zero vectors are left untouched and `false` is returned.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

/// Non-maximum suppression. Returns the indices of the kept boxes, highest score first.
pub fn nms(boxes: &[FaceBox], iou_threshold: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| {
        boxes[b]
            .score
            .partial_cmp(&boxes[a].score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut suppressed = vec![false; boxes.len()];
    let mut keep = Vec::new();

    for (i, &current) in order.iter().enumerate() {
        if suppressed[current] {
            continue;
        }
        keep.push(current);
        for &other in order.iter().skip(i + 1) {
            if !suppressed[other] && boxes[current].iou(&boxes[other]) > iou_threshold {
                suppressed[other] = true;
            }
        }
    }

    keep
}
