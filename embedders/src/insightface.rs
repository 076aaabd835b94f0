//! InsightFace `buffalo_l` pipeline: SCRFD for detection, ArcFace for recognition.
//!
//! Both networks are executed as opaque ONNX graphs. This module only prepares
//! their input tensors and interprets their outputs.

use crate::{l2_normalize, nms, EmbeddingError, FaceBox, FaceEmbedding, FaceModel};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ort::{session::Session, value::Value};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

pub const MODEL_NAME: &str = "buffalo_l";

/// ArcFace (w600k_r50) output dimensions.
pub const EMBEDDING_SIZE: usize = 512;

/// SCRFD square input side.
const DETECTOR_INPUT: u32 = 640;

/// ArcFace square input side.
const RECOGNIZER_INPUT: u32 = 112;

const STRIDES: [usize; 3] = [8, 16, 32];

const DEFAULT_NMS_THRESHOLD: f32 = 0.4;

/// Reference landmark positions of an aligned 112x112 ArcFace crop.
/// Left eye, right eye, nose tip, left mouth corner, right mouth corner.
const ARCFACE_TEMPLATE: [(f32, f32); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// Boxes smaller than this (in source pixels) are discarded.
const MIN_FACE_SIDE: f32 = 8.0;

#[derive(Debug, Clone)]
pub struct InsightFaceConfig {
    /// Path to the SCRFD detection model, e.g. `det_10g.onnx`.
    pub detector_path: PathBuf,

    /// Path to the ArcFace recognition model, e.g. `w600k_r50.onnx`.
    pub recognizer_path: PathBuf,

    /// Detection scores below this are ignored.
    pub detection_confidence: f32,

    /// IoU above which overlapping detections are suppressed.
    pub nms_threshold: f32,
}

impl InsightFaceConfig {
    pub fn new(
        detector_path: impl Into<PathBuf>,
        recognizer_path: impl Into<PathBuf>,
        detection_confidence: f32,
    ) -> Self {
        Self {
            detector_path: detector_path.into(),
            recognizer_path: recognizer_path.into(),
            detection_confidence,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
        }
    }
}

/// A face found by the detector.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub bbox: FaceBox,

    /// Five facial landmarks in source pixel coordinates, if the detector provides them.
    pub landmarks: Option<[(f32, f32); 5]>,
}

pub struct InsightFace {
    config: InsightFaceConfig,
    detector: Mutex<Session>,
    recognizer: Mutex<Session>,
}

impl InsightFace {
    /// Load both ONNX sessions. Fails if either model file is missing or invalid.
    pub fn load(config: InsightFaceConfig) -> Result<Self, EmbeddingError> {
        for path in [&config.detector_path, &config.recognizer_path] {
            if !path.exists() {
                return Err(EmbeddingError::Model(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let detector = Self::session(&config.detector_path)?;
        let recognizer = Self::session(&config.recognizer_path)?;

        tracing::info!(
            "Loaded face models (detector: {}, recognizer: {})",
            config.detector_path.display(),
            config.recognizer_path.display()
        );

        Ok(Self {
            config,
            detector: Mutex::new(detector),
            recognizer: Mutex::new(recognizer),
        })
    }

    fn session(path: &Path) -> Result<Session, EmbeddingError> {
        let builder = Session::builder()?;

        #[cfg(feature = "cuda")]
        let builder = builder.with_execution_providers([
            ort::execution_providers::CUDAExecutionProvider::default().build(),
        ])?;

        Ok(builder.commit_from_file(path)?)
    }

    pub fn model(&self) -> FaceModel {
        FaceModel {
            name: MODEL_NAME.to_string(),
            size: EMBEDDING_SIZE,
            detection_confidence: self.config.detection_confidence,
        }
    }

    /// Decode `bytes`, find the most confident face and return its embedding.
    pub fn process(&self, bytes: &[u8]) -> Result<FaceEmbedding, EmbeddingError> {
        let image = image::load_from_memory(bytes)?;

        if image.width() == 0 || image.height() == 0 {
            return Err(EmbeddingError::InvalidImage("image has no pixels".into()));
        }

        let faces = self.detect(&image)?;

        let Some(face) = faces.first() else {
            tracing::warn!("No faces detected with sufficient confidence");
            return Err(EmbeddingError::NoFaceDetected);
        };

        if faces.len() > 1 {
            tracing::warn!(
                "Multiple faces detected ({}), using the most confident one",
                faces.len()
            );
        }

        let embedding = self.embed(&image, face)?;

        tracing::debug!(
            "Extracted face embedding (confidence: {:.3}, dim: {})",
            face.bbox.score,
            embedding.len()
        );

        Ok(FaceEmbedding {
            embedding,
            confidence: face.bbox.score,
            face: face.bbox,
            faces_detected: faces.len(),
        })
    }

    /// Run the detector. The result is sorted by descending score.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectedFace>, EmbeddingError> {
        let (img_w, img_h) = image.dimensions();
        let (tensor, scale) = detector_input(image);

        let mut session = self.detector.lock();

        let input_name = session.inputs[0].name.clone();
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        // scores, boxes and optionally landmarks for each stride
        if output_names.len() < STRIDES.len() * 2 {
            return Err(EmbeddingError::Model(format!(
                "unexpected detector outputs: {output_names:?}"
            )));
        }
        let has_landmarks = output_names.len() >= STRIDES.len() * 3;

        let shape = [1i64, 3, DETECTOR_INPUT as i64, DETECTOR_INPUT as i64];
        let input = Value::from_array((shape.to_vec(), tensor))?;
        let outputs = session.run(ort::inputs![input_name => input])?;

        let mut candidates = vec![];

        for (i, stride) in STRIDES.iter().enumerate() {
            let extract = |name: &str| -> Result<Vec<f32>, EmbeddingError> {
                let Some(value) = outputs.get(name) else {
                    return Err(EmbeddingError::Model(format!(
                        "missing detector output '{name}'"
                    )));
                };
                let (_, data) = value.try_extract_tensor::<f32>()?;
                Ok(data.to_vec())
            };

            let scores = extract(&output_names[i])?;
            let boxes = extract(&output_names[i + STRIDES.len()])?;
            let kps = if has_landmarks {
                Some(extract(&output_names[i + STRIDES.len() * 2])?)
            } else {
                None
            };

            candidates.extend(decode_stride(
                &StrideOutput {
                    stride: *stride,
                    scores: &scores,
                    boxes: &boxes,
                    landmarks: kps.as_deref(),
                },
                &DecodeParams {
                    scale,
                    image_width: img_w as f32,
                    image_height: img_h as f32,
                    threshold: self.config.detection_confidence,
                },
            ));
        }

        let boxes: Vec<FaceBox> = candidates.iter().map(|c| c.bbox).collect();
        let keep = nms(&boxes, self.config.nms_threshold);

        let faces: Vec<DetectedFace> = keep.into_iter().map(|i| candidates[i].clone()).collect();

        tracing::debug!(
            "Detector: {} candidates, {} faces after NMS",
            candidates.len(),
            faces.len()
        );

        Ok(faces)
    }

    /// Run the recognizer on a detected face and return the L2 normalized embedding.
    pub fn embed(
        &self,
        image: &DynamicImage,
        face: &DetectedFace,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let rgb = image.to_rgb8();

        let crop = match face.landmarks {
            Some(landmarks) => align(&rgb, &landmarks),
            None => crop_square(&rgb, &face.bbox),
        };

        let tensor = recognizer_input(&crop);

        let mut session = self.recognizer.lock();
        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();

        let shape = [1i64, 3, RECOGNIZER_INPUT as i64, RECOGNIZER_INPUT as i64];
        let input = Value::from_array((shape.to_vec(), tensor))?;
        let outputs = session.run(ort::inputs![input_name => input])?;

        let Some(value) = outputs.get(&output_name) else {
            return Err(EmbeddingError::Model(format!(
                "missing recognizer output '{output_name}'"
            )));
        };

        let (_, data) = value.try_extract_tensor::<f32>()?;
        let mut embedding = data.to_vec();

        if embedding.len() != EMBEDDING_SIZE {
            return Err(EmbeddingError::Model(format!(
                "expected embedding of size {EMBEDDING_SIZE}, got {}",
                embedding.len()
            )));
        }

        if !l2_normalize(&mut embedding) {
            return Err(EmbeddingError::Model("recognizer produced a zero vector".into()));
        }

        Ok(embedding)
    }
}

/// Letterbox the image into the top left corner of the detector input and lay it out as
/// NCHW RGB, normalized to `(v - 127.5) / 128`. Returns the tensor data and the resize scale.
fn detector_input(image: &DynamicImage) -> (Vec<f32>, f32) {
    let (w, h) = image.dimensions();
    let side = DETECTOR_INPUT as f32;
    let scale = side / (w.max(h) as f32);
    let nw = ((w as f32 * scale) as u32).clamp(1, DETECTOR_INPUT);
    let nh = ((h as f32 * scale) as u32).clamp(1, DETECTOR_INPUT);

    let resized = image
        .resize_exact(nw, nh, image::imageops::FilterType::Triangle)
        .to_rgb8();

    let mut padded = RgbImage::new(DETECTOR_INPUT, DETECTOR_INPUT);
    image::imageops::overlay(&mut padded, &resized, 0, 0);

    (to_nchw(&padded, 127.5, 128.0), scale)
}

/// NCHW RGB normalized to `(v - 127.5) / 127.5`.
fn recognizer_input(crop: &RgbImage) -> Vec<f32> {
    to_nchw(crop, 127.5, 127.5)
}

fn to_nchw(image: &RgbImage, mean: f32, std: f32) -> Vec<f32> {
    let (w, h) = image.dimensions();
    let plane = (w * h) as usize;
    let mut data = vec![0.0; plane * 3];

    for (x, y, pixel) in image.enumerate_pixels() {
        let offset = (y * w + x) as usize;
        for c in 0..3 {
            data[c * plane + offset] = (pixel[c] as f32 - mean) / std;
        }
    }

    data
}

struct StrideOutput<'a> {
    stride: usize,
    scores: &'a [f32],
    boxes: &'a [f32],
    landmarks: Option<&'a [f32]>,
}

struct DecodeParams {
    /// Letterbox scale, detector pixels per source pixel.
    scale: f32,
    image_width: f32,
    image_height: f32,
    threshold: f32,
}

/// Decode the distance predictions of one SCRFD stride into source image coordinates.
///
/// Anchors are laid out row major over the feature map with `scores.len() / cells`
/// anchors per cell, every anchor centered on its cell's top left corner.
fn decode_stride(out: &StrideOutput, params: &DecodeParams) -> Vec<DetectedFace> {
    let side = DETECTOR_INPUT as usize / out.stride;
    let cells = side * side;

    if out.scores.is_empty() || out.scores.len() % cells != 0 {
        tracing::warn!(
            "Detector stride {}: {} scores do not fit a {side}x{side} grid",
            out.stride,
            out.scores.len()
        );
        return vec![];
    }

    let anchors = out.scores.len() / cells;
    let stride = out.stride as f32;
    let mut faces = vec![];

    for (idx, &score) in out.scores.iter().enumerate() {
        if score < params.threshold {
            continue;
        }

        let b = idx * 4;
        if b + 4 > out.boxes.len() {
            break;
        }

        let cell = idx / anchors;
        let cx = (cell % side) as f32 * stride;
        let cy = (cell / side) as f32 * stride;

        let to_source_x = |v: f32| (v / params.scale).clamp(0.0, params.image_width);
        let to_source_y = |v: f32| (v / params.scale).clamp(0.0, params.image_height);

        let bbox = FaceBox {
            x1: to_source_x(cx - out.boxes[b] * stride),
            y1: to_source_y(cy - out.boxes[b + 1] * stride),
            x2: to_source_x(cx + out.boxes[b + 2] * stride),
            y2: to_source_y(cy + out.boxes[b + 3] * stride),
            score,
        };

        if bbox.width() < MIN_FACE_SIDE || bbox.height() < MIN_FACE_SIDE {
            continue;
        }

        let landmarks = out.landmarks.and_then(|kps| {
            let k = idx * 10;
            let kps = kps.get(k..k + 10)?;
            let mut points = [(0.0, 0.0); 5];
            for (p, point) in points.iter_mut().enumerate() {
                *point = (
                    (cx + kps[p * 2] * stride) / params.scale,
                    (cy + kps[p * 2 + 1] * stride) / params.scale,
                );
            }
            Some(points)
        });

        faces.push(DetectedFace { bbox, landmarks });
    }

    faces
}

/// Least squares similarity transform (rotation, uniform scale, translation) mapping `src`
/// onto `dst`. Returned as `[a, b, tx, ty]` where
/// `x' = a*x - b*y + tx` and `y' = b*x + a*y + ty`.
fn similarity_transform(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> [f32; 4] {
    let n = src.len() as f32;
    let mean = |pts: &[(f32, f32); 5]| {
        let (sx, sy) = pts
            .iter()
            .fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
        (sx / n, sy / n)
    };

    let (msx, msy) = mean(src);
    let (mdx, mdy) = mean(dst);

    let mut dot = 0.0;
    let mut cross = 0.0;
    let mut norm = 0.0;

    for ((sx, sy), (dx, dy)) in src.iter().zip(dst.iter()) {
        let (sx, sy) = (sx - msx, sy - msy);
        let (dx, dy) = (dx - mdx, dy - mdy);
        dot += sx * dx + sy * dy;
        cross += sx * dy - sy * dx;
        norm += sx * sx + sy * sy;
    }

    if norm == 0.0 {
        return [1.0, 0.0, mdx - msx, mdy - msy];
    }

    let a = dot / norm;
    let b = cross / norm;
    let tx = mdx - (a * msx - b * msy);
    let ty = mdy - (b * msx + a * msy);

    [a, b, tx, ty]
}

/// Warp the face onto the ArcFace template using its landmarks.
fn align(image: &RgbImage, landmarks: &[(f32, f32); 5]) -> RgbImage {
    let [a, b, tx, ty] = similarity_transform(landmarks, &ARCFACE_TEMPLATE);
    let det = a * a + b * b;

    if det == 0.0 {
        return RgbImage::new(RECOGNIZER_INPUT, RECOGNIZER_INPUT);
    }

    RgbImage::from_fn(RECOGNIZER_INPUT, RECOGNIZER_INPUT, |u, v| {
        // Inverse similarity: source = R^-1 * (dest - t) / s
        let (du, dv) = (u as f32 - tx, v as f32 - ty);
        let x = (a * du + b * dv) / det;
        let y = (-b * du + a * dv) / det;
        bilinear(image, x, y)
    })
}

fn bilinear(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || x < 0.0 || y < 0.0 || x > (w - 1) as f32 || y > (h - 1) as f32 {
        return Rgb([0, 0, 0]);
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = image.get_pixel(x0, y0);
    let p10 = image.get_pixel(x1, y0);
    let p01 = image.get_pixel(x0, y1);
    let p11 = image.get_pixel(x1, y1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Square crop around the box center, resized to the recognizer input. Used when the detector
/// has no landmark outputs.
fn crop_square(image: &RgbImage, bbox: &FaceBox) -> RgbImage {
    let (w, h) = image.dimensions();
    let (x, y, side) = square_region(bbox, w, h);
    let crop = image::imageops::crop_imm(image, x, y, side, side).to_image();
    image::imageops::resize(
        &crop,
        RECOGNIZER_INPUT,
        RECOGNIZER_INPUT,
        image::imageops::FilterType::Triangle,
    )
}

/// Largest square centered on the box that fits inside a `w` x `h` image.
fn square_region(bbox: &FaceBox, w: u32, h: u32) -> (u32, u32, u32) {
    let cx = (bbox.x1 + bbox.x2) / 2.0;
    let cy = (bbox.y1 + bbox.y2) / 2.0;
    let side = bbox.width().max(bbox.height()).min(w.min(h) as f32).max(1.0);

    let x = (cx - side / 2.0).clamp(0.0, w as f32 - side);
    let y = (cy - side / 2.0).clamp(0.0, h as f32 - side);

    (x as u32, y as u32, side as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_input_letterboxes_wide_images() {
        let image = DynamicImage::new_rgb8(1280, 640);
        let (data, scale) = detector_input(&image);

        assert_eq!(3 * 640 * 640, data.len());
        assert!((scale - 0.5).abs() < f32::EPSILON);

        // Black source pixels and padding normalize to the same value.
        let black = (0.0 - 127.5) / 128.0;
        assert!(data.iter().all(|v| (v - black).abs() < 1e-6));
    }

    #[test]
    fn nchw_layout_separates_channels() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 255, 0]));

        let data = to_nchw(&image, 0.0, 1.0);

        // R plane, G plane, B plane
        assert_eq!(vec![255.0, 0.0, 0.0, 255.0, 0.0, 0.0], data);
    }

    #[test]
    fn decode_maps_anchor_to_source_coordinates() {
        let side = 640 / 32;
        let cells = side * side;
        let mut scores = vec![0.0; cells * 2];
        let mut boxes = vec![0.0; cells * 2 * 4];

        // Cell (x = 3, y = 2), second anchor.
        let idx = (2 * side + 3) * 2 + 1;
        scores[idx] = 0.9;
        boxes[idx * 4..idx * 4 + 4].copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);

        let faces = decode_stride(
            &StrideOutput {
                stride: 32,
                scores: &scores,
                boxes: &boxes,
                landmarks: None,
            },
            &DecodeParams {
                scale: 0.5,
                image_width: 1280.0,
                image_height: 1280.0,
                threshold: 0.5,
            },
        );

        assert_eq!(1, faces.len());
        let bbox = faces[0].bbox;
        // center (96, 64) in detector space, +-32, then / 0.5
        assert_eq!((128.0, 64.0, 256.0, 192.0), (bbox.x1, bbox.y1, bbox.x2, bbox.y2));
        assert!((bbox.score - 0.9).abs() < f32::EPSILON);
        assert!(faces[0].landmarks.is_none());
    }

    #[test]
    fn decode_skips_low_scores_and_tiny_boxes() {
        let side = 640 / 8;
        let cells = side * side;
        let mut scores = vec![0.0; cells * 2];
        let boxes = vec![0.1; cells * 2 * 4];

        scores[0] = 0.4;
        // Passes the threshold but the box is under the minimum side.
        scores[10] = 0.8;

        let faces = decode_stride(
            &StrideOutput {
                stride: 8,
                scores: &scores,
                boxes: &boxes,
                landmarks: None,
            },
            &DecodeParams {
                scale: 1.0,
                image_width: 640.0,
                image_height: 640.0,
                threshold: 0.5,
            },
        );

        assert!(faces.is_empty());
    }

    #[test]
    fn decode_reads_landmarks() {
        let side = 640 / 16;
        let cells = side * side;
        let mut scores = vec![0.0; cells * 2];
        let mut boxes = vec![0.0; cells * 2 * 4];
        let mut kps = vec![0.0; cells * 2 * 10];

        let idx = 0;
        scores[idx] = 0.99;
        boxes[0..4].copy_from_slice(&[0.0, 0.0, 4.0, 4.0]);
        kps[0..10].copy_from_slice(&[1.0, 1.0, 2.0, 1.0, 1.5, 2.0, 1.0, 3.0, 2.0, 3.0]);

        let faces = decode_stride(
            &StrideOutput {
                stride: 16,
                scores: &scores,
                boxes: &boxes,
                landmarks: Some(&kps),
            },
            &DecodeParams {
                scale: 1.0,
                image_width: 640.0,
                image_height: 640.0,
                threshold: 0.5,
            },
        );

        let landmarks = faces[0].landmarks.unwrap();
        assert_eq!((16.0, 16.0), landmarks[0]);
        assert_eq!((32.0, 48.0), landmarks[4]);
    }

    #[test]
    fn decode_rejects_mismatched_grid() {
        let faces = decode_stride(
            &StrideOutput {
                stride: 8,
                scores: &[0.9; 7],
                boxes: &[1.0; 28],
                landmarks: None,
            },
            &DecodeParams {
                scale: 1.0,
                image_width: 640.0,
                image_height: 640.0,
                threshold: 0.5,
            },
        );
        assert!(faces.is_empty());
    }

    #[test]
    fn similarity_transform_recovers_scale_and_translation() {
        let src = ARCFACE_TEMPLATE.map(|(x, y)| (x * 2.0 + 10.0, y * 2.0 + 20.0));
        let [a, b, tx, ty] = similarity_transform(&src, &ARCFACE_TEMPLATE);

        assert!((a - 0.5).abs() < 1e-4);
        assert!(b.abs() < 1e-4);
        assert!((tx + 5.0).abs() < 1e-3);
        assert!((ty + 10.0).abs() < 1e-3);
    }

    #[test]
    fn align_with_template_landmarks_is_identity() {
        let image = RgbImage::from_fn(112, 112, |x, y| Rgb([x as u8, y as u8, 0]));
        let aligned = align(&image, &ARCFACE_TEMPLATE);

        assert_eq!(image.get_pixel(40, 60), aligned.get_pixel(40, 60));
        assert_eq!(image.get_pixel(100, 10), aligned.get_pixel(100, 10));
    }

    #[test]
    fn square_region_stays_inside_image() {
        let bbox = FaceBox {
            x1: 90.0,
            y1: 0.0,
            x2: 110.0,
            y2: 40.0,
            score: 1.0,
        };
        let (x, y, side) = square_region(&bbox, 100, 100);
        assert_eq!(40, side);
        assert!(x + side <= 100);
        assert_eq!(0, y);
    }
}
