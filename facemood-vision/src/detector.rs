use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::{session::Session, value::Value};

use crate::error::{PipelineError, Result};
use crate::model;
use crate::types::BoundingBox;
use crate::yunet::{self, RawDetection, RawTensor};

/// Face localization on a single-channel frame.
///
/// An empty result means "no face" and is not an error.
pub trait FaceDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<BoundingBox>>;
}

impl<T: FaceDetector + ?Sized> FaceDetector for Box<T> {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<BoundingBox>> {
        (**self).detect(gray)
    }
}

/// Fixed detection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Side of the square canvas the frame is letterboxed into. Larger finds
    /// smaller faces but costs more per frame.
    pub input_size: u32,
    /// Minimum confidence to accept a region. Higher rejects more false positives.
    pub score_threshold: f32,
    /// Overlap above which the weaker of two candidates is suppressed.
    pub nms_threshold: f32,
    pub min_face_size: u32,
    pub max_face_size: Option<u32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            score_threshold: 0.6,
            nms_threshold: 0.3,
            min_face_size: 30,
            max_face_size: None,
        }
    }
}

impl DetectorConfig {
    /// YuNet's coarsest head has stride 32, so the canvas must divide evenly.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));
        if self.input_size == 0 || self.input_size % 32 != 0 {
            return invalid(format!(
                "input_size {} is not a positive multiple of 32",
                self.input_size
            ));
        }
        for (name, value) in [
            ("score_threshold", self.score_threshold),
            ("nms_threshold", self.nms_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} {value} is outside [0, 1]"));
            }
        }
        if let Some(max) = self.max_face_size {
            if max < self.min_face_size {
                return invalid(format!(
                    "max_face_size {max} is below min_face_size {}",
                    self.min_face_size
                ));
            }
        }
        Ok(())
    }
}

/// Mapping between frame pixels and the square detector canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Letterbox {
    pub fn fit(frame_width: u32, frame_height: u32, target_size: u32) -> Self {
        let max_dim = frame_width.max(frame_height).max(1);
        let scale = target_size as f32 / max_dim as f32;
        let new_width = ((frame_width as f32 * scale) as u32).clamp(1, target_size.max(1));
        let new_height = ((frame_height as f32 * scale) as u32).clamp(1, target_size.max(1));
        Self {
            scale,
            offset_x: target_size.saturating_sub(new_width) / 2,
            offset_y: target_size.saturating_sub(new_height) / 2,
            frame_width,
            frame_height,
        }
    }

    /// Project a canvas-space `[x, y, w, h]` back into the frame, rounding
    /// outward and clamping to the frame bounds.
    pub fn to_frame(&self, bbox: &[f32; 4]) -> Option<BoundingBox> {
        let x0 = (bbox[0] - self.offset_x as f32) / self.scale;
        let y0 = (bbox[1] - self.offset_y as f32) / self.scale;
        let x1 = x0 + bbox[2] / self.scale;
        let y1 = y0 + bbox[3] / self.scale;

        let x0 = x0.floor().max(0.0);
        let y0 = y0.floor().max(0.0);
        let x1 = x1.ceil().min(self.frame_width as f32);
        let y1 = y1.ceil().min(self.frame_height as f32);

        if !(x1 > x0 && y1 > y0) {
            return None;
        }
        Some(BoundingBox::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        ))
    }
}

/// YuNet face detector run through onnxruntime.
pub struct YuNetDetector {
    session: Session,
    config: DetectorConfig,
}

impl YuNetDetector {
    pub fn load(path: &Path, config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let session = model::load_session(path)?;
        Self::new(session, config)
    }

    pub fn new(session: Session, config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { session, config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn run(&mut self, input: Array4<f32>) -> Result<Vec<RawTensor>> {
        let input_tensor = Value::from_array(input).map_err(PipelineError::Detection)?;
        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(PipelineError::Detection)?;

        let mut tensors = Vec::new();
        for (name, output) in outputs.iter() {
            let (shape, data) = output
                .try_extract_tensor::<f32>()
                .map_err(PipelineError::Detection)?;
            tensors.push(RawTensor {
                name: name.to_string(),
                shape: shape.iter().copied().collect(),
                data: data.to_vec(),
            });
        }
        Ok(tensors)
    }

    fn accept(&self, bbox: &BoundingBox) -> bool {
        let short = bbox.width.min(bbox.height);
        let long = bbox.width.max(bbox.height);
        short >= self.config.min_face_size && self.config.max_face_size.map_or(true, |max| long <= max)
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<BoundingBox>> {
        if gray.width() == 0 || gray.height() == 0 {
            return Ok(Vec::new());
        }

        let target = self.config.input_size;
        let (letterbox, canvas) = letterbox_gray(gray, target);
        let raw = self.run(replicate_planes(&canvas)?)?;

        let candidates: Vec<RawDetection> =
            yunet::decode_detections(&raw, target as usize, self.config.score_threshold)?;
        let kept = yunet::nms(&candidates, self.config.nms_threshold);
        log::trace!("yunet: {} raw, {} after nms", candidates.len(), kept.len());

        Ok(kept
            .iter()
            .filter_map(|d| letterbox.to_frame(&d.bbox))
            .filter(|b| self.accept(b))
            .collect())
    }
}

/// Resize keeping aspect ratio and centre on a black square canvas.
pub fn letterbox_gray(gray: &GrayImage, target_size: u32) -> (Letterbox, GrayImage) {
    let letterbox = Letterbox::fit(gray.width(), gray.height(), target_size);
    let new_width = ((gray.width() as f32 * letterbox.scale) as u32).clamp(1, target_size.max(1));
    let new_height = ((gray.height() as f32 * letterbox.scale) as u32).clamp(1, target_size.max(1));
    let resized = imageops::resize(gray, new_width, new_height, FilterType::Triangle);

    let mut canvas = GrayImage::new(target_size, target_size);
    imageops::overlay(
        &mut canvas,
        &resized,
        letterbox.offset_x as i64,
        letterbox.offset_y as i64,
    );
    (letterbox, canvas)
}

/// The detector is trained on 3-channel input; a grayscale plane is copied
/// into all three, values kept in [0, 255].
fn replicate_planes(canvas: &GrayImage) -> Result<Array4<f32>> {
    let (w, h) = canvas.dimensions();
    let plane: Vec<f32> = canvas.as_raw().iter().map(|&v| v as f32).collect();
    let mut input_data = Vec::with_capacity(plane.len() * 3);
    for _ in 0..3 {
        input_data.extend_from_slice(&plane);
    }
    Array4::from_shape_vec((1, 3, h as usize, w as usize), input_data)
        .map_err(|e| PipelineError::MalformedOutput(format!("detector input: {e}")))
}
