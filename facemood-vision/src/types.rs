use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use image::{GrayImage, RgbImage};
use ndarray::Array4;

/// One captured image, owned by the pipeline for the duration of a tick.
#[derive(Debug)]
pub struct Frame {
    index: u64,
    captured_at: Instant,
    image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self {
            index,
            captured_at: Instant::now(),
            image,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Single-channel copy for the detector.
    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }
}

/// Axis-aligned integer region, origin at the top-left of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the box is non-empty and lies entirely inside a `width` x `height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty()
            && self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// `[1, 3, S, S]` planar RGB tensor with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Array4<f32>,
}

impl NormalizedTensor {
    pub fn new(data: Array4<f32>) -> Self {
        Self { data }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }

    /// Side length `S` of the square planes.
    pub fn size(&self) -> usize {
        self.data.shape()[3]
    }
}

/// Raw per-class logits, index-aligned with the label table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector(pub Vec<f32>);

impl ScoreVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Ordered class names, shared read-only by every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLabelTable {
    labels: Arc<[String]>,
}

impl ClassLabelTable {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    pub index: usize,
    pub confidence: f32,
    pub distribution: Vec<f32>,
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.1}%", self.label, self.confidence * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Classified(ClassificationResult),
    NoFace,
    /// Recoverable failure confined to this tick.
    Failed(String),
}

/// Everything the renderer gets for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub frame_index: u64,
    pub candidates: Vec<BoundingBox>,
    pub primary: Option<BoundingBox>,
    pub outcome: TickOutcome,
}

impl TickReport {
    pub fn result(&self) -> Option<&ClassificationResult> {
        match &self.outcome {
            TickOutcome::Classified(result) => Some(result),
            _ => None,
        }
    }
}
