use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use crate::error::{PipelineError, Result};
use crate::types::{BoundingBox, NormalizedTensor};

/// Side length of the classifier input.
pub const DEFAULT_INPUT_SIZE: u32 = 64;

#[inline]
pub fn normalize_channel(value: u8) -> f32 {
    value as f32 / 255.0
}

/// Crop `region` out of `frame`, resize to `size`x`size` and pack it as a
/// planar `[1, 3, size, size]` tensor (R plane, G plane, B plane) in `[0, 1]`.
pub fn preprocess(frame: &RgbImage, region: BoundingBox, size: u32) -> Result<NormalizedTensor> {
    if !region.fits_within(frame.width(), frame.height()) {
        return Err(PipelineError::InvalidRegion {
            region,
            frame_width: frame.width(),
            frame_height: frame.height(),
        });
    }

    let crop = imageops::crop_imm(frame, region.x, region.y, region.width, region.height);
    let face = imageops::resize(&crop.to_image(), size, size, FilterType::Triangle);

    let plane = (size * size) as usize;
    let mut input_data = vec![0f32; 3 * plane];
    let (r_channel, rest) = input_data.split_at_mut(plane);
    let (g_channel, b_channel) = rest.split_at_mut(plane);

    for (i, pixel) in face.as_raw().chunks_exact(3).enumerate() {
        r_channel[i] = normalize_channel(pixel[0]);
        g_channel[i] = normalize_channel(pixel[1]);
        b_channel[i] = normalize_channel(pixel[2]);
    }

    let tensor = Array4::from_shape_vec((1, 3, size as usize, size as usize), input_data)
        .map_err(|e| PipelineError::MalformedOutput(format!("tensor layout: {e}")))?;
    Ok(NormalizedTensor::new(tensor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_normalize_endpoints() {
        assert_eq!(normalize_channel(255), 1.0);
        assert_eq!(normalize_channel(0), 0.0);
    }

    #[test]
    fn test_shape_and_range() {
        let frame = gradient(320, 240);
        let tensor = preprocess(&frame, BoundingBox::new(40, 30, 120, 90), 64).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert!(tensor
            .as_array()
            .iter()
            .all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_deterministic() {
        let frame = gradient(200, 150);
        let region = BoundingBox::new(13, 7, 97, 111);
        let a = preprocess(&frame, region, 64).unwrap();
        let b = preprocess(&frame, region, 64).unwrap();
        let bits = |t: &NormalizedTensor| t.as_array().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_planar_channel_order() {
        // Identity resize keeps pixel values, so plane offsets can be checked directly.
        let mut frame = RgbImage::from_pixel(8, 8, Rgb([255, 0, 51]));
        frame.put_pixel(3, 2, Rgb([0, 255, 0]));
        let tensor = preprocess(&frame, BoundingBox::new(0, 0, 8, 8), 8).unwrap();
        let arr = tensor.as_array();
        assert_eq!(arr[[0, 0, 0, 0]], 1.0);
        assert_eq!(arr[[0, 1, 0, 0]], 0.0);
        assert!((arr[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);
        assert_eq!(arr[[0, 0, 2, 3]], 0.0);
        assert_eq!(arr[[0, 1, 2, 3]], 1.0);

        let flat = arr.as_slice().unwrap();
        assert_eq!(flat[64 + 2 * 8 + 3], 1.0);
    }

    #[test]
    fn test_rejects_bad_region() {
        let frame = gradient(100, 100);
        let empty = preprocess(&frame, BoundingBox::new(10, 10, 0, 20), 64);
        assert!(matches!(empty, Err(PipelineError::InvalidRegion { .. })));
        let outside = preprocess(&frame, BoundingBox::new(90, 90, 20, 20), 64);
        assert!(matches!(outside, Err(PipelineError::InvalidRegion { .. })));
    }
}
