use facemood_vision::{Frame, FrameSource, PipelineError};
use std::collections::VecDeque;
use std::path::PathBuf;

/// Frames from still image files, one per file, in the order given.
pub struct ImageFileSource {
    paths: VecDeque<PathBuf>,
    next_index: u64,
}

impl ImageFileSource {
    pub fn new<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        Self {
            paths: paths.into_iter().collect(),
            next_index: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;

        log::info!("frame {}: {}", index, path.display());
        let img = image::open(&path)
            .map_err(|e| PipelineError::Source(format!("{}: {}", path.display(), e)))?;
        Ok(Some(Frame::new(index, img.to_rgb8())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_yields_in_order_then_stops() {
        let dir = std::env::temp_dir().join(format!("facemood-source-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let a = dir.join("a.png");
        let b = dir.join("b.png");
        RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])).save(&a).unwrap();
        RgbImage::from_pixel(5, 2, Rgb([9, 9, 9])).save(&b).unwrap();

        let mut source = ImageFileSource::new([a, dir.join("missing.png"), b]);
        let first = source.next_frame().unwrap().unwrap();
        assert_eq!((first.index(), first.width(), first.height()), (0, 4, 3));

        let miss = source.next_frame().unwrap_err();
        assert!(!miss.is_fatal());

        let third = source.next_frame().unwrap().unwrap();
        assert_eq!((third.index(), third.width()), (2, 5));
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.remaining(), 0);
    }
}
