//! Frame sources for the runner.

use image::RgbImage;
use line_vision::{FrameSource, LineVisionError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Replays the images of a directory in file-name order, one per cycle.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, LineVisionError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|err| LineVisionError::Acquisition(format!("{}: {err}", dir.display())))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| LineVisionError::Acquisition(format!("{}: {err}", dir.display())))?
                .path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if is_image {
                paths.push(path);
            }
        }
        paths.sort();
        info!(dir = %dir.display(), frames = paths.len(), "image sequence opened");

        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, LineVisionError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        debug!(path = %path.display(), "loading frame");
        Ok(Some(image::open(path)?.to_rgb8()))
    }
}

/// Ends any source early once `interrupted` is raised, so the follower takes its
/// normal end-of-stream exit and still sends the stop.
pub struct InterruptibleSource<S> {
    inner: S,
    interrupted: Arc<AtomicBool>,
}

impl<S> InterruptibleSource<S> {
    pub fn new(inner: S, interrupted: Arc<AtomicBool>) -> Self {
        Self { inner, interrupted }
    }
}

impl<S: FrameSource> FrameSource for InterruptibleSource<S> {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, LineVisionError> {
        if self.interrupted.load(Ordering::SeqCst) {
            info!("interrupted, ending frame stream");
            return Ok(None);
        }
        self.inner.next_frame()
    }
}

#[cfg(feature = "camera")]
pub use camera::CameraSource;

#[cfg(feature = "camera")]
mod camera {
    use super::*;
    use opencv::{
        core::Mat,
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture},
    };

    /// Frames from a V4L/DirectShow device or a video file, through OpenCV.
    pub struct CameraSource {
        capture: VideoCapture,
        frame: Mat,
    }

    fn acquisition(err: opencv::Error) -> LineVisionError {
        LineVisionError::Acquisition(err.to_string())
    }

    impl CameraSource {
        pub fn device(index: i32) -> Result<Self, LineVisionError> {
            let capture = VideoCapture::new(index, videoio::CAP_ANY).map_err(acquisition)?;
            Self::from_capture(capture, &format!("camera {index}"))
        }

        pub fn file(path: &str) -> Result<Self, LineVisionError> {
            let capture = VideoCapture::from_file(path, videoio::CAP_ANY).map_err(acquisition)?;
            Self::from_capture(capture, path)
        }

        fn from_capture(capture: VideoCapture, name: &str) -> Result<Self, LineVisionError> {
            if !capture.is_opened().map_err(acquisition)? {
                return Err(LineVisionError::Acquisition(format!("cannot open {name}")));
            }
            info!(source = name, "video capture opened");
            Ok(Self {
                capture,
                frame: Mat::default(),
            })
        }
    }

    impl FrameSource for CameraSource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>, LineVisionError> {
            if !self.capture.read(&mut self.frame).map_err(acquisition)? || self.frame.empty() {
                return Ok(None);
            }

            // OpenCV delivers BGR.
            let mut rgb = Mat::default();
            imgproc::cvt_color(&self.frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
                .map_err(acquisition)?;
            let width = rgb.cols() as u32;
            let height = rgb.rows() as u32;
            let bytes = rgb.data_bytes().map_err(acquisition)?.to_vec();

            RgbImage::from_raw(width, height, bytes)
                .map(Some)
                .ok_or_else(|| LineVisionError::Acquisition("frame buffer size mismatch".into()))
        }
    }
}
