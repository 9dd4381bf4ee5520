// THEORY:
// `VideoFileSource` is the bridge between OpenCV's decoder and the sentinel's
// `FrameSource` trait. Each `next_frame` reads one BGR frame and encodes it
// straight to JPEG with `imgcodecs`, which expects BGR, so no colour conversion
// is needed. The capture handle is released when the source is dropped, which
// the sentinel guarantees on every exit path.

use cloud_sentinel::{Frame, FrameSource, SourceError};
use opencv::{
    core::{Mat, Vector},
    imgcodecs,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn backend(e: opencv::Error) -> SourceError {
    SourceError::Backend(e.to_string())
}

pub struct VideoFileSource {
    cap: VideoCapture,
    path: PathBuf,
    next_index: u64,
}

impl VideoFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let path_str = path
            .to_str()
            .ok_or_else(|| SourceError::Backend(format!("non UTF-8 video path: {}", path.display())))?;

        let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY).map_err(backend)?;
        if !cap.is_opened().map_err(backend)? {
            return Err(SourceError::Backend(format!("cannot open video {}", path.display())));
        }

        let fps = cap.get(videoio::CAP_PROP_FPS).map_err(backend)?;
        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(backend)? as u32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(backend)? as u32;
        info!("📂 Feed: {} ({}x{} @ {:.1} fps)", path.display(), width, height, fps);

        Ok(Self {
            cap,
            path,
            next_index: 0,
        })
    }
}

impl FrameSource for VideoFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let mut frame = Mat::default();
        if !self.cap.read(&mut frame).map_err(backend)? || frame.empty() {
            return Ok(None);
        }

        let mut jpeg = Vector::<u8>::new();
        imgcodecs::imencode(".jpg", &frame, &mut jpeg, &Vector::new()).map_err(backend)?;
        let size = frame.size().map_err(backend)?;

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Frame {
            index,
            width: size.width as u32,
            height: size.height as u32,
            jpeg: jpeg.to_vec(),
        }))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        debug!("Releasing video capture for {}", self.path.display());
        let _ = self.cap.release();
    }
}

/// Picks a source for `feed`: a directory of stills or a video file.
pub fn open_feed(feed: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
    if feed.is_dir() {
        Ok(Box::new(cloud_sentinel::ImageDirSource::open(feed)?))
    } else {
        Ok(Box::new(VideoFileSource::open(feed)?))
    }
}
