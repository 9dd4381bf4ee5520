// THEORY:
// A frame source is anything that yields still images one after another until it
// runs dry. The sentinel never decodes video itself; it only needs the next
// frame, already JPEG-encoded, ready to ship to the vision model. `Ok(None)`
// means the stream ended normally and is not an error.
//
// `ImageDirSource` replays a directory of stills in file-name order, decoding
// each with the `image` crate and re-encoding it as JPEG. It is the source used
// by tests and by the binary when handed a directory instead of a video file.
// Video files are decoded in the binary crate, behind the same trait.

use crate::error::SourceError;
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

const STILL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// One sampled image, JPEG-encoded.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Position in the stream, starting at 0.
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl Frame {
    /// Decodes a still image from disk and re-encodes it as JPEG.
    pub fn from_image_path(path: impl AsRef<Path>, index: u64) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| SourceError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        let jpeg = encode_jpeg(width, height, rgb.into_raw())?;
        Ok(Self {
            index,
            width,
            height,
            jpeg,
        })
    }
}

pub trait FrameSource: Send {
    /// The next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Label for logs.
    fn describe(&self) -> String;
}

/// Encodes an RGB8 buffer as JPEG.
pub fn encode_jpeg(width: u32, height: u32, rgb: Vec<u8>) -> Result<Vec<u8>, SourceError> {
    let buffer = image::RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
        SourceError::Backend(format!("buffer does not hold a {width}x{height} RGB image"))
    })?;
    let mut out = Cursor::new(Vec::new());
    buffer.write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}

/// Replays still images from a directory, sorted by file name.
pub struct ImageDirSource {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    cursor: usize,
}

impl ImageDirSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let dir = dir.as_ref().to_path_buf();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_still = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| STILL_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_still {
                paths.push(path);
            }
        }
        paths.sort();
        debug!("{} stills found in {}", paths.len(), dir.display());
        Ok(Self { dir, paths, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        let index = self.cursor as u64;
        self.cursor += 1;
        Frame::from_image_path(path, index).map(Some)
    }

    fn describe(&self) -> String {
        format!("{} ({} stills)", self.dir.display(), self.paths.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_still(dir: &Path, name: &str, shade: u8) {
        let img = image::RgbImage::from_pixel(8, 6, image::Rgb([shade, shade, shade]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn replays_stills_in_name_order_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        write_still(dir.path(), "b.png", 200);
        write_still(dir.path(), "a.png", 10);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut source = ImageDirSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!((first.width, first.height), (8, 6));
        assert_eq!(&first.jpeg[..2], &[0xFF, 0xD8]);

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.index, 1);
        assert!(source.next_frame().unwrap().is_none());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn corrupt_still_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();
        let mut source = ImageDirSource::open(dir.path()).unwrap();
        assert!(matches!(source.next_frame(), Err(SourceError::Decode { .. })));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageDirSource::open(dir.path().join("nope"));
        assert!(matches!(result, Err(SourceError::Io(_))));
    }

    #[test]
    fn encode_rejects_short_buffers() {
        assert!(matches!(encode_jpeg(4, 4, vec![0; 10]), Err(SourceError::Backend(_))));
        let jpeg = encode_jpeg(2, 2, vec![128; 12]).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
