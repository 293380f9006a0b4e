use std::path::{Path, PathBuf};

use crate::output::domain::frame_sink::FrameSink;
use crate::shared::frame::Frame;

/// Saves every Nth annotated frame to a single image file, overwriting the
/// previous snapshot. The format follows the file extension.
pub struct SnapshotSink {
    path: PathBuf,
    every: usize,
    received: usize,
    saved: usize,
}

impl SnapshotSink {
    pub fn new(path: &Path, every: usize) -> Result<Self, &'static str> {
        if every < 1 {
            return Err("snapshot interval must be >= 1");
        }
        Ok(Self {
            path: path.to_path_buf(),
            every,
            received: 0,
            saved: 0,
        })
    }

    pub fn saved(&self) -> usize {
        self.saved
    }
}

impl FrameSink for SnapshotSink {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let due = self.received % self.every == 0;
        self.received += 1;
        if !due {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;
        img.save(&self.path)?;
        self.saved += 1;
        log::debug!("Snapshot of frame {} saved to {}", frame.index(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(value: u8, index: usize) -> Frame {
        Frame::new(vec![value; 16 * 8 * 3], 16, 8, 3, index)
    }

    #[test]
    fn test_saves_first_frame_and_every_nth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.png");
        let mut sink = SnapshotSink::new(&path, 3).unwrap();

        for i in 0..7 {
            sink.write(&solid(i as u8 * 10, i)).unwrap();
        }

        // Frames 0, 3 and 6.
        assert_eq!(sink.saved(), 3);
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (16, 8));
        assert_eq!(img.get_pixel(0, 0).0, [60, 60, 60]);
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out").join("snap.png");
        let mut sink = SnapshotSink::new(&path, 1).unwrap();
        sink.write(&solid(1, 0)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(SnapshotSink::new(Path::new("snap.png"), 0).is_err());
    }

    #[test]
    fn test_unknown_extension_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SnapshotSink::new(&dir.path().join("snap.unknown"), 1).unwrap();
        assert!(sink.write(&solid(1, 0)).is_err());
    }
}
