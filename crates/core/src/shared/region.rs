use thiserror::Error;

/// A face bounding box in frame pixel coordinates.
///
/// Detectors may report boxes that extend past the frame edges; use
/// [`Region::clamp_to`] before touching pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("invalid region {width}x{height} at ({x}, {y})")]
    InvalidRegion {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
}

impl RegionError {
    pub fn invalid(region: &Region) -> Self {
        RegionError::InvalidRegion {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
        }
    }
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Intersects the region with a `frame_w` × `frame_h` frame.
    ///
    /// Returns an empty region (zero width or height) when nothing is visible.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Region {
        let x1 = self.x.clamp(0, frame_w as i32);
        let y1 = self.y.clamp(0, frame_h as i32);
        let x2 = self.right().clamp(0, frame_w as i32);
        let y2 = self.bottom().clamp(0, frame_h as i32);
        Region {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0),
            height: (y2 - y1).max(0),
        }
    }

    /// Whether both sides fall within `[min, max]`; `max == 0` means unbounded.
    pub fn fits_size(&self, min: u32, max: u32) -> bool {
        let side_ok = |side: i32| {
            let side = side.max(0) as u32;
            side >= min && (max == 0 || side <= max)
        };
        side_ok(self.width) && side_ok(self.height)
    }
}
