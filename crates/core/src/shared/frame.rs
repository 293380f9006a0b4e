use ndarray::{ArrayView3, ShapeError};

use crate::shared::region::{Region, RegionError};

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at capture boundaries only; the pipeline
/// treats pixel data as opaque apart from cropping and overlay drawing.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A zero-sized frame, as produced by a camera that is still warming up.
    pub fn empty(index: usize) -> Self {
        Self::new(Vec::new(), 0, 0, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Copies the part of the frame covered by `region` into a new frame.
    ///
    /// The region is clipped to the frame first. A region with no visible
    /// area is rejected with [`RegionError::InvalidRegion`].
    pub fn crop(&self, region: &Region) -> Result<Frame, RegionError> {
        let visible = region.clamp_to(self.width, self.height);
        if visible.is_empty() {
            return Err(RegionError::invalid(region));
        }

        let fw = self.width as usize;
        let channels = self.channels as usize;
        let rx = visible.x as usize;
        let ry = visible.y as usize;
        let rw = visible.width as usize;
        let rh = visible.height as usize;

        let mut pixels = Vec::with_capacity(rw * rh * channels);
        for row in 0..rh {
            let start = ((ry + row) * fw + rx) * channels;
            pixels.extend_from_slice(&self.data[start..start + rw * channels]);
        }

        Ok(Frame::new(
            pixels,
            rw as u32,
            rh as u32,
            self.channels,
            self.index,
        ))
    }

    /// `(height, width, channels)` view of the pixels.
    pub fn as_ndarray(&self) -> Result<ArrayView3<'_, u8>, ShapeError> {
        ArrayView3::from_shape(self.shape(), &self.data)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Frame::new(data, width, height, 3, 7)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_empty_frame_is_empty() {
        let frame = Frame::empty(3);
        assert!(frame.is_empty());
        assert_eq!(frame.index(), 3);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2x2 RGB: set pixel (row=1, col=0) to red
        let mut data = vec![0u8; 12];
        data[6] = 255;
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray().unwrap();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_crop_copies_region_pixels() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&Region::new(2, 3, 4, 2)).unwrap();

        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.index(), 7);
        let arr = crop.as_ndarray().unwrap();
        assert_eq!(arr[[0, 0, 0]], 2); // x
        assert_eq!(arr[[0, 0, 1]], 3); // y
        assert_eq!(arr[[1, 3, 0]], 5);
        assert_eq!(arr[[1, 3, 1]], 4);
    }

    #[test]
    fn test_crop_clips_to_frame_bounds() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&Region::new(7, -2, 10, 5)).unwrap();
        assert_eq!(crop.width(), 3);
        assert_eq!(crop.height(), 3);
        assert_eq!(crop.as_ndarray().unwrap()[[0, 0, 0]], 7);
        assert_eq!(crop.as_ndarray().unwrap()[[0, 0, 1]], 0);
    }

    #[test]
    fn test_crop_zero_width_is_invalid() {
        let frame = gradient_frame(10, 8);
        let err = frame.crop(&Region::new(2, 2, 0, 5)).unwrap_err();
        assert!(matches!(err, RegionError::InvalidRegion { width: 0, .. }));
    }

    #[test]
    fn test_crop_outside_frame_is_invalid() {
        let frame = gradient_frame(10, 8);
        assert!(frame.crop(&Region::new(20, 20, 5, 5)).is_err());
    }
}
