use image::imageops::{self, FilterType};
use ndarray::{Array4, ArrayView2};
use serde::{Deserialize, Serialize, Serializer};

use crate::shared::constants::TENSOR_SIZE;
use crate::shared::frame::Frame;
use crate::shared::region::{Region, RegionError};

/// Nested `[batch][channel][row][col]` layout used on the wire.
type NestedGrid = Vec<Vec<Vec<Vec<u8>>>>;

/// Grayscale model input with shape `[1, 1, 64, 64]`.
///
/// Serializes as nested JSON arrays, which is what the scoring service
/// expects under the `data` key.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "NestedGrid")]
pub struct NormalizedTensor {
    data: Array4<u8>,
}

impl NormalizedTensor {
    /// Resamples a face crop to 64×64 (bilinear) and converts it to luma.
    ///
    /// The weighting truncates each channel before summing, so pure white
    /// maps to 253 rather than 255. Models trained on this input depend on it.
    pub fn from_face(face: &Frame) -> Result<Self, RegionError> {
        let invalid = || {
            RegionError::invalid(&Region::new(
                0,
                0,
                face.width() as i32,
                face.height() as i32,
            ))
        };
        if face.is_empty() || face.channels() == 0 {
            return Err(invalid());
        }

        let rgb = image::RgbImage::from_raw(face.width(), face.height(), rgb_bytes(face))
            .ok_or_else(invalid)?;
        let side = TENSOR_SIZE as u32;
        let resized = imageops::resize(&rgb, side, side, FilterType::Triangle);

        let mut data = Array4::<u8>::zeros((1, 1, TENSOR_SIZE, TENSOR_SIZE));
        for (col, row, pixel) in resized.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            data[[0, 0, row as usize, col as usize]] = luma(r, g, b);
        }
        Ok(Self { data })
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[[0, 0, row, col]]
    }

    pub fn plane(&self) -> ArrayView2<'_, u8> {
        self.data.slice(ndarray::s![0, 0, .., ..])
    }
}

/// Packed RGB for any channel layout: gray is replicated, alpha dropped.
fn rgb_bytes(face: &Frame) -> Vec<u8> {
    let channels = face.channels() as usize;
    if channels == 3 {
        return face.data().to_vec();
    }
    face.data()
        .chunks_exact(channels)
        .flat_map(|px| match px {
            [v] | [v, _] => [*v, *v, *v],
            _ => [px[0], px[1], px[2]],
        })
        .collect()
}

/// `R/4 + G/2 + B/4` with each term truncated independently.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    (r >> 2) + (g >> 1) + (b >> 2)
}

impl Serialize for NormalizedTensor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.data.outer_iter().map(|batch| {
            batch
                .outer_iter()
                .map(|plane| plane.outer_iter().map(|row| row.to_vec()).collect())
                .collect::<Vec<Vec<Vec<u8>>>>()
        }))
    }
}

impl TryFrom<NestedGrid> for NormalizedTensor {
    type Error = String;

    fn try_from(grid: NestedGrid) -> Result<Self, Self::Error> {
        let expected = (1, 1, TENSOR_SIZE, TENSOR_SIZE);
        let flat: Vec<u8> = grid.into_iter().flatten().flatten().flatten().collect();
        let data = Array4::from_shape_vec(expected, flat)
            .map_err(|e| format!("tensor must have shape {expected:?}: {e}"))?;
        Ok(Self { data })
    }
}
