//! Image file decode/encode
//!
//! Images are exchanged with the engine as `f64` arrays scaled to [0, 1]: `HxW` for 8-bit
//! grayscale files and `HxWx3` for everything else (converted to RGB on load).

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::{Array2, Array3, ArrayD, ArrayViewD};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to load image '{path}': {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to save image '{path}': {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Cannot encode array of shape {0:?}: expected HxW or HxWx3")]
    UnsupportedShape(Vec<usize>),
}

/// Loads and saves images as normalized arrays
pub trait ImageCodec {
    fn load(&self, path: &Path) -> Result<ArrayD<f64>, CodecError>;
    fn save(&self, image: &ArrayViewD<f64>, path: &Path) -> Result<(), CodecError>;
}

/// Codec backed by the `image` crate; the file format follows the path extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCodec;

/// Convert a decoded image to a normalized array
pub fn image_to_array(image: DynamicImage) -> ArrayD<f64> {
    match image {
        DynamicImage::ImageLuma8(gray) => {
            let (width, height) = gray.dimensions();
            Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
                gray.get_pixel(x as u32, y as u32)[0] as f64 / 255.0
            })
            .into_dyn()
        }
        other => {
            let rgb = other.to_rgb8();
            let (width, height) = rgb.dimensions();
            Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
                rgb.get_pixel(x as u32, y as u32)[c] as f64 / 255.0
            })
            .into_dyn()
        }
    }
}

/// Quantize a [0, 1] value to 8 bits, clamping out-of-range input
fn to_u8(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Convert a normalized array to an 8-bit image
pub fn array_to_image(image: &ArrayViewD<f64>) -> Result<DynamicImage, CodecError> {
    let unsupported = || CodecError::UnsupportedShape(image.shape().to_vec());

    match *image.shape() {
        [height, width] => {
            let pixels: Vec<u8> = image.iter().map(|v| to_u8(*v)).collect();
            GrayImage::from_raw(width as u32, height as u32, pixels)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(unsupported)
        }
        [height, width, 3] => {
            let pixels: Vec<u8> = image.iter().map(|v| to_u8(*v)).collect();
            RgbImage::from_raw(width as u32, height as u32, pixels)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(unsupported)
        }
        _ => Err(unsupported()),
    }
}

impl ImageCodec for FileCodec {
    fn load(&self, path: &Path) -> Result<ArrayD<f64>, CodecError> {
        let decoded = image::open(path).map_err(|source| CodecError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(image_to_array(decoded))
    }

    fn save(&self, image: &ArrayViewD<f64>, path: &Path) -> Result<(), CodecError> {
        array_to_image(image)?
            .save(path)
            .map_err(|source| CodecError::Save {
                path: path.to_path_buf(),
                source,
            })
    }
}
