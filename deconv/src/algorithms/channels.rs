//! Per-channel dispatch for grayscale and RGB images.
//!
//! Single-channel transforms are fanned out over the planes of a color image with no
//! shared state between channels, then restacked in the original channel order.

use std::fmt;

use ndarray::{stack, Array2, ArrayD, ArrayView2, ArrayViewD, Axis, Ix2, Ix3};

use crate::error::{DeconvError, Result};

/// Number of planes in a color image
pub const COLOR_CHANNELS: usize = 3;

/// Layout of an image array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// `H x W`
    Grayscale,
    /// `H x W x 3`
    Rgb,
}

impl ImageKind {
    /// Classify an array shape, rejecting anything that is not `HxW` or `HxWx3`
    /// as well as empty images.
    pub fn from_shape(shape: &[usize]) -> Result<Self> {
        let unsupported = || DeconvError::UnsupportedImageShape {
            shape: shape.to_vec(),
        };

        if shape.contains(&0) {
            return Err(unsupported());
        }

        match shape {
            [_, _] => Ok(ImageKind::Grayscale),
            [_, _, COLOR_CHANNELS] => Ok(ImageKind::Rgb),
            _ => Err(unsupported()),
        }
    }

    pub fn channel_count(&self) -> usize {
        match self {
            ImageKind::Grayscale => 1,
            ImageKind::Rgb => COLOR_CHANNELS,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Grayscale => write!(f, "Grayscale"),
            ImageKind::Rgb => write!(f, "RGB"),
        }
    }
}

fn check_plane(input: (usize, usize), output: &Array2<f64>, channel: usize) -> Result<()> {
    if output.dim() != input {
        return Err(DeconvError::Shape(format!(
            "Channel {channel} transform returned {:?}, expected {:?}",
            output.dim(),
            input
        )));
    }
    Ok(())
}

/// Apply a single-channel transform to every channel of an image
///
/// Grayscale images are passed straight to `transform`. RGB images are split into three
/// planes, each transformed independently in channel order, and restacked along the last
/// axis. The transform receives the plane and its channel index.
///
/// # Errors
/// * [`DeconvError::UnsupportedImageShape`] for shapes other than `HxW` / `HxWx3`
/// * [`DeconvError::Shape`] if the transform changes the plane shape
/// * Any error returned by `transform`
pub fn process_channels<F>(image: &ArrayViewD<f64>, mut transform: F) -> Result<ArrayD<f64>>
where
    F: FnMut(ArrayView2<f64>, usize) -> Result<Array2<f64>>,
{
    let kind = ImageKind::from_shape(image.shape())?;
    let unsupported = |_| DeconvError::UnsupportedImageShape {
        shape: image.shape().to_vec(),
    };

    match kind {
        ImageKind::Grayscale => {
            let plane = image.view().into_dimensionality::<Ix2>().map_err(unsupported)?;
            let result = transform(plane, 0)?;
            check_plane(plane.dim(), &result, 0)?;
            Ok(result.into_dyn())
        }
        ImageKind::Rgb => {
            let color = image.view().into_dimensionality::<Ix3>().map_err(unsupported)?;

            let mut planes = Vec::with_capacity(COLOR_CHANNELS);
            for (channel, plane) in color.axis_iter(Axis(2)).enumerate() {
                let result = transform(plane, channel)?;
                check_plane(plane.dim(), &result, channel)?;
                planes.push(result);
            }

            let views: Vec<ArrayView2<f64>> = planes.iter().map(|p| p.view()).collect();
            let stacked = stack(Axis(2), &views)
                .map_err(|e| DeconvError::Shape(format!("Failed to restack channels: {e}")))?;
            Ok(stacked.into_dyn())
        }
    }
}
