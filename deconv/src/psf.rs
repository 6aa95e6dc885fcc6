//! Point spread function synthesis and normalization.
//!
//! A PSF describes how a single point of light is spread by the blur process. This
//! module builds normalized Gaussian and linear-motion kernels from compact parameters
//! and provides the [`Psf`] wrapper the deconvolution algorithms consume.
//!
//! # Usage
//!
//! ```rust
//! use deconv::psf::{generate_gaussian_psf, generate_motion_psf};
//!
//! # fn main() -> deconv::Result<()> {
//! let gaussian = generate_gaussian_psf(15, 2.5)?;
//! assert_eq!(gaussian.dim(), (15, 15));
//!
//! let motion = generate_motion_psf((9, 21), 10.0, 0.0)?;
//! assert!((motion.sum() - 1.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```

use ndarray::{s, Array2, ArrayView2};

use crate::convolve2d::gaussian_filter;
use crate::error::{DeconvError, Result};

/// Sigma of the smoothing pass applied to motion kernels longer than one pixel
pub const MOTION_SMOOTHING_SIGMA: f64 = 0.5;

/// Kernel dimensions as (height, width)
///
/// Converts from a single `usize` (square kernel) or a `(height, width)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSize {
    pub height: usize,
    pub width: usize,
}

impl From<usize> for KernelSize {
    fn from(size: usize) -> Self {
        Self {
            height: size,
            width: size,
        }
    }
}

impl From<(usize, usize)> for KernelSize {
    fn from((height, width): (usize, usize)) -> Self {
        Self { height, width }
    }
}

impl KernelSize {
    fn validate(&self) -> Result<()> {
        if self.height == 0 || self.width == 0 {
            return Err(DeconvError::Configuration(format!(
                "PSF size must be positive, got {}x{}",
                self.height, self.width
            )));
        }
        Ok(())
    }

    fn center(&self) -> (usize, usize) {
        (self.height / 2, self.width / 2)
    }
}

/// Gaussian standard deviation as (sigma_y, sigma_x)
///
/// Converts from a single `f64` (isotropic) or a `(sigma_y, sigma_x)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sigma {
    pub y: f64,
    pub x: f64,
}

impl From<f64> for Sigma {
    fn from(sigma: f64) -> Self {
        Self { y: sigma, x: sigma }
    }
}

impl From<(f64, f64)> for Sigma {
    fn from((y, x): (f64, f64)) -> Self {
        Self { y, x }
    }
}

impl Sigma {
    fn validate(&self) -> Result<()> {
        if self.y <= 0.0 || self.x <= 0.0 || !self.y.is_finite() || !self.x.is_finite() {
            return Err(DeconvError::Configuration(format!(
                "PSF sigma must be positive and finite, got ({}, {})",
                self.y, self.x
            )));
        }
        Ok(())
    }
}

/// A blur kernel with at least one row and one column
///
/// Construction rejects empty arrays; values are not otherwise checked, so callers may
/// wrap arbitrary measured kernels. Normalization happens inside the algorithms.
#[derive(Debug, Clone, PartialEq)]
pub struct Psf {
    kernel: Array2<f64>,
}

impl Psf {
    /// Wrap a kernel array, failing with [`DeconvError::Shape`] if either dimension is zero.
    pub fn new(kernel: Array2<f64>) -> Result<Self> {
        let (height, width) = kernel.dim();
        if height == 0 || width == 0 {
            return Err(DeconvError::Shape(format!(
                "PSF dimensions must be positive, got {height}x{width}"
            )));
        }
        Ok(Self { kernel })
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.kernel.view()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.kernel.dim()
    }

    pub fn sum(&self) -> f64 {
        self.kernel.sum()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.kernel
    }

    /// Return a copy scaled to unit sum (unchanged when the sum is not positive).
    pub fn normalized(&self) -> Psf {
        Psf {
            kernel: normalize_psf(&self.kernel.view()),
        }
    }

    /// Fail with [`DeconvError::NumericDegeneracy`] if the kernel cannot be normalized.
    ///
    /// [`normalize_psf`] tolerates degenerate kernels by passing them through; hosts that
    /// prefer to reject them call this before deconvolving.
    pub fn ensure_positive_sum(&self) -> Result<()> {
        let sum = self.sum();
        if sum > 0.0 {
            Ok(())
        } else {
            Err(DeconvError::NumericDegeneracy(sum))
        }
    }

    /// The kernel rotated by 180 degrees (reflected along both axes)
    pub fn flipped(&self) -> Array2<f64> {
        self.kernel.slice(s![..;-1, ..;-1]).to_owned()
    }
}

impl TryFrom<Array2<f64>> for Psf {
    type Error = DeconvError;

    fn try_from(kernel: Array2<f64>) -> Result<Self> {
        Psf::new(kernel)
    }
}

/// Scale a kernel so its elements sum to 1.0
///
/// Kernels whose sum is zero or negative are returned unchanged.
pub fn normalize_psf(psf: &ArrayView2<f64>) -> Array2<f64> {
    let sum = psf.sum();
    if sum > 0.0 {
        psf.mapv(|v| v / sum)
    } else {
        psf.to_owned()
    }
}

/// Generate a normalized 2D Gaussian PSF
///
/// The value at offset `(dy, dx)` from the kernel center `(h / 2, w / 2)` is
/// `exp(-(dx² / (2·σx²) + dy² / (2·σy²)))` before normalization.
///
/// # Arguments
/// * `size` - Kernel size, a single `usize` or `(height, width)`
/// * `sigma` - Standard deviation, a single `f64` or `(sigma_y, sigma_x)`
///
/// # Errors
/// * [`DeconvError::Configuration`] if the size or either sigma is not positive
pub fn generate_gaussian_psf(size: impl Into<KernelSize>, sigma: impl Into<Sigma>) -> Result<Psf> {
    let size = size.into();
    let sigma = sigma.into();
    size.validate()?;
    sigma.validate()?;

    let (cy, cx) = size.center();
    let kernel = Array2::from_shape_fn((size.height, size.width), |(y, x)| {
        let dy = y as f64 - cy as f64;
        let dx = x as f64 - cx as f64;
        // Divide before squaring so tiny sigmas degrade to a delta instead of 0/0
        (-0.5 * ((dx / sigma.x).powi(2) + (dy / sigma.y).powi(2))).exp()
    });

    Psf::new(normalize_psf(&kernel.view()))
}

/// Generate a normalized linear motion-blur PSF
///
/// Draws `ceil(length) + 1` unit impulses along a line of the given length through the
/// kernel center, each rounded to the nearest pixel; samples falling outside the kernel
/// are dropped. Lines longer than one pixel are lightly smoothed with a Gaussian of
/// sigma [`MOTION_SMOOTHING_SIGMA`] before normalization.
///
/// # Arguments
/// * `size` - Kernel size, a single `usize` or `(height, width)`
/// * `length` - Motion length in pixels
/// * `angle_degrees` - Motion direction; 0 is horizontal, 90 is vertical
///
/// # Errors
/// * [`DeconvError::Configuration`] if the size or length is not positive, or the angle
///   is not finite
pub fn generate_motion_psf(
    size: impl Into<KernelSize>,
    length: f64,
    angle_degrees: f64,
) -> Result<Psf> {
    let size = size.into();
    size.validate()?;
    if length <= 0.0 || !length.is_finite() {
        return Err(DeconvError::Configuration(format!(
            "Motion length must be positive and finite, got {length}"
        )));
    }
    if !angle_degrees.is_finite() {
        return Err(DeconvError::Configuration(format!(
            "Motion angle must be finite, got {angle_degrees}"
        )));
    }

    let angle = angle_degrees.to_radians();
    let dx = length * angle.cos();
    let dy = length * angle.sin();

    let (cy, cx) = size.center();
    let mut kernel = Array2::<f64>::zeros((size.height, size.width));

    let num_points = length.ceil() as usize;

    // Samples with |t| * length beyond twice the kernel extent cannot land in the kernel,
    // so long lines only visit the indices around the center.
    let t_max = 2.0 * (size.height + size.width + 1) as f64 / length;
    let n = num_points as f64;
    let first = ((0.5 - t_max) * n).floor().max(0.0) as usize;
    let last = ((0.5 + t_max) * n).ceil().min(n) as usize;

    for i in first..=last {
        let t = i as f64 / num_points as f64 - 0.5;
        let y = (cy as f64 + t * dy).round();
        let x = (cx as f64 + t * dx).round();

        if y >= 0.0 && x >= 0.0 && (y as usize) < size.height && (x as usize) < size.width {
            kernel[[y as usize, x as usize]] = 1.0;
        }
    }

    if length > 1.0 {
        kernel = gaussian_filter(&kernel.view(), MOTION_SMOOTHING_SIGMA);
    }

    Psf::new(normalize_psf(&kernel.view()))
}
