//! Non-blind image deconvolution
//!
//! Restores images degraded by a known point spread function (PSF). The crate provides
//! the Richardson-Lucy estimator, Gaussian and motion PSF synthesis, and a registry
//! mapping algorithm names to implementations.
//!
//! The engine is synchronous and performs no I/O. Progress is reported through an
//! optional [`ProgressSink`] supplied by the caller.
//!
//! ```rust
//! use deconv::{deconvolve, generate_gaussian_psf, DeconvolveOptions};
//! use ndarray::Array2;
//!
//! # fn main() -> deconv::Result<()> {
//! let image = Array2::from_elem((16, 16), 0.5).into_dyn();
//! let psf = generate_gaussian_psf(5, 1.0)?;
//! let options = DeconvolveOptions::new(10, true);
//!
//! let restored = deconvolve(&image.view(), &psf, "richardson_lucy", &options, None)?;
//! assert_eq!(restored.shape(), image.shape());
//! # Ok(())
//! # }
//! ```

pub mod algorithms;
pub mod convolve2d;
pub mod error;
pub mod options;
pub mod progress;
pub mod psf;
pub mod registry;

pub use algorithms::{DeconvolutionAlgorithm, ImageKind, RichardsonLucy};
pub use error::{DeconvError, Result};
pub use options::DeconvolveOptions;
pub use progress::{LogSink, MessageLog, ProgressSink};
pub use psf::{generate_gaussian_psf, generate_motion_psf, normalize_psf, Psf};
pub use registry::{get_algorithm, list_algorithms, AlgorithmRegistry};

use ndarray::{ArrayD, ArrayViewD};

/// Deconvolve `image` with the built-in algorithm named `algorithm_id`
///
/// # Arguments
/// * `image` - `HxW` or `HxWx3` image, values conventionally in [0, 1]
/// * `psf` - Blur kernel
/// * `algorithm_id` - Registry key, e.g. `"richardson_lucy"`
/// * `options` - Iteration count and clipping
/// * `progress` - Optional progress sink
///
/// # Errors
/// * [`DeconvError::UnknownAlgorithm`] if `algorithm_id` is not registered
/// * [`DeconvError::Configuration`] for a zero iteration count
/// * [`DeconvError::UnsupportedImageShape`] for images that are not `HxW` / `HxWx3`
pub fn deconvolve(
    image: &ArrayViewD<f64>,
    psf: &Psf,
    algorithm_id: &str,
    options: &DeconvolveOptions,
    progress: Option<&dyn ProgressSink>,
) -> Result<ArrayD<f64>> {
    let algorithm = get_algorithm(algorithm_id)?;
    algorithm.deconvolve(image, psf, options, progress)
}
