//! Deconvolution algorithms
//!
//! Every algorithm is a stateless value implementing [`DeconvolutionAlgorithm`], so one
//! instance can be shared across calls and threads. Algorithms are looked up by name
//! through the [`crate::registry`].

pub mod channels;
pub mod richardson_lucy;

pub use channels::{process_channels, ImageKind};
pub use richardson_lucy::RichardsonLucy;

use ndarray::{ArrayD, ArrayViewD};

use crate::error::Result;
use crate::options::DeconvolveOptions;
use crate::progress::ProgressSink;
use crate::psf::Psf;

/// A non-blind deconvolution method
pub trait DeconvolutionAlgorithm: Send + Sync {
    /// Identifier used for registry lookup
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Restore `image` (`HxW` or `HxWx3`) blurred by `psf`.
    ///
    /// Returns a new array with the same shape as `image`. Values lie in [0, 1] when
    /// `options.clip` is set and are non-negative otherwise.
    fn deconvolve(
        &self,
        image: &ArrayViewD<f64>,
        psf: &Psf,
        options: &DeconvolveOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ArrayD<f64>>;
}
