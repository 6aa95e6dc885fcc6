//! Error types shared by the deconvolution engine and PSF synthesis.

use thiserror::Error;

/// Errors that can occur while building PSFs or running a deconvolution.
///
/// All errors are raised synchronously; a failed call produces no output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeconvError {
    /// A parameter is out of its valid range (iterations, PSF size, sigma, length, options).
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown algorithm '{id}'. Available algorithms: {}", available.join(", "))]
    UnknownAlgorithm { id: String, available: Vec<String> },

    /// An array has dimensions the operation cannot accept (e.g. an empty PSF).
    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Unsupported image shape {shape:?}: expected HxW or HxWx3")]
    UnsupportedImageShape { shape: Vec<usize> },

    /// A PSF whose elements sum to zero or a negative value.
    #[error("PSF sums to {0}, it cannot be normalized")]
    NumericDegeneracy(f64),
}

pub type Result<T> = std::result::Result<T, DeconvError>;
