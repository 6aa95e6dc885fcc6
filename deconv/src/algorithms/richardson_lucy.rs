//! Richardson-Lucy deconvolution
//!
//! An iterative maximum-likelihood estimator for images blurred by a known PSF under
//! Poisson noise. Given an observed image `g` and PSF `h`, each iteration computes
//!
//! ```text
//! u(n+1) = u(n) · (h_flip ⊛ (g / (h ⊛ u(n))))
//! ```
//!
//! where `h_flip` is `h` rotated by 180 degrees. Convolutions keep the image size and
//! extend the boundary symmetrically, so a PSF larger than the image is handled by the
//! same reflection policy.

use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Zip};

use super::channels::{process_channels, ImageKind};
use super::DeconvolutionAlgorithm;
use crate::convolve2d::{convolve2d, ConvolveOptions};
use crate::error::Result;
use crate::options::DeconvolveOptions;
use crate::progress::{report, ProgressSink};
use crate::psf::Psf;

/// Floor applied to the initial estimate and to the re-blurred estimate before division
pub const EPSILON: f64 = 1e-10;

/// Approximate number of iteration messages per run; shorter runs report every iteration
const PROGRESS_REPORTS: usize = 10;

/// Stateless Richardson-Lucy algorithm
#[derive(Debug, Clone, Copy, Default)]
pub struct RichardsonLucy;

/// Whether iteration `iteration` (1-based) of `total` emits a progress message
fn should_report(iteration: usize, total: usize) -> bool {
    total <= PROGRESS_REPORTS || iteration % total.div_ceil(PROGRESS_REPORTS) == 0
}

impl RichardsonLucy {
    pub const NAME: &'static str = "richardson_lucy";

    pub fn new() -> Self {
        Self
    }

    /// Deconvolve a single channel
    ///
    /// # Arguments
    /// * `observed` - Blurred channel
    /// * `psf` - Blur kernel; normalized internally
    /// * `options` - Iteration count and clipping; must already be validated
    /// * `progress` - Optional progress sink
    pub fn deconvolve_channel(
        &self,
        observed: &ArrayView2<f64>,
        psf: &Psf,
        options: &DeconvolveOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Array2<f64> {
        let iterations = options.iterations;

        report(progress, || {
            let (h, w) = psf.dim();
            format!("Normalizing PSF (size: {h}x{w})")
        });
        let psf = psf.normalized();
        let psf_flipped = psf.flipped();
        let conv = Some(ConvolveOptions::default());

        let mut estimate = observed.mapv(|v| v.max(EPSILON));

        report(progress, || {
            format!("Starting {iterations} Richardson-Lucy iterations")
        });

        for iteration in 1..=iterations {
            let mut convolved = convolve2d(&estimate.view(), &psf.view(), conv);
            convolved.mapv_inplace(|v| v.max(EPSILON));

            let ratio = Zip::from(observed)
                .and(&convolved)
                .map_collect(|&g, &c| g / c);

            let correction = convolve2d(&ratio.view(), &psf_flipped.view(), conv);

            Zip::from(&mut estimate)
                .and(&correction)
                .for_each(|e, &c| *e = (*e * c).max(0.0));

            if should_report(iteration, iterations) {
                report(progress, || {
                    let percent = 100.0 * iteration as f64 / iterations as f64;
                    format!("Iteration {iteration}/{iterations} ({percent:.1}%)")
                });
            }
        }

        if options.clip {
            report(progress, || "Applying value clipping".to_string());
            estimate.mapv_inplace(|v| v.clamp(0.0, 1.0));
        }

        estimate
    }
}

impl DeconvolutionAlgorithm for RichardsonLucy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Richardson-Lucy: iterative maximum-likelihood deconvolution"
    }

    fn deconvolve(
        &self,
        image: &ArrayViewD<f64>,
        psf: &Psf,
        options: &DeconvolveOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ArrayD<f64>> {
        options.validate()?;
        let kind = ImageKind::from_shape(image.shape())?;

        report(progress, || {
            format!(
                "Starting Richardson-Lucy deconvolution ({kind}, {} iterations)",
                options.iterations
            )
        });

        let result = process_channels(image, |plane, channel| {
            if kind == ImageKind::Rgb {
                report(progress, || {
                    format!("Processing channel {}/{}", channel + 1, kind.channel_count())
                });
            }
            Ok(self.deconvolve_channel(&plane, psf, options, progress))
        })?;

        report(progress, || "Deconvolution completed".to_string());

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeconvError;
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};
    use std::cell::RefCell;

    fn identity_psf(size: usize) -> Psf {
        let mut kernel = Array2::zeros((size, size));
        kernel[[size / 2, size / 2]] = 1.0;
        Psf::new(kernel).unwrap()
    }

    fn gradient_image(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(y, x)| {
            ((y * cols + x) as f64 / (rows * cols) as f64).min(1.0)
        })
    }

    #[test]
    fn test_should_report() {
        // Small counts report every iteration
        assert!((1..=10).all(|i| should_report(i, 10)));

        // 25 iterations -> every ceil(2.5) = 3
        let reported: Vec<usize> = (1..=25).filter(|i| should_report(*i, 25)).collect();
        assert_eq!(reported, vec![3, 6, 9, 12, 15, 18, 21, 24]);

        let reported = (1..=30).filter(|i| should_report(*i, 30)).count();
        assert_eq!(reported, 10);
    }

    #[test]
    fn test_identity_psf_returns_input() {
        let image = gradient_image(6, 7);
        for iterations in [1, 3, 12] {
            let result = RichardsonLucy.deconvolve_channel(
                &image.view(),
                &identity_psf(3),
                &DeconvolveOptions::new(iterations, true),
                None,
            );
            for (r, e) in result.iter().zip(image.iter()) {
                assert_relative_eq!(*r, *e, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_uniform_image_is_fixed_point() {
        let image = Array2::from_elem((8, 8), 0.5);
        let psf = Psf::new(Array2::from_elem((3, 3), 1.0 / 9.0)).unwrap();

        let result = RichardsonLucy.deconvolve_channel(
            &image.view(),
            &psf,
            &DeconvolveOptions::new(5, true),
            None,
        );

        for v in result.iter() {
            assert_relative_eq!(*v, 0.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_unnormalized_psf_is_normalized() {
        let image = Array2::from_elem((6, 6), 0.3);
        let psf = Psf::new(Array2::from_elem((3, 3), 4.0)).unwrap();

        let result = RichardsonLucy.deconvolve_channel(
            &image.view(),
            &psf,
            &DeconvolveOptions::new(4, false),
            None,
        );

        for v in result.iter() {
            assert_relative_eq!(*v, 0.3, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_psf_larger_than_image() {
        let image = Array2::from_elem((3, 2), 0.4);
        let psf = Psf::new(Array2::from_elem((7, 7), 1.0)).unwrap();

        let result = RichardsonLucy.deconvolve_channel(
            &image.view(),
            &psf,
            &DeconvolveOptions::new(3, true),
            None,
        );

        assert_eq!(result.dim(), (3, 2));
        for v in result.iter() {
            assert_relative_eq!(*v, 0.4, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_output_non_negative_every_iteration() {
        let mut image = Array2::zeros((9, 9));
        image[[4, 4]] = 1.0;
        image[[1, 7]] = 0.6;
        let psf = Psf::new(array![[0.0, 0.2, 0.0], [0.2, 0.2, 0.2], [0.0, 0.2, 0.0]]).unwrap();

        for iterations in 1..=6 {
            let result = RichardsonLucy.deconvolve_channel(
                &image.view(),
                &psf,
                &DeconvolveOptions::new(iterations, false),
                None,
            );
            assert!(result.iter().all(|v| *v >= 0.0));
        }
    }

    #[test]
    fn test_clip_bounds_output() {
        // Out-of-range observations stay out of range without clipping
        let mut image = Array2::from_elem((9, 9), 1.5);
        image[[4, 4]] = 3.0;
        let psf = Psf::new(Array2::from_elem((3, 3), 1.0)).unwrap();

        let unclipped = RichardsonLucy.deconvolve_channel(
            &image.view(),
            &psf,
            &DeconvolveOptions::new(20, false),
            None,
        );
        let clipped = RichardsonLucy.deconvolve_channel(
            &image.view(),
            &psf,
            &DeconvolveOptions::new(20, true),
            None,
        );

        assert!(unclipped.iter().cloned().fold(f64::MIN, f64::max) > 1.0);
        assert!(clipped.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let image = Array2::from_elem((4, 4), 0.5).into_dyn();
        let err = RichardsonLucy
            .deconvolve(
                &image.view(),
                &identity_psf(3),
                &DeconvolveOptions::new(0, true),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DeconvError::Configuration(_)));
    }

    #[test]
    fn test_rejects_four_channel_image() {
        let image = Array3::from_elem((4, 4, 4), 0.5).into_dyn();
        let err = RichardsonLucy
            .deconvolve(
                &image.view(),
                &identity_psf(3),
                &DeconvolveOptions::default(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DeconvError::UnsupportedImageShape { .. }));
    }

    #[test]
    fn test_progress_messages_grayscale() {
        let messages = RefCell::new(Vec::new());
        let sink = |m: &str| messages.borrow_mut().push(m.to_string());

        let image = Array2::from_elem((5, 5), 0.5).into_dyn();
        RichardsonLucy
            .deconvolve(
                &image.view(),
                &identity_psf(3),
                &DeconvolveOptions::new(3, true),
                Some(&sink),
            )
            .unwrap();

        let messages = messages.into_inner();
        assert_eq!(
            messages,
            vec![
                "Starting Richardson-Lucy deconvolution (Grayscale, 3 iterations)",
                "Normalizing PSF (size: 3x3)",
                "Starting 3 Richardson-Lucy iterations",
                "Iteration 1/3 (33.3%)",
                "Iteration 2/3 (66.7%)",
                "Iteration 3/3 (100.0%)",
                "Applying value clipping",
                "Deconvolution completed",
            ]
        );
    }

    #[test]
    fn test_progress_messages_rgb() {
        let messages = RefCell::new(Vec::new());
        let sink = |m: &str| messages.borrow_mut().push(m.to_string());

        let image = Array3::from_elem((4, 4, 3), 0.5).into_dyn();
        RichardsonLucy
            .deconvolve(
                &image.view(),
                &identity_psf(1),
                &DeconvolveOptions::new(40, false),
                Some(&sink),
            )
            .unwrap();

        let messages = messages.into_inner();
        let channel_lines: Vec<&String> = messages
            .iter()
            .filter(|m| m.starts_with("Processing channel"))
            .collect();
        assert_eq!(
            channel_lines,
            vec![
                "Processing channel 1/3",
                "Processing channel 2/3",
                "Processing channel 3/3"
            ]
        );

        // 40 iterations report every 4th, ten per channel
        let iteration_lines = messages
            .iter()
            .filter(|m| m.starts_with("Iteration"))
            .count();
        assert_eq!(iteration_lines, 30);
        assert!(!messages.iter().any(|m| m == "Applying value clipping"));
    }
}
