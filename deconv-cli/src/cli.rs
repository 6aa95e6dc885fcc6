//! Command line interface
//!
//! Collects parameters, synthesizes the PSF, runs the deconvolution on a worker thread
//! and saves the result.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use deconv::registry::default_registry;
use deconv::{generate_gaussian_psf, generate_motion_psf, DeconvolveOptions, Psf};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::codec::{FileCodec, ImageCodec};
use crate::task::{Poll, TaskRunner};

/// Blur model used to synthesize the PSF
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlurType {
    /// Isotropic Gaussian blur (requires --sigma)
    Gaussian,
    /// Linear motion blur (requires --length, optional --angle)
    Motion,
}

impl std::fmt::Display for BlurType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlurType::Gaussian => write!(f, "gaussian"),
            BlurType::Motion => write!(f, "motion"),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "deconvolve",
    about = "Restore a blurred image by iterative PSF deconvolution",
    after_help = "Examples:\n  \
        deconvolve -i input.jpg -t gaussian -s 15 --sigma 5.0 -n 30 -o output.jpg\n  \
        deconvolve -i input.jpg -t motion -s 20 --length 10 --angle 45 -o output.jpg"
)]
pub struct Args {
    /// Path to the input image
    #[arg(short, long, required_unless_present = "list_algorithms")]
    pub image: Option<PathBuf>,

    /// Blur type used to build the PSF
    #[arg(short = 't', long, value_enum, required_unless_present = "list_algorithms")]
    pub blur_type: Option<BlurType>,

    /// PSF kernel size in pixels
    #[arg(short, long, required_unless_present = "list_algorithms")]
    pub size: Option<usize>,

    /// Path for the restored image
    #[arg(short, long, required_unless_present = "list_algorithms")]
    pub output: Option<PathBuf>,

    /// Deconvolution algorithm
    #[arg(short, long, default_value = "richardson_lucy")]
    pub algorithm: String,

    /// Gaussian standard deviation (required for --blur-type gaussian)
    #[arg(long)]
    pub sigma: Option<f64>,

    /// Motion length in pixels (required for --blur-type motion)
    #[arg(long)]
    pub length: Option<f64>,

    /// Motion angle in degrees, 0 is horizontal
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub angle: f64,

    /// Number of iterations [default: 30]
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Do not clamp the result to [0, 1]
    #[arg(long)]
    pub no_clip: bool,

    /// JSON file with algorithm options; explicit flags take precedence
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Reject PSFs that sum to zero or less instead of passing them through
    #[arg(long)]
    pub strict_psf: bool,

    /// List available algorithms and exit
    #[arg(long)]
    pub list_algorithms: bool,
}

impl Args {
    /// Build the PSF described by the blur arguments
    pub fn build_psf(&self) -> anyhow::Result<Psf> {
        let blur_type = self.blur_type.context("--blur-type is required")?;
        let size = self.size.context("--size is required")?;

        let psf = match blur_type {
            BlurType::Gaussian => {
                let Some(sigma) = self.sigma else {
                    bail!("--sigma is required when --blur-type=gaussian");
                };
                let psf = generate_gaussian_psf(size, sigma)?;
                info!("Gaussian PSF generated: size={size}, sigma={sigma}");
                psf
            }
            BlurType::Motion => {
                let Some(length) = self.length else {
                    bail!("--length is required when --blur-type=motion");
                };
                let psf = generate_motion_psf(size, length, self.angle)?;
                info!(
                    "Motion PSF generated: size={size}, length={length}, angle={}°",
                    self.angle
                );
                psf
            }
        };

        if self.strict_psf {
            psf.ensure_positive_sum()?;
        }

        Ok(psf)
    }

    /// Merge the options file (if any) with explicit flags
    pub fn resolve_options(&self) -> anyhow::Result<DeconvolveOptions> {
        let mut options = match &self.options {
            Some(path) => load_options(path)?,
            None => DeconvolveOptions::default(),
        };

        if let Some(iterations) = self.iterations {
            options.iterations = iterations;
        }
        if self.no_clip {
            options.clip = false;
        }

        Ok(options)
    }
}

/// Read [`DeconvolveOptions`] from a JSON file
pub fn load_options(path: &Path) -> anyhow::Result<DeconvolveOptions> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file '{}'", path.display()))?;
    let options = DeconvolveOptions::from_json(&json)
        .with_context(|| format!("Invalid options file '{}'", path.display()))?;
    Ok(options)
}

fn print_algorithms() {
    println!("Available algorithms:");
    for descriptor in default_registry().descriptors() {
        println!("  {:<20} {}", descriptor.id, descriptor.description);
    }
}

fn spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg}") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Execute the command described by `args`
pub fn run(args: &Args) -> anyhow::Result<()> {
    if args.list_algorithms {
        print_algorithms();
        return Ok(());
    }

    let image_path = args.image.as_deref().context("--image is required")?;
    let output_path = args.output.as_deref().context("--output is required")?;

    // Validate everything cheap before touching the filesystem
    let algorithm = default_registry().get(&args.algorithm)?;
    let options = args.resolve_options()?;
    options.validate()?;
    let psf = args.build_psf()?;

    let codec = FileCodec;
    info!("Loading image: {}", image_path.display());
    let image = codec.load(image_path)?;
    info!("Image loaded: {:?}", image.shape());

    info!(
        "Running '{}' ({} iterations, clip={})",
        algorithm.name(),
        options.iterations,
        options.clip
    );

    let handle = TaskRunner::default().submit(move |progress| {
        algorithm.deconvolve(&image.view(), &psf, &options, Some(progress))
    })?;

    let bar = spinner();
    loop {
        match handle.poll(Duration::from_millis(100)) {
            Poll::Progress(event) => {
                info!("[{:.1}s] {}", event.elapsed.as_secs_f64(), event.message);
                bar.set_message(event.message);
            }
            Poll::Pending => {}
            Poll::Done => break,
        }
    }
    bar.finish_and_clear();

    let restored = handle.join()??;

    codec.save(&restored.view(), output_path)?;
    info!("Image saved to: {}", output_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use deconv::DeconvError;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("deconvolve").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["-i", "in.png", "-t", "gaussian", "-s", "9", "--sigma", "2", "-o", "out.png"]);

        assert_eq!(args.algorithm, "richardson_lucy");
        assert_eq!(args.blur_type, Some(BlurType::Gaussian));
        assert_eq!(args.angle, 0.0);
        assert_eq!(args.resolve_options().unwrap(), DeconvolveOptions::new(30, true));
    }

    #[test]
    fn test_missing_required_arguments() {
        assert!(Args::try_parse_from(["deconvolve", "-i", "in.png"]).is_err());
        assert!(Args::try_parse_from(["deconvolve", "--list-algorithms"]).is_ok());
    }

    #[test]
    fn test_flags_override_options() {
        let args = parse(&[
            "-i", "in.png", "-t", "motion", "-s", "15", "--length", "10", "--angle", "-30",
            "-o", "out.png", "-n", "12", "--no-clip",
        ]);

        assert_relative_eq!(args.angle, -30.0);
        assert_eq!(args.resolve_options().unwrap(), DeconvolveOptions::new(12, false));
    }

    #[test]
    fn test_options_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"iterations": 7, "clip": false, "unused": 1}"#).unwrap();

        let args = parse(&[
            "-i", "in.png", "-t", "gaussian", "-s", "5", "--sigma", "1", "-o", "out.png",
            "--options", path.to_str().unwrap(),
        ]);
        assert_eq!(args.resolve_options().unwrap(), DeconvolveOptions::new(7, false));

        let args = parse(&[
            "-i", "in.png", "-t", "gaussian", "-s", "5", "--sigma", "1", "-o", "out.png",
            "--options", path.to_str().unwrap(), "-n", "3",
        ]);
        assert_eq!(args.resolve_options().unwrap(), DeconvolveOptions::new(3, false));
    }

    #[test]
    fn test_gaussian_requires_sigma() {
        let args = parse(&["-i", "in.png", "-t", "gaussian", "-s", "9", "-o", "out.png"]);
        let err = args.build_psf().unwrap_err();
        assert_eq!(err.to_string(), "--sigma is required when --blur-type=gaussian");
    }

    #[test]
    fn test_motion_requires_length() {
        let args = parse(&["-i", "in.png", "-t", "motion", "-s", "9", "-o", "out.png"]);
        let err = args.build_psf().unwrap_err();
        assert_eq!(err.to_string(), "--length is required when --blur-type=motion");
    }

    #[test]
    fn test_build_psf() {
        let args = parse(&["-i", "a", "-t", "motion", "-s", "11", "--length", "6", "-o", "b"]);
        let psf = args.build_psf().unwrap();
        assert_eq!(psf.dim(), (11, 11));
        assert_relative_eq!(psf.sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_sigma_surfaces_configuration_error() {
        let args = parse(&["-i", "a", "-t", "gaussian", "-s", "5", "--sigma", "0", "-o", "b"]);
        let err = args.build_psf().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeconvError>(),
            Some(DeconvError::Configuration(_))
        ));
    }

    #[test]
    fn test_unknown_algorithm_fails_before_loading() {
        let args = parse(&[
            "-i", "does-not-exist.png", "-t", "gaussian", "-s", "5", "--sigma", "1",
            "-o", "out.png", "-a", "foo",
        ]);
        let err = run(&args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeconvError>(),
            Some(DeconvError::UnknownAlgorithm { .. })
        ));
    }
}
