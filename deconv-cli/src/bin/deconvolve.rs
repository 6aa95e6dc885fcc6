//! Deconvolve a blurred image with a synthesized Gaussian or motion PSF.

use clap::Parser;
use deconv_cli::{run, Args};
use env_logger::Env;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
