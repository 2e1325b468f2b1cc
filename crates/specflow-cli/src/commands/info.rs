//! Available windows and scales, and the effective analysis parameters.

use clap::Args;
use specflow_analysis::postprocess::complex_count;
use specflow_core::{FrequencyScale, WindowCoefficients, WindowFunction};

use super::common::load_config;

/// Show analysis options.
#[derive(Args)]
pub struct InfoArgs {
    /// Configuration name or path (default: the user configuration file)
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let settings = load_config(args.config.as_deref())?.into_settings()?;

    println!("Windows (coherent gain at {} samples):", settings.block_size);
    for window in WindowFunction::ALL {
        let coefficients = WindowCoefficients::new(window, settings.block_size);
        let gain = coefficients.sum() / settings.block_size as f64;
        let marker = if window == settings.window { "*" } else { " " };
        println!("  {marker} {:<18} {gain:.4}", window.name());
    }

    println!("\nFrequency scales (position of 1 kHz between the display bounds):");
    for scale in FrequencyScale::ALL {
        let marker = if scale == settings.scale { "*" } else { " " };
        let position = scale_position(scale, settings.min_frequency, settings.max_frequency, 1000.0);
        match position {
            Some(p) => println!("  {marker} {:<18} {:.0}%", scale.name(), p * 100.0),
            None => println!("  {marker} {:<18} n/a", scale.name()),
        }
    }

    let rate = f64::from(settings.sample_rate);
    println!("\nAnalysis:");
    println!("  Bins per block:  {}", complex_count(settings.block_size));
    println!("  Resolution:      {:.2} Hz", rate / settings.block_size as f64);
    println!("  Frame rate:      {:.1} frames/s", rate / settings.hop_size() as f64);
    println!("  Displayed bins:  {}", settings.cropped_len());
    println!("  Poll period:     {} ms", settings.poll_period.as_millis());
    Ok(())
}

/// Fraction of the display axis below `frequency`.
fn scale_position(scale: FrequencyScale, min: f64, max: f64, frequency: f64) -> Option<f64> {
    if scale.requires_positive() && min <= 0.0 {
        return None;
    }
    let lo = scale.to_perceptual(min);
    let span = scale.to_perceptual(max) - lo;
    (span > 0.0).then(|| (scale.to_perceptual(frequency) - lo) / span)
}
