//! Live analysis of a synthetic tone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Args;
use specflow_analysis::{
    AnalyzerSettings, CaptureSource, Direction, PlanRegistry, SpectrumAnalyzer, SpectrumView,
    StereoSpectrum, VariantKind, connect,
};
use specflow_core::{FrequencyScale, WindowFunction};
use tracing::info;

use super::common::load_config;
use crate::render::{bar_chart, spectrogram_row};
use crate::source::{ToneSource, Tones};

#[derive(Args)]
pub struct RunArgs {
    /// Configuration name or path (default: the user configuration file)
    #[arg(short, long)]
    config: Option<String>,

    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Left channel tone in Hz
    #[arg(long, default_value = "440")]
    left: f64,

    /// Right channel tone in Hz
    #[arg(long, default_value = "1000")]
    right: f64,

    /// Tone amplitude (full scale = 1)
    #[arg(long, default_value = "0.5")]
    amplitude: f32,

    /// Typical frames per capture chunk; actual chunks vary around it
    #[arg(long, default_value = "480")]
    chunk: usize,

    /// Override the transform block size
    #[arg(long)]
    block_size: Option<usize>,

    /// Override the hop divisor
    #[arg(long)]
    move_speed: Option<usize>,

    /// Override the analysis window
    #[arg(long)]
    window: Option<WindowFunction>,

    /// Override the display frequency scale
    #[arg(long)]
    scale: Option<FrequencyScale>,

    /// Override the display width in characters
    #[arg(long)]
    width: Option<usize>,

    /// Block until the optimized transform plan is ready before starting
    #[arg(long)]
    warm_up: bool,

    /// Height of the bar chart printed at the end
    #[arg(long, default_value = "8")]
    rows: usize,

    /// Print only the summary
    #[arg(short, long)]
    quiet: bool,
}

impl RunArgs {
    fn settings(&self) -> anyhow::Result<AnalyzerSettings> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(block_size) = self.block_size {
            config.transform.block_size = block_size;
        }
        if let Some(move_speed) = self.move_speed {
            config.transform.move_speed = move_speed;
        }
        if let Some(window) = self.window {
            config.transform.window = window;
        }
        if let Some(scale) = self.scale {
            config.display.scale = scale;
        }
        if let Some(width) = self.width {
            config.display.width = width;
        }
        Ok(config.into_settings()?)
    }
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let settings = args.settings()?;
    let registry = PlanRegistry::new();

    // Held until the analyzer has its own handle, so the warmed plan is reused.
    let warm = if args.warm_up {
        let mut plan = registry.acquire::<f64>(settings.block_size, Direction::Forward)?;
        let swapped = plan.session()?.finish_optimization();
        info!(size = settings.block_size, swapped, "transform plan warmed up");
        Some(plan)
    } else {
        None
    };
    let analyzer = SpectrumAnalyzer::new(&settings, &registry)?;
    drop(warm);

    let mut view = SpectrumView::new(&settings, analyzer.exchange())?;
    let mut source = ToneSource::new(
        settings.sample_rate,
        settings.channels,
        Tones {
            left_hz: args.left,
            right_hz: args.right,
            amplitude: args.amplitude,
        },
        args.chunk,
    );

    println!(
        "Analyzing {} Hz / {} Hz tones at {} Hz, {} channel(s)",
        args.left, args.right, settings.sample_rate, settings.channels
    );
    println!(
        "  Block: {} samples, hop {} ({:.1} frames/s), {} window",
        settings.block_size,
        settings.hop_size(),
        f64::from(settings.sample_rate) / settings.hop_size() as f64,
        settings.window
    );
    println!(
        "  Display: {:.0}-{:.0} Hz on a {} axis, {} columns",
        settings.min_frequency, settings.max_frequency, settings.scale, settings.display_width
    );
    if args.seconds.is_none() {
        println!("\nPress Ctrl+C to stop...\n");
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let exchange = connect(&mut source, analyzer)?;
    let started = Instant::now();
    let deadline = args.seconds.map(Duration::from_secs_f64);
    let mut column = StereoSpectrum::zeroed(settings.display_width);

    while running.load(Ordering::SeqCst) && deadline.is_none_or(|d| started.elapsed() < d) {
        thread::sleep(settings.poll_period);
        if view.poll()? > 0 && !args.quiet && view.display(0, &mut column)? {
            println!("{}", spectrogram_row(&column.left));
        }
    }

    // Ask while the analyzer still holds the plan.
    let variant = registry
        .acquire::<f64>(settings.block_size, Direction::Forward)
        .and_then(|mut plan| plan.session().map(|s| s.active_variant()))
        .ok()
        .flatten();
    source.stop()?;
    view.poll()?;
    let elapsed = started.elapsed().as_secs_f64();
    let stats = exchange.stats();

    if !args.quiet && view.display(0, &mut column)? {
        println!();
        for line in bar_chart(&column.left, args.rows) {
            println!("|{line}|");
        }
    }

    println!("\nDone: {elapsed:.2}s");
    println!("  Frames captured:  {}", source.frames_sent());
    println!("  Spectra produced: {}", stats.written);
    println!("  Spectra consumed: {}", view.frames_seen());
    println!("  Frame buffers:    {}", stats.allocated);
    println!(
        "  Transform plan:   {}",
        match variant {
            Some(VariantKind::Optimized) => "optimized",
            Some(VariantKind::Fast) => "fast",
            None => "released",
        }
    );

    registry.shutdown();
    Ok(())
}
