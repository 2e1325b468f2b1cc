//! Specflow Analysis - streaming spectrum analysis for real-time displays
//!
//! Turns an unbounded stream of interleaved audio into spectral frames at a
//! fixed hop rate and hands them to a periodically polled consumer.
//!
//! - [`transform`] - shared FFT plans with a background optimize-then-swap upgrade
//! - [`accumulator`] - overlapping fixed-size blocks from arbitrary chunks
//! - [`postprocess`] - magnitudes, decibels, cropping, perceptual remapping
//! - [`exchange`] - recycling producer/consumer hand-off under a reader/writer lock
//! - [`history`] - bounded rolling history of display columns
//! - [`analyzer`] - producer-side pipeline and its settings
//! - [`view`] - consumer-side polling, history and display remapping
//! - [`source`] - the inbound capture interface
//!
//! ## Data flow
//!
//! ```text
//! capture bytes ─► SpectrumAnalyzer ─► FrameExchange ─► SpectrumView ─► display
//!                  (accumulate,          (free list +     (levels,
//!                   window, FFT)          active queue)    history, remap)
//! ```
//!
//! ## Example
//!
//! ```
//! use specflow_analysis::{AnalyzerSettings, PlanRegistry, SpectrumAnalyzer, SpectrumView};
//!
//! let settings = AnalyzerSettings { block_size: 2048, move_speed: 8, ..Default::default() };
//! let registry = PlanRegistry::new();
//! let mut analyzer = SpectrumAnalyzer::new(&settings, &registry).unwrap();
//! let mut view = SpectrumView::new(&settings, analyzer.exchange()).unwrap();
//!
//! // Producer: whatever the capture delivers.
//! let tone: Vec<f32> = (0..4096)
//!     .flat_map(|i| {
//!         let s = (i as f32 * 2.0 * std::f32::consts::PI * 1000.0 / 48_000.0).sin();
//!         [s, s]
//!     })
//!     .collect();
//! analyzer.process(&tone).unwrap();
//!
//! // Consumer: on the render timer.
//! view.poll().unwrap();
//! let column = view.display_latest().unwrap().unwrap();
//! assert_eq!(column.len(), settings.display_width);
//! ```

pub mod accumulator;
pub mod analyzer;
pub mod error;
pub mod exchange;
pub mod frame;
pub mod history;
pub mod postprocess;
pub mod source;
pub mod transform;
pub mod view;

pub use accumulator::BlockAccumulator;
pub use analyzer::{AnalyzerSettings, LevelMeter, SpectrumAnalyzer};
pub use error::{AnalysisError, Result};
pub use exchange::{ExchangeStats, FrameExchange};
pub use frame::{SpectralFrame, StereoSpectrum};
pub use history::HistoryCache;
pub use postprocess::{FrequencyRemapper, SpectrumMode};
pub use source::{CaptureCallback, CaptureSource, connect};
pub use transform::{Direction, FftSample, PlanKey, PlanRegistry, PlanSession, Precision, TransformPlan, VariantKind};
pub use view::SpectrumView;
