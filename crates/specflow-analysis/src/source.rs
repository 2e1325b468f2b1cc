//! Inbound capture interface.
//!
//! Audio devices and loopback captures live outside this crate. They are
//! seen through [`CaptureSource`]: a fixed sample rate and channel count,
//! and a callback that receives raw interleaved `f32` bytes whenever the
//! device has some.

use tracing::warn;

use crate::analyzer::SpectrumAnalyzer;
use crate::error::{AnalysisError, Result};
use crate::exchange::FrameExchange;
use crate::frame::SpectralFrame;

/// Callback invoked with `(buffer, byte_count)` for each captured chunk.
///
/// Only the first `byte_count` bytes of `buffer` are valid.
pub type CaptureCallback = Box<dyn FnMut(&[u8], usize) + Send + 'static>;

/// A provider of interleaved native-endian `f32` audio.
pub trait CaptureSource {
    /// Sample rate in Hz, constant for the life of the capture.
    fn sample_rate(&self) -> u32;

    /// Interleaved channel count, constant for the life of the capture.
    fn channels(&self) -> u16;

    /// Starts delivering audio to `callback`, on whatever thread the source
    /// chooses.
    fn start(&mut self, callback: CaptureCallback) -> Result<()>;

    /// Stops delivery. The callback is dropped once no further call can
    /// happen.
    fn stop(&mut self) -> Result<()>;
}

/// Moves `analyzer` into `source`'s callback and starts the capture.
///
/// Returns the exchange the analyzer publishes to. Buffers the analyzer
/// rejects are logged and skipped; capture continues.
///
/// # Errors
///
/// - [`AnalysisError::FormatMismatch`] if the source's rate or channel count
///   differs from the analyzer settings
/// - whatever [`CaptureSource::start`] reports
pub fn connect<S: CaptureSource + ?Sized>(
    source: &mut S,
    mut analyzer: SpectrumAnalyzer,
) -> Result<FrameExchange<SpectralFrame>> {
    let settings = analyzer.settings();
    if source.sample_rate() != settings.sample_rate || source.channels() != settings.channels {
        return Err(AnalysisError::FormatMismatch {
            expected_rate: settings.sample_rate,
            actual_rate: source.sample_rate(),
            expected_channels: settings.channels,
            actual_channels: source.channels(),
        });
    }

    let exchange = analyzer.exchange();
    source.start(Box::new(move |bytes, byte_count| {
        if let Err(err) = analyzer.process_bytes(bytes, byte_count) {
            warn!(error = %err, byte_count, "capture buffer rejected");
        }
    }))?;
    Ok(exchange)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnalyzerSettings, PlanRegistry};

    /// Delivers a fixed list of buffers synchronously from `start`.
    struct ScriptedSource {
        rate: u32,
        channels: u16,
        buffers: Vec<Vec<u8>>,
        running: bool,
    }

    impl CaptureSource for ScriptedSource {
        fn sample_rate(&self) -> u32 {
            self.rate
        }

        fn channels(&self) -> u16 {
            self.channels
        }

        fn start(&mut self, mut callback: CaptureCallback) -> Result<()> {
            self.running = true;
            for buffer in &self.buffers {
                callback(buffer, buffer.len());
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.running = false;
            Ok(())
        }
    }

    fn settings() -> AnalyzerSettings {
        AnalyzerSettings {
            block_size: 256,
            move_speed: 2,
            prefill: false,
            ..AnalyzerSettings::default()
        }
    }

    #[test]
    fn connect_feeds_analyzer() {
        let registry = PlanRegistry::new();
        let analyzer = SpectrumAnalyzer::new(&settings(), &registry).unwrap();
        let chunk: Vec<u8> = vec![0.1f32; 2 * 128].iter().flat_map(|s| s.to_ne_bytes()).collect();
        let mut source = ScriptedSource {
            rate: 48_000,
            channels: 2,
            // Two hops fill the first block, two more add two frames; the
            // misaligned buffer in the middle is skipped.
            buffers: vec![chunk.clone(), chunk.clone(), vec![0u8; 5], chunk.clone(), chunk],
            running: false,
        };
        let exchange = connect(&mut source, analyzer).unwrap();
        assert!(source.running);
        assert_eq!(exchange.len(), 3);
        source.stop().unwrap();
        assert!(!source.running);
    }

    #[test]
    fn connect_rejects_format_mismatch() {
        let registry = PlanRegistry::new();
        let analyzer = SpectrumAnalyzer::new(&settings(), &registry).unwrap();
        let mut source = ScriptedSource {
            rate: 44_100,
            channels: 2,
            buffers: Vec::new(),
            running: false,
        };
        assert!(matches!(
            connect(&mut source, analyzer),
            Err(AnalysisError::FormatMismatch {
                expected_rate: 48_000,
                actual_rate: 44_100,
                ..
            })
        ));
        assert!(!source.running);
    }
}
