//! Producer side of the pipeline.
//!
//! [`SpectrumAnalyzer`] runs the whole per-hop chain synchronously inside the
//! capture callback: accumulate → window → transform → (levels) → exchange.
//! It owns its [`TransformPlan`] handle, so moving the analyzer into the
//! capture closure is what makes that closure the plan's single writer.

use std::sync::Arc;
use std::time::Duration;

use rustfft::num_complex::Complex;
use specflow_core::{FrequencyScale, WindowCoefficients, WindowFunction};
use tracing::{debug, trace, warn};

use crate::accumulator::BlockAccumulator;
use crate::error::{AnalysisError, Result};
use crate::exchange::FrameExchange;
use crate::frame::{SpectralFrame, StereoSpectrum};
use crate::postprocess::{self, SpectrumMode, complex_count};
use crate::transform::{Direction, PlanRegistry, TransformPlan};

/// Bytes per interleaved `f32` sample.
const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// Runtime configuration of one analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSettings {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channels delivered by the capture (1 or 2).
    pub channels: u16,
    /// Samples per transform block. Powers of two transform fastest.
    pub block_size: usize,
    /// Hop divisor: `hop = block_size / move_speed`.
    pub move_speed: usize,
    /// Window applied before each transform.
    pub window: WindowFunction,
    /// Lowest displayed frequency in Hz.
    pub min_frequency: f64,
    /// Highest displayed frequency in Hz.
    pub max_frequency: f64,
    /// Decibel range mapped onto `[0, 1]`.
    pub max_db: f64,
    /// Perceptual axis for display remapping.
    pub scale: FrequencyScale,
    /// Destination buckets per displayed column.
    pub display_width: usize,
    /// Columns retained for repaint after a resize.
    pub history_capacity: usize,
    /// Consumer poll period.
    pub poll_period: Duration,
    /// Start with one block of silence so the first frame arrives after a
    /// single hop.
    pub prefill: bool,
    /// Compute cropped decibel levels on the producer side.
    pub producer_levels: bool,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            block_size: 8192,
            move_speed: 8,
            window: WindowFunction::BlackmanNuttall,
            min_frequency: 50.0,
            max_frequency: 20_000.0,
            max_db: 130.0,
            scale: FrequencyScale::Decade,
            display_width: 256,
            history_capacity: 512,
            poll_period: Duration::from_millis(20),
            prefill: true,
            producer_levels: true,
        }
    }
}

impl AnalyzerSettings {
    /// Samples advanced per emitted frame.
    pub fn hop_size(&self) -> usize {
        self.block_size / self.move_speed.max(1)
    }

    /// Half the sample rate.
    pub fn nyquist(&self) -> f64 {
        f64::from(self.sample_rate) / 2.0
    }

    /// Bins per channel after cropping to the frequency range.
    pub fn cropped_len(&self) -> usize {
        postprocess::cropped_len(
            self.block_size,
            self.sample_rate,
            self.min_frequency,
            self.max_frequency,
        )
    }

    /// Checks every field, reporting the first problem found.
    ///
    /// # Errors
    ///
    /// The [`AnalysisError`] variant naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate(self.sample_rate));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(AnalysisError::InvalidChannels(self.channels));
        }
        if self.block_size == 0 {
            return Err(AnalysisError::InvalidBlockSize(self.block_size));
        }
        if self.move_speed == 0 || self.move_speed > self.block_size {
            return Err(AnalysisError::InvalidMoveSpeed {
                move_speed: self.move_speed,
                block_size: self.block_size,
            });
        }
        let nyquist = self.nyquist();
        let (min, max) = (self.min_frequency, self.max_frequency);
        let ordered = min.is_finite() && max.is_finite() && min >= 0.0 && min < max && max <= nyquist;
        if !ordered || (self.scale.requires_positive() && min <= 0.0) {
            return Err(AnalysisError::InvalidFrequencyRange { min, max, nyquist });
        }
        if !(self.max_db.is_finite() && self.max_db > 0.0) {
            return Err(AnalysisError::InvalidMaxDb(self.max_db));
        }
        Ok(())
    }
}

/// Turns complex spectra into cropped decibel levels.
///
/// Applies window-normalized single-sided magnitudes, crops to the settings'
/// frequency range, then compresses to decibels over `max_db`.
#[derive(Debug)]
pub struct LevelMeter {
    block_size: usize,
    sample_rate: u32,
    min_frequency: f64,
    max_frequency: f64,
    max_db: f64,
    window: Arc<WindowCoefficients>,
    magnitudes: Vec<f64>,
}

impl LevelMeter {
    /// Creates a meter for `settings`, normalizing by `window`.
    pub fn new(settings: &AnalyzerSettings, window: Arc<WindowCoefficients>) -> Self {
        Self {
            block_size: settings.block_size,
            sample_rate: settings.sample_rate,
            min_frequency: settings.min_frequency,
            max_frequency: settings.max_frequency,
            max_db: settings.max_db,
            window,
            magnitudes: vec![0.0; complex_count(settings.block_size)],
        }
    }

    /// Levels per channel produced by [`measure`](Self::measure).
    pub fn levels_len(&self) -> usize {
        postprocess::cropped_len(
            self.block_size,
            self.sample_rate,
            self.min_frequency,
            self.max_frequency,
        )
    }

    /// Writes the levels of one channel's spectrum into `out`, resizing it.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::BufferTooShort`] if `spectrum` has fewer than
    /// `block_size / 2 + 1` bins.
    pub fn measure(&mut self, spectrum: &[Complex<f64>], out: &mut Vec<f64>) -> Result<()> {
        postprocess::magnitudes(
            self.block_size,
            spectrum,
            &mut self.magnitudes,
            SpectrumMode::Magnitude,
            Some(self.window.as_ref()),
        )?;
        out.resize(self.levels_len(), 0.0);
        let len = postprocess::crop(
            self.block_size,
            self.sample_rate,
            self.min_frequency,
            self.max_frequency,
            &self.magnitudes,
            out,
        )?;
        out.truncate(len);
        postprocess::to_db(out, self.max_db);
        Ok(())
    }

    /// [`measure`](Self::measure) for both channels of a frame.
    ///
    /// # Errors
    ///
    /// As for [`measure`](Self::measure).
    pub fn measure_frame(&mut self, frame: &SpectralFrame, out: &mut StereoSpectrum) -> Result<()> {
        self.measure(&frame.left_spectrum, &mut out.left)?;
        self.measure(&frame.right_spectrum, &mut out.right)
    }
}

/// Everything a hop touches except the accumulator that triggers it.
struct HopState {
    block_size: usize,
    channels: usize,
    plan: TransformPlan<f64>,
    window: Arc<WindowCoefficients>,
    windowed: Vec<f64>,
    meter: Option<LevelMeter>,
    exchange: FrameExchange<SpectralFrame>,
    sequence: u64,
}

impl HopState {
    fn run(&mut self, block: &[f32]) -> Result<()> {
        let sequence = self.sequence;
        let (channels, block_size) = (self.channels, self.block_size);
        self.exchange.try_write_with(|frame| {
            if frame.block_size() != block_size {
                *frame = SpectralFrame::new(block_size);
            }
            frame.sequence = sequence;
            for (i, samples) in block.chunks_exact(channels).enumerate() {
                frame.left_wave[i] = f64::from(samples[0]);
                frame.right_wave[i] = f64::from(samples[channels - 1]);
            }

            transform_channel(
                &mut self.plan,
                &self.window,
                &mut self.windowed,
                &frame.left_wave,
                &mut frame.left_spectrum,
            )?;
            transform_channel(
                &mut self.plan,
                &self.window,
                &mut self.windowed,
                &frame.right_wave,
                &mut frame.right_spectrum,
            )?;

            match self.meter.as_mut() {
                Some(meter) => {
                    let mut levels = frame.levels.take().unwrap_or_default();
                    meter.measure_frame(frame, &mut levels)?;
                    frame.levels = Some(levels);
                }
                None => frame.levels = None,
            }
            Ok::<(), AnalysisError>(())
        })?;
        trace!(sequence, "emitted spectral frame");
        self.sequence += 1;
        Ok(())
    }
}

/// Window → forward transform → copy out the single-sided spectrum.
fn transform_channel(
    plan: &mut TransformPlan<f64>,
    window: &WindowCoefficients,
    windowed: &mut [f64],
    wave: &[f64],
    spectrum: &mut [Complex<f64>],
) -> Result<()> {
    window.apply(wave, windowed)?;
    let mut session = plan.session()?;
    session.write_real(windowed)?;
    session.execute()?;
    session.read_complex(spectrum)
}

/// Producer-side pipeline for one capture stream.
///
/// # Example
///
/// ```
/// use specflow_analysis::{AnalyzerSettings, PlanRegistry, SpectrumAnalyzer};
///
/// let settings = AnalyzerSettings {
///     block_size: 1024,
///     move_speed: 4,
///     prefill: false,
///     ..AnalyzerSettings::default()
/// };
/// let registry = PlanRegistry::new();
/// let mut analyzer = SpectrumAnalyzer::new(&settings, &registry).unwrap();
/// let exchange = analyzer.exchange();
///
/// // 1024 stereo frames fill the first block.
/// let emitted = analyzer.process(&vec![0.0f32; 2048]).unwrap();
/// assert_eq!(emitted, 1);
/// assert_eq!(exchange.len(), 1);
/// ```
pub struct SpectrumAnalyzer {
    settings: AnalyzerSettings,
    accumulator: BlockAccumulator<f32>,
    hop: HopState,
    unaligned: Vec<f32>,
}

impl SpectrumAnalyzer {
    /// Builds the pipeline and acquires its forward plan from `registry`.
    ///
    /// # Errors
    ///
    /// Any [`AnalyzerSettings::validate`] failure.
    pub fn new(settings: &AnalyzerSettings, registry: &PlanRegistry) -> Result<Self> {
        settings.validate()?;
        let block_size = settings.block_size;
        if !block_size.is_power_of_two() {
            warn!(block_size, "block size is not a power of two; transforms will be slower");
        }

        let channels = usize::from(settings.channels);
        let hop_size = settings.hop_size();
        let accumulator = if settings.prefill {
            BlockAccumulator::primed(block_size, hop_size, channels)?
        } else {
            BlockAccumulator::new(block_size, hop_size, channels)?
        };

        let window = Arc::new(WindowCoefficients::new(settings.window, block_size));
        let meter = settings
            .producer_levels
            .then(|| LevelMeter::new(settings, Arc::clone(&window)));
        let plan = registry.acquire::<f64>(block_size, Direction::Forward)?;

        debug!(
            block_size,
            hop_size,
            channels,
            window = %settings.window,
            "spectrum analyzer ready"
        );
        Ok(Self {
            settings: settings.clone(),
            accumulator,
            hop: HopState {
                block_size,
                channels,
                plan,
                window,
                windowed: vec![0.0; block_size],
                meter,
                exchange: FrameExchange::new(move || SpectralFrame::new(block_size)),
                sequence: 0,
            },
            unaligned: Vec::new(),
        })
    }

    /// Settings this analyzer was built with.
    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    /// A handle to the exchange frames are published to.
    pub fn exchange(&self) -> FrameExchange<SpectralFrame> {
        self.hop.exchange.clone()
    }

    /// The window table applied to every block.
    pub fn window(&self) -> &Arc<WindowCoefficients> {
        &self.hop.window
    }

    /// Frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.hop.sequence
    }

    /// Feeds interleaved samples; returns the number of frames emitted.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::PlanReleased`] if the plan registry was shut down.
    pub fn process(&mut self, samples: &[f32]) -> Result<usize> {
        let Self {
            accumulator, hop, ..
        } = self;
        accumulator.try_write(samples, |block| hop.run(block))
    }

    /// Feeds the first `byte_count` bytes of a capture buffer of native-endian
    /// interleaved `f32` samples.
    ///
    /// Aligned buffers are reinterpreted in place; misaligned ones are copied
    /// into a scratch buffer first.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::BufferTooShort`] if `byte_count > bytes.len()`
    /// - [`AnalysisError::MisalignedCapture`] if `byte_count` is not a whole
    ///   number of interleaved frames
    /// - anything [`process`](Self::process) returns
    pub fn process_bytes(&mut self, bytes: &[u8], byte_count: usize) -> Result<usize> {
        if byte_count > bytes.len() {
            return Err(AnalysisError::buffer_too_short(byte_count, bytes.len()));
        }
        let frame_bytes = SAMPLE_BYTES * usize::from(self.settings.channels);
        if byte_count % frame_bytes != 0 {
            return Err(AnalysisError::MisalignedCapture {
                bytes: byte_count,
                frame_bytes,
            });
        }
        let bytes = &bytes[..byte_count];

        if let Ok(samples) = bytemuck::try_cast_slice::<u8, f32>(bytes) {
            return self.process(samples);
        }

        let mut scratch = std::mem::take(&mut self.unaligned);
        scratch.clear();
        scratch.extend(
            bytes
                .chunks_exact(SAMPLE_BYTES)
                .map(bytemuck::pod_read_unaligned::<f32>),
        );
        let outcome = self.process(&scratch);
        self.unaligned = scratch;
        outcome
    }

    /// Drops buffered samples; the next frame needs a full block (or one hop
    /// when prefill is on).
    pub fn reset(&mut self) {
        self.accumulator.reset();
        if self.settings.prefill {
            self.accumulator.prime();
        }
    }
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("settings", &self.settings)
            .field("frames_emitted", &self.hop.sequence)
            .finish_non_exhaustive()
    }
}
