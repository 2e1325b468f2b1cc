//! Consumer side of the pipeline.
//!
//! A [`SpectrumView`] is polled on the render timer. Each poll drains the
//! frame exchange, turns every frame into a column of cropped decibel levels
//! (reusing the producer's levels when present), pushes the column into a
//! bounded history and keeps a copy of the newest frame for wave displays.
//! Columns are remapped onto the perceptual display axis on demand, so a
//! resized display can repaint its whole history at the new width.

use std::sync::Arc;

use specflow_core::WindowCoefficients;
use tracing::trace;

use crate::analyzer::{AnalyzerSettings, LevelMeter};
use crate::error::Result;
use crate::exchange::FrameExchange;
use crate::frame::{SpectralFrame, StereoSpectrum};
use crate::history::HistoryCache;
use crate::postprocess::FrequencyRemapper;

/// Periodic consumer of an analyzer's frames.
#[derive(Debug)]
pub struct SpectrumView {
    settings: AnalyzerSettings,
    exchange: FrameExchange<SpectralFrame>,
    meter: LevelMeter,
    history: HistoryCache<StereoSpectrum>,
    remapper: FrequencyRemapper,
    last_frame: Option<SpectralFrame>,
    spare: Option<StereoSpectrum>,
    frames_seen: u64,
}

impl SpectrumView {
    /// Creates a view over `exchange`, which must carry frames produced with
    /// `settings`.
    ///
    /// # Errors
    ///
    /// Any [`AnalyzerSettings::validate`] failure.
    pub fn new(settings: &AnalyzerSettings, exchange: FrameExchange<SpectralFrame>) -> Result<Self> {
        settings.validate()?;
        let window = Arc::new(WindowCoefficients::new(settings.window, settings.block_size));
        Ok(Self {
            settings: settings.clone(),
            exchange,
            meter: LevelMeter::new(settings, window),
            history: HistoryCache::new(settings.history_capacity),
            remapper: FrequencyRemapper::new(),
            last_frame: None,
            spare: None,
            frames_seen: 0,
        })
    }

    /// Reads every frame queued at the time of the call.
    ///
    /// Returns the number of frames consumed.
    ///
    /// # Errors
    ///
    /// Level computation errors for malformed frames. Frames before the
    /// failing one are kept.
    pub fn poll(&mut self) -> Result<usize> {
        let exchange = self.exchange.clone();
        let pending = exchange.len();
        let mut consumed = 0;
        for _ in 0..pending {
            match exchange.read_with(|frame| self.absorb(frame)) {
                Some(outcome) => outcome?,
                None => break,
            }
            consumed += 1;
        }
        if consumed > 0 {
            trace!(consumed, total = self.frames_seen, "polled spectral frames");
        }
        Ok(consumed)
    }

    fn absorb(&mut self, frame: &SpectralFrame) -> Result<()> {
        let mut column = self
            .spare
            .take()
            .unwrap_or_else(|| StereoSpectrum::zeroed(self.meter.levels_len()));
        match &frame.levels {
            Some(levels) => column.clone_from(levels),
            None => self.meter.measure_frame(frame, &mut column)?,
        }
        // The evicted column becomes the next one's buffer.
        self.spare = self.history.push(column);

        match self.last_frame.as_mut() {
            Some(last) => last.clone_from(frame),
            None => self.last_frame = Some(frame.clone()),
        }
        self.frames_seen += 1;
        Ok(())
    }

    /// Settings this view interprets frames with.
    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    /// Frames consumed since creation.
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Retained cropped-level columns, oldest first.
    pub fn history(&self) -> &HistoryCache<StereoSpectrum> {
        &self.history
    }

    /// Newest cropped-level column.
    pub fn latest(&self) -> Option<&StereoSpectrum> {
        self.history.latest()
    }

    /// Copy of the newest frame (waves and spectra).
    pub fn last_frame(&self) -> Option<&SpectralFrame> {
        self.last_frame.as_ref()
    }

    /// Changes how many columns are retained.
    pub fn resize_history(&mut self, capacity: usize) {
        self.history.resize(capacity);
    }

    /// Remaps the column `age` polls back (0 = newest) onto `dst`, whose
    /// channel lengths set the display width.
    ///
    /// Returns `false` when no column of that age is retained.
    ///
    /// # Errors
    ///
    /// Remap errors (see [`FrequencyRemapper::remap`]).
    pub fn display(&mut self, age: usize, dst: &mut StereoSpectrum) -> Result<bool> {
        let Some(column) = self.history.get(age) else {
            return Ok(false);
        };
        let (min, max, scale) = (
            self.settings.min_frequency,
            self.settings.max_frequency,
            self.settings.scale,
        );
        self.remapper.remap(&column.left, min, max, &mut dst.left, scale)?;
        self.remapper.remap(&column.right, min, max, &mut dst.right, scale)?;
        Ok(true)
    }

    /// Remaps the newest column onto a fresh pair of `display_width` buckets.
    ///
    /// # Errors
    ///
    /// As for [`display`](Self::display).
    pub fn display_latest(&mut self) -> Result<Option<StereoSpectrum>> {
        let mut out = StereoSpectrum::zeroed(self.settings.display_width);
        Ok(self.display(0, &mut out)?.then_some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlanRegistry, SpectrumAnalyzer};

    fn settings() -> AnalyzerSettings {
        AnalyzerSettings {
            block_size: 1024,
            move_speed: 4,
            history_capacity: 3,
            display_width: 32,
            prefill: false,
            ..AnalyzerSettings::default()
        }
    }

    #[test]
    fn poll_drains_and_keeps_history() {
        let registry = PlanRegistry::new();
        let mut analyzer = SpectrumAnalyzer::new(&settings(), &registry).unwrap();
        let mut view = SpectrumView::new(&settings(), analyzer.exchange()).unwrap();

        assert_eq!(view.poll().unwrap(), 0);
        // 1024 + 4 hops of 256 stereo frames
        let samples = vec![0.25f32; 2 * (1024 + 4 * 256)];
        assert_eq!(analyzer.process(&samples).unwrap(), 5);

        assert_eq!(view.poll().unwrap(), 5);
        assert_eq!(view.frames_seen(), 5);
        assert_eq!(view.history().len(), 3);
        assert_eq!(view.last_frame().unwrap().sequence, 4);
        assert_eq!(view.latest().unwrap().len(), settings().cropped_len());
    }

    #[test]
    fn consumer_computes_levels_when_producer_skips_them() {
        let registry = PlanRegistry::new();
        let with = settings();
        let without = AnalyzerSettings {
            producer_levels: false,
            ..settings()
        };
        let samples: Vec<f32> = (0..2048).map(|i| ((i / 2) as f32 * 0.3).sin()).collect();

        let mut a = SpectrumAnalyzer::new(&with, &registry).unwrap();
        let mut view_a = SpectrumView::new(&with, a.exchange()).unwrap();
        a.process(&samples).unwrap();
        view_a.poll().unwrap();

        let mut b = SpectrumAnalyzer::new(&without, &registry).unwrap();
        let mut view_b = SpectrumView::new(&without, b.exchange()).unwrap();
        b.process(&samples).unwrap();
        view_b.poll().unwrap();

        let (la, lb) = (view_a.latest().unwrap(), view_b.latest().unwrap());
        assert_eq!(la.len(), lb.len());
        for (x, y) in la.left.iter().zip(&lb.left) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn display_remaps_and_survives_resize() {
        let registry = PlanRegistry::new();
        let mut analyzer = SpectrumAnalyzer::new(&settings(), &registry).unwrap();
        let mut view = SpectrumView::new(&settings(), analyzer.exchange()).unwrap();
        analyzer.process(&vec![0.5f32; 2 * 1024 + 2 * 512]).unwrap();
        view.poll().unwrap();

        let latest = view.display_latest().unwrap().unwrap();
        assert_eq!(latest.len(), 32);

        let mut wide = StereoSpectrum::zeroed(100);
        assert!(view.display(2, &mut wide).unwrap());
        assert!(!view.display(3, &mut wide).unwrap());

        view.resize_history(1);
        assert_eq!(view.history().len(), 1);
        assert!(!view.display(1, &mut wide).unwrap());
    }
}
