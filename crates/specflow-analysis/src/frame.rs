//! Per-hop data handed from the producer to the consumer.

use rustfft::num_complex::Complex;

/// Everything one hop produces for both channels.
///
/// Frames are recycled through a [`FrameExchange`](crate::FrameExchange);
/// every field is overwritten in place on each hop, so the vectors keep their
/// allocation for the life of the exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralFrame {
    /// Hop counter assigned by the analyzer, starting at 0.
    pub sequence: u64,
    /// Left channel samples of the block, before windowing.
    pub left_wave: Vec<f64>,
    /// Right channel samples of the block, before windowing.
    pub right_wave: Vec<f64>,
    /// Left channel single-sided spectrum, `block_size / 2 + 1` bins.
    pub left_spectrum: Vec<Complex<f64>>,
    /// Right channel single-sided spectrum.
    pub right_spectrum: Vec<Complex<f64>>,
    /// Cropped decibel levels, when the producer computed them.
    pub levels: Option<StereoSpectrum>,
}

impl SpectralFrame {
    /// Allocates a zeroed frame for `block_size`-point blocks.
    pub fn new(block_size: usize) -> Self {
        let bins = block_size / 2 + 1;
        Self {
            sequence: 0,
            left_wave: vec![0.0; block_size],
            right_wave: vec![0.0; block_size],
            left_spectrum: vec![Complex::new(0.0, 0.0); bins],
            right_spectrum: vec![Complex::new(0.0, 0.0); bins],
            levels: None,
        }
    }

    /// Block size this frame was allocated for.
    pub fn block_size(&self) -> usize {
        self.left_wave.len()
    }
}

/// A pair of real-valued per-channel sequences (magnitudes or levels).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoSpectrum {
    /// Left channel.
    pub left: Vec<f64>,
    /// Right channel.
    pub right: Vec<f64>,
}

impl StereoSpectrum {
    /// Zero-filled pair of `len` elements each.
    pub fn zeroed(len: usize) -> Self {
        Self {
            left: vec![0.0; len],
            right: vec![0.0; len],
        }
    }

    /// Elements per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Returns `true` if both channels are empty.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Resizes both channels, zero-filling new elements.
    pub fn resize(&mut self, len: usize) {
        self.left.resize(len, 0.0);
        self.right.resize(len, 0.0);
    }
}
