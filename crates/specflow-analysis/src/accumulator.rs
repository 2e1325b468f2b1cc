//! Overlapping fixed-size blocks from an arbitrarily chunked stream.
//!
//! [`BlockAccumulator`] buffers `block_size` interleaved frames. Whenever the
//! buffer fills it hands the whole block to a callback, then shifts left by
//! one hop so the newest `block_size - hop_size` frames become the start of
//! the next block. A single `write` may complete any number of blocks.

use crate::error::{AnalysisError, Result};

/// Sliding block buffer for interleaved samples.
///
/// Sizes are in frames; the buffer holds `block_size * stride` elements.
///
/// # Example
///
/// ```
/// use specflow_analysis::BlockAccumulator;
///
/// let mut acc = BlockAccumulator::<f32>::new(4, 2, 1).unwrap();
/// let mut blocks = Vec::new();
/// acc.write(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], |block| blocks.push(block.to_vec()));
/// assert_eq!(blocks, vec![vec![1.0, 2.0, 3.0, 4.0], vec![3.0, 4.0, 5.0, 6.0]]);
/// ```
#[derive(Debug, Clone)]
pub struct BlockAccumulator<T> {
    buffer: Vec<T>,
    offset: usize,
    block_size: usize,
    hop_size: usize,
    stride: usize,
}

impl<T: Copy + Default> BlockAccumulator<T> {
    /// Creates an empty accumulator; the first block completes after
    /// `block_size` frames.
    ///
    /// # Errors
    ///
    /// Fails if `block_size`, `hop_size` or `stride` is zero, or
    /// `hop_size > block_size`.
    pub fn new(block_size: usize, hop_size: usize, stride: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(AnalysisError::InvalidBlockSize(block_size));
        }
        if hop_size == 0 || hop_size > block_size {
            return Err(AnalysisError::InvalidHopSize {
                hop: hop_size,
                block: block_size,
            });
        }
        if stride == 0 {
            return Err(AnalysisError::InvalidStride(stride));
        }
        Ok(Self {
            buffer: vec![T::default(); block_size * stride],
            offset: 0,
            block_size,
            hop_size,
            stride,
        })
    }

    /// Creates an accumulator pre-filled with `block_size - hop_size` frames
    /// of silence, so the first block completes after a single hop.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn primed(block_size: usize, hop_size: usize, stride: usize) -> Result<Self> {
        let mut acc = Self::new(block_size, hop_size, stride)?;
        acc.prime();
        Ok(acc)
    }

    /// Frames per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Frames advanced per emitted block.
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Interleaved elements per frame.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Elements currently buffered.
    pub fn buffered(&self) -> usize {
        self.offset
    }

    /// Elements still needed before the next block completes.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    /// Empties the buffer, keeping the configuration.
    pub fn reset(&mut self) {
        self.buffer.fill(T::default());
        self.offset = 0;
    }

    /// Replaces the buffer contents with `block_size - hop_size` frames of
    /// silence.
    pub fn prime(&mut self) {
        self.buffer.fill(T::default());
        self.offset = self.overlap_len();
    }

    fn overlap_len(&self) -> usize {
        (self.block_size - self.hop_size) * self.stride
    }

    fn advance(&mut self) {
        let hop = self.hop_size * self.stride;
        self.buffer.copy_within(hop.., 0);
        self.offset = self.buffer.len() - hop;
    }

    /// Appends `data`, calling `on_block` once per completed block.
    ///
    /// The block slice is only valid for the duration of the call. Returns
    /// the number of blocks emitted.
    pub fn write(&mut self, data: &[T], mut on_block: impl FnMut(&[T])) -> usize {
        match self.try_write(data, |block| {
            on_block(block);
            Ok::<(), std::convert::Infallible>(())
        }) {
            Ok(emitted) => emitted,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`write`](Self::write).
    ///
    /// Stops at the first callback error. The failing block has already
    /// been shifted out, so the accumulator stays consistent and input past
    /// that block is left unconsumed.
    pub fn try_write<E>(
        &mut self,
        data: &[T],
        mut on_block: impl FnMut(&[T]) -> std::result::Result<(), E>,
    ) -> std::result::Result<usize, E> {
        let mut consumed = 0;
        let mut emitted = 0;
        while consumed < data.len() {
            let n = self.remaining().min(data.len() - consumed);
            self.buffer[self.offset..self.offset + n]
                .copy_from_slice(&data[consumed..consumed + n]);
            self.offset += n;
            consumed += n;

            if self.offset == self.buffer.len() {
                let outcome = on_block(&self.buffer);
                self.advance();
                emitted += 1;
                outcome?;
            }
        }
        Ok(emitted)
    }
}
