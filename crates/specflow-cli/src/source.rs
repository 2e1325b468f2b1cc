//! Synthetic capture source: one sine per channel, delivered in irregular
//! chunks at real-time pace from a background thread.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use specflow_analysis::{AnalysisError, CaptureCallback, CaptureSource};
use tracing::debug;

/// Chunk length multipliers, cycled to imitate a device that does not
/// deliver fixed-size buffers.
const CHUNK_PATTERN: [f64; 5] = [1.0, 0.5, 1.5, 0.75, 1.25];

/// Tone settings for [`ToneSource`].
#[derive(Debug, Clone, Copy)]
pub struct Tones {
    /// Left channel frequency in Hz.
    pub left_hz: f64,
    /// Right channel frequency in Hz (ignored for mono).
    pub right_hz: f64,
    /// Peak amplitude, full scale = 1.
    pub amplitude: f32,
}

/// Oscillator state carried across chunks.
#[derive(Debug)]
struct Oscillator {
    tones: Tones,
    sample_rate: f64,
    channels: usize,
    phase: [f64; 2],
}

impl Oscillator {
    /// Appends `frames` interleaved frames to `out`.
    fn fill(&mut self, frames: usize, out: &mut Vec<f32>) {
        let steps = [
            TAU * self.tones.left_hz / self.sample_rate,
            TAU * self.tones.right_hz / self.sample_rate,
        ];
        for _ in 0..frames {
            for ch in 0..self.channels {
                out.push(self.tones.amplitude * self.phase[ch].sin() as f32);
                self.phase[ch] = (self.phase[ch] + steps[ch]) % TAU;
            }
        }
    }
}

/// [`CaptureSource`] producing two sine tones.
#[derive(Debug)]
pub struct ToneSource {
    sample_rate: u32,
    channels: u16,
    tones: Tones,
    chunk_frames: usize,
    running: Arc<AtomicBool>,
    frames_sent: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl ToneSource {
    /// Creates a stopped source delivering chunks of about `chunk_frames`.
    pub fn new(sample_rate: u32, channels: u16, tones: Tones, chunk_frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            tones,
            chunk_frames: chunk_frames.max(1),
            running: Arc::new(AtomicBool::new(false)),
            frames_sent: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    /// Frames delivered to the callback so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }
}

impl CaptureSource for ToneSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn start(&mut self, mut callback: CaptureCallback) -> specflow_analysis::Result<()> {
        if self.worker.is_some() {
            return Err(AnalysisError::Capture("tone source already started".into()));
        }
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let frames_sent = Arc::clone(&self.frames_sent);
        let chunk_frames = self.chunk_frames;
        let sample_rate = f64::from(self.sample_rate);
        let mut oscillator = Oscillator {
            tones: self.tones,
            sample_rate,
            channels: usize::from(self.channels),
            phase: [0.0; 2],
        };

        let worker = thread::Builder::new()
            .name("tone-source".into())
            .spawn(move || {
                let started = Instant::now();
                let mut samples = Vec::new();
                let mut sent = 0u64;
                for factor in CHUNK_PATTERN.iter().cycle() {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    let frames = ((chunk_frames as f64 * factor) as usize).max(1);
                    samples.clear();
                    oscillator.fill(frames, &mut samples);
                    let bytes: &[u8] = bytemuck::cast_slice(samples.as_slice());
                    callback(bytes, bytes.len());
                    sent += frames as u64;
                    frames_sent.store(sent, Ordering::Relaxed);

                    // Pace to the wall clock.
                    let due = Duration::from_secs_f64(sent as f64 / sample_rate);
                    if let Some(wait) = due.checked_sub(started.elapsed()) {
                        thread::sleep(wait);
                    }
                }
                debug!(frames = sent, "tone source stopped");
            })
            .map_err(|e| AnalysisError::Capture(format!("failed to spawn tone thread: {e}")))?;
        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) -> specflow_analysis::Result<()> {
        self.running.store(false, Ordering::SeqCst);
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| AnalysisError::Capture("tone thread panicked".into())),
            None => Ok(()),
        }
    }
}

impl Drop for ToneSource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const TONES: Tones = Tones {
        left_hz: 1000.0,
        right_hz: 250.0,
        amplitude: 0.5,
    };

    #[test]
    fn oscillator_is_continuous_across_chunks() {
        let mut a = Oscillator {
            tones: TONES,
            sample_rate: 48_000.0,
            channels: 2,
            phase: [0.0; 2],
        };
        let mut b = Oscillator {
            tones: TONES,
            sample_rate: 48_000.0,
            channels: 2,
            phase: [0.0; 2],
        };
        let mut whole = Vec::new();
        a.fill(300, &mut whole);
        let mut pieces = Vec::new();
        b.fill(100, &mut pieces);
        b.fill(200, &mut pieces);
        assert_eq!(whole.len(), 600);
        for (x, y) in whole.iter().zip(&pieces) {
            assert!((x - y).abs() < 1e-6);
        }
        assert!(whole.iter().all(|s| s.abs() <= 0.5));
    }

    #[test]
    fn delivers_whole_frames_until_stopped() {
        let lengths = Arc::new(Mutex::new(Vec::new()));
        let mut source = ToneSource::new(48_000, 2, TONES, 96);
        let seen = Arc::clone(&lengths);
        source
            .start(Box::new(move |bytes, count| {
                assert_eq!(bytes.len(), count);
                seen.lock().unwrap().push(count);
            }))
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        source.stop().unwrap();

        let lengths = lengths.lock().unwrap();
        assert!(!lengths.is_empty());
        assert!(lengths.iter().all(|n| n % 8 == 0));
        let total: usize = lengths.iter().sum();
        assert_eq!(total as u64, source.frames_sent() * 8);
    }

    #[test]
    fn cannot_start_twice() {
        let mut source = ToneSource::new(48_000, 1, TONES, 64);
        source.start(Box::new(|_, _| {})).unwrap();
        assert!(matches!(
            source.start(Box::new(|_, _| {})),
            Err(AnalysisError::Capture(_))
        ));
        source.stop().unwrap();
    }
}
