//! Shared FFT plans with a background optimize-then-swap upgrade.
//!
//! A [`PlanRegistry`] hands out one plan per (size, direction, precision).
//! Every plan starts on a cheap scalar variant so [`PlanRegistry::acquire`]
//! never waits; a background thread meanwhile measures the candidate
//! algorithms rustfft offers for that size and keeps the fastest. The next
//! [`PlanSession::execute`] that finds the measurement finished copies the
//! current input/output buffers into the new variant, drops the old one and
//! continues on the faster plan.
//!
//! # Single-writer contract
//!
//! A plan is driven through a [`PlanSession`], obtained from
//! [`TransformPlan::session`] with `&mut self`. The session holds the plan
//! exclusively for one write → execute → read cycle, so concurrent `execute`
//! calls on one plan are impossible rather than merely forbidden. Handles are
//! not `Clone`; move the handle into the thread that drives it.
//!
//! # Lifetime
//!
//! Handles are reference counted by the registry. Dropping (or
//! [`release`](TransformPlan::release)-ing) the last handle for an identity
//! releases the plan, joining the optimizer thread if it is still running.
//! [`PlanRegistry::shutdown`] releases every plan at once; handles that
//! outlive it fail with [`AnalysisError::PlanReleased`].
//!
//! # Example
//!
//! ```
//! use specflow_analysis::transform::{Direction, PlanRegistry};
//!
//! let registry = PlanRegistry::new();
//! let mut plan = registry.acquire::<f64>(8, Direction::Forward).unwrap();
//! let mut session = plan.session().unwrap();
//! session.write_real(&[1.0; 8]).unwrap();
//! session.execute().unwrap();
//! let mut magnitude = [0.0; 5];
//! session.read_magnitude(&mut magnitude).unwrap();
//! assert!((magnitude[0] - 8.0).abs() < 1e-12);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use rustfft::num_complex::Complex;
use rustfft::num_traits::{Float, Zero};
use rustfft::{Fft, FftDirection, FftNum, FftPlanner, FftPlannerScalar};
use tracing::{debug, trace, warn};

use crate::error::{AnalysisError, Result};

/// Timed executions per candidate when measuring the optimized variant.
const MEASURE_ROUNDS: usize = 4;

/// Transform direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Time domain to frequency domain.
    Forward,
    /// Frequency domain to time domain, unnormalized.
    Inverse,
}

impl From<Direction> for FftDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => FftDirection::Forward,
            Direction::Inverse => FftDirection::Inverse,
        }
    }
}

/// Element precision of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    /// `f32`.
    Single,
    /// `f64`.
    Double,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Scalar types a plan can be built for: `f32` and `f64`.
pub trait FftSample: FftNum + Float + sealed::Sealed {
    /// Precision tag used in the plan identity.
    const PRECISION: Precision;

    /// Converts from `f64`, rounding for `f32`.
    fn lossy_from(value: f64) -> Self;

    /// Widens to `f64`.
    fn as_f64(self) -> f64;
}

impl FftSample for f32 {
    const PRECISION: Precision = Precision::Single;

    #[inline]
    fn lossy_from(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        f64::from(self)
    }
}

impl FftSample for f64 {
    const PRECISION: Precision = Precision::Double;

    #[inline]
    fn lossy_from(value: f64) -> Self {
        value
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

/// Identity of a shared plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanKey {
    /// Transform length in points.
    pub size: usize,
    /// Transform direction.
    pub direction: Direction,
    /// Element precision.
    pub precision: Precision,
}

/// Which variant of a plan is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    /// Scalar plan built synchronously at acquisition.
    Fast,
    /// Plan chosen by timing candidates on the optimizer thread.
    Optimized,
}

/// One executable plan bound to its own buffers.
struct PlanVariant<T: FftSample> {
    fft: Arc<dyn Fft<T>>,
    input: Vec<Complex<T>>,
    output: Vec<Complex<T>>,
    scratch: Vec<Complex<T>>,
    kind: VariantKind,
}

impl<T: FftSample> PlanVariant<T> {
    fn new(fft: Arc<dyn Fft<T>>, size: usize, kind: VariantKind) -> Self {
        let scratch_len = fft.get_inplace_scratch_len();
        Self {
            fft,
            input: vec![Complex::zero(); size],
            output: vec![Complex::zero(); size],
            scratch: vec![Complex::zero(); scratch_len],
            kind,
        }
    }

    /// Transforms `input` into `output`, leaving `input` intact.
    fn run(&mut self) {
        self.output.copy_from_slice(&self.input);
        self.fft.process_with_scratch(&mut self.output, &mut self.scratch);
    }

    /// Best-of-N wall time for one execution.
    fn time(&mut self, rounds: usize) -> Duration {
        for (i, c) in self.input.iter_mut().enumerate() {
            *c = Complex::new(T::lossy_from((i % 7) as f64 - 3.0), T::zero());
        }
        self.run();
        let mut best = Duration::MAX;
        for _ in 0..rounds {
            let start = Instant::now();
            self.run();
            best = best.min(start.elapsed());
        }
        self.input.fill(Complex::zero());
        self.output.fill(Complex::zero());
        best
    }
}

/// Plans every candidate for `size` and keeps the fastest.
fn measure<T: FftSample>(size: usize, direction: FftDirection) -> PlanVariant<T> {
    let mut best = PlanVariant::new(
        FftPlanner::<T>::new().plan_fft(size, direction),
        size,
        VariantKind::Optimized,
    );
    let best_time = best.time(MEASURE_ROUNDS);

    let mut scalar = PlanVariant::new(
        FftPlannerScalar::<T>::new().plan_fft(size, direction),
        size,
        VariantKind::Optimized,
    );
    let scalar_time = scalar.time(MEASURE_ROUNDS);

    trace!(size, ?best_time, ?scalar_time, "measured fft candidates");
    if scalar_time < best_time {
        best = scalar;
    }
    best
}

/// Mutable plan state behind the shared mutex.
struct PlanCore<T: FftSample> {
    key: PlanKey,
    active: Option<PlanVariant<T>>,
    optimizer: Option<JoinHandle<PlanVariant<T>>>,
}

impl<T: FftSample> PlanCore<T> {
    fn new(key: PlanKey) -> Self {
        let direction = FftDirection::from(key.direction);
        let fast = PlanVariant::new(
            FftPlannerScalar::<T>::new().plan_fft(key.size, direction),
            key.size,
            VariantKind::Fast,
        );

        let size = key.size;
        let optimizer = thread::Builder::new()
            .name(format!("fft-plan-{size}"))
            .spawn(move || measure::<T>(size, direction));
        let optimizer = match optimizer {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(size, error = %err, "could not spawn fft optimizer, staying on fast plan");
                None
            }
        };

        debug!(size, direction = ?key.direction, precision = ?key.precision, "created transform plan");
        Self {
            key,
            active: Some(fast),
            optimizer,
        }
    }

    fn active_mut(&mut self) -> Result<&mut PlanVariant<T>> {
        self.active.as_mut().ok_or(AnalysisError::PlanReleased)
    }

    fn active(&self) -> Result<&PlanVariant<T>> {
        self.active.as_ref().ok_or(AnalysisError::PlanReleased)
    }

    /// Swaps in the optimized variant if its thread has finished.
    fn poll_optimizer(&mut self) {
        if self.optimizer.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = self.optimizer.take() {
                self.install(handle.join());
            }
        }
    }

    /// Blocks until the optimizer finishes and swaps it in.
    fn finish_optimization(&mut self) -> bool {
        if let Some(handle) = self.optimizer.take() {
            self.install(handle.join());
        }
        self.active
            .as_ref()
            .is_some_and(|v| v.kind == VariantKind::Optimized)
    }

    fn install(&mut self, joined: thread::Result<PlanVariant<T>>) {
        let mut next = match joined {
            Ok(variant) => variant,
            Err(_) => {
                warn!(size = self.key.size, "fft optimizer panicked, keeping fast plan");
                return;
            }
        };
        let Some(current) = self.active.as_ref() else {
            // Released while the optimizer ran; drop its result.
            return;
        };
        next.input.copy_from_slice(&current.input);
        next.output.copy_from_slice(&current.output);
        self.active = Some(next);
        debug!(size = self.key.size, direction = ?self.key.direction, "swapped to optimized fft plan");
    }

    fn release(&mut self) {
        if let Some(handle) = self.optimizer.take() {
            // The result is discarded either way; only the join matters.
            let _ = handle.join();
        }
        if self.active.take().is_some() {
            debug!(size = self.key.size, direction = ?self.key.direction, "released transform plan");
        }
    }
}

impl<T: FftSample> Drop for PlanCore<T> {
    fn drop(&mut self) {
        self.release();
    }
}

struct SharedPlan<T: FftSample> {
    key: PlanKey,
    core: Mutex<PlanCore<T>>,
}

/// Type-erased view the registry keeps of each plan.
trait RegisteredPlan: Send + Sync {
    fn release(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: FftSample> RegisteredPlan for SharedPlan<T> {
    fn release(&self) {
        self.core.lock().release();
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct Entry {
    plan: Arc<dyn RegisteredPlan>,
    handles: usize,
}

type Entries = HashMap<PlanKey, Entry>;

/// Process-wide owner of shared transform plans.
///
/// Cloning the registry clones a reference to the same set of plans; the host
/// application creates one and passes it to every analyzer.
#[derive(Clone, Default)]
pub struct PlanRegistry {
    entries: Arc<Mutex<Entries>>,
}

impl PlanRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the plan for `(size, direction, T::PRECISION)`,
    /// building it on first request.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidBlockSize`] if `size` is zero.
    pub fn acquire<T: FftSample>(&self, size: usize, direction: Direction) -> Result<TransformPlan<T>> {
        if size == 0 {
            return Err(AnalysisError::InvalidBlockSize(size));
        }
        let key = PlanKey {
            size,
            direction,
            precision: T::PRECISION,
        };

        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(&key) {
            if let Ok(shared) = Arc::clone(&entry.plan).into_any().downcast::<SharedPlan<T>>() {
                entry.handles += 1;
                trace!(size, handles = entry.handles, "shared existing transform plan");
                return Ok(TransformPlan {
                    shared,
                    entries: Arc::clone(&self.entries),
                });
            }
        }

        let shared = Arc::new(SharedPlan {
            key,
            core: Mutex::new(PlanCore::new(key)),
        });
        entries.insert(
            key,
            Entry {
                plan: Arc::clone(&shared) as Arc<dyn RegisteredPlan>,
                handles: 1,
            },
        );
        Ok(TransformPlan {
            shared,
            entries: Arc::clone(&self.entries),
        })
    }

    /// Number of live plans.
    pub fn plan_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Number of live handles to the plan with identity `key`.
    pub fn handle_count(&self, key: &PlanKey) -> usize {
        self.entries.lock().get(key).map_or(0, |e| e.handles)
    }

    /// Releases every plan, joining outstanding optimizer threads.
    ///
    /// Handles acquired earlier stay valid objects but fail with
    /// [`AnalysisError::PlanReleased`] on their next session.
    pub fn shutdown(&self) {
        let drained: Vec<Entry> = self.entries.lock().drain().map(|(_, e)| e).collect();
        let count = drained.len();
        for entry in drained {
            entry.plan.release();
        }
        debug!(count, "plan registry shut down");
    }
}

impl fmt::Debug for PlanRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanRegistry")
            .field("plans", &self.plan_count())
            .finish()
    }
}

/// Counted handle to a shared plan.
///
/// Not `Clone`: each driving context acquires its own handle, and all
/// execution goes through [`session`](Self::session).
pub struct TransformPlan<T: FftSample> {
    shared: Arc<SharedPlan<T>>,
    entries: Arc<Mutex<Entries>>,
}

impl<T: FftSample> TransformPlan<T> {
    /// Identity of the underlying plan.
    pub fn key(&self) -> PlanKey {
        self.shared.key
    }

    /// Transform length.
    pub fn size(&self) -> usize {
        self.shared.key.size
    }

    /// Locks the plan for one write → execute → read cycle.
    ///
    /// Blocks only while another handle to the same plan holds a session.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::PlanReleased`] after [`PlanRegistry::shutdown`].
    pub fn session(&mut self) -> Result<PlanSession<'_, T>> {
        let core = self.shared.core.lock();
        core.active()?;
        Ok(PlanSession { core })
    }

    /// Gives up this handle; the last handle releases the plan.
    pub fn release(self) {}
}

impl<T: FftSample> Drop for TransformPlan<T> {
    fn drop(&mut self) {
        let mut entries = self.entries.lock();
        let key = self.shared.key;
        let Some(entry) = entries.get_mut(&key) else {
            return;
        };
        // After a shutdown the same key may belong to a newer plan.
        let ours = Arc::as_ptr(&entry.plan).cast::<()>() == Arc::as_ptr(&self.shared).cast::<()>();
        if !ours {
            return;
        }
        entry.handles -= 1;
        if entry.handles == 0 {
            if let Some(entry) = entries.remove(&key) {
                drop(entries);
                entry.plan.release();
            }
        }
    }
}

impl<T: FftSample> fmt::Debug for TransformPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPlan")
            .field("key", &self.shared.key)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a plan for one hop.
pub struct PlanSession<'a, T: FftSample> {
    core: MutexGuard<'a, PlanCore<T>>,
}

impl<T: FftSample> PlanSession<'_, T> {
    /// Transform length.
    pub fn size(&self) -> usize {
        self.core.key.size
    }

    /// Variant currently executing, or `None` once released.
    pub fn active_variant(&self) -> Option<VariantKind> {
        self.core.active.as_ref().map(|v| v.kind)
    }

    /// Fills the input buffer from real samples, zeroing imaginary parts.
    ///
    /// Only the first `size()` samples of `src` are used.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::BufferTooShort`] if `src` is shorter than the plan.
    pub fn write_real(&mut self, src: &[T]) -> Result<()> {
        let variant = self.core.active_mut()?;
        let n = variant.input.len();
        if src.len() < n {
            return Err(AnalysisError::buffer_too_short(n, src.len()));
        }
        for (c, &x) in variant.input.iter_mut().zip(src) {
            *c = Complex::new(x, T::zero());
        }
        Ok(())
    }

    /// Fills the input buffer from complex samples.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::BufferTooShort`] if `src` is shorter than the plan.
    pub fn write_complex(&mut self, src: &[Complex<T>]) -> Result<()> {
        let variant = self.core.active_mut()?;
        let n = variant.input.len();
        if src.len() < n {
            return Err(AnalysisError::buffer_too_short(n, src.len()));
        }
        variant.input.copy_from_slice(&src[..n]);
        Ok(())
    }

    /// Runs the active plan, first swapping in a finished optimized variant.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::PlanReleased`] if the plan was released.
    pub fn execute(&mut self) -> Result<()> {
        self.core.poll_optimizer();
        self.core.active_mut()?.run();
        Ok(())
    }

    /// The output buffer of the last execution.
    pub fn output(&self) -> Result<&[Complex<T>]> {
        Ok(&self.core.active()?.output)
    }

    /// Copies the first `dst.len()` output bins into `dst`.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::BufferTooShort`] if `dst` is longer than the output.
    pub fn read_complex(&self, dst: &mut [Complex<T>]) -> Result<()> {
        let output = self.output()?;
        if dst.len() > output.len() {
            return Err(AnalysisError::buffer_too_short(dst.len(), output.len()));
        }
        dst.copy_from_slice(&output[..dst.len()]);
        Ok(())
    }

    /// Writes `sqrt(re² + im²)` of the first `dst.len()` output bins.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::BufferTooShort`] if `dst` is longer than the output.
    pub fn read_magnitude(&self, dst: &mut [T]) -> Result<()> {
        let output = self.output()?;
        if dst.len() > output.len() {
            return Err(AnalysisError::buffer_too_short(dst.len(), output.len()));
        }
        for (m, c) in dst.iter_mut().zip(output) {
            *m = (c.re * c.re + c.im * c.im).sqrt();
        }
        Ok(())
    }

    /// Waits for the optimizer thread and swaps its plan in.
    ///
    /// Returns `true` if the optimized variant is active afterwards.
    pub fn finish_optimization(&mut self) -> bool {
        self.core.finish_optimization()
    }
}
