//! Cross-rate hand-off of recycled frames between producer and consumer.
//!
//! The producer runs whenever audio arrives; the consumer polls on a timer.
//! [`FrameExchange`] decouples the two with an active queue and a free list
//! of reusable objects under one reader/writer lock:
//!
//! - [`write_with`](FrameExchange::write_with) takes a recycled (or new)
//!   object, fills it **outside** the lock, then queues it
//! - [`read_with`](FrameExchange::read_with) dequeues the oldest object,
//!   hands it to a closure outside the lock, then recycles it
//! - [`for_each_queued`](FrameExchange::for_each_queued) walks the queue
//!   under a shared read lock, so several readers can inspect it at once
//!
//! The lock is only held to move an object between the two lists, so the
//! producer never waits on the consumer's processing. Nothing is dropped:
//! `written == read + queued` at all times.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

type Factory<T> = dyn Fn() -> T + Send + Sync;

struct Queues<T> {
    free: Vec<T>,
    active: VecDeque<T>,
    written: u64,
    read: u64,
    allocated: usize,
}

/// Counters describing an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeStats {
    /// Objects queued since creation.
    pub written: u64,
    /// Objects dequeued since creation.
    pub read: u64,
    /// Objects waiting to be read.
    pub queued: usize,
    /// Objects waiting on the free list.
    pub free: usize,
    /// Objects ever constructed by the factory.
    pub allocated: usize,
}

/// Recycling producer/consumer queue.
///
/// Clones share the same queues; give one clone to the producer and one to
/// the consumer.
///
/// # Example
///
/// ```
/// use specflow_analysis::FrameExchange;
///
/// let exchange = FrameExchange::new(|| vec![0u8; 4]);
/// exchange.write_with(|buf| buf[0] = 7);
/// assert_eq!(exchange.read_with(|buf| buf[0]), Some(7));
/// assert_eq!(exchange.read_with(|buf| buf[0]), None);
/// assert_eq!(exchange.stats().free, 1);
/// ```
pub struct FrameExchange<T> {
    queues: Arc<RwLock<Queues<T>>>,
    factory: Arc<Factory<T>>,
}

impl<T> Clone for FrameExchange<T> {
    fn clone(&self) -> Self {
        Self {
            queues: Arc::clone(&self.queues),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T> FrameExchange<T> {
    /// Creates an empty exchange that builds new objects with `factory`.
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            queues: Arc::new(RwLock::new(Queues {
                free: Vec::new(),
                active: VecDeque::new(),
                written: 0,
                read: 0,
                allocated: 0,
            })),
            factory: Arc::new(factory),
        }
    }

    /// Takes a free object (or builds one), lets `fill` write it, and queues
    /// it for the reader.
    ///
    /// The object becomes visible to readers only after `fill` returns.
    pub fn write_with<R>(&self, fill: impl FnOnce(&mut T) -> R) -> R {
        match self.try_write_with(|item| Ok::<R, std::convert::Infallible>(fill(item))) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Fallible [`write_with`](Self::write_with).
    ///
    /// When `fill` fails the object goes back to the free list instead of
    /// the queue, so readers never see a half-written object.
    pub fn try_write_with<R, E>(
        &self,
        fill: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, E> {
        let recycled = self.queues.write().free.pop();
        let mut item = match recycled {
            Some(item) => item,
            None => {
                self.queues.write().allocated += 1;
                (self.factory)()
            }
        };
        let outcome = fill(&mut item);
        let mut queues = self.queues.write();
        if outcome.is_ok() {
            queues.active.push_back(item);
            queues.written += 1;
        } else {
            queues.free.push(item);
        }
        outcome
    }

    /// Dequeues the oldest object, passes it to `f`, then recycles it.
    ///
    /// Returns `None` when nothing is queued.
    pub fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let item = {
            let mut queues = self.queues.write();
            let item = queues.active.pop_front()?;
            queues.read += 1;
            item
        };
        let result = f(&item);
        self.queues.write().free.push(item);
        Some(result)
    }

    /// Reads every queued object in order, returning how many were read.
    ///
    /// Objects written while draining wait for the next call.
    pub fn drain(&self, mut f: impl FnMut(&T)) -> usize {
        let batch: Vec<T> = {
            let mut queues = self.queues.write();
            let batch: Vec<T> = queues.active.drain(..).collect();
            queues.read += batch.len() as u64;
            batch
        };
        let count = batch.len();
        for item in &batch {
            f(item);
        }
        self.queues.write().free.extend(batch);
        count
    }

    /// Visits queued objects oldest first under a shared read lock, without
    /// dequeuing them.
    pub fn for_each_queued(&self, mut f: impl FnMut(&T)) {
        let queues = self.queues.read();
        for item in &queues.active {
            f(item);
        }
    }

    /// Objects waiting to be read.
    pub fn len(&self) -> usize {
        self.queues.read().active.len()
    }

    /// Returns `true` if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.queues.read().active.is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> ExchangeStats {
        let queues = self.queues.read();
        ExchangeStats {
            written: queues.written,
            read: queues.read,
            queued: queues.active.len(),
            free: queues.free.len(),
            allocated: queues.allocated,
        }
    }
}

impl<T> fmt::Debug for FrameExchange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameExchange")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fifo_order() {
        let exchange = FrameExchange::new(|| 0u32);
        for i in 1..=3 {
            exchange.write_with(|v| *v = i);
        }
        let mut seen = Vec::new();
        while let Some(v) = exchange.read_with(|v| *v) {
            seen.push(v);
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn objects_are_recycled() {
        let exchange = FrameExchange::new(|| Vec::<u8>::with_capacity(64));
        for _ in 0..10 {
            exchange.write_with(|v| v.push(1));
            exchange.read_with(|_| ());
        }
        let stats = exchange.stats();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.free, 1);
        assert_eq!(stats.written, 10);
        assert_eq!(stats.read, 10);
        // The single recycled vector accumulated every push.
        exchange.write_with(|v| assert_eq!(v.len(), 10));
    }

    #[test]
    fn failed_write_is_not_queued() {
        let exchange = FrameExchange::new(|| 0u8);
        let outcome: Result<(), &str> = exchange.try_write_with(|v| {
            *v = 9;
            Err("half written")
        });
        assert!(outcome.is_err());
        assert!(exchange.is_empty());
        let stats = exchange.stats();
        assert_eq!((stats.written, stats.free), (0, 1));
    }

    #[test]
    fn drain_reads_everything_in_order() {
        let exchange = FrameExchange::new(|| 0usize);
        for i in 0..5 {
            exchange.write_with(|v| *v = i);
        }
        let mut seen = Vec::new();
        assert_eq!(exchange.drain(|v| seen.push(*v)), 5);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(exchange.is_empty());
        assert_eq!(exchange.stats().free, 5);
    }

    #[test]
    fn snapshot_does_not_dequeue() {
        let exchange = FrameExchange::new(|| 0i32);
        exchange.write_with(|v| *v = 4);
        exchange.write_with(|v| *v = 5);
        let mut sum = 0;
        exchange.for_each_queued(|v| sum += v);
        assert_eq!(sum, 9);
        assert_eq!(exchange.len(), 2);
    }

    #[test]
    fn producer_and_consumer_threads() {
        let exchange = FrameExchange::new(|| 0u64);
        let producer = {
            let exchange = exchange.clone();
            thread::spawn(move || {
                for i in 0..10_000u64 {
                    exchange.write_with(|v| *v = i);
                }
            })
        };

        let mut expected = 0u64;
        while expected < 10_000 {
            exchange.drain(|v| {
                assert_eq!(*v, expected);
                expected += 1;
            });
            thread::yield_now();
        }
        producer.join().unwrap();

        let stats = exchange.stats();
        assert_eq!(stats.written, stats.read + stats.queued as u64);
        assert_eq!(stats.allocated, stats.free + stats.queued);
    }
}
