//! Leading-edge write throttle
//!
//! A write is forwarded only when the interval since the last forwarded write
//! has elapsed and no forwarded write is still in flight. Everything else is
//! dropped; there is no trailing call. The value that finally goes out is
//! whatever the caller passes at that moment, so intermediate values are
//! superseded rather than queued.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Default)]
struct Gate {
    last_forwarded: Option<Instant>,
    in_flight: bool,
}

/// Gate for one logical parameter
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    gate: Mutex<Gate>,
}

/// Held while a forwarded write is in flight
#[derive(Debug)]
pub struct ThrottlePermit {
    throttle: Arc<Throttle>,
}

impl Drop for ThrottlePermit {
    fn drop(&mut self) {
        self.throttle.lock().in_flight = false;
    }
}

impl Throttle {
    pub fn new(interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            interval,
            gate: Mutex::new(Gate::default()),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn lock(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the right to forward a write now
    pub fn try_acquire(self: &Arc<Self>) -> Option<ThrottlePermit> {
        let now = Instant::now();
        let mut gate = self.lock();

        if gate.in_flight {
            trace!("write dropped, previous still in flight");
            return None;
        }
        if let Some(last) = gate.last_forwarded {
            if now.duration_since(last) < self.interval {
                trace!(since_ms = now.duration_since(last).as_millis() as u64, "write dropped");
                return None;
            }
        }

        gate.last_forwarded = Some(now);
        gate.in_flight = true;
        Some(ThrottlePermit {
            throttle: Arc::clone(self),
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }
}

/// An async writer behind a [`Throttle`]
///
/// `apply` runs synchronously on every call; `write` only when the throttle
/// lets the call through.
pub struct ThrottledWrite<A, W> {
    throttle: Arc<Throttle>,
    apply: A,
    write: W,
}

impl<A, W> ThrottledWrite<A, W> {
    pub fn new(interval: Duration, apply: A, write: W) -> Self {
        Self::with_throttle(Throttle::new(interval), apply, write)
    }

    /// Gate on an existing throttle; writers sharing it share one schedule
    pub fn with_throttle(throttle: Arc<Throttle>, apply: A, write: W) -> Self {
        Self {
            throttle,
            apply,
            write,
        }
    }

    pub fn throttle(&self) -> &Arc<Throttle> {
        &self.throttle
    }

    /// Returns `None` when the write was dropped
    pub async fn call<T, Fut>(&self, value: T) -> Option<Fut::Output>
    where
        A: Fn(&T),
        W: Fn(T) -> Fut,
        Fut: Future,
    {
        (self.apply)(&value);
        let _permit = self.throttle.try_acquire()?;
        Some((self.write)(value).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interval_gates_writes() {
        let throttle = Throttle::new(Duration::from_millis(100));

        assert!(throttle.try_acquire().is_some());
        tokio::time::advance(Duration::from_millis(99)).await;
        assert!(throttle.try_acquire().is_none());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(throttle.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_blocks_until_released() {
        let throttle = Throttle::new(Duration::from_millis(100));

        let permit = throttle.try_acquire().unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(throttle.is_in_flight());
        assert!(throttle.try_acquire().is_none());

        drop(permit);
        assert!(!throttle.is_in_flight());
        assert!(throttle.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_sends_leading_and_latest() {
        let applied = Mutex::new(Vec::new());
        let sent = Mutex::new(Vec::new());
        let throttled = ThrottledWrite::new(
            Duration::from_millis(100),
            |v: &f64| applied.lock().unwrap().push(*v),
            |v: f64| {
                sent.lock().unwrap().push(v);
                async {}
            },
        );

        let mut last = 0;
        for (at, value) in [(0, 1.0), (30, 2.0), (60, 3.0), (130, 4.0)] {
            tokio::time::advance(Duration::from_millis(at - last)).await;
            last = at;
            throttled.call(value).await;
        }

        assert_eq!(*sent.lock().unwrap(), vec![1.0, 4.0]);
        assert_eq!(*applied.lock().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_throttle_spans_writers() {
        let throttle = Throttle::new(Duration::from_millis(100));
        let first = ThrottledWrite::with_throttle(throttle.clone(), |_: &u8| {}, |v: u8| async move { v });
        let second = ThrottledWrite::with_throttle(throttle.clone(), |_: &u8| {}, |v: u8| async move { v });

        assert_eq!(first.call(1).await, Some(1));
        assert_eq!(second.call(2).await, None);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(second.call(3).await, Some(3));
        assert!(Arc::ptr_eq(first.throttle(), &throttle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_returns_none() {
        let throttled = ThrottledWrite::new(Duration::from_millis(100), |_: &u8| {}, |v: u8| async move { v });
        assert_eq!(throttled.call(1).await, Some(1));
        assert_eq!(throttled.call(2).await, None);
    }
}
