//! In-memory idempotency guard.
//!
//! [`IdempotencyGuard::admit`] decides whether a run may start:
//!
//! - no entry for the key: the caller receives a [`RunPermit`] and the key
//!   is marked in flight;
//! - an in-flight entry: the caller receives an [`InFlightRun`] it can
//!   await for the first run's result;
//! - a retained completed entry: the caller receives the stored result.
//!
//! A permit dropped without [`RunPermit::complete`] (error, cancellation,
//! panic) clears the key so a retry may proceed. Completed results are
//! retained for the configured window and then expire lazily.
//!
//! This is a duplicate-suppression window for concurrent or retried calls
//! inside one process. It is not a durable exactly-once guarantee.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use sinkbyte_types::state::RunKey;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{self, GuardError};

enum Slot<V> {
    InFlight(watch::Receiver<Option<V>>),
    Completed(V),
}

struct GuardEntry<V> {
    slot: Slot<V>,
    expires_at: Option<Instant>,
}

impl<V> GuardEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

struct Inner<V> {
    entries: Mutex<HashMap<RunKey, GuardEntry<V>>>,
    completed_ttl: Duration,
}

impl<V> Inner<V> {
    fn lock(&self) -> error::Result<MutexGuard<'_, HashMap<RunKey, GuardEntry<V>>>> {
        self.entries.lock().map_err(|_| GuardError::LockPoisoned)
    }
}

/// Outcome of [`IdempotencyGuard::admit`].
pub enum Admission<V> {
    /// No run holds the key; the caller owns it until the permit resolves.
    Proceed(RunPermit<V>),
    /// Another run holds the key.
    InFlight(InFlightRun<V>),
    /// A run with this key completed inside the retention window.
    Completed(V),
}

/// Short-lived marker store keyed by [`RunKey`].
///
/// Cloning is cheap; clones share the same entries.
pub struct IdempotencyGuard<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for IdempotencyGuard<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone> IdempotencyGuard<V> {
    /// Create a guard that keeps completed results for `completed_ttl`.
    ///
    /// A zero TTL clears a key as soon as its run completes.
    #[must_use]
    pub fn new(completed_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                completed_ttl,
            }),
        }
    }

    /// Atomically check the key and, if free, mark it in flight.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::LockPoisoned`] if the entry lock is poisoned.
    pub fn admit(&self, key: &RunKey) -> error::Result<Admission<V>> {
        let mut entries = self.inner.lock()?;
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now));

        if let Some(entry) = entries.get(key) {
            return Ok(match &entry.slot {
                Slot::InFlight(rx) => {
                    tracing::debug!(run_key = %key, "Run already in flight");
                    Admission::InFlight(InFlightRun { rx: rx.clone() })
                }
                Slot::Completed(value) => {
                    tracing::debug!(run_key = %key, "Run already completed");
                    Admission::Completed(value.clone())
                }
            });
        }

        let (tx, rx) = watch::channel(None);
        entries.insert(
            key.clone(),
            GuardEntry {
                slot: Slot::InFlight(rx),
                expires_at: None,
            },
        );
        Ok(Admission::Proceed(RunPermit {
            key: key.clone(),
            inner: Arc::clone(&self.inner),
            sender: Some(tx),
        }))
    }
}

/// Exclusive right to run the key. Resolve with [`RunPermit::complete`].
pub struct RunPermit<V> {
    key: RunKey,
    inner: Arc<Inner<V>>,
    sender: Option<watch::Sender<Option<V>>>,
}

impl<V: Clone> RunPermit<V> {
    /// The key this permit holds.
    #[must_use]
    pub fn key(&self) -> &RunKey {
        &self.key
    }

    /// Publish the run result to waiters and retain or clear the entry.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::LockPoisoned`] if the entry lock is poisoned.
    /// The permit is dropped as abandoned, so the key is still
    /// cleared and waiters wake without a result.
    pub fn complete(mut self, value: V) -> error::Result<()> {
        {
            let mut entries = self.inner.lock()?;
            if self.inner.completed_ttl.is_zero() {
                entries.remove(&self.key);
            } else {
                entries.insert(
                    self.key.clone(),
                    GuardEntry {
                        slot: Slot::Completed(value.clone()),
                        expires_at: Some(Instant::now() + self.inner.completed_ttl),
                    },
                );
            }
        }
        if let Some(tx) = self.sender.take() {
            tx.send_replace(Some(value));
        }
        Ok(())
    }
}

impl<V> Drop for RunPermit<V> {
    fn drop(&mut self) {
        if self.sender.is_none() {
            return;
        }
        let mut entries = match self.inner.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.remove(&self.key);
        tracing::debug!(run_key = %self.key, "Run abandoned, guard entry cleared");
        // Dropping the sender after the entry is gone wakes waiters with no result.
        drop(entries);
        self.sender.take();
    }
}

/// Handle on a run another caller is executing.
pub struct InFlightRun<V> {
    rx: watch::Receiver<Option<V>>,
}

impl<V: Clone> InFlightRun<V> {
    /// Wait for the owning run to finish.
    ///
    /// Returns `None` if the owner gave up without a result; the caller
    /// should re-admit.
    pub async fn wait(mut self) -> Option<V> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> RunKey {
        RunKey::new(s)
    }

    impl<V> IdempotencyGuard<V> {
        fn contains(&self, key: &RunKey) -> error::Result<bool> {
            let entries = self.inner.lock()?;
            Ok(entries
                .get(key)
                .is_some_and(|entry| !entry.is_expired(Instant::now())))
        }

        fn len(&self) -> error::Result<usize> {
            let entries = self.inner.lock()?;
            let now = Instant::now();
            Ok(entries.values().filter(|e| !e.is_expired(now)).count())
        }
    }

    #[tokio::test]
    async fn first_admit_proceeds_and_marks_key() {
        let guard: IdempotencyGuard<u32> = IdempotencyGuard::new(Duration::ZERO);
        let Admission::Proceed(permit) = guard.admit(&key("a")).unwrap() else {
            panic!("expected Proceed");
        };
        assert_eq!(permit.key().as_str(), "a");
        assert!(guard.contains(&key("a")).unwrap());
        permit.complete(1).unwrap();
    }

    #[tokio::test]
    async fn zero_ttl_clears_on_complete() {
        let guard: IdempotencyGuard<u32> = IdempotencyGuard::new(Duration::ZERO);
        let Admission::Proceed(permit) = guard.admit(&key("a")).unwrap() else {
            panic!("expected Proceed");
        };
        permit.complete(7).unwrap();
        assert!(!guard.contains(&key("a")).unwrap());
        assert!(matches!(
            guard.admit(&key("a")).unwrap(),
            Admission::Proceed(_)
        ));
    }

    #[tokio::test]
    async fn second_admit_sees_in_flight_and_receives_result() {
        let guard: IdempotencyGuard<u32> = IdempotencyGuard::new(Duration::ZERO);
        let Admission::Proceed(permit) = guard.admit(&key("a")).unwrap() else {
            panic!("expected Proceed");
        };
        let Admission::InFlight(waiter) = guard.admit(&key("a")).unwrap() else {
            panic!("expected InFlight");
        };
        let handle = tokio::spawn(waiter.wait());
        permit.complete(42).unwrap();
        assert_eq!(handle.await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn dropped_permit_clears_key_and_wakes_waiters_empty() {
        let guard: IdempotencyGuard<u32> = IdempotencyGuard::new(Duration::from_secs(60));
        let Admission::Proceed(permit) = guard.admit(&key("a")).unwrap() else {
            panic!("expected Proceed");
        };
        let Admission::InFlight(waiter) = guard.admit(&key("a")).unwrap() else {
            panic!("expected InFlight");
        };
        drop(permit);
        assert_eq!(waiter.wait().await, None);
        assert!(!guard.contains(&key("a")).unwrap());
    }

    #[tokio::test]
    async fn different_keys_do_not_interfere() {
        let guard: IdempotencyGuard<u32> = IdempotencyGuard::new(Duration::ZERO);
        let a = guard.admit(&key("a")).unwrap();
        let b = guard.admit(&key("b")).unwrap();
        assert!(matches!(a, Admission::Proceed(_)));
        assert!(matches!(b, Admission::Proceed(_)));
        assert_eq!(guard.len().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_entry_is_retained_then_expires() {
        let guard: IdempotencyGuard<u32> = IdempotencyGuard::new(Duration::from_secs(30));
        let Admission::Proceed(permit) = guard.admit(&key("a")).unwrap() else {
            panic!("expected Proceed");
        };
        permit.complete(5).unwrap();

        match guard.admit(&key("a")).unwrap() {
            Admission::Completed(v) => assert_eq!(v, 5),
            _ => panic!("expected Completed"),
        }

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!guard.contains(&key("a")).unwrap());
        assert!(matches!(
            guard.admit(&key("a")).unwrap(),
            Admission::Proceed(_)
        ));
    }

    #[tokio::test]
    async fn complete_on_poisoned_lock_still_clears_key() {
        let guard: IdempotencyGuard<u32> = IdempotencyGuard::new(Duration::from_secs(60));
        let Admission::Proceed(permit) = guard.admit(&key("a")).unwrap() else {
            panic!("expected Proceed");
        };
        let Admission::InFlight(waiter) = guard.admit(&key("a")).unwrap() else {
            panic!("expected InFlight");
        };

        let inner = Arc::clone(&guard.inner);
        let _ = std::thread::spawn(move || {
            let _held = inner.entries.lock().unwrap();
            panic!("poison the guard lock");
        })
        .join();

        assert!(matches!(permit.complete(3), Err(GuardError::LockPoisoned)));
        assert_eq!(waiter.wait().await, None);
        let entries = guard
            .inner
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        assert!(!entries.contains_key(&key("a")));
    }
}
