use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use crate::error::Error;

/// Single-assignment synchronizer
///
/// The first call to [`settle`](OneShot::settle) or [`fail`](OneShot::fail)
/// decides the outcome; later calls are ignored. Every clone of the handle
/// refers to the same cell, and any number of readers can [`wait`](OneShot::wait)
/// for it.
pub struct OneShot<T, E = Error> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

struct Inner<T, E> {
    outcome: Option<Result<T, E>>,
    wakers: HashMap<u64, Waker>,
    next_key: u64,
}

impl<T, E> OneShot<T, E> {
    /// Create an unsettled synchronizer
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                outcome: None,
                wakers: HashMap::new(),
                next_key: 0,
            })),
        }
    }

    /// Create a synchronizer already settled with `value`
    pub fn settled(value: T) -> Self {
        let shot = Self::new();
        shot.settle(value);
        shot
    }

    /// Settle with a value. Returns `false` if an outcome was already set.
    pub fn settle(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Settle with a failure. Returns `false` if an outcome was already set.
    pub fn fail(&self, error: E) -> bool {
        self.complete(Err(error))
    }

    /// Whether an outcome has been set
    pub fn is_settled(&self) -> bool {
        self.lock().outcome.is_some()
    }

    /// Number of pending [`Wait`] futures registered on this cell
    pub fn waiters(&self) -> usize {
        self.lock().wakers.len()
    }

    /// Wait for the outcome
    pub fn wait(&self) -> Wait<'_, T, E> {
        Wait {
            shot: self,
            key: None,
        }
    }

    fn complete(&self, outcome: Result<T, E>) -> bool {
        let wakers = {
            let mut inner = self.lock();
            if inner.outcome.is_some() {
                return false;
            }
            inner.outcome = Some(outcome);
            std::mem::take(&mut inner.wakers)
        };

        for waker in wakers.into_values() {
            waker.wake();
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T, E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, E> Default for OneShot<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for OneShot<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for OneShot<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShot")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Future returned by [`OneShot::wait`]
///
/// Dropping it before the cell settles withdraws its registration.
pub struct Wait<'a, T, E> {
    shot: &'a OneShot<T, E>,
    key: Option<u64>,
}

impl<T: Clone, E: Clone> Future for Wait<'_, T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut inner = this.shot.lock();
        if let Some(outcome) = inner.outcome.clone() {
            if let Some(key) = this.key.take() {
                inner.wakers.remove(&key);
            }
            return Poll::Ready(outcome);
        }

        let key = match this.key {
            Some(key) => key,
            None => {
                let key = inner.next_key;
                inner.next_key += 1;
                this.key = Some(key);
                key
            }
        };
        let stale = inner
            .wakers
            .get(&key)
            .map_or(true, |waker| !waker.will_wake(cx.waker()));
        if stale {
            inner.wakers.insert(key, cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T, E> Drop for Wait<'_, T, E> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.shot.lock().wakers.remove(&key);
        }
    }
}
