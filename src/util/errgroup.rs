//! Bounded error groups.
//!
//! A [`BoundedGroup`] runs closures on its own rayon thread pool, sized to
//! the group's limit, so at most `limit` of them are in flight. Waiting
//! blocks until every submitted closure finished and returns the first
//! error recorded; a failing closure never interrupts its siblings.
//!
//! [`SkipAwareGroup`] additionally treats [`Skip`] errors as a non-failure
//! outcome: they are collected and handed back by `wait` unless a real error
//! also happened.
//!
//! Groups compose: a closure submitted to an outer group may drive its own
//! inner group, holding exactly one outer thread while it does.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use anyhow::{anyhow, Context as _, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Closures submitted but not finished yet.
#[derive(Debug, Default)]
struct Pending {
    count: Mutex<usize>,
    done: Condvar,
}

impl Pending {
    fn start(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count -= 1;
        if *count == 0 {
            self.done.notify_all();
        }
    }

    fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            count = self
                .done
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Runs closures with bounded parallelism, keeping the first error.
pub struct BoundedGroup {
    pool: ThreadPool,
    pending: Arc<Pending>,
    first_error: Arc<Mutex<Option<anyhow::Error>>>,
}

impl BoundedGroup {
    /// Create a group running at most `limit` closures at once (at least one).
    pub fn new(limit: usize) -> Result<Self> {
        let limit = limit.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(limit)
            .thread_name(|i| format!("shipwright-build-{i}"))
            .build()
            .with_context(|| format!("failed to start a pool of {limit} build threads"))?;

        Ok(BoundedGroup {
            pool,
            pending: Arc::new(Pending::default()),
            first_error: Arc::new(Mutex::new(None)),
        })
    }

    /// Number of closures that may run at once.
    pub fn limit(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue a closure. It starts once a pool thread is free.
    pub fn go<F>(&mut self, f: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        let first_error = Arc::clone(&self.first_error);
        pending.start();

        self.pool.spawn(move || {
            match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => record(&first_error, err),
                Err(payload) => record(
                    &first_error,
                    anyhow!("task panicked: {}", panic_message(&*payload)),
                ),
            }
            pending.finish();
        });
    }

    /// Wait for every submitted closure and return the first error.
    pub fn wait(self) -> Result<()> {
        self.pending.wait();

        let mut first_error = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match first_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn record(slot: &Mutex<Option<anyhow::Error>>, err: anyhow::Error) {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_none() {
        *slot = Some(err);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Explicit "nothing to do" signal. Not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    reasons: Vec<String>,
}

impl Skip {
    /// Create a skip with one reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Skip {
            reasons: vec![reason.into()],
        }
    }

    /// Merge several skips into one.
    pub fn merge(skips: impl IntoIterator<Item = Skip>) -> Self {
        Skip {
            reasons: skips.into_iter().flat_map(|s| s.reasons).collect(),
        }
    }

    /// The reasons carried by this skip.
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reasons.join("\n"))
    }
}

impl std::error::Error for Skip {}

/// Check whether an error is, or wraps, a [`Skip`].
pub fn is_skip(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<Skip>())
}

fn as_skip(err: &anyhow::Error) -> Option<Skip> {
    err.chain().find_map(|cause| cause.downcast_ref::<Skip>().cloned())
}

/// A [`BoundedGroup`] that collects skips instead of failing on them.
pub struct SkipAwareGroup {
    inner: BoundedGroup,
    skips: Arc<Mutex<Vec<Skip>>>,
}

impl SkipAwareGroup {
    /// Create a group running at most `limit` closures at once.
    pub fn new(limit: usize) -> Result<Self> {
        Ok(SkipAwareGroup {
            inner: BoundedGroup::new(limit)?,
            skips: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Queue a closure.
    pub fn go<F>(&mut self, f: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let skips = Arc::clone(&self.skips);
        self.inner.go(move || match f() {
            Err(err) => match as_skip(&err) {
                Some(skip) => {
                    tracing::debug!(reason = %skip, "skipped");
                    skips
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(skip);
                    Ok(())
                }
                None => Err(err),
            },
            Ok(()) => Ok(()),
        });
    }

    /// Wait for every closure.
    ///
    /// Returns the first real error if any happened, otherwise the collected
    /// skips (possibly none).
    pub fn wait(self) -> Result<Vec<Skip>> {
        self.inner.wait()?;
        let mut skips = self.skips.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(std::mem::take(&mut *skips))
    }
}
