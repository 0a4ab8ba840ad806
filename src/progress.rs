//! Unit-counted progress reporting and cooperative cancellation.
//!
//! A language-neutral progress abstraction: `{ totalUnits, completedUnits,
//! cancelled, addChild(child, weight) }`. This is a plain atomic counter
//! pair plus a cancel flag, with optional hierarchical composition — a
//! parent aggregates its children's completion weighted by the unit
//! count the caller assigned each child.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

struct ProgressInner {
    total: AtomicI64,
    completed: AtomicI64,
    cancelled: AtomicBool,
}

struct Child {
    progress: Progress,
    weight: i64,
}

/// A shared, cloneable progress counter.
///
/// Cloning a `Progress` shares the same underlying counters — clone it
/// into a closure handed to a worker rather than passing `&mut`.
#[derive(Clone)]
pub struct Progress {
    inner: Arc<ProgressInner>,
    children: Arc<std::sync::Mutex<Vec<Child>>>,
}

impl Progress {
    pub fn new(total_unit_count: i64) -> Self {
        Self {
            inner: Arc::new(ProgressInner {
                total: AtomicI64::new(total_unit_count),
                completed: AtomicI64::new(0),
                cancelled: AtomicBool::new(false),
            }),
            children: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn total_unit_count(&self) -> i64 {
        self.inner.total.load(Ordering::Relaxed)
    }

    pub fn set_total_unit_count(&self, total: i64) {
        self.inner.total.store(total, Ordering::Relaxed);
    }

    /// Completed units contributed directly to this progress (excluding
    /// children).
    pub fn own_completed_unit_count(&self) -> i64 {
        self.inner.completed.load(Ordering::Relaxed)
    }

    /// Completed units, aggregating any children weighted by the unit
    /// count they were given via [`Progress::add_child`].
    pub fn completed_unit_count(&self) -> i64 {
        let own = self.own_completed_unit_count();
        let children = self.children.lock().unwrap();
        let from_children: i64 = children
            .iter()
            .map(|child| {
                let total = child.progress.total_unit_count();
                if total <= 0 {
                    0
                } else {
                    let fraction = child.progress.completed_unit_count() as f64 / total as f64;
                    (fraction * child.weight as f64).round() as i64
                }
            })
            .sum();
        own + from_children
    }

    /// Advances this progress's own counter by `units` (not a child's).
    pub fn advance(&self, units: i64) {
        self.inner.completed.fetch_add(units, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        self.children
            .lock()
            .unwrap()
            .iter()
            .any(|child| child.progress.is_cancelled())
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Relaxed);
    }

    /// Registers `child` as contributing `weight` units toward this
    /// progress's completion.
    pub fn add_child(&self, child: Progress, weight: i64) {
        self.children.lock().unwrap().push(Child {
            progress: child,
            weight,
        });
    }

    /// Polls the cancellation flag, returning `Err` if set. Callers
    /// invoke this between chunks of I/O.
    pub fn check_cancelled(&self) -> crate::error::Result<()> {
        if self.is_cancelled() {
            Err(crate::error::ZipCoreError::cancelled())
        } else {
            Ok(())
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(0)
    }
}
