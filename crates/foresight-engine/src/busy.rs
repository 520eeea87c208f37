//! The busy-set: admission control for asynchronous simulation runs.
//!
//! At most one asynchronous run may be in flight per physical body. Two
//! predictors can share a physical body (a player marker riding the
//! ship, and the ship's own marker), and with parallel dependency
//! resolution a worker can request a run for a body the coordinator has
//! already dispatched. A second request while the first is in flight is
//! rejected at admission and completes immediately as a no-op.

use std::sync::{Arc, Mutex, MutexGuard};

use foresight_core::BodyId;
use indexmap::IndexSet;

/// Set of bodies with an in-flight asynchronous run.
///
/// The only structure mutated by several workers at once; every insert
/// and remove takes the lock.
#[derive(Default)]
pub struct BusySet {
    bodies: Mutex<IndexSet<BodyId>>,
}

// Compile-time assertion: BusySet must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<BusySet>();
};

impl BusySet {
    /// An empty busy-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to admit a run for `body`.
    ///
    /// Returns an [`Admission`] that keeps `body` in the set until it is
    /// dropped, or `None` if a run for `body` is already in flight.
    pub fn try_admit(self: &Arc<Self>, body: BodyId) -> Option<Admission> {
        if self.lock().insert(body) {
            Some(Admission {
                set: Arc::clone(self),
                body,
            })
        } else {
            None
        }
    }

    /// Whether a run for `body` is in flight.
    pub fn contains(&self, body: BodyId) -> bool {
        self.lock().contains(&body)
    }

    /// Number of in-flight runs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no run is in flight.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget every admission. Used on reconfiguration, which is only
    /// applied once no run is in flight.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, IndexSet<BodyId>> {
        // A poisoned set only means a worker panicked mid-insert/remove;
        // the set itself is still a valid IndexSet.
        self.bodies.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Proof of admission for one asynchronous run.
///
/// Removes its body from the busy-set on drop, including when the run
/// unwinds.
pub struct Admission {
    set: Arc<BusySet>,
    body: BodyId,
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.set.lock().swap_remove(&self.body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn duplicate_admission_is_rejected() {
        let set = Arc::new(BusySet::new());
        let _first = set.try_admit(BodyId(1)).expect("first admission");
        assert!(set.try_admit(BodyId(1)).is_none());
        assert!(set.contains(BodyId(1)));

        // Other bodies are unaffected.
        let other = set.try_admit(BodyId(2));
        assert!(other.is_some());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn dropping_admission_releases_body() {
        let set = Arc::new(BusySet::new());
        let admission = set.try_admit(BodyId(5)).unwrap();
        drop(admission);
        assert!(set.is_empty());
        assert!(set.try_admit(BodyId(5)).is_some());
    }

    #[test]
    fn admission_released_on_unwind() {
        let set = Arc::new(BusySet::new());
        let set_c = Arc::clone(&set);
        let result = thread::spawn(move || {
            let _admission = set_c.try_admit(BodyId(9)).unwrap();
            panic!("run failed");
        })
        .join();
        assert!(result.is_err());
        assert!(!set.contains(BodyId(9)));
    }

    #[test]
    fn concurrent_admissions_have_one_winner() {
        let set = Arc::new(BusySet::new());
        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = Arc::clone(&set);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    // Hold the admission until every thread has tried.
                    let admission = set.try_admit(BodyId(3));
                    let won = admission.is_some();
                    barrier.wait();
                    won
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
        assert!(set.is_empty());
    }
}
