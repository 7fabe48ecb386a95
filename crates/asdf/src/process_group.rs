//! Participant groups for collective container operations.
//!
//! Every participant in a group runs the same sequence of collective calls
//! (create, open, close). The group only needs to report who is who and
//! provide a barrier; how participants are spawned is up to the caller.

use std::sync::{Arc, Barrier};

/// The set of participants that share one container.
pub trait ProcessGroup {
    /// This participant's index, `0..size()`.
    fn rank(&self) -> usize;

    /// Number of participants.
    fn size(&self) -> usize;

    /// Block until every participant has reached the barrier.
    fn barrier(&self);
}

/// A group of one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl ProcessGroup for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}
}

/// Threads of one process acting as a group.
///
/// ```
/// use asdf::{ProcessGroup, ThreadGroup};
///
/// let members = ThreadGroup::split(3);
/// assert_eq!(members.len(), 3);
/// assert_eq!(members[2].rank(), 2);
/// assert!(members.iter().all(|m| m.size() == 3));
/// ```
#[derive(Debug, Clone)]
pub struct ThreadGroup {
    rank: usize,
    size: usize,
    barrier: Arc<Barrier>,
}

impl ThreadGroup {
    /// One member per rank, to be moved into `size` threads.
    ///
    /// A `size` of zero is treated as one.
    pub fn split(size: usize) -> Vec<ThreadGroup> {
        let size = size.max(1);
        let barrier = Arc::new(Barrier::new(size));
        (0..size)
            .map(|rank| ThreadGroup {
                rank,
                size,
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }
}

impl ProcessGroup for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.barrier.wait();
    }
}
