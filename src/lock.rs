use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::project::Project;

/// Registry of per-project locks serializing mutating operations.
///
/// One lock per project identity, created on first use and kept for the
/// lifetime of the registry. Acquisition never blocks: a held lock makes
/// [`ProjectLocks::try_lock`] return `false` immediately.
///
/// The registry is owned by the board and shared by reference; it is not a
/// global.
#[derive(Debug, Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<Project, Arc<AtomicBool>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, project: &Project) -> Arc<AtomicBool> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(project.clone()).or_default())
    }

    /// Try to take the project's lock without waiting.
    pub fn try_lock(&self, project: &Project) -> bool {
        self.lock_for(project)
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the project's lock, whoever holds it.
    pub fn unlock(&self, project: &Project) {
        self.lock_for(project).store(false, Ordering::Release);
    }

    /// Whether an operation currently holds the project's lock.
    pub fn is_locked(&self, project: &Project) -> bool {
        self.lock_for(project).load(Ordering::Acquire)
    }

    /// Scoped variant of [`ProjectLocks::try_lock`]: the lock is released
    /// when the returned guard is dropped.
    pub fn try_acquire<'a>(&'a self, project: &'a Project) -> Option<ProjectLockGuard<'a>> {
        self.try_lock(project)
            .then_some(ProjectLockGuard { locks: self, project })
    }
}

/// Holds a project's lock for the duration of one logical operation.
#[must_use = "the project is unlocked as soon as the guard is dropped"]
pub struct ProjectLockGuard<'a> {
    locks: &'a ProjectLocks,
    project: &'a Project,
}

impl Drop for ProjectLockGuard<'_> {
    fn drop(&mut self) {
        self.locks.unlock(self.project);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use super::*;

    #[test]
    fn try_lock_refuses_while_held() {
        let locks = ProjectLocks::new();
        let p = Project::new("/dev/duty");
        assert!(locks.try_lock(&p));
        assert!(!locks.try_lock(&p));
        assert!(!locks.try_lock(&p));
        locks.unlock(&p);
        assert!(locks.try_lock(&p));
    }

    #[test]
    fn locks_are_per_project() {
        let locks = ProjectLocks::new();
        let a = Project::new("/dev/a");
        let b = Project::new("/dev/b");
        assert!(locks.try_lock(&a));
        assert!(locks.try_lock(&b));
        assert!(locks.is_locked(&a));
    }

    #[test]
    fn guard_releases_on_drop() {
        let locks = ProjectLocks::new();
        let p = Project::new("/dev/mvodb");
        {
            let _guard = locks.try_acquire(&p).unwrap();
            assert!(locks.try_acquire(&p).is_none());
        }
        assert!(!locks.is_locked(&p));
        assert!(locks.try_acquire(&p).is_some());
    }

    #[test]
    fn only_one_thread_wins() {
        let locks = Arc::new(ProjectLocks::new());
        let barrier = Arc::new(Barrier::new(8));
        let p = Project::new("/dev/contended");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let barrier = Arc::clone(&barrier);
                let p = p.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    locks.try_lock(&p)
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
