//! Progress reporting for long-running builds.
//!
//! Building a smoothing operator on a full-resolution hemisphere can take a
//! while; callers pass a [`Progress`] to observe each diffusion step.
//!
//! ```
//! use sulcus::algo::Progress;
//!
//! let progress = Progress::new(|current, total, message| {
//!     eprintln!("[{}/{}] {}", current, total, message);
//! });
//! progress.report(1, 20, "Smoothing step");
//! ```

/// A progress callback that receives `(current, total, message)` updates.
///
/// `total` is `0` when the number of steps is not known up front, as when
/// smoothing runs until every vertex is reached.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_report_invokes_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let progress = Progress::new(move |current, _, _| {
            seen.fetch_add(current, Ordering::Relaxed);
        });
        progress.report(2, 5, "a");
        progress.report(3, 5, "b");
        assert_eq!(calls.load(Ordering::Relaxed), 5);
    }
}
