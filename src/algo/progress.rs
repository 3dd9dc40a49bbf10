//! Progress reporting and cooperative cancellation.
//!
//! A [`Progress`] wraps a callback receiving the completed fraction of work
//! in `[0, 1]`. The callback answers with a [`ProgressStatus`]; returning
//! [`ProgressStatus::Cancel`] aborts the running operation, which then fails
//! with [`AtlasError::Cancelled`](crate::AtlasError::Cancelled).
//!
//! A [`CancelToken`] can be attached as well, so another thread can abort a
//! build without waiting for the next callback.
//!
//! # Example
//!
//! ```
//! use isochart::algo::progress::{CancelToken, Progress, ProgressStatus};
//!
//! let token = CancelToken::new();
//! let progress = Progress::new(|fraction| {
//!     println!("{:.0}%", fraction * 100.0);
//!     ProgressStatus::Continue
//! })
//! .with_cancel_token(token.clone());
//!
//! // Later, from any thread:
//! token.cancel();
//! assert!(progress.is_cancelled());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AtlasError, Result};

/// Answer of a progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressStatus {
    /// Keep going.
    #[default]
    Continue,
    /// Abort as soon as possible.
    Cancel,
}

/// Shared flag that aborts a running operation when set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives the completed fraction in `[0, 1]` and is only ever
/// invoked from the thread that started the operation.
pub struct Progress {
    callback: Box<dyn Fn(f32) -> ProgressStatus + Send + Sync>,
    token: Option<CancelToken>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(f32) -> ProgressStatus + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
            token: None,
        }
    }

    /// Attach a cancel token polled alongside the callback.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Report progress and return the callback's answer.
    ///
    /// A set cancel token overrides the callback.
    #[inline]
    pub fn report(&self, fraction: f32) -> ProgressStatus {
        let status = (self.callback)(fraction.clamp(0.0, 1.0));
        if self.is_cancelled() {
            ProgressStatus::Cancel
        } else {
            status
        }
    }

    /// Whether the attached cancel token is set.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Create a no-op progress reporter that never cancels.
    pub fn none() -> Self {
        Self::new(|_| ProgressStatus::Continue)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Cheap handle that worker threads poll for cancellation.
#[derive(Debug, Clone)]
pub(crate) struct CancelProbe {
    local: CancelToken,
    user: Option<CancelToken>,
}

impl CancelProbe {
    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.local.is_cancelled() || self.user.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    #[inline]
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(AtlasError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Throttles callback invocations to one per `frequency` of completed work.
///
/// The first update is always delivered. Once a cancel is observed, every
/// later update and every probe fails.
pub(crate) struct ProgressTracker<'a> {
    progress: &'a Progress,
    frequency: f32,
    last: Option<f32>,
    probe: CancelProbe,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(progress: &'a Progress, frequency: f32) -> Self {
        Self {
            progress,
            frequency: frequency.clamp(0.0, 1.0),
            last: None,
            probe: CancelProbe {
                local: CancelToken::new(),
                user: progress.token.clone(),
            },
        }
    }

    pub(crate) fn probe(&self) -> CancelProbe {
        self.probe.clone()
    }

    /// Report overall progress, invoking the callback when due.
    pub(crate) fn update(&mut self, fraction: f32) -> Result<()> {
        self.probe.check()?;
        let due = match self.last {
            None => true,
            Some(last) => fraction - last >= self.frequency || (fraction >= 1.0 && last < 1.0),
        };
        if !due {
            return Ok(());
        }
        self.last = Some(fraction);
        if self.progress.report(fraction) == ProgressStatus::Cancel {
            self.probe.local.cancel();
            log::debug!("cancelled by progress callback at {:.3}", fraction);
            return Err(AtlasError::Cancelled);
        }
        Ok(())
    }

    /// Report `done / total` of a stage occupying `[start, end]` of the whole run.
    pub(crate) fn update_stage(&mut self, start: f32, end: f32, done: usize, total: usize) -> Result<()> {
        let sub = if total == 0 {
            1.0
        } else {
            (done as f32 / total as f32).min(1.0)
        };
        self.update(start + (end - start) * sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_throttling() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let progress = Progress::new(move |f| {
            sink.lock().unwrap().push(f);
            ProgressStatus::Continue
        });

        let mut tracker = ProgressTracker::new(&progress, 0.25);
        for i in 0..=10 {
            tracker.update(i as f32 / 10.0).unwrap();
        }
        let seen = calls.lock().unwrap().clone();
        assert_eq!(seen.first(), Some(&0.0));
        assert_eq!(seen.last(), Some(&1.0));
        assert!(seen.len() < 11);
    }

    #[test]
    fn test_zero_frequency_reports_everything() {
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        let progress = Progress::new(move |_| {
            *sink.lock().unwrap() += 1;
            ProgressStatus::Continue
        });
        let mut tracker = ProgressTracker::new(&progress, 0.0);
        for _ in 0..5 {
            tracker.update(0.5).unwrap();
        }
        assert_eq!(*count.lock().unwrap(), 5);
    }

    #[test]
    fn test_cancel_from_callback() {
        let progress = Progress::new(|_| ProgressStatus::Cancel);
        let mut tracker = ProgressTracker::new(&progress, 0.0001);
        assert_eq!(tracker.update(0.0), Err(AtlasError::Cancelled));
        assert!(tracker.probe().is_cancelled());
        assert_eq!(tracker.update(0.5), Err(AtlasError::Cancelled));
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let progress = Progress::none().with_cancel_token(token.clone());
        let tracker = ProgressTracker::new(&progress, 0.1);
        let probe = tracker.probe();
        assert!(probe.check().is_ok());
        token.cancel();
        assert_eq!(probe.check(), Err(AtlasError::Cancelled));
        assert_eq!(progress.report(0.3), ProgressStatus::Cancel);
    }

    #[test]
    fn test_stage_mapping() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let progress = Progress::new(move |f| {
            sink.lock().unwrap().push(f);
            ProgressStatus::Continue
        });
        let mut tracker = ProgressTracker::new(&progress, 0.0);
        tracker.update_stage(0.2, 0.6, 1, 2).unwrap();
        tracker.update_stage(0.2, 0.6, 0, 0).unwrap();
        let seen = calls.lock().unwrap().clone();
        assert!((seen[0] - 0.4).abs() < 1e-6);
        assert!((seen[1] - 0.6).abs() < 1e-6);
    }
}
