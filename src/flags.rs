use crate::types::ReconstructRequest;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Capacity of the reconstruct request queue. More than one pending
/// reconstruction is already unusual; the queue only absorbs bursts.
const SCAN_QUEUE_CAPACITY: usize = 4;

/// Cross-thread shared state between the controller and the capture thread.
///
/// Every flag has exactly one writer and one reader: the controller sets
/// request flags, the capture thread clears them after acting. Frame data
/// itself is ordered by the mid-buffer mutex, so `Relaxed` loads/stores are
/// sufficient here.
pub(crate) struct SharedState {
    pub running: AtomicBool,

    pub color_streaming: AtomicBool,
    pub depth_streaming: AtomicBool,
    pub scan_enabled: AtomicBool,
    pub tracking_enabled: AtomicBool,

    pub scan_start_requested: AtomicBool,
    pub scan_stop_requested: AtomicBool,
    pub scan_completed: AtomicBool,

    /// Total failed frame acquisitions since construction. Diagnostic only;
    /// failed acquisitions are retried without limit.
    pub acquire_failures: AtomicU64,

    /// Reconstruct requests carry a format and path, which cannot ride an
    /// atomic flag. Bounded so a stalled capture thread surfaces as
    /// `ScanBacklog` instead of unbounded growth.
    pub scan_requests_tx: Sender<ReconstructRequest>,
    pub scan_requests_rx: Receiver<ReconstructRequest>,

    scan_error: Mutex<Option<String>>,
}

/// One consistent view of the capability flags, taken once per loop
/// iteration by the capture thread.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FlagSnapshot {
    pub color_streaming: bool,
    pub depth_streaming: bool,
    pub scan_enabled: bool,
    pub tracking_enabled: bool,
}

impl SharedState {
    pub fn new() -> Self {
        let (scan_requests_tx, scan_requests_rx) = crossbeam_channel::bounded(SCAN_QUEUE_CAPACITY);
        SharedState {
            running: AtomicBool::new(false),
            color_streaming: AtomicBool::new(false),
            depth_streaming: AtomicBool::new(false),
            scan_enabled: AtomicBool::new(false),
            tracking_enabled: AtomicBool::new(false),
            scan_start_requested: AtomicBool::new(false),
            scan_stop_requested: AtomicBool::new(false),
            scan_completed: AtomicBool::new(false),
            acquire_failures: AtomicU64::new(0),
            scan_requests_tx,
            scan_requests_rx,
            scan_error: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> FlagSnapshot {
        FlagSnapshot {
            color_streaming: self.color_streaming.load(Ordering::Relaxed),
            depth_streaming: self.depth_streaming.load(Ordering::Relaxed),
            scan_enabled: self.scan_enabled.load(Ordering::Relaxed),
            tracking_enabled: self.tracking_enabled.load(Ordering::Relaxed),
        }
    }

    /// Record a reconstruction failure for the controller to pick up.
    pub fn set_scan_error(&self, message: String) {
        log::error!("scan reconstruction failed: {}", message);
        let mut slot = match self.scan_error.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(message);
    }

    /// Take the last recorded reconstruction error, clearing the slot.
    pub fn take_scan_error(&self) -> Option<String> {
        let mut slot = match self.scan_error.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_start_false() {
        let shared = SharedState::new();
        let snapshot = shared.snapshot();
        assert!(!snapshot.color_streaming);
        assert!(!snapshot.depth_streaming);
        assert!(!snapshot.scan_enabled);
        assert!(!snapshot.tracking_enabled);
        assert!(!shared.running.load(Ordering::Relaxed));
    }

    #[test]
    fn test_scan_error_take_clears() {
        let shared = SharedState::new();
        assert_eq!(shared.take_scan_error(), None);
        shared.set_scan_error("boom".into());
        assert_eq!(shared.take_scan_error(), Some("boom".into()));
        assert_eq!(shared.take_scan_error(), None);
    }
}
