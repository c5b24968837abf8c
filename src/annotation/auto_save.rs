//! Auto-save manager driven by operation count.
//!
//! Labeling is bursty and keyboard-driven, so saves are triggered by the number
//! of labeling operations since the last save rather than by a timer.

/// Decides when accumulated labeling operations should be flushed to disk.
///
/// Every counted operation advances a counter; once it reaches the interval
/// a save is due. A failed save keeps the state dirty and restarts the
/// counter, so the next attempt happens one full interval later instead of on
/// every subsequent keystroke.
#[derive(Debug)]
pub struct AutoSaveManager {
    /// Operations between saves (0 disables auto-save).
    interval: usize,

    /// Operations counted since the last save attempt.
    pending_ops: usize,

    /// Whether there are unsaved changes.
    dirty: bool,

    /// Consecutive failed save attempts.
    failures: usize,
}

impl AutoSaveManager {
    /// Create a manager that saves every `interval` operations.
    pub fn new(interval: usize) -> Self {
        Self {
            interval,
            pending_ops: 0,
            dirty: false,
            failures: 0,
        }
    }

    /// Check if auto-save is enabled.
    pub fn is_enabled(&self) -> bool {
        self.interval > 0
    }

    /// Operations between saves.
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Record one labeling operation. Returns true if a save is now due.
    pub fn record_operation(&mut self) -> bool {
        self.pending_ops += 1;
        self.dirty = true;
        log::trace!("Auto-save: {} operations pending", self.pending_ops);
        self.should_save()
    }

    /// Mark that state changed without counting toward the interval.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Check if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Operations counted since the last save attempt.
    pub fn pending_operations(&self) -> usize {
        self.pending_ops
    }

    /// Check if we should save now.
    pub fn should_save(&self) -> bool {
        self.is_enabled() && self.dirty && self.pending_ops >= self.interval
    }

    /// Mark that a save completed successfully.
    pub fn mark_saved(&mut self) {
        self.pending_ops = 0;
        self.dirty = false;
        self.failures = 0;
        log::trace!("Auto-save: marked saved");
    }

    /// Mark that a save failed.
    ///
    /// This keeps the dirty flag set so we'll try again after another interval.
    pub fn mark_save_failed(&mut self) {
        self.pending_ops = 0;
        self.failures += 1;
        log::trace!("Auto-save: marked save failed ({} in a row)", self.failures);
    }

    /// Consecutive failed save attempts.
    pub fn consecutive_failures(&self) -> usize {
        self.failures
    }
}

impl Default for AutoSaveManager {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_AUTO_SAVE_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let manager = AutoSaveManager::new(3);
        assert!(!manager.is_dirty());
        assert!(!manager.should_save());
        assert!(manager.is_enabled());
        assert_eq!(manager.consecutive_failures(), 0);
    }

    #[test]
    fn test_saves_at_interval() {
        let mut manager = AutoSaveManager::new(3);
        assert!(!manager.record_operation());
        assert!(!manager.record_operation());
        assert!(manager.record_operation());

        manager.mark_saved();
        assert!(!manager.is_dirty());
        assert_eq!(manager.pending_operations(), 0);
    }

    #[test]
    fn test_failed_save_retries_next_interval() {
        let mut manager = AutoSaveManager::new(2);
        manager.record_operation();
        assert!(manager.record_operation());

        manager.mark_save_failed();
        assert!(manager.is_dirty());
        assert_eq!(manager.consecutive_failures(), 1);

        // Not retried on the very next operation
        assert!(!manager.record_operation());
        assert!(manager.record_operation());

        manager.mark_saved();
        assert_eq!(manager.consecutive_failures(), 0);
    }

    #[test]
    fn test_disabled() {
        let mut manager = AutoSaveManager::new(0);
        assert!(!manager.is_enabled());
        for _ in 0..100 {
            assert!(!manager.record_operation());
        }
        assert!(manager.is_dirty());
    }

    #[test]
    fn test_mark_dirty_does_not_count() {
        let mut manager = AutoSaveManager::new(1);
        manager.mark_dirty();
        assert!(manager.is_dirty());
        assert!(!manager.should_save());
    }
}
