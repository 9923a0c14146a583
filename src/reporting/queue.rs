//! Bounded FIFO of classified errors.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::reporting::classified::{ClassifiedError, ErrorStats};

/// Bounded error queue. `len() <= capacity()` always holds.
#[derive(Debug)]
pub struct ErrorQueue {
    entries: Mutex<VecDeque<ClassifiedError>>,
    capacity: usize,
}

impl ErrorQueue {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    // No critical section can leave the deque half-updated; poison is ignored.
    fn lock(&self) -> MutexGuard<'_, VecDeque<ClassifiedError>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append, evicting the oldest entry when over capacity.
    pub fn push(&self, error: ClassifiedError) -> Option<ClassifiedError> {
        let mut entries = self.lock();
        entries.push_back(error);
        if entries.len() > self.capacity {
            entries.pop_front()
        } else {
            None
        }
    }

    /// Oldest-first copy of the current contents.
    pub fn snapshot(&self) -> Vec<ClassifiedError> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Counts by severity and kind in a single pass.
    pub fn stats(&self) -> ErrorStats {
        let entries = self.lock();
        let mut stats = ErrorStats::default();
        for error in entries.iter() {
            stats.record(error);
        }
        stats
    }
}

impl Default for ErrorQueue {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{ErrorKind, Severity};
    use chrono::Utc;
    use uuid::Uuid;

    fn error(message: String, severity: Severity, kind: ErrorKind) -> ClassifiedError {
        ClassifiedError {
            id: Uuid::new_v4(),
            message,
            stack: None,
            timestamp: Utc::now(),
            source_url: None,
            user_agent: "test".into(),
            context: None,
            status: None,
            kind,
            severity,
            request: None,
        }
    }

    #[test]
    fn test_keeps_most_recent_in_order() {
        let queue = ErrorQueue::new(50);
        for i in 0..60 {
            queue.push(error(format!("e{}", i), Severity::Medium, ErrorKind::Unknown));
            assert!(queue.len() <= 50);
        }

        let messages: Vec<_> = queue.snapshot().into_iter().map(|e| e.message).collect();
        let expected: Vec<_> = (10..60).map(|i| format!("e{}", i)).collect();
        assert_eq!(messages, expected);
    }

    #[test]
    fn test_push_returns_evicted() {
        let queue = ErrorQueue::new(1);
        assert!(queue.push(error("a".into(), Severity::Low, ErrorKind::Http)).is_none());
        let evicted = queue.push(error("b".into(), Severity::Low, ErrorKind::Http)).unwrap();
        assert_eq!(evicted.message, "a");
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let queue = ErrorQueue::new(5);
        queue.push(error("a".into(), Severity::Low, ErrorKind::Http));
        let snapshot = queue.snapshot();
        queue.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stats() {
        let queue = ErrorQueue::new(10);
        queue.push(error("a".into(), Severity::High, ErrorKind::Http));
        queue.push(error("b".into(), Severity::High, ErrorKind::Network));
        queue.push(error("c".into(), Severity::Critical, ErrorKind::Application));

        let stats = queue.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.severity(Severity::High), 2);
        assert_eq!(stats.severity(Severity::Critical), 1);
        assert_eq!(stats.kind(ErrorKind::Network), 1);
        assert_eq!(stats.kind(ErrorKind::Unknown), 0);
    }
}
