//! Control Module Tests
//!
//! Covers the node-state thresholds and the vitals bookkeeping behind the
//! Status report.

#[cfg(test)]
mod tests {
    use crate::control::types::{NoPending, NodeState, PendingSource};
    use crate::control::vitals::NodeVitals;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedPending(AtomicUsize);

    impl PendingSource for FixedPending {
        fn pending(&self) -> usize {
            self.0.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn test_state_thresholds() {
        assert_eq!(NodeState::from_pending(0), NodeState::Idle);
        assert_eq!(NodeState::from_pending(1), NodeState::Busy);
        assert_eq!(NodeState::from_pending(4), NodeState::Busy);
        assert_eq!(NodeState::from_pending(5), NodeState::Overloaded);
        assert_eq!(NodeState::from_pending(50), NodeState::Overloaded);
    }

    #[test]
    fn test_state_strings_match_wire_format() {
        assert_eq!(NodeState::Idle.as_str(), "IDLE");
        assert_eq!(NodeState::Busy.as_str(), "BUSY");
        assert_eq!(NodeState::Overloaded.as_str(), "OVERLOADED");
        assert_eq!(NodeState::ShuttingDown.as_str(), "SHUTTING_DOWN");
    }

    #[test]
    fn test_vitals_follow_pending_source() {
        let pending = Arc::new(FixedPending(AtomicUsize::new(0)));
        let vitals = NodeVitals::new("B", pending.clone());

        assert_eq!(vitals.state(), NodeState::Idle);

        pending.0.store(3, Ordering::Relaxed);
        assert_eq!(vitals.state(), NodeState::Busy);

        pending.0.store(9, Ordering::Relaxed);
        assert_eq!(vitals.state(), NodeState::Overloaded);
    }

    #[test]
    fn test_shutdown_flag_wins_over_pending() {
        let vitals = NodeVitals::new("C", Arc::new(NoPending));

        vitals.begin_shutdown();

        assert!(vitals.is_shutting_down());
        assert_eq!(vitals.state(), NodeState::ShuttingDown);
    }

    #[test]
    fn test_request_counter() {
        let vitals = NodeVitals::new("A", Arc::new(NoPending));

        assert_eq!(vitals.requests_processed(), 0);
        vitals.record_request();
        vitals.record_request();
        assert_eq!(vitals.requests_processed(), 2);
    }

    #[tokio::test]
    async fn test_exit_signal_wakes_waiter() {
        let vitals = NodeVitals::new("A", Arc::new(NoPending));

        let waiter = {
            let vitals = vitals.clone();
            tokio::spawn(async move {
                vitals.exit_requested().await;
            })
        };

        // Give the waiter a chance to register before signalling.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        vitals.signal_exit();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("exit signal should wake the waiter")
            .unwrap();
    }
}
