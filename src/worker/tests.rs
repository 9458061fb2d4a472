//! Worker Module Tests
//!
//! Covers task processing: range extraction, the part-index contract and
//! failure behavior. The pull/heartbeat loops are transport glue and are
//! exercised against a live leader, not here.

#[cfg(test)]
mod tests {
    use crate::control::types::NoPending;
    use crate::control::vitals::NodeVitals;
    use crate::dataset::store::RowStore;
    use crate::scheduler::types::Task;
    use crate::worker::runner::{WorkerRuntime, SLOWDOWN_ENV};
    use std::sync::Arc;

    fn worker(node_id: &str) -> Arc<WorkerRuntime> {
        WorkerRuntime::new(
            node_id,
            "green",
            1,
            "http://127.0.0.1:1".to_string(),
            NodeVitals::new(node_id, Arc::new(NoPending)),
        )
    }

    fn rows(n: usize) -> RowStore {
        RowStore::from_rows("id,value", (0..n).map(|i| format!("{},{}", i, i * 2)).collect())
    }

    fn task(chunk_id: u32, start_row: u64, num_rows: u64) -> Task {
        Task {
            request_id: "q1".to_string(),
            chunk_id,
            start_row,
            num_rows,
            dataset_key: "test.csv".to_string(),
        }
    }

    #[tokio::test]
    async fn test_process_task_extracts_requested_range() {
        let w = worker("C");
        w.dataset.seed("test.csv", rows(10)).await;

        let result = w.process_task(&task(1, 2, 3)).await;

        let text = String::from_utf8(result.payload).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["id,value", "2,4", "3,6", "4,8"]);
        assert_eq!(result.request_id, "q1");
    }

    #[tokio::test]
    async fn test_part_index_is_chunk_id_not_derived_from_rows() {
        let w = worker("C");
        w.dataset.seed("test.csv", rows(10)).await;

        // start/count deliberately misaligned with the chunk id; the part
        // index must still be the chunk id.
        let result = w.process_task(&task(7, 0, 5)).await;

        assert_eq!(result.part_index, 7);
    }

    #[tokio::test]
    async fn test_process_task_records_latency_for_heartbeat() {
        let w = worker("C");
        w.dataset.seed("test.csv", rows(100)).await;

        assert_eq!(w.last_task_ms(), 0.0);
        w.process_task(&task(0, 0, 100)).await;

        assert!(w.last_task_ms() >= 0.0);
    }

    #[tokio::test]
    async fn test_dataset_failure_yields_empty_chunk() {
        let w = worker("C");

        let result = w.process_task(&task(2, 0, 10)).await;

        assert_eq!(result.part_index, 2);
        assert!(result.payload.is_empty());
    }

    #[tokio::test]
    async fn test_zero_row_task_yields_empty_payload() {
        let w = worker("C");
        w.dataset.seed("test.csv", rows(10)).await;

        let result = w.process_task(&task(0, 4, 0)).await;

        assert!(result.payload.is_empty());
    }

    #[tokio::test]
    async fn test_slowdown_only_applies_to_worker_d() {
        // Serialized in one test: the env var is process-global.
        std::env::set_var(SLOWDOWN_ENV, "120");

        let slow = worker("D");
        let fast = worker("C");
        slow.dataset.seed("test.csv", rows(5)).await;
        fast.dataset.seed("test.csv", rows(5)).await;

        let started = std::time::Instant::now();
        fast.process_task(&task(0, 0, 5)).await;
        assert!(started.elapsed() < std::time::Duration::from_millis(100));

        let started = std::time::Instant::now();
        slow.process_task(&task(0, 0, 5)).await;
        assert!(started.elapsed() >= std::time::Duration::from_millis(120));

        std::env::remove_var(SLOWDOWN_ENV);
    }
}
