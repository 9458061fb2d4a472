//! Gateway Module Tests
//!
//! Covers the session layer (blocking indexed reads, the poll cursor,
//! idempotence, eviction) and the fan-out accounting that turns chunk
//! arrivals into full/partial/empty outcomes.

#[cfg(test)]
mod tests {
    use crate::gateway::fanout::{classify, process_session, Dispatcher, FanoutOutcome, TeamEndpoint};
    use crate::gateway::session::{GetNextResult, SessionStore};
    use crate::scheduler::protocol::PushChunkRequest;
    use crate::scheduler::types::{ChunkResult, Request};
    use std::time::Duration;

    fn chunk(request_id: &str, part_index: u32) -> ChunkResult {
        ChunkResult {
            request_id: request_id.to_string(),
            part_index,
            payload: format!("part-{}", part_index).into_bytes(),
        }
    }

    fn push(request_id: &str, part_index: u32, team: &str) -> PushChunkRequest {
        PushChunkRequest {
            from: "B".to_string(),
            team: team.to_string(),
            result: chunk(request_id, part_index),
        }
    }

    fn request(id: &str, green: bool, pink: bool) -> Request {
        Request {
            request_id: id.to_string(),
            dataset_key: "test.csv".to_string(),
            need_green: green,
            need_pink: pink,
        }
    }

    // ============================================================
    // SESSION LIFECYCLE
    // ============================================================

    #[test]
    fn test_session_ids_are_unique() {
        let store = SessionStore::new();

        let a = store.create_session();
        let b = store.create_session();

        assert_ne!(a, b);
        assert_eq!(store.session_count(), 2);
    }

    #[tokio::test]
    async fn test_get_next_returns_buffered_chunk() {
        let store = SessionStore::new();
        let sid = store.create_session();
        store.add_chunk(&sid, chunk(&sid, 0));

        match store.get_next(&sid, 0).await {
            GetNextResult::Chunk { payload, has_more } => {
                assert_eq!(payload, b"part-0");
                assert!(has_more, "session still open, more may come");
            }
            other => panic!("expected chunk, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_next_is_idempotent() {
        let store = SessionStore::new();
        let sid = store.create_session();
        store.add_chunk(&sid, chunk(&sid, 0));
        store.add_chunk(&sid, chunk(&sid, 1));
        store.complete_session(&sid);

        let first = store.get_next(&sid, 0).await;
        let second = store.get_next(&sid, 0).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_next_blocks_until_chunk_arrives() {
        let store = SessionStore::new();
        let sid = store.create_session();

        let writer = {
            let store = store.clone();
            let sid = sid.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                store.add_chunk(&sid, chunk(&sid, 0));
            })
        };

        let result = store.get_next(&sid, 0).await;
        writer.await.unwrap();

        assert!(matches!(result, GetNextResult::Chunk { .. }));
    }

    #[tokio::test]
    async fn test_get_next_on_empty_complete_session_ends_immediately() {
        let store = SessionStore::new();
        let sid = store.create_session();
        store.complete_session(&sid);

        let started = std::time::Instant::now();
        let result = store.get_next(&sid, 0).await;

        assert_eq!(result, GetNextResult::End);
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_get_next_unknown_session() {
        let store = SessionStore::new();
        assert_eq!(store.get_next("missing", 0).await, GetNextResult::NotFound);
    }

    #[tokio::test]
    async fn test_get_next_times_out_on_open_session() {
        let store = SessionStore::with_timings(Duration::from_millis(80), Duration::from_secs(300));
        let sid = store.create_session();

        let result = store.get_next(&sid, 0).await;

        assert_eq!(result, GetNextResult::TimedOut);
    }

    #[tokio::test]
    async fn test_get_next_has_more_goes_false_at_final_chunk() {
        let store = SessionStore::new();
        let sid = store.create_session();
        store.add_chunk(&sid, chunk(&sid, 0));
        store.add_chunk(&sid, chunk(&sid, 1));
        store.complete_session(&sid);

        match store.get_next(&sid, 0).await {
            GetNextResult::Chunk { has_more, .. } => assert!(has_more),
            other => panic!("unexpected {:?}", other),
        }
        match store.get_next(&sid, 1).await {
            GetNextResult::Chunk { has_more, .. } => assert!(!has_more),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_chunks_after_complete_are_discarded() {
        let store = SessionStore::new();
        let sid = store.create_session();
        store.add_chunk(&sid, chunk(&sid, 0));
        store.complete_session(&sid);

        assert!(!store.add_chunk(&sid, chunk(&sid, 1)));
        assert_eq!(store.chunk_count(&sid), Some(1));
    }

    #[test]
    fn test_close_erases_session() {
        let store = SessionStore::new();
        let sid = store.create_session();

        assert!(store.close(&sid));
        assert!(!store.close(&sid));
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_sweep_evicts_only_idle_sessions() {
        let store = SessionStore::with_timings(Duration::from_secs(185), Duration::from_millis(40));
        let idle = store.create_session();
        let active = store.create_session();

        std::thread::sleep(Duration::from_millis(70));
        // Touch one session; the other stays idle past the timeout.
        store.poll_next(&active);

        let evicted = store.sweep_idle();

        assert_eq!(evicted, 1);
        assert_eq!(store.chunk_count(&idle), None);
        assert!(store.chunk_count(&active).is_some());
    }

    // ============================================================
    // POLL CURSOR
    // ============================================================

    #[test]
    fn test_poll_next_on_empty_session_does_not_advance() {
        let store = SessionStore::new();
        let sid = store.create_session();

        let first = store.poll_next(&sid).unwrap();
        assert!(!first.ready);
        assert!(first.has_more, "open session may still produce chunks");

        store.add_chunk(&sid, chunk(&sid, 0));

        // The cursor did not move on the not-ready poll.
        let second = store.poll_next(&sid).unwrap();
        assert!(second.ready);
        assert_eq!(second.payload, b"part-0");
    }

    #[test]
    fn test_poll_next_after_complete_reports_no_more() {
        let store = SessionStore::new();
        let sid = store.create_session();
        store.add_chunk(&sid, chunk(&sid, 0));
        store.complete_session(&sid);

        let first = store.poll_next(&sid).unwrap();
        assert!(first.ready);
        assert!(!first.has_more);

        let second = store.poll_next(&sid).unwrap();
        assert!(!second.ready);
        assert!(!second.has_more);
    }

    #[test]
    fn test_poll_next_unknown_session() {
        let store = SessionStore::new();
        assert!(store.poll_next("missing").is_none());
    }

    #[tokio::test]
    async fn test_poll_next_advances_exactly_once_per_arrival() {
        let store = SessionStore::new();
        let sid = store.create_session();

        // Chunks arrive at t = 0, 50, 100 ms.
        store.add_chunk(&sid, chunk(&sid, 0));
        let writer = {
            let store = store.clone();
            let sid = sid.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                store.add_chunk(&sid, chunk(&sid, 1));
                tokio::time::sleep(Duration::from_millis(50)).await;
                store.add_chunk(&sid, chunk(&sid, 2));
            })
        };

        // Polls at t = 25, 75, 125, 200 ms see exactly one new chunk each,
        // then not-ready.
        tokio::time::sleep(Duration::from_millis(25)).await;
        let p0 = store.poll_next(&sid).unwrap();
        assert!(p0.ready);
        assert_eq!(p0.payload, b"part-0");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let p1 = store.poll_next(&sid).unwrap();
        assert!(p1.ready);
        assert_eq!(p1.payload, b"part-1");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let p2 = store.poll_next(&sid).unwrap();
        assert!(p2.ready);
        assert_eq!(p2.payload, b"part-2");

        tokio::time::sleep(Duration::from_millis(75)).await;
        let p3 = store.poll_next(&sid).unwrap();
        assert!(!p3.ready);

        writer.await.unwrap();
    }

    // ============================================================
    // FAN-OUT ACCOUNTING
    // ============================================================

    #[test]
    fn test_classify_full_success() {
        assert_eq!(classify(6, 6, 2, 0, 2), FanoutOutcome::Full);
    }

    #[test]
    fn test_classify_partial_on_missing_chunks() {
        assert_eq!(classify(6, 4, 2, 0, 2), FanoutOutcome::Partial);
    }

    #[test]
    fn test_classify_partial_when_one_team_silent() {
        // Count met by duplicates from one team, but only one team spoke.
        assert_eq!(classify(6, 6, 2, 0, 1), FanoutOutcome::Partial);
        // One team failed outright; the other delivered.
        assert_eq!(classify(3, 3, 1, 1, 1), FanoutOutcome::Partial);
    }

    #[test]
    fn test_classify_empty_on_zero_chunks() {
        assert_eq!(classify(6, 0, 2, 0, 0), FanoutOutcome::Empty);
        assert_eq!(classify(0, 0, 0, 2, 0), FanoutOutcome::Empty);
    }

    #[test]
    fn test_ingest_feeds_session_and_board() {
        let store = SessionStore::new();
        let dispatcher = Dispatcher::new(vec![]);
        let sid = store.create_session();

        dispatcher.ingest(push(&sid, 0, "green"), &store);

        assert_eq!(store.chunk_count(&sid), Some(1));
        assert_eq!(dispatcher.board.count(&sid), 1);
    }

    #[test]
    fn test_ingest_discards_for_unknown_or_complete_session() {
        let store = SessionStore::new();
        let dispatcher = Dispatcher::new(vec![]);

        dispatcher.ingest(push("missing", 0, "green"), &store);
        assert_eq!(dispatcher.board.count("missing"), 0);

        let sid = store.create_session();
        store.complete_session(&sid);
        dispatcher.ingest(push(&sid, 0, "green"), &store);
        assert_eq!(dispatcher.board.count(&sid), 0);
    }

    #[tokio::test]
    async fn test_run_with_no_selected_team_is_empty() {
        let dispatcher = Dispatcher::with_wait(
            vec![TeamEndpoint {
                node_id: "B".to_string(),
                team: "green".to_string(),
                url: "http://127.0.0.1:1".to_string(),
            }],
            Duration::from_millis(100),
        );

        let report = dispatcher.run(&request("q1", false, true)).await;

        assert_eq!(report.outcome, FanoutOutcome::Empty);
        assert_eq!(report.expected, 0);
    }

    #[tokio::test]
    async fn test_run_with_unreachable_team_times_out_empty() {
        let dispatcher = Dispatcher::with_wait(
            vec![TeamEndpoint {
                node_id: "B".to_string(),
                team: "green".to_string(),
                url: "http://127.0.0.1:1".to_string(),
            }],
            Duration::from_millis(150),
        );

        let report = dispatcher.run(&request("q1", true, false)).await;

        assert_eq!(report.outcome, FanoutOutcome::Empty);
        assert_eq!(report.received, 0);
    }

    #[tokio::test]
    async fn test_process_session_always_completes_session() {
        let store = SessionStore::new();
        let dispatcher = Dispatcher::with_wait(vec![], Duration::from_millis(100));
        let sid = store.create_session();

        process_session(
            dispatcher,
            store.clone(),
            sid.clone(),
            request("client-q", true, true),
        )
        .await;

        // Empty outcome still completes (not erases) the session.
        assert_eq!(store.get_next(&sid, 0).await, GetNextResult::End);
    }
}
