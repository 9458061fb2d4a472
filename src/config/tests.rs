//! Config Module Tests
//!
//! Validates parsing of the topology document and the role/team lookup
//! helpers the boot path and the gateway fan-out rely on.

#[cfg(test)]
mod tests {
    use crate::config::loader::load_config;
    use crate::config::types::{NetworkConfig, NodeRole};

    fn sample_document() -> &'static str {
        r#"{
            "nodes": [
                {"id": "A", "role": "LEADER", "host": "127.0.0.1", "port": 50050, "team": "none", "capacity_score": 1},
                {"id": "B", "role": "TEAM_LEADER", "host": "127.0.0.1", "port": 50051, "team": "green", "capacity_score": 1},
                {"id": "C", "role": "WORKER", "host": "127.0.0.1", "port": 50052, "team": "green", "capacity_score": 10},
                {"id": "D", "role": "WORKER", "host": "127.0.0.1", "port": 50053, "team": "pink"},
                {"id": "E", "role": "TEAM_LEADER", "host": "127.0.0.1", "port": 50054, "team": "pink", "capacity_score": 1},
                {"id": "F", "role": "WORKER", "host": "127.0.0.1", "port": 50055, "team": "pink", "capacity_score": 2}
            ],
            "overlay": [["A", "B"], ["A", "E"], ["B", "C"], ["E", "D"], ["E", "F"]],
            "client_gateway": "A",
            "shared_memory": {
                "segments": [
                    {"name": "team_green", "members": ["B", "C"]},
                    {"name": "team_pink", "members": ["E", "D", "F"]}
                ]
            }
        }"#
    }

    fn parse_sample() -> NetworkConfig {
        serde_json::from_str(sample_document()).expect("sample document should parse")
    }

    #[test]
    fn test_parse_full_document() {
        let cfg = parse_sample();

        assert_eq!(cfg.nodes.len(), 6);
        assert_eq!(cfg.client_gateway, "A");
        assert_eq!(cfg.overlay.len(), 5);
        assert_eq!(cfg.shared_memory.segments.len(), 2);
        assert_eq!(cfg.shared_memory.segments[1].members, vec!["E", "D", "F"]);
    }

    #[test]
    fn test_roles_deserialize_from_screaming_case() {
        let cfg = parse_sample();

        assert_eq!(cfg.node("A").unwrap().role, NodeRole::Leader);
        assert_eq!(cfg.node("B").unwrap().role, NodeRole::TeamLeader);
        assert_eq!(cfg.node("C").unwrap().role, NodeRole::Worker);
    }

    #[test]
    fn test_capacity_score_defaults_to_one() {
        let cfg = parse_sample();

        assert_eq!(cfg.node("C").unwrap().capacity_score, 10);
        assert_eq!(cfg.node("D").unwrap().capacity_score, 1);
    }

    #[test]
    fn test_team_lookups_preserve_document_order() {
        let cfg = parse_sample();

        let leaders: Vec<&str> = cfg.team_leaders().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(leaders, vec!["B", "E"]);

        let pink: Vec<&str> = cfg
            .workers_in_team("pink")
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(pink, vec!["D", "F"]);

        assert_eq!(cfg.leader_of_team("green").unwrap().id, "B");
        assert!(cfg.leader_of_team("none").is_none());
    }

    #[test]
    fn test_base_url() {
        let cfg = parse_sample();
        assert_eq!(cfg.node("B").unwrap().base_url(), "http://127.0.0.1:50051");
    }

    #[test]
    fn test_unknown_gateway_rejected() {
        let dir = std::env::temp_dir().join("query_fabric_cfg_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad_gateway.json");

        let doc = sample_document().replace("\"client_gateway\": \"A\"", "\"client_gateway\": \"Z\"");
        std::fs::write(&path, doc).unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("client_gateway"));
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = load_config(std::path::Path::new("/nonexistent/network_setup.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
