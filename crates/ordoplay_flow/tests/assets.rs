// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for authored flow assets

use ordoplay_flow::nodes::{Counter, LogMessage, Reroute};
use ordoplay_flow::{
    find_nodes_of_type, ActivationState, FinishPolicy, FlowAsset, FlowGraph, NodeId, NodeRegistry,
    SignalMode,
};

const ENTRY: &str = "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a01";
const COUNTER: &str = "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a02";
const SKIPPED: &str = "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a03";
const DONE: &str = "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a04";

const ASSET: &str = r#"
FlowAsset(
    version: 1,
    name: "Door",
    finish_policy: Complete,
    nodes: [
        (
            id: "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a01",
            class: "Reroute",
            connections: {
                "Out": (node_id: "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a02", pin_name: "In"),
            },
        ),
        (
            id: "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a02",
            class: "Counter",
            properties: { "goal": "1" },
            connections: {
                "Goal": (node_id: "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a03", pin_name: "In"),
            },
        ),
        (
            id: "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a03",
            class: "Reroute",
            signal_mode: PassThrough,
            connections: {
                "Out": (node_id: "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a04", pin_name: "In"),
            },
        ),
        (
            id: "6f1c9c2e-0c7d-4c53-9d6e-5d1f7b1e0a04",
            class: "LogMessage",
            properties: { "message": "Door opened" },
        ),
    ],
)
"#;

fn id(s: &str) -> NodeId {
    s.parse().unwrap()
}

fn door() -> FlowGraph {
    let asset = FlowAsset::from_ron(ASSET).unwrap();
    FlowGraph::from_asset(&asset, &NodeRegistry::with_builtin_nodes()).unwrap()
}

#[test]
fn test_asset_runs_to_completion() {
    let mut graph = door();
    assert_eq!(graph.name, "Door");
    assert_eq!(graph.finish_policy(), FinishPolicy::Complete);

    graph.start_flow(id(ENTRY)).unwrap();

    let log = graph.node_as::<LogMessage>(id(DONE)).unwrap();
    assert_eq!(log.message(), "Door opened");
    assert_eq!(log.emitted(), 1);

    let skipped = graph.node(id(SKIPPED)).unwrap();
    assert_eq!(skipped.base().signal_mode(), SignalMode::PassThrough);
    assert_eq!(skipped.base().activation_state(), ActivationState::Completed);

    assert_eq!(
        graph.node(id(COUNTER)).unwrap().base().activation_state(),
        ActivationState::Completed
    );
    assert!(graph.is_finished());
}

#[test]
fn test_search_from_entry() {
    let graph = door();

    let mut found = Vec::new();
    find_nodes_of_type::<Reroute>(&graph, id(ENTRY), 8, &mut found);
    assert_eq!(found, [id(ENTRY), id(SKIPPED)]);

    found.clear();
    find_nodes_of_type::<Counter>(&graph, id(SKIPPED), 8, &mut found);
    assert!(found.is_empty());
}

#[test]
fn test_asset_file_round_trip() {
    let asset = FlowAsset::from_ron(ASSET).unwrap();
    let path = std::env::temp_dir().join(format!("flow_asset_{}.ron", NodeId::new()));

    asset.save(&path).unwrap();
    let loaded = FlowAsset::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, asset);
}
