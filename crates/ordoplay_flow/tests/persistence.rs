// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for saving and restoring running graphs

mod common;

use common::{recorder, recording_graph, Recorder};
use ordoplay_flow::nodes::Counter;
use ordoplay_flow::persistence::encode_state;
use ordoplay_flow::{
    ActivationState, FlowAsset, FlowGraph, FlowNode, FlowSaveData, MemorySaveStore, NodeDefinition,
    NodeId, NodeRegistry, NodeSaveData, SaveStore, SignalMode,
};

/// Two recorders with fixed IDs, so a fresh graph can load the save
fn recorder_pair(ids: [NodeId; 2]) -> FlowGraph {
    let mut graph = recording_graph("Pair");
    graph.add_node(Recorder::new().with_id(ids[0]));
    graph.add_node(Recorder::new().with_id(ids[1]));
    graph.connect(ids[0], "Out", ids[1], "In").unwrap();
    graph
}

#[test]
fn test_save_covers_active_nodes() {
    let ids = [NodeId::new(), NodeId::new()];
    let mut graph = recorder_pair(ids);
    graph.trigger_input(ids[0], "In");

    let data = graph.save_instance().unwrap();

    assert_eq!(data.graph_name, "Pair");
    assert_eq!(data.nodes.len(), 1);
    assert!(data.node(ids[0]).is_some());
    assert!(data.node(ids[1]).is_none());
    assert_eq!(recorder(&graph, ids[0]).saves, 1);
}

#[test]
fn test_round_trip_restores_state() {
    let ids = [NodeId::new(), NodeId::new()];
    let mut graph = recorder_pair(ids);
    graph.trigger_input(ids[0], "In");
    graph.trigger_input(ids[0], "In");
    let data = graph.save_instance().unwrap();

    let mut restored = recorder_pair(ids);
    restored.load_instance(&data).unwrap();

    let node = recorder(&restored, ids[0]);
    assert_eq!(node.base().activation_state(), ActivationState::Active);
    assert_eq!(node.value, 2);
    assert_eq!(node.loads, 1);
    // activation hooks do not run again on load
    assert_eq!(node.activations, 0);
    assert!(restored.is_node_active(ids[0]));
    assert!(!restored.is_node_active(ids[1]));
}

#[test]
fn test_corrupt_record_is_all_or_nothing() {
    let ids = [NodeId::new(), NodeId::new()];
    let mut graph = recorder_pair(ids);
    graph.trigger_input(ids[0], "In");
    graph.trigger_input(ids[1], "In");
    let mut data = graph.save_instance().unwrap();
    assert_eq!(data.nodes.len(), 2);
    data.nodes[1].data = encode_state(&0u8).unwrap();

    let mut restored = recorder_pair(ids);
    assert!(restored.load_instance(&data).is_err());

    for id in ids {
        let node = recorder(&restored, id);
        assert_eq!(node.base().activation_state(), ActivationState::NeverActivated);
        assert_eq!(node.value, 0);
        assert_eq!(node.loads, 0);
        assert!(!restored.is_node_active(id));
    }
}

#[test]
fn test_disabled_node_loads_terminal() {
    let ids = [NodeId::new(), NodeId::new()];
    let mut graph = recorder_pair(ids);
    graph.trigger_input(ids[0], "In");
    let data = graph.save_instance().unwrap();

    let mut restored = recorder_pair(ids);
    restored
        .node_mut(ids[0])
        .unwrap()
        .base_mut()
        .set_signal_mode(SignalMode::Disabled)
        .unwrap();
    restored.load_instance(&data).unwrap();

    let node = recorder(&restored, ids[0]);
    assert!(node.base().activation_state().is_terminal());
    assert_eq!(node.loads, 0);
    assert_eq!(node.cleanups, 1);
    assert!(restored.is_finished());
}

#[test]
fn test_pass_through_node_forwards_on_load() {
    let ids = [NodeId::new(), NodeId::new()];
    let mut graph = recorder_pair(ids);
    graph.trigger_input(ids[0], "In");
    let data = graph.save_instance().unwrap();

    let mut restored = recorder_pair(ids);
    restored
        .node_mut(ids[0])
        .unwrap()
        .base_mut()
        .set_signal_mode(SignalMode::PassThrough)
        .unwrap();
    restored.load_instance(&data).unwrap();

    let node = recorder(&restored, ids[0]);
    assert!(node.base().activation_state().is_terminal());
    assert_eq!(node.passes, 1);
    assert_eq!(recorder(&restored, ids[1]).executed, ["In"]);
}

#[test]
fn test_save_data_for_missing_node_is_skipped() {
    let ids = [NodeId::new(), NodeId::new()];
    let mut graph = recorder_pair(ids);
    graph.trigger_input(ids[0], "In");
    let data = graph.save_instance().unwrap();

    let mut other = recorder_pair([NodeId::new(), NodeId::new()]);
    other.load_instance(&data).unwrap();
    assert!(other.is_finished());
}

#[test]
fn test_corrupt_buffer_is_an_error() {
    let ids = [NodeId::new(), NodeId::new()];
    let mut graph = recorder_pair(ids);
    let mut data = FlowSaveData::default();
    data.nodes.push(NodeSaveData {
        node_id: ids[0],
        data: vec![1, 2, 3],
    });

    assert!(graph.load_instance(&data).is_err());
}

#[test]
fn test_memory_store() {
    let ids = [NodeId::new(), NodeId::new()];
    let mut graph = recorder_pair(ids);
    graph.trigger_input(ids[0], "In");
    graph.trigger_input(ids[1], "In");

    let mut store = MemorySaveStore::new();
    assert_eq!(graph.save_to_store(&mut store).unwrap(), 2);
    assert_eq!(store.len(), 2);
    assert!(store.remove(ids[1]).is_some());

    let mut restored = recorder_pair(ids);
    assert_eq!(restored.load_from_store(&store).unwrap(), 1);
    assert!(restored.is_node_active(ids[0]));
    assert!(!restored.is_node_active(ids[1]));
}

#[test]
fn test_save_file_round_trip() {
    let ids = [NodeId::new(), NodeId::new()];
    let mut graph = recorder_pair(ids);
    graph.trigger_input(ids[0], "In");
    let data = graph.save_instance().unwrap();

    let path = std::env::temp_dir().join(format!("flow_save_{}.ron", NodeId::new()));
    data.save(&path).unwrap();
    let loaded = FlowSaveData::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(loaded, data);

    let bytes = data.to_bytes().unwrap();
    assert_eq!(FlowSaveData::from_bytes(&bytes).unwrap(), data);
}

#[test]
fn test_counter_resumes_from_save() {
    let counter = NodeDefinition::new(Counter::CLASS).with_property("goal", "3");
    let counter_id = counter.id;
    let mut asset = FlowAsset::new("Resume");
    asset.nodes.push(counter);
    let registry = NodeRegistry::with_builtin_nodes();

    let mut graph = asset.instantiate(&registry).unwrap();
    graph.trigger_input(counter_id, Counter::IN);
    graph.trigger_input(counter_id, Counter::IN);
    let data = graph.save_instance().unwrap();

    let mut restored = asset.instantiate(&registry).unwrap();
    restored.load_instance(&data).unwrap();
    assert_eq!(restored.node_as::<Counter>(counter_id).unwrap().count(), 2);

    restored.trigger_input(counter_id, Counter::IN);
    assert_eq!(
        restored.node(counter_id).unwrap().base().activation_state(),
        ActivationState::Completed
    );
}
