// SPDX-License-Identifier: MIT OR Apache-2.0
//! Searching a graph by following connections.

use crate::context::{FlowContext, NodeInfo};
use crate::node::{FlowNode, NodeId};
use std::collections::HashSet;

/// Collect nodes matching `predicate`, following connections from `start`.
///
/// Each node is visited once and added to `out` at most once. The search
/// stops as soon as `out` holds `limit` entries: the limit bounds the number
/// of matches, not how many hops away from `start` the search goes.
/// Nodes that are executing, or upstream of the executing node, are
/// searched like any other.
pub fn find_nodes_by_class(
    cx: &dyn FlowContext,
    start: NodeId,
    predicate: &dyn Fn(&NodeInfo<'_>) -> bool,
    limit: usize,
    out: &mut Vec<NodeId>,
) {
    let mut visited = HashSet::new();
    visit(cx, start, predicate, limit, out, &mut visited);
}

/// Collect nodes of concrete type `T`, following connections from `start`
pub fn find_nodes_of_type<T: FlowNode>(
    cx: &dyn FlowContext,
    start: NodeId,
    limit: usize,
    out: &mut Vec<NodeId>,
) {
    find_nodes_by_class(cx, start, &|info| info.is::<T>(), limit, out);
}

fn visit(
    cx: &dyn FlowContext,
    node_id: NodeId,
    predicate: &dyn Fn(&NodeInfo<'_>) -> bool,
    limit: usize,
    out: &mut Vec<NodeId>,
    visited: &mut HashSet<NodeId>,
) {
    if out.len() >= limit || !visited.insert(node_id) {
        return;
    }
    let Some(info) = cx.node_info(node_id) else {
        return;
    };

    if predicate(&info) && !out.contains(&node_id) {
        out.push(node_id);
    }

    for next in info.connections.connected_node_ids() {
        if out.len() >= limit {
            return;
        }
        visit(cx, next, predicate, limit, out, visited);
    }
}
