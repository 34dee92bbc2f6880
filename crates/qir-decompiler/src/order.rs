//! Topological ordering and unreachable-block detachment.
//!
//! Back edges only exist inside composite loop blocks, so the outer
//! graph is a DAG and a reversed depth-first post-order is a valid
//! topological order.

use crate::graph::{BlockId, Graph};

/// Compute `graph.ordering` and detach everything unreachable from the
/// entry block: detached blocks lose their edges, and reachable blocks
/// forget them as predecessors.
pub fn sort(graph: &mut Graph) {
    if graph.blocks.is_empty() {
        return;
    }

    let mut marked = vec![false; graph.blocks.len()];
    let mut post_order = Vec::new();
    visit(graph, graph.entry(), &mut marked, &mut post_order);
    post_order.reverse();
    graph.ordering = post_order;

    let detached: Vec<BlockId> = (0..graph.blocks.len()).filter(|id| !marked[*id]).collect();
    for &id in &detached {
        graph.blocks[id].next = None;
        graph.blocks[id].next_jumped = None;
        graph.blocks[id].predecessors.clear();
    }
    for block in &mut graph.blocks {
        block
            .predecessors
            .retain(|(pred, _)| !detached.contains(pred));
    }
    graph.detached = detached;
}

fn visit(graph: &Graph, id: BlockId, marked: &mut [bool], post_order: &mut Vec<BlockId>) {
    marked[id] = true;
    for (successor, _) in graph.blocks[id].successors() {
        if !marked[successor] {
            visit(graph, successor, marked, post_order);
        }
    }
    post_order.push(id);
}
