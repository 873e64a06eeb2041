// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Branching propagation: breadth-first influence tracing outward from a
//! selected node, degree by degree.

use crate::common::NodeId;
use crate::graph::CausalGraph;
use crate::results::{Direction, InfluenceClassification, Movement};

/// How an influence arriving at an already-reached node combines with what
/// is already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeRule {
    /// Opposing arrivals mark the node mixed.
    Mixed,
    /// Opposing arrivals are discounted and the first sign sticks.  Used
    /// under central stopping, where influence looping back past the
    /// central node is treated as spent.
    KeepFirstSign,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BranchSpec {
    pub max_degree: u32,
    pub merge: MergeRule,
    /// When set, propagation halts through this node: it is classified on
    /// reach but its outgoing links are never expanded.
    pub stop_at: Option<NodeId>,
}

pub(crate) fn trace_by_branching(
    graph: &CausalGraph,
    source: NodeId,
    direction: Direction,
    spec: &BranchSpec,
) -> InfluenceClassification {
    let mut out = InfluenceClassification::new(source, graph.len());
    let mut score = vec![0i32; graph.len()];
    score[source.index()] = direction.signum() as i32;
    out.spanned.insert(source);

    // each frontier entry is a node reached in the previous degree together
    // with the polarity it was reached at
    let mut frontier: Vec<(NodeId, i8)> = vec![(source, direction.signum())];
    let mut degree = 0;
    while degree < spec.max_degree && !frontier.is_empty() {
        let mut next = Vec::new();
        for &(node, polarity) in &frontier {
            for &link_id in graph.outgoing_links(node) {
                let link = graph.link(link_id);
                let induced = polarity * link.polarity.signum();
                out.links.insert(link_id);
                out.spanned.insert(link.target);
                merge_arrival(&mut out, &mut score, link.target, induced, spec.merge);
                if spec.stop_at == Some(link.target) {
                    continue;
                }
                next.push((link.target, induced));
            }
        }
        frontier = next;
        degree += 1;
    }

    finish(&mut out, graph, direction);
    out
}

/// Sequentially fold one arriving influence into a node's running state.
fn merge_arrival(
    out: &mut InfluenceClassification,
    score: &mut [i32],
    node: NodeId,
    induced: i8,
    rule: MergeRule,
) {
    let current = score[node.index()];
    if current == 0 {
        // first contact
        score[node.index()] = induced as i32;
        if induced > 0 {
            out.positive.insert(node);
        } else {
            out.negative.insert(node);
        }
    } else if (current > 0) == (induced > 0) {
        // another influence in the same direction
        score[node.index()] += induced as i32;
        if induced > 0 {
            out.positive.insert(node);
        } else {
            out.negative.insert(node);
        }
    } else {
        match rule {
            MergeRule::Mixed => {
                out.mixed.insert(node);
                score[node.index()] += induced as i32;
            }
            MergeRule::KeepFirstSign => {
                // the opposing input is discounted; the node keeps moving
                // the way it already was
                if current > 0 {
                    out.positive.insert(node);
                } else {
                    out.negative.insert(node);
                }
            }
        }
    }
}

fn finish(out: &mut InfluenceClassification, graph: &CausalGraph, direction: Direction) {
    // mixed takes precedence over positive/negative
    let mixed = out.mixed.clone();
    out.positive.retain(|id| !mixed.contains(id));
    out.negative.retain(|id| !mixed.contains(id));

    for node in graph.nodes() {
        if !out.spanned.contains(&node.id) {
            out.unreached.insert(node.id);
        }
    }

    for &id in &out.positive {
        out.directions[id.index()] = Some(Movement::Up);
    }
    for &id in &out.negative {
        out.directions[id.index()] = Some(Movement::Down);
    }
    out.directions[out.master.index()] = Some(Movement::from_signum(direction.signum()));

    // the master is spanned but belongs to no classification set
    let master = out.master;
    out.positive.remove(&master);
    out.negative.remove(&master);
    out.mixed.remove(&master);
    out.unreached.remove(&master);
}
