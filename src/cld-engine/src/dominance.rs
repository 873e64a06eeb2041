// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Loop-strength resolution: a closed-form qualitative answer for nodes
//! embedded in feedback loops, where naive branching would circle forever
//! or double-count passes around a cycle.
//!
//! Loops in a system are walked weakest to strongest; later walks overwrite
//! earlier assignments, so the dominant loop decides any node shared
//! between intersecting loops.

use std::collections::BTreeSet;

use log::{debug, warn};

use crate::common::{LinkId, NodeId};
use crate::graph::CausalGraph;
use crate::loops::{Loop, LoopRef, LoopRegistry};
use crate::results::{Direction, InfluenceClassification, Movement};

/// Per-invocation scratch state, created fresh on every top-level trace and
/// threaded by reference through the recursion.
struct DirectionContext {
    /// Resolved +1/-1 per node; None until assigned.
    directions: Vec<Option<i8>>,
    /// Nodes settled for this invocation.  Growth-only: the recursion
    /// cannot revisit an evaluated node, which is what guarantees
    /// termination on any loop topology.
    evaluated: BTreeSet<NodeId>,
    /// Links walked or propagated through, for the rendering collaborator.
    links: BTreeSet<LinkId>,
}

impl DirectionContext {
    fn new(node_count: usize) -> DirectionContext {
        DirectionContext {
            directions: vec![None; node_count],
            evaluated: BTreeSet::new(),
            links: BTreeSet::new(),
        }
    }

    fn direction(&self, id: NodeId) -> Option<i8> {
        self.directions[id.index()]
    }

    fn set_direction(&mut self, id: NodeId, signum: i8) {
        self.directions[id.index()] = Some(signum);
    }
}

pub(crate) fn trace_by_loop_strength(
    graph: &CausalGraph,
    registry: &LoopRegistry,
    source: NodeId,
    direction: Direction,
) -> InfluenceClassification {
    let mut ctx = DirectionContext::new(graph.len());
    resolve(graph, registry, &mut ctx, source, direction.signum());

    let mut out = InfluenceClassification::new(source, graph.len());
    out.links = ctx.links;
    out.spanned = ctx.evaluated;
    for node in graph.nodes() {
        match ctx.directions[node.id.index()] {
            Some(signum) => {
                out.directions[node.id.index()] = Some(Movement::from_signum(signum));
                // cross-system direct loops can assign a direction to a
                // node outside the evaluated system; it was still visited
                out.spanned.insert(node.id);
                if node.id != source {
                    if signum > 0 {
                        out.positive.insert(node.id);
                    } else {
                        out.negative.insert(node.id);
                    }
                }
            }
            None => {
                if node.id != source {
                    out.unreached.insert(node.id);
                }
            }
        }
    }
    out
}

fn resolve(
    graph: &CausalGraph,
    registry: &LoopRegistry,
    ctx: &mut DirectionContext,
    node: NodeId,
    signum: i8,
) {
    if ctx.evaluated.contains(&node) {
        return;
    }

    let direct = registry.loops_containing(node);
    if direct.is_empty() {
        // not part of any loop: the node takes the incoming direction and
        // passes it straight through its outgoing links
        ctx.evaluated.insert(node);
        ctx.set_direction(node, signum);
        for &link_id in graph.outgoing_links(node) {
            let link = graph.link(link_id);
            ctx.links.insert(link_id);
            resolve(graph, registry, ctx, link.target, signum * link.polarity.signum());
        }
        return;
    }

    resolve_loop_system(graph, registry, ctx, node, signum, &direct);
}

fn resolve_loop_system(
    graph: &CausalGraph,
    registry: &LoopRegistry,
    ctx: &mut DirectionContext,
    node: NodeId,
    signum: i8,
    direct: &[LoopRef],
) {
    // every directly-containing loop should carry the same loop-system id;
    // a mismatch is an authoring defect we tolerate by taking the first
    let mut system_ids: Vec<&str> = Vec::new();
    for loop_ref in direct {
        if let Some(system_id) = registry.system_of(&loop_ref.id)
            && !system_ids.contains(&system_id)
        {
            system_ids.push(system_id);
        }
    }
    if system_ids.len() > 1 {
        warn!(
            "{node} sits in intersecting loops tagged to different loop systems {system_ids:?}; \
             check the loop specification"
        );
    }
    let system_id = system_ids[0];

    let system_nodes = registry.system_node_ids(system_id);
    let output_nodes = registry.output_nodes_of_system(system_id, graph);

    // walk the loops the node belongs to, weakest first, so the strongest
    // loop has the last word on shared nodes
    for loop_ref in direct {
        let Some(lp) = registry.get(&loop_ref.id) else {
            continue;
        };
        if let Some(start) = lp.node_ids.iter().position(|&id| id == node) {
            walk_loop(ctx, lp, start, signum);
        }
    }

    // loops in the system the node is not part of resolve from any node
    // they share with an already-walked loop; with no resolved
    // intersection yet, a loop is left for a later pass
    for loop_ref in registry.loops_in_system(system_id) {
        if direct.iter().any(|d| d.id == loop_ref.id) {
            continue;
        }
        let Some(lp) = registry.get(&loop_ref.id) else {
            continue;
        };
        let mut entry = None;
        for (position, &member) in lp.node_ids.iter().enumerate() {
            if let Some(resolved) = ctx.direction(member) {
                entry = Some((position, resolved));
            }
        }
        if let Some((position, resolved)) = entry {
            walk_loop(ctx, lp, position, resolved);
        }
    }

    // the whole system is settled before anything downstream runs
    for &member in &system_nodes {
        ctx.evaluated.insert(member);
    }

    for output in output_nodes {
        if ctx.evaluated.contains(&output) {
            continue;
        }
        // direction leaving the system: resolved source direction times the
        // polarity of the link out
        let mut feed = None;
        for &link_id in graph.incoming_links(output) {
            let link = graph.link(link_id);
            if system_nodes.contains(&link.source)
                && let Some(resolved) = ctx.direction(link.source)
            {
                feed = Some((link_id, resolved * link.polarity.signum()));
            }
        }
        match feed {
            Some((link_id, out_signum)) => {
                ctx.links.insert(link_id);
                resolve(graph, registry, ctx, output, out_signum);
            }
            None => {
                debug!("{output}: no resolved direction leads out of {system_id}, skipping");
            }
        }
    }
}

/// Re-index the loop's cycle to start at `start` and assign each node's
/// direction in turn: the first node takes the incoming direction, each
/// later node the previous node's direction times the polarity at its
/// position in the rotated sequence.
fn walk_loop(ctx: &mut DirectionContext, lp: &Loop, start: usize, signum: i8) {
    if !lp.fully_linked() {
        // a partially-linked loop has an unreliable walk; settle for the
        // entry node and let intersections fill in the rest
        ctx.set_direction(lp.node_ids[start], signum);
        return;
    }

    let len = lp.node_ids.len();
    let mut previous = signum;
    for j in 0..len {
        let position = (start + j) % len;
        let assigned = if j == 0 {
            signum
        } else {
            previous * lp.link_polarities[position].signum()
        };
        ctx.set_direction(lp.node_ids[position], assigned);
        previous = assigned;
    }
    ctx.links.extend(lp.link_ids.iter().copied());
}
