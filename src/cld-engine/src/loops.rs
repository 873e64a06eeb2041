// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Loop registry: materialized feedback loops, loop-system groupings, and
//! the strength ordering the dominance engine processes them in.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use float_cmp::approx_eq;
use log::warn;
use ordered_float::OrderedFloat;

use crate::common::{Error, ErrorCode, ErrorKind, LinkId, NodeId};
use crate::datamodel::{LinkPolarity, LoopPolarity, LoopRecord};
use crate::graph::{CausalGraph, Node};

/// A materialized feedback loop.
///
/// `node_ids[i]` connects to `node_ids[i + 1]` (wrapping back to the first
/// node) through `link_ids[i]` with `link_polarities[i]`.  When the source
/// data declares a node sequence with no matching link for some pair, the
/// link arrays come out shorter than the node array; the registry warns and
/// the engines treat such loops as best-effort data.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub id: String,
    pub name: String,
    pub description: String,
    pub polarity: LoopPolarity,
    pub node_ids: Vec<NodeId>,
    pub link_ids: Vec<LinkId>,
    pub link_polarities: Vec<LinkPolarity>,
    pub system_id: String,
    /// Explicit rank from the source data; 0 means unspecified.
    pub rank: f64,
    pub mean_eigenvector: f64,
    pub mean_betweenness: f64,
    pub mean_degree: f64,
}

impl Loop {
    /// Strength used for processing order: the explicit rank when given,
    /// otherwise the loop's mean eigenvector centrality as a proxy.
    pub fn resolved_rank(&self) -> f64 {
        if approx_eq!(f64, self.rank, 0.0, ulps = 2) {
            self.mean_eigenvector
        } else {
            self.rank
        }
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.node_ids.contains(&node_id)
    }

    /// True when every consecutive node pair (including the wraparound) has
    /// a matching link.
    pub fn fully_linked(&self) -> bool {
        !self.node_ids.is_empty() && self.link_ids.len() == self.node_ids.len()
    }

    /// Polarity implied by the derived links: an even number of negative
    /// links reinforces, an odd number balances.
    pub fn derived_polarity(&self) -> LoopPolarity {
        let negative_count = self
            .link_polarities
            .iter()
            .filter(|polarity| **polarity == LinkPolarity::Negative)
            .count();
        if negative_count % 2 == 0 {
            LoopPolarity::Reinforcing
        } else {
            LoopPolarity::Balancing
        }
    }
}

/// A loop id together with its resolved strength rank.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopRef {
    pub id: String,
    pub rank: f64,
}

/// All loops in the diagram, grouped into loop systems and ordered for
/// processing.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopRegistry {
    loops: Vec<Loop>,
    by_id: HashMap<String, usize>,
    /// Loop indexes per system id, weakest first.
    systems: BTreeMap<String, Vec<usize>>,
}

impl LoopRegistry {
    pub fn new(records: &[LoopRecord], graph: &CausalGraph) -> (LoopRegistry, Vec<Error>) {
        let mut errors = Vec::new();

        let loops: Vec<Loop> = records
            .iter()
            .map(|record| build_loop(record, graph, &mut errors))
            .collect();

        let by_id: HashMap<String, usize> = loops
            .iter()
            .enumerate()
            .map(|(i, lp)| (lp.id.clone(), i))
            .collect();

        let mut systems: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, lp) in loops.iter().enumerate() {
            systems.entry(lp.system_id.clone()).or_default().push(i);
        }
        for members in systems.values_mut() {
            order_by_strength(&loops, members);
        }

        (
            LoopRegistry {
                loops,
                by_id,
                systems,
            },
            errors,
        )
    }

    pub fn loops(&self) -> &[Loop] {
        &self.loops
    }

    pub fn get(&self, loop_id: &str) -> Option<&Loop> {
        self.by_id.get(loop_id).map(|&i| &self.loops[i])
    }

    pub fn system_of(&self, loop_id: &str) -> Option<&str> {
        self.get(loop_id).map(|lp| lp.system_id.as_str())
    }

    /// Loops the node directly belongs to, in the registry's processing
    /// order (weakest first within each system).
    pub fn loops_containing(&self, node_id: NodeId) -> Vec<LoopRef> {
        let mut refs = Vec::new();
        for members in self.systems.values() {
            for &i in members {
                let lp = &self.loops[i];
                if lp.contains(node_id) {
                    refs.push(LoopRef {
                        id: lp.id.clone(),
                        rank: lp.resolved_rank(),
                    });
                }
            }
        }
        refs
    }

    /// All loops in a system, weakest first.
    pub fn loops_in_system(&self, system_id: &str) -> Vec<LoopRef> {
        self.systems
            .get(system_id)
            .map(|members| {
                members
                    .iter()
                    .map(|&i| LoopRef {
                        id: self.loops[i].id.clone(),
                        rank: self.loops[i].resolved_rank(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Union of member-loop node sets.
    pub fn system_node_ids(&self, system_id: &str) -> BTreeSet<NodeId> {
        self.systems
            .get(system_id)
            .map(|members| {
                members
                    .iter()
                    .flat_map(|&i| self.loops[i].node_ids.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Union of member-loop link sets.
    pub fn system_link_ids(&self, system_id: &str) -> BTreeSet<LinkId> {
        self.systems
            .get(system_id)
            .map(|members| {
                members
                    .iter()
                    .flat_map(|&i| self.loops[i].link_ids.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes outside the system that are directly downstream of any system
    /// node.
    pub fn output_nodes_of_system(&self, system_id: &str, graph: &CausalGraph) -> Vec<NodeId> {
        let system_nodes = self.system_node_ids(system_id);
        let mut outputs = BTreeSet::new();
        for &node_id in &system_nodes {
            for &link_id in graph.outgoing_links(node_id) {
                let target = graph.link_target(link_id);
                if !system_nodes.contains(&target) {
                    outputs.insert(target);
                }
            }
        }
        outputs.into_iter().collect()
    }
}

fn build_loop(record: &LoopRecord, graph: &CausalGraph, errors: &mut Vec<Error>) -> Loop {
    // order the declared members into the cycle walk sequence
    let mut members: Vec<(NodeId, f64)> = record
        .members
        .iter()
        .filter(|member| member.order.is_finite())
        .map(|member| (member.node_id, member.order))
        .collect();
    members.sort_by_key(|&(_, order)| OrderedFloat(order));
    let node_ids: Vec<NodeId> = members.into_iter().map(|(node_id, _)| node_id).collect();

    // derive the connecting link for each consecutive pair, wrapping from
    // the last node back to the first
    let mut link_ids = Vec::with_capacity(node_ids.len());
    let mut link_polarities = Vec::with_capacity(node_ids.len());
    for (i, &source) in node_ids.iter().enumerate() {
        let target = node_ids[(i + 1) % node_ids.len()];
        match graph
            .links()
            .iter()
            .find(|link| link.source == source && link.target == target)
        {
            Some(link) => {
                link_ids.push(link.id);
                link_polarities.push(link.polarity);
            }
            None => {
                warn!(
                    "loop {}: no link connects {} to {}; continuing with partial loop",
                    record.id, source, target
                );
                errors.push(Error::new(
                    ErrorKind::Registry,
                    ErrorCode::UnlinkedLoopSequence,
                    Some(format!("loop {}: {} -> {}", record.id, source, target)),
                ));
            }
        }
    }

    let mean = |f: fn(&Node) -> f64| -> f64 {
        if node_ids.is_empty() {
            return 0.0;
        }
        node_ids.iter().map(|&id| f(graph.node(id))).sum::<f64>() / node_ids.len() as f64
    };
    let mean_eigenvector = mean(|node| node.eigenvector_centrality);
    let mean_betweenness = mean(|node| node.betweenness_centrality);
    let mean_degree = mean(|node| node.degree_centrality);

    let lp = Loop {
        id: record.id.clone(),
        name: record.name.clone(),
        description: record.description.clone(),
        polarity: record.polarity,
        node_ids,
        link_ids,
        link_polarities,
        system_id: record.system_id.clone(),
        rank: record.rank,
        mean_eigenvector,
        mean_betweenness,
        mean_degree,
    };

    if lp.fully_linked() && lp.derived_polarity() != lp.polarity {
        warn!(
            "loop {}: declared {:?} but links imply {:?}",
            lp.id,
            lp.polarity,
            lp.derived_polarity()
        );
        errors.push(Error::new(
            ErrorKind::Registry,
            ErrorCode::LoopPolarityMismatch,
            Some(lp.id.clone()),
        ));
    }

    lp
}

/// Order a system's loops weakest-first.  When the resolved ranks average
/// above 0.5 they are explicit analyst ranks (1 = weakest) and sort
/// ascending; otherwise they are eigenvector-centrality proxies and sort
/// descending.  The 0.5 threshold is load-bearing for existing datasets;
/// keep it exact.
fn order_by_strength(loops: &[Loop], members: &mut [usize]) {
    if members.is_empty() {
        return;
    }
    let mean: f64 = members
        .iter()
        .map(|&i| loops[i].resolved_rank())
        .sum::<f64>()
        / members.len() as f64;

    if mean > 0.5 {
        members.sort_by_key(|&i| OrderedFloat(loops[i].resolved_rank()));
    } else {
        members.sort_by_key(|&i| OrderedFloat(-loops[i].resolved_rank()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{x_link, x_loop, x_neg_link, x_node};

    fn three_cycle() -> CausalGraph {
        let nodes = vec![x_node(1, "a"), x_node(2, "b"), x_node(3, "c")];
        let links = vec![x_link(1, 1, 2), x_link(2, 2, 3), x_link(3, 3, 1)];
        CausalGraph::new(&nodes, &links).unwrap()
    }

    #[test]
    fn test_sequence_and_links() {
        let graph = three_cycle();
        let records = vec![x_loop(
            "loop1",
            "sys1",
            0.0,
            LoopPolarity::Reinforcing,
            &[(1, 1.0), (2, 2.0), (3, 3.0)],
        )];
        let (registry, errors) = LoopRegistry::new(&records, &graph);
        assert!(errors.is_empty());

        let lp = registry.get("loop1").unwrap();
        assert_eq!(lp.node_ids, vec![NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(lp.link_ids, vec![LinkId(1), LinkId(2), LinkId(3)]);
        assert!(lp.fully_linked());
        assert_eq!(lp.derived_polarity(), LoopPolarity::Reinforcing);
    }

    #[test]
    fn test_sequence_orders_by_member_order() {
        let graph = three_cycle();
        // declared out of id order; the order column decides the walk
        let records = vec![x_loop(
            "loop1",
            "sys1",
            0.0,
            LoopPolarity::Reinforcing,
            &[(3, 3.0), (1, 1.0), (2, 2.0)],
        )];
        let (registry, _) = LoopRegistry::new(&records, &graph);
        assert_eq!(
            registry.get("loop1").unwrap().node_ids,
            vec![NodeId(1), NodeId(2), NodeId(3)]
        );
    }

    #[test]
    fn test_missing_link_is_tolerated() {
        // 1 -> 2 exists but the loop declares 1, 2, 3 with no 2 -> 3 link
        let nodes = vec![x_node(1, "a"), x_node(2, "b"), x_node(3, "c")];
        let links = vec![x_link(1, 1, 2), x_link(2, 3, 1)];
        let graph = CausalGraph::new(&nodes, &links).unwrap();
        let records = vec![x_loop(
            "loop1",
            "sys1",
            0.0,
            LoopPolarity::Reinforcing,
            &[(1, 1.0), (2, 2.0), (3, 3.0)],
        )];
        let (registry, errors) = LoopRegistry::new(&records, &graph);

        let lp = registry.get("loop1").unwrap();
        assert_eq!(lp.node_ids.len(), 3);
        assert_eq!(lp.link_ids.len(), 2);
        assert!(!lp.fully_linked());
        assert!(
            errors
                .iter()
                .any(|e| e.code == ErrorCode::UnlinkedLoopSequence)
        );
    }

    #[test]
    fn test_declared_polarity_mismatch_warns() {
        let nodes = vec![x_node(1, "a"), x_node(2, "b"), x_node(3, "c")];
        let links = vec![x_link(1, 1, 2), x_link(2, 2, 3), x_neg_link(3, 3, 1)];
        let graph = CausalGraph::new(&nodes, &links).unwrap();
        // one negative link makes this balancing, but it claims reinforcing
        let records = vec![x_loop(
            "loop1",
            "sys1",
            0.0,
            LoopPolarity::Reinforcing,
            &[(1, 1.0), (2, 2.0), (3, 3.0)],
        )];
        let (registry, errors) = LoopRegistry::new(&records, &graph);

        assert_eq!(
            registry.get("loop1").unwrap().derived_polarity(),
            LoopPolarity::Balancing
        );
        assert!(
            errors
                .iter()
                .any(|e| e.code == ErrorCode::LoopPolarityMismatch)
        );
    }

    fn two_loop_graph() -> CausalGraph {
        // two cycles sharing node 2: 1->2->3->1 and 2->4->2
        let nodes = vec![x_node(1, "a"), x_node(2, "b"), x_node(3, "c"), x_node(4, "d")];
        let links = vec![
            x_link(1, 1, 2),
            x_link(2, 2, 3),
            x_link(3, 3, 1),
            x_link(4, 2, 4),
            x_link(5, 4, 2),
        ];
        CausalGraph::new(&nodes, &links).unwrap()
    }

    #[test]
    fn test_explicit_ranks_sort_ascending() {
        let graph = two_loop_graph();
        let records = vec![
            x_loop(
                "strong",
                "sys1",
                2.0,
                LoopPolarity::Reinforcing,
                &[(1, 1.0), (2, 2.0), (3, 3.0)],
            ),
            x_loop(
                "weak",
                "sys1",
                1.0,
                LoopPolarity::Reinforcing,
                &[(2, 1.0), (4, 2.0)],
            ),
        ];
        let (registry, _) = LoopRegistry::new(&records, &graph);

        // mean rank 1.5 > 0.5: explicit, ascending, weakest first
        let refs = registry.loops_in_system("sys1");
        let order: Vec<&str> = refs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["weak", "strong"]);
        assert_eq!(refs[0].rank, 1.0);
        assert_eq!(refs[1].rank, 2.0);
    }

    #[test]
    fn test_centrality_proxy_ranks_sort_descending() {
        let graph = two_loop_graph();
        // rank values in centrality range (mean <= 0.5)
        let records = vec![
            x_loop(
                "one",
                "sys1",
                0.08,
                LoopPolarity::Reinforcing,
                &[(1, 1.0), (2, 2.0), (3, 3.0)],
            ),
            x_loop(
                "two",
                "sys1",
                0.2,
                LoopPolarity::Reinforcing,
                &[(2, 1.0), (4, 2.0)],
            ),
        ];
        let (registry, _) = LoopRegistry::new(&records, &graph);

        // mean 0.14 <= 0.5: proxy values, descending
        let order: Vec<String> = registry
            .loops_in_system("sys1")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(order, vec!["two".to_string(), "one".to_string()]);
    }

    #[test]
    fn test_membership_and_outputs() {
        // cycle 1->2->3->1 with an exit link 3->4
        let nodes = vec![x_node(1, "a"), x_node(2, "b"), x_node(3, "c"), x_node(4, "d")];
        let links = vec![
            x_link(1, 1, 2),
            x_link(2, 2, 3),
            x_link(3, 3, 1),
            x_link(4, 3, 4),
        ];
        let graph = CausalGraph::new(&nodes, &links).unwrap();
        let records = vec![x_loop(
            "loop1",
            "sys1",
            0.0,
            LoopPolarity::Reinforcing,
            &[(1, 1.0), (2, 2.0), (3, 3.0)],
        )];
        let (registry, _) = LoopRegistry::new(&records, &graph);

        assert_eq!(
            registry.system_node_ids("sys1"),
            [NodeId(1), NodeId(2), NodeId(3)].into_iter().collect()
        );
        assert_eq!(
            registry.system_link_ids("sys1"),
            [LinkId(1), LinkId(2), LinkId(3)].into_iter().collect()
        );
        assert_eq!(
            registry.output_nodes_of_system("sys1", &graph),
            vec![NodeId(4)]
        );
        assert_eq!(registry.system_of("loop1"), Some("sys1"));

        let containing = registry.loops_containing(NodeId(2));
        assert_eq!(containing.len(), 1);
        assert_eq!(containing[0].id, "loop1");
        assert!(registry.loops_containing(NodeId(4)).is_empty());
    }
}
