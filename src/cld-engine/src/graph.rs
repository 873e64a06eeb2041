// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Canonical lookup from ids to nodes/links plus the precomputed adjacency
//! both engines traverse.

use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::common::{LinkId, NodeId, Result};
use crate::datamodel::{LinkPolarity, LinkRecord, NodeKind, NodeRecord};
use crate::model_err;

/// Link ids attached to a node, in link-id order.
pub type LinkList = SmallVec<[LinkId; 4]>;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub description: String,
    pub kind: NodeKind,
    pub cluster: String,
    pub custom_pos: (f32, f32),
    pub inputs: LinkList,
    pub outputs: LinkList,
    pub degree_centrality: f64,
    pub eigenvector_centrality: f64,
    pub betweenness_centrality: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub source: NodeId,
    pub target: NodeId,
    pub polarity: LinkPolarity,
    /// Delay-derived weight, visual thickness only.
    pub weight: f64,
    pub description: String,
}

/// The immutable graph both engines read.  Built once per project.
#[derive(Debug, Clone, PartialEq)]
pub struct CausalGraph {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl CausalGraph {
    pub fn new(node_records: &[NodeRecord], link_records: &[LinkRecord]) -> Result<CausalGraph> {
        let n = node_records.len();

        // ids must be dense and consecutive from 1: record order is id order
        for (i, record) in node_records.iter().enumerate() {
            if record.id != NodeId::from_index(i) {
                return model_err!(
                    NonContiguousNodeIds,
                    format!("expected node id {} at position {}, found {}", i + 1, i, record.id)
                );
            }
        }
        for (i, record) in link_records.iter().enumerate() {
            if record.id != LinkId::from_index(i) {
                return model_err!(
                    NonContiguousLinkIds,
                    format!("expected link id {} at position {}, found {}", i + 1, i, record.id)
                );
            }
            for endpoint in [record.source, record.target] {
                if endpoint.0 < 1 || endpoint.index() >= n {
                    return model_err!(
                        BadLinkEndpoint,
                        format!("{} references nonexistent {}", record.id, endpoint)
                    );
                }
            }
        }

        let links: Vec<Link> = link_records
            .iter()
            .map(|record| Link {
                id: record.id,
                source: record.source,
                target: record.target,
                polarity: record.polarity,
                weight: record.delay.weight(),
                description: record.description.clone(),
            })
            .collect();

        let mut nodes: Vec<Node> = node_records
            .iter()
            .map(|record| Node {
                id: record.id,
                name: record.name.clone(),
                description: record.description.clone(),
                kind: record.kind,
                cluster: record.cluster.clone(),
                custom_pos: record.custom_pos,
                inputs: LinkList::new(),
                outputs: LinkList::new(),
                degree_centrality: 0.0,
                eigenvector_centrality: 1.0,
                betweenness_centrality: 1.0,
            })
            .collect();

        for link in &links {
            nodes[link.source.index()].outputs.push(link.id);
            nodes[link.target.index()].inputs.push(link.id);
        }

        // degree centrality falls directly out of the adjacency
        for node in nodes.iter_mut() {
            node.degree_centrality = if n > 1 {
                (node.inputs.len() + node.outputs.len()) as f64 / (n - 1) as f64
            } else {
                0.0
            };
        }

        Ok(CausalGraph { nodes, links })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.index()]
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 >= 1 && id.index() < self.nodes.len()
    }

    pub fn outgoing_links(&self, id: NodeId) -> &[LinkId] {
        &self.nodes[id.index()].outputs
    }

    pub fn incoming_links(&self, id: NodeId) -> &[LinkId] {
        &self.nodes[id.index()].inputs
    }

    pub fn link_target(&self, id: LinkId) -> NodeId {
        self.links[id.index()].target
    }

    pub fn link_polarity(&self, id: LinkId) -> LinkPolarity {
        self.links[id.index()].polarity
    }

    /// Case-insensitive lookup by node name, used to resolve the configured
    /// central node.
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|node| node.name.eq_ignore_ascii_case(name))
    }

    /// BFS hop counts from `source`; None for unreachable nodes.
    pub fn shortest_path_lengths(&self, source: NodeId) -> Vec<Option<u32>> {
        let mut dist: Vec<Option<u32>> = vec![None; self.nodes.len()];
        dist[source.index()] = Some(0);

        let mut queue = VecDeque::new();
        queue.push_back(source);
        while let Some(current) = queue.pop_front() {
            let d = dist[current.index()].unwrap();
            for &link_id in self.outgoing_links(current) {
                let target = self.link_target(link_id);
                if dist[target.index()].is_none() {
                    dist[target.index()] = Some(d + 1);
                    queue.push_back(target);
                }
            }
        }

        dist
    }

    /// Longest shortest-path hop count from `source` to any reachable node.
    pub fn max_path_length_from(&self, source: NodeId) -> u32 {
        self.shortest_path_lengths(source)
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(0)
    }

    /// Network-wide maximum of `max_path_length_from`, used to validate an
    /// explicit trace length.
    pub fn max_path_length(&self) -> u32 {
        self.nodes
            .iter()
            .map(|node| self.max_path_length_from(node.id))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::testutils::{x_link, x_neg_link, x_node};

    #[test]
    fn test_adjacency_build() {
        let nodes = vec![x_node(1, "a"), x_node(2, "b"), x_node(3, "c")];
        let links = vec![x_link(1, 1, 2), x_neg_link(2, 2, 3), x_link(3, 1, 3)];
        let graph = CausalGraph::new(&nodes, &links).unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.outgoing_links(NodeId(1)), &[LinkId(1), LinkId(3)]);
        assert_eq!(graph.incoming_links(NodeId(3)), &[LinkId(2), LinkId(3)]);
        assert_eq!(graph.link_target(LinkId(2)), NodeId(3));
        assert_eq!(graph.link_polarity(LinkId(2)), LinkPolarity::Negative);
        assert!(graph.outgoing_links(NodeId(3)).is_empty());
    }

    #[test]
    fn test_degree_centrality() {
        let nodes = vec![x_node(1, "a"), x_node(2, "b"), x_node(3, "c")];
        let links = vec![x_link(1, 1, 2), x_link(2, 2, 3)];
        let graph = CausalGraph::new(&nodes, &links).unwrap();

        // (in + out) / (n - 1)
        assert_eq!(graph.node(NodeId(1)).degree_centrality, 0.5);
        assert_eq!(graph.node(NodeId(2)).degree_centrality, 1.0);
        assert_eq!(graph.node(NodeId(3)).degree_centrality, 0.5);
    }

    #[test]
    fn test_non_contiguous_ids_rejected() {
        let nodes = vec![x_node(1, "a"), x_node(3, "c")];
        let err = CausalGraph::new(&nodes, &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::NonContiguousNodeIds);

        let nodes = vec![x_node(1, "a"), x_node(2, "b")];
        let links = vec![x_link(2, 1, 2)];
        let err = CausalGraph::new(&nodes, &links).unwrap_err();
        assert_eq!(err.code, ErrorCode::NonContiguousLinkIds);
    }

    #[test]
    fn test_dangling_endpoint_rejected() {
        let nodes = vec![x_node(1, "a"), x_node(2, "b")];
        let links = vec![x_link(1, 1, 5)];
        let err = CausalGraph::new(&nodes, &links).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadLinkEndpoint);
    }

    #[test]
    fn test_shortest_paths() {
        // 1 -> 2 -> 3 -> 4, plus shortcut 1 -> 3; node 5 disconnected
        let nodes = vec![
            x_node(1, "a"),
            x_node(2, "b"),
            x_node(3, "c"),
            x_node(4, "d"),
            x_node(5, "e"),
        ];
        let links = vec![
            x_link(1, 1, 2),
            x_link(2, 2, 3),
            x_link(3, 3, 4),
            x_link(4, 1, 3),
        ];
        let graph = CausalGraph::new(&nodes, &links).unwrap();

        let dist = graph.shortest_path_lengths(NodeId(1));
        assert_eq!(dist, vec![Some(0), Some(1), Some(1), Some(2), None]);
        assert_eq!(graph.max_path_length_from(NodeId(1)), 2);
        assert_eq!(graph.max_path_length_from(NodeId(4)), 0);
        assert_eq!(graph.max_path_length(), 2);
    }

    #[test]
    fn test_node_by_name() {
        let nodes = vec![x_node(1, "Displacement"), x_node(2, "violence")];
        let graph = CausalGraph::new(&nodes, &[]).unwrap();
        assert_eq!(graph.node_by_name("displacement").unwrap().id, NodeId(1));
        assert_eq!(graph.node_by_name("VIOLENCE").unwrap().id, NodeId(2));
        assert!(graph.node_by_name("peace").is_none());
    }
}
