// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Eigenvector and betweenness centrality over the directed graph.
//!
//! A failed computation never aborts loading: the affected measure falls
//! back to a neutral default of 1.0 for every node and the degradation is
//! logged and recorded on the project.

use std::collections::VecDeque;

use log::warn;

use crate::common::{Error, ErrorCode, ErrorKind, NodeId};
use crate::graph::CausalGraph;

const POWER_ITERATION_LIMIT: usize = 100;
const POWER_ITERATION_TOL: f64 = 1e-6;

/// Fill the eigenvector and betweenness measures on the graph's nodes,
/// returning any degradation diagnostics.  Degree centrality is computed
/// as part of the adjacency build.
pub(crate) fn assign(graph: &mut CausalGraph) -> Vec<Error> {
    let mut errors = Vec::new();

    match eigenvector(graph) {
        Some(values) => {
            for (node, value) in graph.nodes_mut().iter_mut().zip(values) {
                node.eigenvector_centrality = value;
            }
        }
        None => {
            warn!("eigenvector centrality could not be determined, setting to 1");
            errors.push(Error::new(
                ErrorKind::Model,
                ErrorCode::CentralityDegraded,
                Some("eigenvector centrality fell back to 1".to_string()),
            ));
            for node in graph.nodes_mut() {
                node.eigenvector_centrality = 1.0;
            }
        }
    }

    match betweenness(graph) {
        Some(values) => {
            for (node, value) in graph.nodes_mut().iter_mut().zip(values) {
                node.betweenness_centrality = value;
            }
        }
        None => {
            warn!("betweenness centrality could not be determined, setting to 1");
            errors.push(Error::new(
                ErrorKind::Model,
                ErrorCode::CentralityDegraded,
                Some("betweenness centrality fell back to 1".to_string()),
            ));
            for node in graph.nodes_mut() {
                node.betweenness_centrality = 1.0;
            }
        }
    }

    errors
}

/// Power iteration on x(I + A), L2-normalized.  Influence accumulates
/// along in-edges.  Returns None when the iteration fails to converge
/// within the limit, or the graph is degenerate.
fn eigenvector(graph: &CausalGraph) -> Option<Vec<f64>> {
    let n = graph.len();
    if n == 0 {
        return None;
    }

    let mut x = vec![1.0 / n as f64; n];
    for _ in 0..POWER_ITERATION_LIMIT {
        let mut next = x.clone();
        for link in graph.links() {
            next[link.target.index()] += x[link.source.index()];
        }

        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm <= 0.0 || !norm.is_finite() {
            return None;
        }
        for v in next.iter_mut() {
            *v /= norm;
        }

        let err: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
        if err < n as f64 * POWER_ITERATION_TOL {
            return Some(next);
        }
        x = next;
    }

    None
}

/// Brandes' algorithm, directed and unweighted, normalized by
/// 1/((n-1)(n-2)) as in the reference network libraries.
fn betweenness(graph: &CausalGraph) -> Option<Vec<f64>> {
    let n = graph.len();
    if n == 0 {
        return None;
    }

    let mut centrality = vec![0.0; n];
    for s in 0..n {
        let mut stack: Vec<usize> = Vec::new();
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0; n];
        let mut dist: Vec<i64> = vec![-1; n];
        sigma[s] = 1.0;
        dist[s] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(s);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &link_id in graph.outgoing_links(NodeId::from_index(v)) {
                let w = graph.link_target(link_id).index();
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
        for value in centrality.iter_mut() {
            *value *= scale;
        }
    }

    Some(centrality)
}
