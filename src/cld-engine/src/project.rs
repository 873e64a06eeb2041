// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Build-once assembly of the graph, loop registry, and trace
//! configuration.  A project is immutable after construction; every trace
//! gets its own scratch state, so invocations never interfere.

use log::warn;

use crate::common::{Error, ErrorCode, ErrorKind, NodeId, Result};
use crate::datamodel::{
    LinkRecord, LoopRecord, LoopScenarioRecord, NodeRecord, TraceLength, TraceSpecs, TraceStrategy,
};
use crate::dominance;
use crate::graph::CausalGraph;
use crate::loops::LoopRegistry;
use crate::propagate::{self, BranchSpec, MergeRule};
use crate::results::{Direction, InfluenceClassification};
use crate::{centrality, config_err, trace_err};

/// The record tables handed over by the ingestion collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
    pub loops: Vec<LoopRecord>,
    pub scenarios: Vec<LoopScenarioRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub graph: CausalGraph,
    pub loops: LoopRegistry,
    pub specs: TraceSpecs,
    /// Presentation-only scenario records, passed through for rendering.
    pub scenarios: Vec<LoopScenarioRecord>,
    /// The configured central node, resolved by name.
    pub central_node: Option<NodeId>,
    /// Non-fatal diagnostics collected while building.
    pub errors: Vec<Error>,
}

impl Project {
    pub fn build(dataset: Dataset, specs: TraceSpecs) -> Result<Project> {
        let mut errors = Vec::new();

        let mut graph = CausalGraph::new(&dataset.nodes, &dataset.links)?;
        errors.extend(centrality::assign(&mut graph));

        let (loops, registry_errors) = LoopRegistry::new(&dataset.loops, &graph);
        errors.extend(registry_errors);

        for scenario in &dataset.scenarios {
            if !scenario.arrays_consistent() {
                warn!("scenario {}: presentation arrays do not line up", scenario.id);
                errors.push(Error::new(
                    ErrorKind::Model,
                    ErrorCode::ScenarioArrayMismatch,
                    Some(scenario.id.clone()),
                ));
            }
        }

        let central_stopping = specs.strategy == TraceStrategy::ByDegreeWithCentralStopping;
        let central_node = match &specs.central_node {
            Some(name) => match graph.node_by_name(name) {
                Some(node) => Some(node.id),
                None if central_stopping => {
                    return config_err!(UnknownCentralNode, name.clone());
                }
                None => {
                    warn!("central node {name:?} not found; ignoring");
                    errors.push(Error::new(
                        ErrorKind::Config,
                        ErrorCode::UnknownCentralNode,
                        Some(name.clone()),
                    ));
                    None
                }
            },
            None if central_stopping => {
                return config_err!(MissingCentralNode);
            }
            None => None,
        };

        if let TraceLength::Degrees(degrees) = specs.length {
            let longest = graph.max_path_length();
            if degrees > longest {
                return config_err!(
                    TraceLengthTooLong,
                    format!("{degrees} exceeds network max path length {longest}")
                );
            }
        }

        Ok(Project {
            graph,
            loops,
            specs,
            scenarios: dataset.scenarios,
            central_node,
            errors,
        })
    }

    /// Classify the expected qualitative effect of perturbing `source` on
    /// every other node, using the configured strategy.
    pub fn trace(&self, source: NodeId, direction: Direction) -> Result<InfluenceClassification> {
        if !self.graph.contains(source) {
            return trace_err!(DoesNotExist, format!("{source}"));
        }

        match self.specs.strategy {
            TraceStrategy::ByLoopStrength => Ok(dominance::trace_by_loop_strength(
                &self.graph,
                &self.loops,
                source,
                direction,
            )),
            TraceStrategy::ByDegree | TraceStrategy::ByPolarity => {
                let spec = BranchSpec {
                    max_degree: self.max_degree_from(source),
                    merge: MergeRule::Mixed,
                    stop_at: None,
                };
                Ok(propagate::trace_by_branching(
                    &self.graph,
                    source,
                    direction,
                    &spec,
                ))
            }
            TraceStrategy::ByDegreeWithCentralStopping => {
                let spec = BranchSpec {
                    max_degree: self.max_degree_from(source),
                    merge: MergeRule::KeepFirstSign,
                    stop_at: if self.specs.central_stop_on_reach {
                        self.central_node
                    } else {
                        None
                    },
                };
                Ok(propagate::trace_by_branching(
                    &self.graph,
                    source,
                    direction,
                    &spec,
                ))
            }
        }
    }

    fn max_degree_from(&self, source: NodeId) -> u32 {
        match self.specs.length {
            TraceLength::MaxPathLength => self.graph.max_path_length_from(source),
            TraceLength::Degrees(degrees) => degrees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::LoopPolarity;
    use crate::results::Movement;
    use crate::testutils::{x_link, x_loop, x_neg_link, x_node, x_specs};

    fn chain_dataset() -> Dataset {
        Dataset {
            nodes: vec![x_node(1, "a"), x_node(2, "b"), x_node(3, "c"), x_node(4, "d")],
            links: vec![x_link(1, 1, 2), x_neg_link(2, 2, 3), x_link(3, 3, 4)],
            loops: vec![],
            scenarios: vec![],
        }
    }

    #[test]
    fn test_build_and_branch_trace() {
        let project = Project::build(
            chain_dataset(),
            x_specs(TraceStrategy::ByPolarity, TraceLength::MaxPathLength),
        )
        .unwrap();

        let out = project.trace(NodeId(1), Direction::Increase).unwrap();
        assert!(out.positive.contains(&NodeId(2)));
        assert!(out.negative.contains(&NodeId(3)));
        assert!(out.negative.contains(&NodeId(4)));
    }

    #[test]
    fn test_explicit_degrees_validated() {
        // network max path length of the chain is 3
        let err = Project::build(
            chain_dataset(),
            x_specs(TraceStrategy::ByDegree, TraceLength::Degrees(9)),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::TraceLengthTooLong);

        let project = Project::build(
            chain_dataset(),
            x_specs(TraceStrategy::ByDegree, TraceLength::Degrees(2)),
        )
        .unwrap();
        let out = project.trace(NodeId(1), Direction::Increase).unwrap();
        assert!(out.unreached.contains(&NodeId(4)));
    }

    #[test]
    fn test_central_node_configuration() {
        // the stopping strategy demands a resolvable central node
        let mut specs = x_specs(
            TraceStrategy::ByDegreeWithCentralStopping,
            TraceLength::MaxPathLength,
        );
        specs.central_stop_on_reach = true;
        let err = Project::build(chain_dataset(), specs.clone()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingCentralNode);

        specs.central_node = Some("nobody".to_string());
        let err = Project::build(chain_dataset(), specs.clone()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownCentralNode);

        specs.central_node = Some("C".to_string());
        let project = Project::build(chain_dataset(), specs).unwrap();
        assert_eq!(project.central_node, Some(NodeId(3)));

        let out = project.trace(NodeId(1), Direction::Increase).unwrap();
        assert!(out.negative.contains(&NodeId(3)));
        assert!(out.unreached.contains(&NodeId(4)));
    }

    #[test]
    fn test_unknown_central_node_tolerated_without_stopping() {
        let mut specs = x_specs(TraceStrategy::ByDegree, TraceLength::MaxPathLength);
        specs.central_node = Some("nobody".to_string());
        let project = Project::build(chain_dataset(), specs).unwrap();
        assert_eq!(project.central_node, None);
        assert!(
            project
                .errors
                .iter()
                .any(|e| e.code == ErrorCode::UnknownCentralNode)
        );
    }

    #[test]
    fn test_loop_strength_dispatch() {
        let dataset = Dataset {
            nodes: vec![x_node(1, "a"), x_node(2, "b"), x_node(3, "c")],
            links: vec![x_link(1, 1, 2), x_link(2, 2, 3), x_link(3, 3, 1)],
            loops: vec![x_loop(
                "loop1",
                "sys1",
                0.0,
                LoopPolarity::Reinforcing,
                &[(1, 1.0), (2, 2.0), (3, 3.0)],
            )],
            scenarios: vec![],
        };
        let project = Project::build(
            dataset,
            x_specs(TraceStrategy::ByLoopStrength, TraceLength::MaxPathLength),
        )
        .unwrap();

        let out = project.trace(NodeId(1), Direction::Increase).unwrap();
        assert_eq!(out.movement_of(NodeId(2)), Some(Movement::Up));
        assert_eq!(out.movement_of(NodeId(3)), Some(Movement::Up));
    }

    #[test]
    fn test_trace_rejects_unknown_source() {
        let project = Project::build(
            chain_dataset(),
            x_specs(TraceStrategy::ByDegree, TraceLength::MaxPathLength),
        )
        .unwrap();
        let err = project.trace(NodeId(40), Direction::Increase).unwrap_err();
        assert_eq!(err.code, ErrorCode::DoesNotExist);
    }
}
