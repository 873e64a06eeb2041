// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Typed records as produced by the (out-of-scope) tabular ingestion
//! collaborator, plus the trace configuration.  Ids are already numeric by
//! the time records reach this crate; everything else is validated here or
//! at project build.

use serde::{Deserialize, Serialize};

use crate::common::{LinkId, NodeId, Result};
use crate::config_err;

/// Sign of a causal link's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkPolarity {
    /// Increase in the source causes increase in the target.
    #[serde(rename = "+")]
    Positive,
    /// Increase in the source causes decrease in the target.
    #[serde(rename = "-")]
    Negative,
}

impl LinkPolarity {
    /// The +1/-1 encoding both engines compute with.
    pub fn signum(self) -> i8 {
        match self {
            LinkPolarity::Positive => 1,
            LinkPolarity::Negative => -1,
        }
    }
}

/// Loop behavior type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopPolarity {
    /// R loop - even number of negative links
    Reinforcing,
    /// B loop - odd number of negative links
    Balancing,
}

/// Node type vocabulary from the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A pure input: the analyst expects no links into it.
    Input,
    /// A pure output: the analyst expects no links out of it.
    Output,
    #[default]
    Endogenous,
}

/// Delay category on a link.  Longer delays map to smaller visual weights;
/// propagation ignores the weight entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delay {
    #[default]
    None,
    Days,
    Weeks,
    Months,
    Years,
    Decades,
}

impl Delay {
    /// Fixed mapping from delay category to link weight, domain [0, 2].
    pub fn weight(self) -> f64 {
        match self {
            Delay::None => 2.00,
            Delay::Days => 0.95,
            Delay::Weeks => 0.70,
            Delay::Months => 0.30,
            Delay::Years => 0.10,
            Delay::Decades => 0.00,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub cluster: String,
    /// Analyst-specified position in the unit square; presentation only.
    #[serde(default)]
    pub custom_pos: (f32, f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: LinkId,
    pub source: NodeId,
    pub target: NodeId,
    pub polarity: LinkPolarity,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub delay: Delay,
}

/// One node's membership in a declared loop: the value of that loop row's
/// order column for the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopMember {
    pub node_id: NodeId,
    pub order: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub polarity: LoopPolarity,
    pub system_id: String,
    /// Explicit strength rank within the loop system; 0 means unspecified
    /// and falls back to the loop's mean eigenvector centrality.
    #[serde(default)]
    pub rank: f64,
    pub members: Vec<LoopMember>,
}

/// A curated arrangement of loops for storytelling.  Carried for the
/// rendering collaborator; never consumed by the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopScenarioRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub loop_ids: Vec<String>,
    pub positions: Vec<(f32, f32)>,
    pub radii: Vec<f32>,
    pub rotations: Vec<f32>,
    pub label_positions: Vec<(f32, f32)>,
    pub label_scales: Vec<f32>,
}

impl LoopScenarioRecord {
    /// The presentation arrays are parallel to loop_ids.
    pub fn arrays_consistent(&self) -> bool {
        let n = self.loop_ids.len();
        self.positions.len() == n
            && self.radii.len() == n
            && self.rotations.len() == n
            && self.label_positions.len() == n
            && self.label_scales.len() == n
    }
}

/// Which tracing algorithm runs when a node is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceStrategy {
    ByLoopStrength,
    ByDegree,
    ByPolarity,
    ByDegreeWithCentralStopping,
}

impl TraceStrategy {
    pub fn parse(s: &str) -> Result<TraceStrategy> {
        match s {
            "byLoopStrength" => Ok(TraceStrategy::ByLoopStrength),
            "byDegree" => Ok(TraceStrategy::ByDegree),
            "byPolarity" => Ok(TraceStrategy::ByPolarity),
            "byDegreeWithCentralStopping" => Ok(TraceStrategy::ByDegreeWithCentralStopping),
            _ => config_err!(BadTraceStrategy, s.to_string()),
        }
    }
}

/// How many degrees the branching engines span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceLength {
    /// Span the longest shortest-path length from the selected node, so
    /// every influenced node is reached at least once.
    MaxPathLength,
    Degrees(u32),
}

impl TraceLength {
    pub fn parse(s: &str) -> Result<TraceLength> {
        if s == "maxPathLength" {
            return Ok(TraceLength::MaxPathLength);
        }
        match s.parse::<u32>() {
            Ok(n) => Ok(TraceLength::Degrees(n)),
            Err(_) => config_err!(BadTraceLength, s.to_string()),
        }
    }
}

/// Trace configuration.  Validated when the project is built, never
/// mid-traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSpecs {
    pub strategy: TraceStrategy,
    pub length: TraceLength,
    /// Name of the designated central node, matched case-insensitively.
    pub central_node: Option<String>,
    /// When true, propagation halts through the central node.
    pub central_stop_on_reach: bool,
}

impl Default for TraceSpecs {
    fn default() -> Self {
        TraceSpecs {
            strategy: TraceStrategy::ByLoopStrength,
            length: TraceLength::MaxPathLength,
            central_node: None,
            central_stop_on_reach: false,
        }
    }
}
