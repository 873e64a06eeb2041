// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The classification structure handed to the rendering collaborator.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::common::{LinkId, NodeId};

/// Direction of the perturbation applied to the selected node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn signum(self) -> i8 {
        match self {
            Direction::Increase => 1,
            Direction::Decrease => -1,
        }
    }
}

/// Qualitative movement of a node under the applied perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Up,
    Down,
}

impl Movement {
    pub(crate) fn from_signum(signum: i8) -> Movement {
        if signum >= 0 { Movement::Up } else { Movement::Down }
    }

    pub fn signum(self) -> i8 {
        match self {
            Movement::Up => 1,
            Movement::Down => -1,
        }
    }
}

/// Result of one trace invocation.
///
/// Rebuilt from scratch on every invocation, never merged across
/// invocations.  After cleanup the four classification sets are disjoint,
/// mixed takes precedence over positive/negative, and the master node
/// appears in none of them (it is in `spanned`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceClassification {
    pub master: NodeId,
    pub positive: BTreeSet<NodeId>,
    pub negative: BTreeSet<NodeId>,
    pub mixed: BTreeSet<NodeId>,
    pub unreached: BTreeSet<NodeId>,
    /// Every link traversed while tracing.
    pub links: BTreeSet<LinkId>,
    /// Every node reached, the master included.
    pub spanned: BTreeSet<NodeId>,
    /// Per-node resolved movement, indexed by node.  Mixed and unreached
    /// nodes carry None.
    pub directions: Vec<Option<Movement>>,
}

impl InfluenceClassification {
    pub(crate) fn new(master: NodeId, node_count: usize) -> InfluenceClassification {
        InfluenceClassification {
            master,
            positive: BTreeSet::new(),
            negative: BTreeSet::new(),
            mixed: BTreeSet::new(),
            unreached: BTreeSet::new(),
            links: BTreeSet::new(),
            spanned: BTreeSet::new(),
            directions: vec![None; node_count],
        }
    }

    pub fn movement_of(&self, id: NodeId) -> Option<Movement> {
        self.directions.get(id.index()).copied().flatten()
    }

    /// True when no classification set overlaps another.
    pub fn sets_disjoint(&self) -> bool {
        let sets = [&self.positive, &self.negative, &self.mixed, &self.unreached];
        for (i, a) in sets.iter().enumerate() {
            for b in sets.iter().skip(i + 1) {
                if a.intersection(b).next().is_some() {
                    return false;
                }
            }
        }
        true
    }
}
