// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Qualitative influence propagation over causal loop diagrams.
//!
//! A diagram is a directed graph of elements connected by signed causal
//! links and organized into feedback loops.  Given a selected node and a
//! direction of perturbation, the engines here classify the expected
//! qualitative effect on every other node: branching propagation for
//! degree-bounded tracing, and loop-strength resolution for nodes embedded
//! in feedback loops, where loop dominance decides the eventual direction.

#![forbid(unsafe_code)]

pub mod common;
pub mod datamodel;
pub mod graph;
pub mod loops;
pub mod project;
pub mod results;

mod centrality;
mod dominance;
mod propagate;
#[cfg(test)]
mod testutils;

pub use self::common::{Error, ErrorCode, ErrorKind, LinkId, NodeId, Result};
pub use self::datamodel::{
    Delay, LinkPolarity, LoopPolarity, NodeKind, TraceLength, TraceSpecs, TraceStrategy,
};
pub use self::graph::CausalGraph;
pub use self::loops::LoopRegistry;
pub use self::project::{Dataset, Project};
pub use self::results::{Direction, InfluenceClassification, Movement};
