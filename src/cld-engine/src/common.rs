// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

use serde::{Deserialize, Serialize};

/// Identifier of a node (system element) in the diagram.
///
/// Node ids are 1-indexed and dense: a diagram with n nodes uses exactly
/// the range 1..=n.  This is checked when a project is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Zero-based offset of this id into the dense node table.
    pub(crate) fn index(self) -> usize {
        debug_assert!(self.0 >= 1);
        (self.0 - 1) as usize
    }

    pub(crate) fn from_index(index: usize) -> NodeId {
        NodeId(index as u32 + 1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Identifier of a causal link.  Like node ids, 1-indexed and dense.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub u32);

impl LinkId {
    pub(crate) fn index(self) -> usize {
        debug_assert!(self.0 >= 1);
        (self.0 - 1) as usize
    }

    pub(crate) fn from_index(index: usize) -> LinkId {
        LinkId(index as u32 + 1)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "link_{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    DoesNotExist,
    NonContiguousNodeIds,
    NonContiguousLinkIds,
    BadLinkEndpoint,
    BadTraceStrategy,
    BadTraceLength,
    TraceLengthTooLong,
    UnknownCentralNode,
    MissingCentralNode,
    CentralityDegraded,
    UnlinkedLoopSequence,
    LoopPolarityMismatch,
    CrossSystemLoops,
    ScenarioArrayMismatch,
    Generic,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            DoesNotExist => "does_not_exist",
            NonContiguousNodeIds => "non_contiguous_node_ids",
            NonContiguousLinkIds => "non_contiguous_link_ids",
            BadLinkEndpoint => "bad_link_endpoint",
            BadTraceStrategy => "bad_trace_strategy",
            BadTraceLength => "bad_trace_length",
            TraceLengthTooLong => "trace_length_too_long",
            UnknownCentralNode => "unknown_central_node",
            MissingCentralNode => "missing_central_node",
            CentralityDegraded => "centrality_degraded",
            UnlinkedLoopSequence => "unlinked_loop_sequence",
            LoopPolarityMismatch => "loop_polarity_mismatch",
            CrossSystemLoops => "cross_system_loops",
            ScenarioArrayMismatch => "scenario_array_mismatch",
            Generic => "generic",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Model,
    Registry,
    Config,
    Trace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Model => "ModelError",
            ErrorKind::Registry => "RegistryError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Trace => "TraceError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

#[macro_export]
macro_rules! model_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Model, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Model, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! config_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Config, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Config, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! trace_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Trace, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Trace, ErrorCode::$code, None))
    }};
}
