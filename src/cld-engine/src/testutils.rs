// Copyright 2026 The CLD Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::common::{LinkId, NodeId};
use crate::datamodel::{
    Delay, LinkPolarity, LinkRecord, LoopMember, LoopPolarity, LoopRecord, NodeKind, NodeRecord,
    TraceLength, TraceSpecs, TraceStrategy,
};

pub(crate) fn x_node(id: u32, name: &str) -> NodeRecord {
    NodeRecord {
        id: NodeId(id),
        name: name.to_string(),
        description: "".to_string(),
        kind: NodeKind::Endogenous,
        cluster: "".to_string(),
        custom_pos: (0.0, 0.0),
    }
}

fn x_link_with_polarity(id: u32, source: u32, target: u32, polarity: LinkPolarity) -> LinkRecord {
    LinkRecord {
        id: LinkId(id),
        source: NodeId(source),
        target: NodeId(target),
        polarity,
        description: "".to_string(),
        delay: Delay::None,
    }
}

pub(crate) fn x_link(id: u32, source: u32, target: u32) -> LinkRecord {
    x_link_with_polarity(id, source, target, LinkPolarity::Positive)
}

pub(crate) fn x_neg_link(id: u32, source: u32, target: u32) -> LinkRecord {
    x_link_with_polarity(id, source, target, LinkPolarity::Negative)
}

pub(crate) fn x_loop(
    id: &str,
    system_id: &str,
    rank: f64,
    polarity: LoopPolarity,
    members: &[(u32, f64)],
) -> LoopRecord {
    LoopRecord {
        id: id.to_string(),
        name: id.to_string(),
        description: "".to_string(),
        polarity,
        system_id: system_id.to_string(),
        rank,
        members: members
            .iter()
            .map(|&(node_id, order)| LoopMember {
                node_id: NodeId(node_id),
                order,
            })
            .collect(),
    }
}

pub(crate) fn x_specs(strategy: TraceStrategy, length: TraceLength) -> TraceSpecs {
    TraceSpecs {
        strategy,
        length,
        central_node: None,
        central_stop_on_reach: false,
    }
}
