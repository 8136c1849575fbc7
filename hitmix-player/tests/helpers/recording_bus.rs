//! Mixing bus spy
//!
//! Forwards to a real `Mixer` and records every attach and detach, so tests
//! can assert what the orchestrator did to the graph and when.

use hitmix_player::playback::nodes::{AudioNode, NodeKind};
use hitmix_player::playback::{Mixer, MixingBus, NodeId};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// One recorded bus operation
#[derive(Debug, Clone, PartialEq)]
pub enum BusOp {
    Added { id: NodeId, kind: NodeKind },
    Removed { id: NodeId, kind: Option<NodeKind> },
}

pub struct RecordingBus {
    mixer: Mixer,
    ops: Mutex<Vec<(Instant, BusOp)>>,
}

impl RecordingBus {
    pub fn new(mixer: Mixer) -> Self {
        Self {
            mixer,
            ops: Mutex::new(Vec::new()),
        }
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    fn record(&self, op: BusOp) {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((Instant::now(), op));
    }

    /// Every operation so far, in order
    pub fn ops(&self) -> Vec<BusOp> {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, op)| op.clone())
            .collect()
    }

    /// Number of nodes of `kind` attached so far
    pub fn added(&self, kind: NodeKind) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, BusOp::Added { kind: k, .. } if *k == kind))
            .count()
    }

    /// Number of detaches that found a node of `kind`
    pub fn removed(&self, kind: NodeKind) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, BusOp::Removed { kind: Some(k), .. } if *k == kind))
            .count()
    }

    /// Kinds currently attached
    pub fn active_kinds(&self) -> Vec<NodeKind> {
        self.mixer.node_kinds()
    }

    /// Attached sustained chains (volume over balance over loop)
    pub fn active_sustained(&self) -> usize {
        self.active_kinds()
            .iter()
            .filter(|k| **k == NodeKind::Volume)
            .count()
    }
}

impl MixingBus for RecordingBus {
    fn add_node(&self, node: Box<dyn AudioNode>) -> NodeId {
        let kind = node.kind();
        let id = self.mixer.add_node(node);
        self.record(BusOp::Added { id, kind });
        id
    }

    fn remove_node(&self, id: NodeId) -> Option<Box<dyn AudioNode>> {
        let node = self.mixer.remove_node(id);
        self.record(BusOp::Removed {
            id,
            kind: node.as_ref().map(|n| n.kind()),
        });
        node
    }
}
