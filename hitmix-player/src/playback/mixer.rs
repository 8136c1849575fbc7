//! Software mixing bus
//!
//! The playback core talks to the audio graph through two narrow traits:
//! `MixingBus` (the channel's own bus, where sound nodes are attached) and
//! `RootGraph` (the output graph the channel's bus is attached to). `Mixer`
//! implements both: it sums every attached node into an interleaved stereo
//! buffer and drops nodes once they end.
//!
//! A `Mixer` is a cheap handle; clones share the same node set, so the
//! render side and the control side can each hold one.
//!
//! ```ignore
//! let root = Mixer::new(44100);
//! let channel = Mixer::new(44100);
//! root.add_root_node(channel.submix());
//! channel.add_node(Box::new(SampleNode::new(buffer, 1.0, 0.0)));
//! root.render(&mut output);
//! ```

use crate::playback::nodes::{AudioNode, NodeKind};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

/// Identity of a node attached to a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A bus sound nodes can be attached to and detached from
pub trait MixingBus: Send + Sync {
    fn add_node(&self, node: Box<dyn AudioNode>) -> NodeId;

    /// Detach a node, handing it back if it was still attached
    fn remove_node(&self, id: NodeId) -> Option<Box<dyn AudioNode>>;
}

/// The device-facing graph a channel's output is attached to
pub trait RootGraph: Send + Sync {
    fn add_root_node(&self, node: Box<dyn AudioNode>) -> NodeId;

    fn remove_root_node(&self, id: NodeId) -> Option<Box<dyn AudioNode>>;
}

struct MixerInner {
    nodes: Vec<(NodeId, Box<dyn AudioNode>)>,
    scratch: Vec<f32>,
    frames_rendered: u64,
}

/// Summing mixer over a dynamic set of nodes
#[derive(Clone)]
pub struct Mixer {
    inner: Arc<Mutex<MixerInner>>,
    next_id: Arc<AtomicU64>,
    sample_rate: u32,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MixerInner {
                nodes: Vec::new(),
                scratch: Vec::new(),
                frames_rendered: 0,
            })),
            next_id: Arc::new(AtomicU64::new(1)),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MixerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn attach(&self, node: Box<dyn AudioNode>) -> NodeId {
        let id = NodeId(self.next_id.fetch_add(1, Ordering::Relaxed));
        trace!("Attaching {} ({})", id, node.kind());
        self.lock().nodes.push((id, node));
        id
    }

    fn detach(&self, id: NodeId) -> Option<Box<dyn AudioNode>> {
        let mut inner = self.lock();
        let index = inner.nodes.iter().position(|(node_id, _)| *node_id == id)?;
        trace!("Detaching {}", id);
        Some(inner.nodes.remove(index).1)
    }

    /// Mix every attached node into `out` (interleaved stereo, overwritten)
    ///
    /// Nodes that end during this call are dropped.
    pub fn render(&self, out: &mut [f32]) {
        let mut guard = self.lock();
        let inner = &mut *guard;

        out.fill(0.0);
        inner.scratch.resize(out.len(), 0.0);

        let requested = out.len() / 2;
        inner.nodes.retain_mut(|(id, node)| {
            let produced = node.fill(&mut inner.scratch);
            for (dst, src) in out.iter_mut().zip(&inner.scratch[..produced * 2]) {
                *dst += *src;
            }
            let alive = produced == requested;
            if !alive {
                trace!("{} ended", id);
            }
            alive
        });
        inner.frames_rendered += requested as u64;
    }

    /// Number of attached nodes
    pub fn active_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.lock().nodes.iter().any(|(node_id, _)| *node_id == id)
    }

    /// Kinds of the attached nodes, in attach order
    pub fn node_kinds(&self) -> Vec<NodeKind> {
        self.lock().nodes.iter().map(|(_, node)| node.kind()).collect()
    }

    /// Total frames rendered so far
    pub fn frames_rendered(&self) -> u64 {
        self.lock().frames_rendered
    }

    /// This mixer as a node of another graph
    ///
    /// The returned node never ends: an empty mixer renders silence.
    pub fn submix(&self) -> Box<dyn AudioNode> {
        Box::new(Submix {
            mixer: self.clone(),
        })
    }
}

impl fmt::Debug for Mixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mixer")
            .field("sample_rate", &self.sample_rate)
            .field("nodes", &self.active_count())
            .finish()
    }
}

impl MixingBus for Mixer {
    fn add_node(&self, node: Box<dyn AudioNode>) -> NodeId {
        self.attach(node)
    }

    fn remove_node(&self, id: NodeId) -> Option<Box<dyn AudioNode>> {
        self.detach(id)
    }
}

impl RootGraph for Mixer {
    fn add_root_node(&self, node: Box<dyn AudioNode>) -> NodeId {
        self.attach(node)
    }

    fn remove_root_node(&self, id: NodeId) -> Option<Box<dyn AudioNode>> {
        self.detach(id)
    }
}

struct Submix {
    mixer: Mixer,
}

impl AudioNode for Submix {
    fn fill(&mut self, out: &mut [f32]) -> usize {
        self.mixer.render(out);
        out.len() / 2
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Submix
    }
}
