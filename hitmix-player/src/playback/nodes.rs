//! Mixing graph nodes
//!
//! Every node renders interleaved stereo `f32` at the mixer rate. A node
//! overwrites the buffer it is given and reports how many frames it
//! produced; producing fewer frames than requested means it has ended and
//! the owning mixer drops it.
//!
//! Live parameters (volume, balance) are `Param` handles shared between the
//! node and whoever adjusts it, so changes land without touching the graph.

use crate::audio::types::AudioBuffer;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Node type tag, for logging and inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Plays a buffer once
    Sample,
    /// Plays a buffer repeatedly
    Loop,
    Balance,
    Volume,
    /// Release envelope around another node
    FadeOut,
    /// A mixer rendered as a node
    Submix,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Sample => "sample",
            NodeKind::Loop => "loop",
            NodeKind::Balance => "balance",
            NodeKind::Volume => "volume",
            NodeKind::FadeOut => "fade_out",
            NodeKind::Submix => "submix",
        };
        write!(f, "{}", name)
    }
}

/// A source of stereo frames in the mixing graph
pub trait AudioNode: Send {
    /// Render into `out` (interleaved stereo, overwritten)
    ///
    /// Returns the number of frames produced; the unproduced tail is left
    /// silent. Fewer frames than `out.len() / 2` signals the end of the node.
    fn fill(&mut self, out: &mut [f32]) -> usize;

    fn kind(&self) -> NodeKind;
}

impl fmt::Debug for dyn AudioNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioNode({})", self.kind())
    }
}

/// Lock-free `f32` parameter shared between a node and its controller
#[derive(Clone)]
pub struct Param(Arc<AtomicU32>);

impl Param {
    pub fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Param({})", self.get())
    }
}

/// Left/right gains for a balance in -1.0 (left) ..= 1.0 (right)
///
/// Centre is unity on both sides; moving toward one side attenuates the
/// other linearly.
pub fn balance_gains(balance: f32) -> (f32, f32) {
    let b = if balance.is_finite() {
        balance.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    (1.0 - b.max(0.0), 1.0 + b.min(0.0))
}

fn silence_tail(out: &mut [f32], frames: usize) {
    if let Some(tail) = out.get_mut(frames * 2..) {
        tail.fill(0.0);
    }
}

/// One-shot playback of a decoded sound with fixed gains
pub struct SampleNode {
    buffer: Arc<AudioBuffer>,
    position: usize,
    gain_left: f32,
    gain_right: f32,
}

impl SampleNode {
    pub fn new(buffer: Arc<AudioBuffer>, volume: f32, balance: f32) -> Self {
        let (left, right) = balance_gains(balance);
        let volume = volume.clamp(0.0, 1.0);
        Self {
            buffer,
            position: 0,
            gain_left: left * volume,
            gain_right: right * volume,
        }
    }

    /// Frames not yet rendered
    pub fn remaining_frames(&self) -> usize {
        self.buffer.frames().saturating_sub(self.position)
    }
}

impl AudioNode for SampleNode {
    fn fill(&mut self, out: &mut [f32]) -> usize {
        let frames = (out.len() / 2).min(self.remaining_frames());
        let start = self.position * 2;
        let source = &self.buffer.samples()[start..start + frames * 2];

        for (dst, src) in out.chunks_exact_mut(2).zip(source.chunks_exact(2)) {
            dst[0] = src[0] * self.gain_left;
            dst[1] = src[1] * self.gain_right;
        }
        silence_tail(out, frames);

        self.position += frames;
        frames
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Sample
    }
}

/// Endless playback of a decoded sound, wrapping at the end
pub struct LoopStream {
    buffer: Arc<AudioBuffer>,
    position: usize,
}

impl LoopStream {
    pub fn new(buffer: Arc<AudioBuffer>) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }
}

impl AudioNode for LoopStream {
    fn fill(&mut self, out: &mut [f32]) -> usize {
        let total = self.buffer.frames();
        if total == 0 {
            out.fill(0.0);
            return 0;
        }

        let samples = self.buffer.samples();
        for dst in out.chunks_exact_mut(2) {
            let i = self.position * 2;
            dst[0] = samples[i];
            dst[1] = samples[i + 1];
            self.position = (self.position + 1) % total;
        }
        out.len() / 2
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Loop
    }
}

/// Applies a live balance to its input
pub struct BalanceNode {
    input: Box<dyn AudioNode>,
    balance: Param,
}

impl BalanceNode {
    pub fn new(input: Box<dyn AudioNode>, balance: Param) -> Self {
        Self { input, balance }
    }
}

impl AudioNode for BalanceNode {
    fn fill(&mut self, out: &mut [f32]) -> usize {
        let frames = self.input.fill(out);
        let (left, right) = balance_gains(self.balance.get());
        for frame in out[..frames * 2].chunks_exact_mut(2) {
            frame[0] *= left;
            frame[1] *= right;
        }
        frames
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Balance
    }
}

/// Applies a live volume (clamped to 0.0..=1.0) to its input
pub struct VolumeNode {
    input: Box<dyn AudioNode>,
    volume: Param,
}

impl VolumeNode {
    pub fn new(input: Box<dyn AudioNode>, volume: Param) -> Self {
        Self { input, volume }
    }
}

impl AudioNode for VolumeNode {
    fn fill(&mut self, out: &mut [f32]) -> usize {
        let frames = self.input.fill(out);
        let gain = self.volume.get().clamp(0.0, 1.0);
        if gain != 1.0 {
            out[..frames * 2].iter_mut().for_each(|s| *s *= gain);
        }
        frames
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> Arc<AudioBuffer> {
        let samples = (0..frames).flat_map(|i| [i as f32, -(i as f32)]).collect();
        Arc::new(AudioBuffer::new(samples, 44100))
    }

    #[test]
    fn test_param_shared_between_clones() {
        let a = Param::new(0.5);
        let b = a.clone();
        b.set(0.25);
        assert_eq!(a.get(), 0.25);
    }

    #[test]
    fn test_balance_gains() {
        assert_eq!(balance_gains(0.0), (1.0, 1.0));
        assert_eq!(balance_gains(1.0), (0.0, 1.0));
        assert_eq!(balance_gains(-1.0), (1.0, 0.0));
        assert_eq!(balance_gains(0.5), (0.5, 1.0));
        assert_eq!(balance_gains(f32::NAN), (1.0, 1.0));
        assert_eq!(balance_gains(-4.0), (1.0, 0.0));
    }

    #[test]
    fn test_sample_node_plays_once_then_ends() {
        let mut node = SampleNode::new(ramp(3), 1.0, 0.0);
        let mut out = [9.0f32; 4];

        assert_eq!(node.fill(&mut out), 2);
        assert_eq!(out, [0.0, 0.0, 1.0, -1.0]);

        assert_eq!(node.fill(&mut out), 1);
        assert_eq!(out, [2.0, -2.0, 0.0, 0.0]);

        assert_eq!(node.fill(&mut out), 0);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn test_sample_node_applies_volume_and_balance() {
        let buffer = Arc::new(AudioBuffer::new(vec![1.0, 1.0], 44100));
        let mut node = SampleNode::new(buffer, 0.5, 1.0);
        let mut out = [0.0f32; 2];
        node.fill(&mut out);
        assert_eq!(out, [0.0, 0.5]);
    }

    #[test]
    fn test_loop_stream_wraps() {
        let mut node = LoopStream::new(ramp(2));
        let mut out = [0.0f32; 10];
        assert_eq!(node.fill(&mut out), 5);
        assert_eq!(out, [0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_loop_stream_of_empty_buffer_ends() {
        let mut node = LoopStream::new(Arc::new(AudioBuffer::silence(0, 44100)));
        let mut out = [1.0f32; 4];
        assert_eq!(node.fill(&mut out), 0);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn test_live_parameters_take_effect_on_next_fill() {
        let buffer = Arc::new(AudioBuffer::new(vec![1.0, 1.0], 44100));
        let volume = Param::new(1.0);
        let balance = Param::new(0.0);
        let mut node = VolumeNode::new(
            Box::new(BalanceNode::new(Box::new(LoopStream::new(buffer)), balance.clone())),
            volume.clone(),
        );

        let mut out = [0.0f32; 2];
        node.fill(&mut out);
        assert_eq!(out, [1.0, 1.0]);

        volume.set(0.5);
        balance.set(-1.0);
        node.fill(&mut out);
        assert_eq!(out, [0.5, 0.0]);
        assert_eq!(node.kind(), NodeKind::Volume);
    }
}
