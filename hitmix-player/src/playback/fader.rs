//! Release envelope for sustained sounds
//!
//! A stopped sustained node is not cut: it is re-added to the bus wrapped in
//! a `FadeOutNode`, which scales it down along a `FadeCurve` and ends once
//! the fade completes.

use crate::playback::nodes::{AudioNode, NodeKind};
use hitmix_common::FadeCurve;

/// Release time applied when a sustained sound is stopped
pub const DEFAULT_RELEASE_MS: u64 = 400;

/// Fades its input to silence over a fixed number of frames, then ends
pub struct FadeOutNode {
    input: Box<dyn AudioNode>,
    curve: FadeCurve,
    total_frames: usize,
    elapsed_frames: usize,
}

impl FadeOutNode {
    pub fn new(input: Box<dyn AudioNode>, fade_frames: usize, curve: FadeCurve) -> Self {
        Self {
            input,
            curve,
            total_frames: fade_frames,
            elapsed_frames: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_frames >= self.total_frames
    }

    fn gain_at(&self, frame: usize) -> f32 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.curve
            .gain_out(frame as f32 / self.total_frames as f32)
    }
}

impl AudioNode for FadeOutNode {
    fn fill(&mut self, out: &mut [f32]) -> usize {
        let remaining = self.total_frames.saturating_sub(self.elapsed_frames);
        let wanted = (out.len() / 2).min(remaining);
        if wanted == 0 {
            out.fill(0.0);
            return 0;
        }

        let produced = self.input.fill(&mut out[..wanted * 2]);
        for (i, frame) in out[..produced * 2].chunks_exact_mut(2).enumerate() {
            let gain = self.gain_at(self.elapsed_frames + i);
            frame[0] *= gain;
            frame[1] *= gain;
        }
        if let Some(tail) = out.get_mut(produced * 2..) {
            tail.fill(0.0);
        }

        self.elapsed_frames += produced;
        if produced < wanted {
            // input ended before the fade did
            self.elapsed_frames = self.total_frames;
        }
        produced
    }

    fn kind(&self) -> NodeKind {
        NodeKind::FadeOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::AudioBuffer;
    use crate::playback::nodes::{LoopStream, SampleNode};
    use std::sync::Arc;

    fn constant_loop() -> Box<dyn AudioNode> {
        Box::new(LoopStream::new(Arc::new(AudioBuffer::new(vec![1.0, 1.0], 44100))))
    }

    #[test]
    fn test_linear_fade_ramps_down_and_ends() {
        let mut node = FadeOutNode::new(constant_loop(), 4, FadeCurve::Linear);
        let mut out = [0.0f32; 12];

        let produced = node.fill(&mut out);
        assert_eq!(produced, 4);
        assert_eq!(&out[..8], &[1.0, 1.0, 0.75, 0.75, 0.5, 0.5, 0.25, 0.25]);
        assert_eq!(&out[8..], &[0.0; 4]);
        assert!(node.is_complete());

        assert_eq!(node.fill(&mut out), 0);
    }

    #[test]
    fn test_fade_spans_multiple_fills() {
        let mut node = FadeOutNode::new(constant_loop(), 4, FadeCurve::Linear);
        let mut out = [0.0f32; 4];

        assert_eq!(node.fill(&mut out), 2);
        assert_eq!(out, [1.0, 1.0, 0.75, 0.75]);
        assert_eq!(node.fill(&mut out), 2);
        assert_eq!(out, [0.5, 0.5, 0.25, 0.25]);
        assert_eq!(node.fill(&mut out), 0);
    }

    #[test]
    fn test_short_input_ends_fade_early() {
        let one_frame = Arc::new(AudioBuffer::new(vec![1.0, 1.0], 44100));
        let mut node = FadeOutNode::new(
            Box::new(SampleNode::new(one_frame, 1.0, 0.0)),
            100,
            FadeCurve::Linear,
        );
        let mut out = [0.0f32; 8];

        assert_eq!(node.fill(&mut out), 1);
        assert!(node.is_complete());
    }

    #[test]
    fn test_zero_length_fade_is_silent() {
        let mut node = FadeOutNode::new(constant_loop(), 0, FadeCurve::Linear);
        let mut out = [1.0f32; 4];
        assert_eq!(node.fill(&mut out), 0);
        assert_eq!(out, [0.0; 4]);
        assert_eq!(node.kind(), NodeKind::FadeOut);
    }
}
