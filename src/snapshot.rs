//! Read-only per-tick view handed to renderers and recorders.

use crate::evaluator::AgentId;
use crate::stream::ObstacleStream;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleView {
    pub x: f32,
    pub gap_top: i32,
    pub gap_bottom: i32,
    pub top_segment_y: i32,
    pub bottom_segment_y: i32,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyView {
    pub id: AgentId,
    pub x: f32,
    pub y: f32,
    pub velocity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generation: u64,
    pub tick: u64,
    pub score: u64,
    pub obstacles: Vec<ObstacleView>,
    pub bodies: Vec<BodyView>,
}

impl Snapshot {
    pub(crate) fn obstacle_views(stream: &ObstacleStream) -> Vec<ObstacleView> {
        stream
            .obstacles()
            .iter()
            .map(|o| ObstacleView {
                x: o.x,
                gap_top: o.gap_top(),
                gap_bottom: o.gap_bottom(),
                top_segment_y: o.top_segment_y(),
                bottom_segment_y: o.bottom_segment_y(),
                passed: o.passed,
            })
            .collect()
    }
}

/// Receives a snapshot after every simulated tick.
pub trait FrameObserver {
    fn observe(&mut self, snapshot: &Snapshot);
}

/// Discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FrameObserver for NoopObserver {
    fn observe(&mut self, _snapshot: &Snapshot) {}
}

impl<F: FnMut(&Snapshot)> FrameObserver for F {
    fn observe(&mut self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

/// Writes one JSON object per frame. The first write error stops recording and
/// is reported by [`JsonLinesRecorder::finish`].
pub struct JsonLinesRecorder<W: Write> {
    out: W,
    frames: u64,
    error: Option<std::io::Error>,
}

impl<W: Write> JsonLinesRecorder<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            frames: 0,
            error: None,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_frame(&mut self, snapshot: &Snapshot) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, snapshot)?;
        self.out.write_all(b"\n")
    }
}

impl<W: Write> FrameObserver for JsonLinesRecorder<W> {
    fn observe(&mut self, snapshot: &Snapshot) {
        if self.error.is_some() {
            return;
        }
        match self.write_frame(snapshot) {
            Ok(()) => self.frames += 1,
            Err(err) => {
                log::warn!("frame recording stopped at tick {}: {}", snapshot.tick, err);
                self.error = Some(err);
            }
        }
    }
}
