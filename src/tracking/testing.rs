//! Scripted vision fakes over integer frames for state-machine tests.

use std::collections::{HashMap, HashSet};

use anyhow::Result;

use crate::vision::{CornerDetector, PointTrack, SparseOpticalFlow, TrackPoint};

pub(crate) type Frame = u32;

/// Returns scripted seeds per frame id; nothing for unscripted frames.
#[derive(Default)]
pub(crate) struct ScriptedDetector {
    pub(crate) seeds: HashMap<Frame, Vec<TrackPoint>>,
    pub(crate) calls: Vec<Frame>,
}

impl ScriptedDetector {
    pub(crate) fn with(mut self, frame: Frame, seeds: Vec<TrackPoint>) -> Self {
        self.seeds.insert(frame, seeds);
        self
    }
}

impl CornerDetector<Frame> for ScriptedDetector {
    fn detect(&mut self, image: &Frame) -> Result<Vec<TrackPoint>> {
        self.calls.push(*image);
        Ok(self.seeds.get(image).cloned().unwrap_or_default())
    }
}

/// Shifts every point by a constant; can lose everything or selected
/// indices when tracking into chosen frames.
pub(crate) struct ShiftFlow {
    pub(crate) shift: (f32, f32),
    pub(crate) lose_all_into: HashSet<Frame>,
    pub(crate) lose_index: Option<usize>,
    pub(crate) calls: Vec<(Frame, Frame, usize)>,
}

impl ShiftFlow {
    pub(crate) fn new(dx: f32, dy: f32) -> Self {
        Self {
            shift: (dx, dy),
            lose_all_into: HashSet::new(),
            lose_index: None,
            calls: Vec::new(),
        }
    }
}

impl SparseOpticalFlow<Frame> for ShiftFlow {
    fn track(
        &mut self,
        prev: &Frame,
        next: &Frame,
        points: &[TrackPoint],
    ) -> Result<Vec<PointTrack>> {
        self.calls.push((*prev, *next, points.len()));
        Ok(points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if self.lose_all_into.contains(next) || self.lose_index == Some(i) {
                    PointTrack::lost()
                } else {
                    PointTrack::found(TrackPoint::new(p.x + self.shift.0, p.y + self.shift.1))
                }
            })
            .collect())
    }
}

pub(crate) fn three_corners() -> Vec<TrackPoint> {
    vec![
        TrackPoint::new(10.0, 10.0),
        TrackPoint::new(50.0, 20.0),
        TrackPoint::new(30.0, 40.0),
    ]
}
