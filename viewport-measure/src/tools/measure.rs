use bevy::prelude::*;
use constants::measurement::DISTANCE_DECIMALS;
use serde::{Deserialize, Serialize};

/// Round a reported distance to the display precision.
pub fn round_distance(value: f32) -> f32 {
    let scale = 10f32.powi(DISTANCE_DECIMALS);
    (value * scale).round() / scale
}

/// Euclidean distance between two world points, rounded for reporting.
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    round_distance(a.distance(b))
}

/// Componentwise average of two world points.
pub fn midpoint(a: Vec3, b: Vec3) -> Vec3 {
    (a + b) * 0.5
}

/// One measured leg between consecutive picked points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: usize,
    pub start: Vec3,
    pub end: Vec3,
    pub distance: f32,
    pub midpoint: Vec3,
}

impl Segment {
    pub fn between(index: usize, start: Vec3, end: Vec3) -> Self {
        Self {
            index,
            start,
            end,
            distance: distance(start, end),
            midpoint: midpoint(start, end),
        }
    }
}

/// Ordered world-space points picked by the ruler.
///
/// Points are stored at full precision and only rounded when a distance is
/// reported. Every mutation bumps `revision` exactly once, including
/// clearing an already empty model; observers compare revisions to learn
/// about changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementModel {
    points: Vec<Vec3>,
    revision: u64,
}

impl MeasurementModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, point: Vec3) {
        self.points.push(point);
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.revision += 1;
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Consecutive legs `points[i] → points[i + 1]`; empty below two points.
    pub fn segments(&self) -> Vec<Segment> {
        self.points
            .windows(2)
            .enumerate()
            .map(|(index, pair)| Segment::between(index, pair[0], pair[1]))
            .collect()
    }

    /// Length of the whole chain as the sum of the reported leg distances.
    pub fn total_length(&self) -> f32 {
        round_distance(self.segments().iter().map(|s| s.distance).sum())
    }

    pub fn snapshot(&self) -> MeasurementSnapshot {
        MeasurementSnapshot {
            points: self.points.iter().map(|p| p.to_array()).collect(),
            segments: self.segments(),
            total_length: self.total_length(),
        }
    }
}

/// Serializable view of a model for the frontend bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSnapshot {
    pub points: Vec<[f32; 3]>,
    pub segments: Vec<Segment>,
    pub total_length: f32,
}
