//! Survivor selection and displacement accumulation.

use nalgebra::Vector2;

use crate::vision::{PointTrack, TrackPoint};

/// Points that were successfully relocated in one TRACK step.
///
/// `previous[i]` and `current[i]` are the same feature before and after the
/// step. Lost points appear in neither list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Survivors {
    pub previous: Vec<TrackPoint>,
    pub current: Vec<TrackPoint>,
    /// Residuals of the survivors whose tracker reported one.
    pub errors: Vec<f32>,
}

impl Survivors {
    /// Pair each input point with its track result and keep the found ones.
    ///
    /// A missing track result (tracker returned fewer entries than points)
    /// counts as lost.
    pub fn select(points: &[TrackPoint], tracks: &[PointTrack]) -> Self {
        let mut survivors = Self {
            previous: Vec::with_capacity(points.len()),
            current: Vec::with_capacity(points.len()),
            errors: Vec::new(),
        };
        for (old, track) in points.iter().zip(tracks) {
            if track.found {
                survivors.previous.push(*old);
                survivors.current.push(track.position);
                survivors.errors.extend(track.error);
            }
        }
        survivors
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Mean per-point pixel shift `(new - old)` over the survivors.
    ///
    /// `None` for an empty set: zero samples carry no displacement
    /// information, which is different from a zero displacement.
    pub fn mean_shift(&self) -> Option<Vector2<f64>> {
        if self.is_empty() {
            return None;
        }
        let sum = self
            .previous
            .iter()
            .zip(&self.current)
            .fold(Vector2::zeros(), |acc: Vector2<f64>, (old, new)| {
                acc + Vector2::new((new.x - old.x) as f64, (new.y - old.y) as f64)
            });
        Some(sum / self.len() as f64)
    }

    /// Mean tracker residual over the survivors that reported one.
    pub fn mean_error(&self) -> Option<f32> {
        if self.errors.is_empty() {
            return None;
        }
        Some(self.errors.iter().sum::<f32>() / self.errors.len() as f32)
    }
}

/// Running physical displacement since start-up. Never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisplacementAccumulator {
    total: Vector2<f64>,
    contributions: u64,
}

impl DisplacementAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, step: Vector2<f64>) {
        self.total += step;
        self.contributions += 1;
    }

    pub fn total(&self) -> Vector2<f64> {
        self.total
    }

    pub fn dx(&self) -> f64 {
        self.total.x
    }

    pub fn dy(&self) -> f64 {
        self.total.y
    }

    /// Number of steps added so far.
    pub fn contributions(&self) -> u64 {
        self.contributions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    fn p(x: f32, y: f32) -> TrackPoint {
        TrackPoint::new(x, y)
    }

    #[test]
    fn test_mean_shift_hand_computed() {
        let old = [p(0.0, 0.0), p(10.0, 10.0)];
        let tracks = [
            PointTrack::found(p(2.0, 1.0)),
            PointTrack::found(p(12.0, 9.0)),
        ];
        let survivors = Survivors::select(&old, &tracks);
        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors.mean_shift(), Some(Vector2::new(2.0, 0.0)));
    }

    #[test]
    fn test_lost_points_excluded_from_mean() {
        let old = [p(0.0, 0.0), p(5.0, 5.0), p(10.0, 10.0)];
        let tracks = [
            PointTrack::found(p(3.0, 0.0)),
            PointTrack::lost(),
            PointTrack::found(p(13.0, 10.0)),
        ];
        let survivors = Survivors::select(&old, &tracks);
        assert_eq!(survivors.previous, vec![p(0.0, 0.0), p(10.0, 10.0)]);
        assert_eq!(survivors.current, vec![p(3.0, 0.0), p(13.0, 10.0)]);
        // Lost point is not a zero sample.
        assert_eq!(survivors.mean_shift(), Some(Vector2::new(3.0, 0.0)));
    }

    #[test]
    fn test_mean_error_ignores_lost_points() {
        let old = [p(0.0, 0.0), p(5.0, 5.0), p(10.0, 10.0)];
        let tracks = [
            PointTrack::found(p(1.0, 0.0)).with_error(2.0),
            PointTrack::lost().with_error(100.0),
            PointTrack::found(p(11.0, 10.0)).with_error(4.0),
        ];
        let survivors = Survivors::select(&old, &tracks);
        assert_eq!(survivors.errors, vec![2.0, 4.0]);
        assert_eq!(survivors.mean_error(), Some(3.0));

        let unscored = Survivors::select(&old[..1], &[PointTrack::found(p(1.0, 0.0))]);
        assert_eq!(unscored.mean_error(), None);
    }

    #[test]
    fn test_short_track_list_counts_as_lost() {
        let old = [p(0.0, 0.0), p(1.0, 1.0)];
        let tracks = [PointTrack::found(p(1.0, 1.0))];
        let survivors = Survivors::select(&old, &tracks);
        assert_eq!(survivors.len(), 1);
    }

    #[test]
    fn test_empty_survivors_have_no_mean() {
        let old = [p(0.0, 0.0)];
        let survivors = Survivors::select(&old, &[PointTrack::lost()]);
        assert!(survivors.is_empty());
        assert_eq!(survivors.mean_shift(), None);
    }

    #[test]
    fn test_accumulator_is_exact_sum() {
        let mut rng = rand::thread_rng();
        let mut acc = DisplacementAccumulator::new();
        let mut expected = Vector2::zeros();
        for _ in 0..200 {
            let step = Vector2::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
            acc.add(step);
            expected += step;
        }
        assert_eq!(acc.contributions(), 200);
        assert_relative_eq!(acc.total(), expected, epsilon = 1e-12);
        assert_eq!(acc.dx(), acc.total().x);
        assert_eq!(acc.dy(), acc.total().y);
    }
}
