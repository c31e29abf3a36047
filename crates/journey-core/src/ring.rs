//! Probability ring: one torus slice per next-token candidate.

use std::f64::consts::TAU;

use serde::Serialize;

use crate::token::Candidate;
use crate::vec3::Vec3;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RingSegment {
    pub token: String,
    pub token_id: u32,
    pub probability: f64,
    /// Angle where the slice begins.
    pub start_angle: f64,
    /// Angular span, `probability × 2π`.
    pub arc_angle: f64,
    /// Label anchor at the slice's angular midpoint.
    pub position: Vec3,
}

impl RingSegment {
    pub fn center_angle(&self) -> f64 {
        self.start_angle + self.arc_angle / 2.0
    }
}

/// Lay out the `top_k` most probable candidates back to back from angle 0.
/// `out` is cleared first.
pub fn compute_ring_segments(
    candidates: &[Candidate],
    radius: f64,
    top_k: usize,
    out: &mut Vec<RingSegment>,
) {
    out.clear();
    if candidates.is_empty() {
        return;
    }

    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    let mut angle = 0.0;
    for candidate in ranked.into_iter().take(top_k) {
        let arc_angle = candidate.probability * TAU;
        let mid = angle + arc_angle / 2.0;
        out.push(RingSegment {
            token: candidate.token.clone(),
            token_id: candidate.token_id,
            probability: candidate.probability,
            start_angle: angle,
            arc_angle,
            position: Vec3::new(mid.cos() * radius, 0.0, mid.sin() * radius),
        });
        angle += arc_angle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn layout(probs: &[f64]) -> Vec<RingSegment> {
        let candidates: Vec<_> = probs
            .iter()
            .enumerate()
            .map(|(i, p)| Candidate::new(format!("t{i}"), *p, i as u32))
            .collect();
        let mut out = Vec::new();
        compute_ring_segments(&candidates, 2.0, 8, &mut out);
        out
    }

    #[test]
    fn test_spans_follow_probabilities() {
        let segments = layout(&[0.5, 0.3, 0.2]);
        let spans: Vec<f64> = segments.iter().map(|s| s.arc_angle).collect();
        assert_relative_eq!(spans[0], PI);
        assert_relative_eq!(spans[1], 0.6 * PI);
        assert_relative_eq!(spans[2], 0.4 * PI);
        assert_relative_eq!(spans.iter().sum::<f64>(), TAU);
    }

    #[test]
    fn test_contiguous_from_zero() {
        let segments = layout(&[0.5, 0.3, 0.2]);
        assert_eq!(segments[0].start_angle, 0.0);
        for pair in segments.windows(2) {
            assert_relative_eq!(pair[1].start_angle, pair[0].start_angle + pair[0].arc_angle);
        }
    }

    #[test]
    fn test_sorted_descending() {
        let segments = layout(&[0.1, 0.6, 0.3]);
        let tokens: Vec<&str> = segments.iter().map(|s| s.token.as_str()).collect();
        assert_eq!(tokens, vec!["t1", "t2", "t0"]);
    }

    #[test]
    fn test_keeps_top_k() {
        let probs = vec![0.1; 10];
        assert_eq!(layout(&probs).len(), 8);
    }

    #[test]
    fn test_label_at_midpoint() {
        let segments = layout(&[0.5, 0.5]);
        assert_relative_eq!(segments[0].center_angle(), PI / 2.0);
        assert_relative_eq!(segments[0].position.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(segments[0].position.z, 2.0);
        assert_relative_eq!(segments[1].position.z, -2.0);
    }

    #[test]
    fn test_empty() {
        assert!(layout(&[]).is_empty());
    }
}
