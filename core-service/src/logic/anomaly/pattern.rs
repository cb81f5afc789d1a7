//! Known-pattern matching
//!
//! Similarity is the Pearson correlation between the most recent power
//! readings and a template shape, clipped to [0, 1]. Anti-correlated or
//! flat windows score 0.

use serde::{Deserialize, Serialize};

/// Named power envelope (dBm or any affine scale of it)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternTemplate {
    pub name: String,
    pub shape: Vec<f64>,
}

/// Pearson correlation of two equal-length series, clipped to [0, 1]
pub fn similarity(window: &[f64], template: &[f64]) -> f64 {
    if window.len() != template.len() || window.len() < 2 {
        return 0.0;
    }

    let n = window.len() as f64;
    let mean_w = window.iter().sum::<f64>() / n;
    let mean_t = template.iter().sum::<f64>() / n;

    let (mut cov, mut var_w, mut var_t) = (0.0, 0.0, 0.0);
    for (w, t) in window.iter().zip(template) {
        let dw = w - mean_w;
        let dt = t - mean_t;
        cov += dw * dt;
        var_w += dw * dw;
        var_t += dt * dt;
    }

    let denom = (var_w * var_t).sqrt();
    if !(denom.is_finite() && denom > f64::EPSILON) {
        return 0.0;
    }
    let r = cov / denom;
    if r.is_finite() {
        r.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Best-scoring template against the tail of `powers`
pub fn best_match<'a>(powers: &[f64], templates: &'a [PatternTemplate]) -> Option<(&'a PatternTemplate, f64)> {
    templates
        .iter()
        .filter(|t| t.shape.len() >= 2 && t.shape.len() <= powers.len())
        .map(|t| {
            let tail = &powers[powers.len() - t.shape.len()..];
            (t, similarity(tail, &t.shape))
        })
        .fold(None, |best: Option<(&PatternTemplate, f64)>, (t, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((t, score)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str, shape: &[f64]) -> PatternTemplate {
        PatternTemplate {
            name: name.to_string(),
            shape: shape.to_vec(),
        }
    }

    #[test]
    fn test_identical_shape_scores_one() {
        let shape = [-90.0, -40.0, -90.0, -40.0];
        assert!((similarity(&shape, &shape) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_offset_and_scale_invariant() {
        let window = [-90.0, -40.0, -90.0, -40.0];
        let template = [0.0, 1.0, 0.0, 1.0];
        assert!((similarity(&window, &template) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_anti_correlation_clipped_to_zero() {
        let window = [-90.0, -40.0, -90.0, -40.0];
        let template = [1.0, 0.0, 1.0, 0.0];
        assert_eq!(similarity(&window, &template), 0.0);
    }

    #[test]
    fn test_flat_inputs_score_zero() {
        assert_eq!(similarity(&[-60.0; 4], &[0.0, 1.0, 0.0, 1.0]), 0.0);
        assert_eq!(similarity(&[-60.0, -50.0], &[1.0, 1.0]), 0.0);
        assert_eq!(similarity(&[-60.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_best_match_uses_tail_and_picks_highest() {
        let powers = [-100.0, -100.0, -90.0, -40.0, -90.0, -40.0];
        let templates = vec![
            template("ook", &[0.0, 1.0, 0.0, 1.0]),
            template("ramp", &[0.0, 1.0, 2.0, 3.0]),
            template("too_long", &[0.0; 10]),
        ];
        let (best, score) = best_match(&powers, &templates).unwrap();
        assert_eq!(best.name, "ook");
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_best_match_none_without_templates() {
        assert!(best_match(&[-60.0, -50.0], &[]).is_none());
    }
}
