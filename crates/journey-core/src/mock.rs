//! Synthetic inference data for driving the scene without a model.

use rand::Rng;

use crate::token::{AttentionWeight, Candidate};

const MIN_WEIGHT: f64 = 0.05;
const MAX_WEIGHT: f64 = 0.95;
const DISTANCE_DECAY: f64 = 0.5;
const NOISE: f64 = 0.2;

const MOCK_VOCAB: [&str; 10] = ["the", "a", "is", "are", "in", "to", "of", "and", "for", "with"];

/// Full `token_count × token_count` attention matrix for one layer.
///
/// Tokens attend most to themselves and decay exponentially with distance,
/// plus uniform noise in ±0.1, clamped to [0.05, 0.95].
pub fn generate_mock_attention(
    token_count: usize,
    layer: usize,
    rng: &mut impl Rng,
) -> Vec<AttentionWeight> {
    let mut weights = Vec::with_capacity(token_count * token_count);
    for query in 0..token_count {
        for key in 0..token_count {
            let distance = query.abs_diff(key) as f64;
            let base = MAX_WEIGHT * (-distance * DISTANCE_DECAY).exp();
            let noise = (rng.random::<f64>() - 0.5) * NOISE;
            weights.push(AttentionWeight {
                query,
                key,
                weight: (base + noise).clamp(MIN_WEIGHT, MAX_WEIGHT),
                layer,
            });
        }
    }
    weights
}

/// Mock attention for layers `0..layers`.
pub fn generate_all_layers(
    token_count: usize,
    layers: usize,
    rng: &mut impl Rng,
) -> Vec<AttentionWeight> {
    let mut weights = Vec::with_capacity(layers * token_count * token_count);
    for layer in 0..layers {
        weights.extend(generate_mock_attention(token_count, layer, rng));
    }
    weights
}

/// Numerically stable softmax. All-zero output when the exponentials vanish.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let Some(max) = logits.iter().copied().reduce(f64::max) else {
        return Vec::new();
    };
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum == 0.0 {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Nucleus sampling: draw from the smallest high-probability set whose
/// mass reaches `top_p`. Returns an index into `probs`.
pub fn sample_top_p(probs: &[f64], top_p: f64, rng: &mut impl Rng) -> usize {
    let mut ranked: Vec<(usize, f64)> = probs.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut cumulative = 0.0;
    let mut nucleus = Vec::new();
    for item in ranked {
        cumulative += item.1;
        nucleus.push(item);
        if cumulative >= top_p {
            break;
        }
    }
    let Some(&(first, _)) = nucleus.first() else {
        return 0;
    };

    let target = rng.random::<f64>() * cumulative;
    let mut acc = 0.0;
    for (index, p) in nucleus {
        acc += p;
        if target <= acc {
            return index;
        }
    }
    first
}

/// Five candidates over a small fixed vocabulary, sorted by probability.
pub fn generate_mock_candidates(temperature: f64, rng: &mut impl Rng) -> Vec<Candidate> {
    let temperature = temperature.max(f64::EPSILON);
    let logits: Vec<f64> = MOCK_VOCAB
        .iter()
        .map(|_| (rng.random::<f64>() * 10.0 - 5.0) / temperature)
        .collect();
    let probs = softmax(&logits);

    let mut ranked: Vec<(usize, f64)> = probs.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(5)
        .map(|(index, p)| Candidate::new(MOCK_VOCAB[index], p, index as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn test_attention_shape_and_bounds() {
        let weights = generate_mock_attention(4, 2, &mut rng());
        assert_eq!(weights.len(), 16);
        assert!(weights.iter().all(|w| w.layer == 2));
        assert!(weights.iter().all(|w| (MIN_WEIGHT..=MAX_WEIGHT).contains(&w.weight)));
    }

    #[test]
    fn test_attention_decays_with_distance() {
        let weights = generate_mock_attention(8, 0, &mut rng());
        let at = |q: usize, k: usize| weights[q * 8 + k].weight;
        // Self-attention sits at the clamp ceiling minus at most the noise
        assert!(at(3, 3) > 0.8);
        assert!(at(0, 7) < 0.2);
    }

    #[test]
    fn test_attention_empty() {
        assert!(generate_mock_attention(0, 0, &mut rng()).is_empty());
    }

    #[test]
    fn test_all_layers() {
        let weights = generate_all_layers(3, 5, &mut rng());
        assert_eq!(weights.len(), 45);
        assert_eq!(weights.last().map(|w| w.layer), Some(4));
    }

    #[test]
    fn test_softmax() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_top_p_stays_in_nucleus() {
        let probs = [0.7, 0.2, 0.05, 0.05];
        let mut rng = rng();
        for _ in 0..100 {
            let i = sample_top_p(&probs, 0.8, &mut rng);
            assert!(i == 0 || i == 1, "sampled {i}");
        }
    }

    #[test]
    fn test_mock_candidates() {
        let candidates = generate_mock_candidates(1.0, &mut rng());
        assert_eq!(candidates.len(), 5);
        assert!(candidates.windows(2).all(|w| w[0].probability >= w[1].probability));
        assert!(candidates.iter().all(|c| MOCK_VOCAB.contains(&c.token.as_str())));
    }
}
