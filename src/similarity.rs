use ndarray::ArrayView2;

/// Vectors with a norm below this are treated as having no direction.
pub const EPSILON: f64 = 1e-10;

/// Cosine similarity of two equal-length vectors, or `None` when either
/// vector is (numerically) zero and the angle is undefined.
pub fn try_cosine_similarity<'a, A, B>(a: A, b: B) -> Option<f64>
where
    A: IntoIterator<Item = &'a f64>,
    B: IntoIterator<Item = &'a f64>,
{
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (x, y) in a.into_iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let (norm_a, norm_b) = (norm_a.sqrt(), norm_b.sqrt());
    if norm_a < EPSILON || norm_b < EPSILON {
        None
    } else {
        Some((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
    }
}

/// Cosine similarity between two vectors; 0.0 for a zero-magnitude vector.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    try_cosine_similarity(a, b).unwrap_or(0.0)
}

/// Similarity of two `joint × axis` frames, flattened.
pub fn frame_similarity(a: ArrayView2<f64>, b: ArrayView2<f64>) -> f64 {
    debug_assert_eq!(a.shape(), b.shape());
    try_cosine_similarity(a.iter(), b.iter()).unwrap_or(0.0)
}

/// Mean of per-pair similarities, skipping pairs whose similarity is undefined.
/// Returns NaN when every pair was skipped (or there were none).
pub fn mean_frame_similarity<'a, I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (ArrayView2<'a, f64>, ArrayView2<'a, f64>)>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    for (a, b) in pairs {
        if let Some(sim) = try_cosine_similarity(a.iter(), b.iter()) {
            sum += sim;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cosine_identical() {
        let a = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 1e-10);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let zero = array![[0.0, 0.0], [0.0, 0.0]];
        let other = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(frame_similarity(zero.view(), zero.view()), 0.0);
        assert_eq!(frame_similarity(zero.view(), other.view()), 0.0);
        assert_eq!(try_cosine_similarity(zero.iter(), other.iter()), None);
    }

    #[test]
    fn test_mean_skips_degenerate_pairs() {
        let zero = array![[0.0, 0.0]];
        let a = array![[1.0, 0.0]];
        let b = array![[0.0, 1.0]];
        let mean = mean_frame_similarity([
            (a.view(), a.view()),
            (zero.view(), zero.view()),
            (a.view(), b.view()),
        ]);
        // (1 + 0) / 2, the zero pair is excluded rather than counted as 0
        assert!((mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mean_all_degenerate_is_nan() {
        let zero = array![[0.0, 0.0]];
        assert!(mean_frame_similarity([(zero.view(), zero.view())]).is_nan());
    }

    #[test]
    fn test_random_vectors_in_range() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let a: Vec<f64> = (0..8).map(|_| rng.random_range(-10.0..10.0)).collect();
            let b: Vec<f64> = (0..8).map(|_| rng.random_range(-10.0..10.0)).collect();
            let sim = cosine_similarity(&a, &b);
            assert!((-1.0..=1.0).contains(&sim));
            assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-9);
        }
    }
}
