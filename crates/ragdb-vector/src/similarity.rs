/// Cosine similarity `(u·v) / (|u| * |v|)`. Zero-magnitude inputs score 0.
pub fn cosine(u: &[f32], v: &[f32]) -> f32 {
    let (mut dot, mut nu, mut nv) = (0f64, 0f64, 0f64);
    for (a, b) in u.iter().zip(v) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        nu += a * a;
        nv += b * b;
    }
    if nu == 0.0 || nv == 0.0 {
        return 0.0;
    }
    (dot / (nu.sqrt() * nv.sqrt())) as f32
}

#[cfg(test)]
mod tests {
    use super::cosine;

    #[test]
    fn identical_orthogonal_and_diagonal() {
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine(&[1.0, 0.0], &[1.0, 1.0]) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        let s = cosine(&[0.0, 0.0], &[1.0, 1.0]);
        assert_eq!(s, 0.0);
        assert!(!s.is_nan());
    }

    #[test]
    fn magnitude_does_not_matter() {
        assert!((cosine(&[2.0, 4.0], &[0.5, 1.0]) - 1.0).abs() < 1e-6);
    }
}
