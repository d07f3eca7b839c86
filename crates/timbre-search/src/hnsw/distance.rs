/// Squared Euclidean distance between two vectors of equal length.
///
/// Accumulates in four lanes so the compiler can vectorize the loop.
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut lanes = [0.0_f32; 4];
    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let tail_a = chunks_a.remainder();
    let tail_b = chunks_b.remainder();

    for (ca, cb) in chunks_a.zip(chunks_b) {
        for lane in 0..4 {
            let d = ca[lane] - cb[lane];
            lanes[lane] += d * d;
        }
    }

    let tail: f32 = tail_a
        .iter()
        .zip(tail_b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum();

    lanes.iter().sum::<f32>() + tail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors_are_zero() {
        let v = [0.1, 0.2, 0.3, 0.4, 0.5];
        assert_eq!(squared_l2(&v, &v), 0.0);
    }

    #[test]
    fn test_known_distance() {
        assert!((squared_l2(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_chunked_and_tail_agree_with_naive() {
        let a: Vec<f32> = (0..19).map(|i| i as f32 * 0.5).collect();
        let b: Vec<f32> = (0..19).map(|i| (19 - i) as f32 * 0.25).collect();
        let naive: f32 = a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum();
        assert!((squared_l2(&a, &b) - naive).abs() < 1e-3);
    }
}
