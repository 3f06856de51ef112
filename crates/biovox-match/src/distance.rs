use biovox_features::Matrix;

pub fn euclidean_distance(a: &Matrix, b: &Matrix) -> f32 {
    let a = a.as_flat();
    let b = b.as_flat();
    if a.len() != b.len() || a.is_empty() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

pub fn cosine_distance(a: &Matrix, b: &Matrix) -> f32 {
    let a = a.as_flat();
    let b = b.as_flat();
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|y| y * y).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_of_identical_matrix_is_zero() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0]]);
        assert_eq!(euclidean_distance(&m, &m), 0.0);
    }

    #[test]
    fn cosine_of_identical_nonzero_matrix_is_zero() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0]]);
        assert!(cosine_distance(&m, &m) < 1e-5);
    }

    #[test]
    fn cosine_of_zero_vectors_is_one() {
        let m = Matrix::zeros(1, 3);
        assert_eq!(cosine_distance(&m, &m), 1.0);
    }
}
