//! Distance and centroid calculations
//!
//! Scalar and vector distances, the geometric centroid of a tuple, and the
//! spread measures used to score multi-way matches.

use crate::algorithm::matching::candidate::Scores;

/// Absolute difference of two scalar scores
#[must_use]
pub fn scalar_distance(a: f64, b: f64) -> f64 {
    (a - b).abs()
}

/// Squared Euclidean distance
#[must_use]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Euclidean distance; reduces to [`scalar_distance`] in one dimension
#[must_use]
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() == 1 && b.len() == 1 {
        return scalar_distance(a[0], b[0]);
    }
    squared_distance(a, b).sqrt()
}

/// Coordinate-wise mean of a set of points
#[must_use]
pub fn centroid(points: &[&[f64]]) -> Scores {
    let Some(first) = points.first() else {
        return Scores::new();
    };
    let n = points.len() as f64;
    (0..first.len())
        .map(|axis| points.iter().map(|p| p[axis]).sum::<f64>() / n)
        .collect()
}

/// Sum of distances from each point to the centroid
#[must_use]
pub fn spread(points: &[&[f64]]) -> f64 {
    let c = centroid(points);
    points.iter().map(|p| euclidean_distance(p, &c)).sum()
}

/// Sum of squared distances from each point to the centroid
///
/// Squaring penalizes tuples with one distant member more than tuples whose
/// members are evenly spread.
#[must_use]
pub fn penalized_distance(points: &[&[f64]]) -> f64 {
    let c = centroid(points);
    points.iter().map(|p| squared_distance(p, &c)).sum()
}

/// Perimeter of the triangle spanned by three points
#[must_use]
pub fn perimeter(a: &[f64], b: &[f64], c: &[f64]) -> f64 {
    euclidean_distance(a, b) + euclidean_distance(b, c) + euclidean_distance(c, a)
}

/// Integer bucket of a score rounded to `digits` decimals
#[must_use]
pub fn round_to_digits(score: f64, digits: i32) -> i64 {
    (score * 10f64.powi(digits)).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_scalar_and_vector_distance() {
        assert!((scalar_distance(0.2, 0.5) - 0.3).abs() < EPS);
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < EPS);
        assert!((squared_distance(&[1.0, 1.0], &[2.0, 3.0]) - 5.0).abs() < EPS);
        assert!((euclidean_distance(&[0.7], &[0.2]) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_centroid_and_spread() {
        let a = [0.0, 0.0];
        let b = [2.0, 0.0];
        let c = [1.0, 3.0];
        let points: [&[f64]; 3] = [&a, &b, &c];

        let centre = centroid(&points);
        assert!((centre[0] - 1.0).abs() < EPS);
        assert!((centre[1] - 1.0).abs() < EPS);

        // distances to (1,1): sqrt2, sqrt2, 2
        let expected_spread = 2.0 * 2f64.sqrt() + 2.0;
        assert!((spread(&points) - expected_spread).abs() < EPS);

        // squared distances: 2, 2, 4
        assert!((penalized_distance(&points) - 8.0).abs() < EPS);
        assert!(centroid(&[]).is_empty());
    }

    #[test]
    fn test_perimeter() {
        let p = perimeter(&[0.0, 0.0], &[3.0, 0.0], &[3.0, 4.0]);
        assert!((p - 12.0).abs() < EPS);
    }

    #[test]
    fn test_round_to_digits() {
        assert_eq!(round_to_digits(0.123_456, 3), 123);
        assert_eq!(round_to_digits(0.123_556, 3), 124);
        assert_eq!(round_to_digits(0.99, 1), 10);
        assert_eq!(round_to_digits(0.04, 1), 0);
    }
}
