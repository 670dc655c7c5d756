use std::cmp::Ordering;

use crate::core::config::DistanceMetric;
use crate::core::errors::RagError;

fn check_dimensions(query: &[f32], candidate: &[f32]) -> Result<(), RagError> {
    if query.is_empty() || query.len() != candidate.len() {
        return Err(RagError::Dimension {
            expected: candidate.len(),
            actual: query.len(),
        });
    }
    Ok(())
}

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, RagError> {
    check_dimensions(query, candidate)?;

    let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
    let denom = l2_norm(query) * l2_norm(candidate);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok(dot / denom)
}

/// Squared Euclidean distance, the score a flat L2 index reports.
pub fn squared_l2_distance(query: &[f32], candidate: &[f32]) -> Result<f32, RagError> {
    check_dimensions(query, candidate)?;

    Ok(query
        .iter()
        .zip(candidate)
        .map(|(a, b)| (a - b) * (a - b))
        .sum())
}

/// Ranks candidates best first. Scores are distances for `Euclidean`
/// (ascending) and similarities for `Cosine` (descending).
pub fn rank(
    metric: DistanceMetric,
    query: &[f32],
    candidates: &[Vec<f32>],
) -> Result<Vec<(usize, f32)>, RagError> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = match metric {
            DistanceMetric::Euclidean => squared_l2_distance(query, candidate)?,
            DistanceMetric::Cosine => cosine_similarity(query, candidate)?,
        };
        scores.push((idx, score));
    }

    match metric {
        DistanceMetric::Euclidean => {
            scores.sort_by(|left, right| left.1.partial_cmp(&right.1).unwrap_or(Ordering::Equal))
        }
        DistanceMetric::Cosine => {
            scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal))
        }
    }
    Ok(scores)
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}
