//! Minutes-weighted percentile ranks.

use thiserror::Error;

use crate::models::StatField;

/// Errors from ranking a single field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PercentileError {
    /// Nothing to rank, or every weight is zero.
    #[error("No weighted entries to rank")]
    NoWeight,

    #[error("Invalid weight {weight} at position {index}")]
    InvalidWeight { index: usize, weight: f64 },
}

/// A stat value and the weight (minutes) behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedValue {
    pub value: f64,
    pub weight: f64,
}

impl WeightedValue {
    pub fn new(value: f64, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Midpoint weighted percentile rank of every entry, returned in input order.
///
/// Entries are stably sorted by value, and each one is placed at the middle of
/// its own weight mass: `100 * (cumulative - weight / 2) / total`. A single
/// entry therefore ranks exactly 50, and an entry with a large weight is not
/// pushed to an extreme by its own minutes.
pub fn weighted_percentiles(entries: &[WeightedValue]) -> Result<Vec<f64>, PercentileError> {
    for (index, entry) in entries.iter().enumerate() {
        if !entry.weight.is_finite() || entry.weight < 0.0 {
            return Err(PercentileError::InvalidWeight {
                index,
                weight: entry.weight,
            });
        }
    }

    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| entries[a].value.total_cmp(&entries[b].value));

    let cumulative: Vec<f64> = order
        .iter()
        .scan(0.0, |acc, &i| {
            *acc += entries[i].weight;
            Some(*acc)
        })
        .collect();

    let total = match cumulative.last() {
        Some(&total) if total > 0.0 => total,
        _ => return Err(PercentileError::NoWeight),
    };

    let mut percentiles = vec![0.0; entries.len()];
    for (rank, &input) in order.iter().enumerate() {
        let weight = entries[input].weight;
        percentiles[input] = 100.0 * (cumulative[rank] - weight / 2.0) / total;
    }

    Ok(percentiles)
}

/// Percentile as it should be rendered: flipped for fields where lower is
/// better.
pub fn display_percentile(field: StatField, percentile: f64) -> f64 {
    if field.is_inverted() {
        100.0 - percentile
    } else {
        percentile
    }
}
