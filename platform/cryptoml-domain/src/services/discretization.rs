use crate::error::{DatasetError, DatasetResult};
use serde::{Deserialize, Serialize};

/// Class code emitted for a missing input value.
pub const MISSING_CLASS: i32 = -1;

const MIN_BIN_WIDTH: f64 = 1e-8;
const KMEANS_MAX_ITER: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetClass {
    Sell,
    Hold,
    Buy,
}

impl TargetClass {
    pub fn code(self) -> i32 {
        match self {
            Self::Sell => 0,
            Self::Hold => 1,
            Self::Buy => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Sell),
            1 => Some(Self::Hold),
            2 => Some(Self::Buy),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
            Self::Buy => "BUY",
        }
    }
}

/// Binary split: `x < threshold` is 0, anything else 1, missing is [`MISSING_CLASS`].
pub fn to_discrete_single(values: &[Option<f64>], threshold: f64) -> Vec<i32> {
    values
        .iter()
        .map(|value| match value {
            None => MISSING_CLASS,
            Some(x) if *x < threshold => 0,
            Some(_) => 1,
        })
        .collect()
}

/// Ternary split into SELL (`x <= lo`), HOLD (`lo < x < hi`) and BUY (`x >= hi`).
pub fn to_discrete_double(values: &[Option<f64>], threshold_lo: f64, threshold_hi: f64) -> Vec<i32> {
    values
        .iter()
        .map(|value| match value {
            None => MISSING_CLASS,
            Some(x) if *x <= threshold_lo => TargetClass::Sell.code(),
            Some(x) if *x < threshold_hi => TargetClass::Hold.code(),
            Some(_) => TargetClass::Buy.code(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscretizationStrategy {
    /// Equal-population bins.
    Quantile,
    /// Bins around 1-D k-means centers.
    KMeans,
}

/// Ordinal binning fitted once over a whole column.
///
/// Fitting sees every value of the column, future rows included. That is fine for offline
/// labelling; a causal variant would have to refit on an expanding window.
#[derive(Debug, Clone, PartialEq)]
pub struct BinDiscretizer {
    edges: Vec<f64>,
}

impl BinDiscretizer {
    pub fn fit(
        values: &[Option<f64>],
        n_bins: usize,
        strategy: DiscretizationStrategy,
    ) -> DatasetResult<Self> {
        if n_bins < 2 {
            return Err(DatasetError::Configuration(format!(
                "n_bins must be >= 2, got {n_bins}"
            )));
        }
        let mut sorted: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return Err(DatasetError::insufficient("bin discretizer fit", 1, 0));
        }
        sorted.sort_by(f64::total_cmp);

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        if max - min <= MIN_BIN_WIDTH {
            tracing::warn!(min, max, "constant column, collapsing to a single bin");
            return Ok(Self {
                edges: vec![min, max],
            });
        }

        let edges = match strategy {
            DiscretizationStrategy::Quantile => quantile_edges(&sorted, n_bins),
            DiscretizationStrategy::KMeans => kmeans_edges(&sorted, n_bins),
        };
        Ok(Self { edges })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len().saturating_sub(1).max(1)
    }

    /// Bin ordinal per value; missing values map to [`MISSING_CLASS`].
    pub fn transform(&self, values: &[Option<f64>]) -> Vec<i32> {
        let inner = if self.edges.len() > 2 {
            &self.edges[1..self.edges.len() - 1]
        } else {
            &[][..]
        };
        values
            .iter()
            .map(|value| match value {
                Some(x) if x.is_finite() => inner.partition_point(|edge| *edge <= *x) as i32,
                _ => MISSING_CLASS,
            })
            .collect()
    }
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn quantile_edges(sorted: &[f64], n_bins: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..=n_bins)
        .map(|k| percentile(sorted, k as f64 / n_bins as f64))
        .collect();

    let mut edges: Vec<f64> = Vec::with_capacity(raw.len());
    for edge in raw {
        match edges.last() {
            Some(last) if edge - last <= MIN_BIN_WIDTH => {}
            _ => edges.push(edge),
        }
    }
    if edges.len() - 1 < n_bins {
        tracing::warn!(
            requested = n_bins,
            kept = edges.len() - 1,
            "quantile bins too narrow, merged"
        );
    }
    edges
}

fn kmeans_edges(sorted: &[f64], n_bins: usize) -> Vec<f64> {
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let step = (max - min) / n_bins as f64;
    let mut centers: Vec<f64> = (0..n_bins)
        .map(|k| min + step * (k as f64 + 0.5))
        .collect();

    for _ in 0..KMEANS_MAX_ITER {
        let mut sums = vec![0.0; n_bins];
        let mut counts = vec![0usize; n_bins];
        for value in sorted {
            let nearest = centers
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (value - *a).abs().total_cmp(&(value - *b).abs()))
                .map(|(k, _)| k)
                .unwrap_or(0);
            sums[nearest] += value;
            counts[nearest] += 1;
        }

        let mut moved = false;
        for k in 0..n_bins {
            if counts[k] == 0 {
                continue;
            }
            let updated = sums[k] / counts[k] as f64;
            if (updated - centers[k]).abs() > f64::EPSILON * updated.abs().max(1.0) {
                moved = true;
            }
            centers[k] = updated;
        }
        if !moved {
            break;
        }
    }

    centers.sort_by(f64::total_cmp);
    let mut edges = Vec::with_capacity(n_bins + 1);
    edges.push(min);
    edges.extend(centers.windows(2).map(|w| (w[0] + w[1]) * 0.5));
    edges.push(max);
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ternary_split_follows_boundaries() {
        let pct = [Some(-0.02), Some(-0.01), Some(-0.005), Some(0.0), Some(0.01), Some(0.02), None];
        let classes = to_discrete_double(&pct, -0.01, 0.01);
        assert_eq!(classes, vec![0, 0, 1, 1, 2, 2, MISSING_CLASS]);
    }

    #[test]
    fn binary_split_at_threshold() {
        let classes = to_discrete_single(&[Some(-0.1), Some(0.0), Some(0.3), None], 0.0);
        assert_eq!(classes, vec![0, 1, 1, MISSING_CLASS]);
    }

    #[test]
    fn class_labels_round_trip_codes() {
        for class in [TargetClass::Sell, TargetClass::Hold, TargetClass::Buy] {
            assert_eq!(TargetClass::from_code(class.code()), Some(class));
        }
        assert_eq!(TargetClass::from_code(MISSING_CLASS), None);
        assert_eq!(TargetClass::Buy.label(), "BUY");
    }

    #[test]
    fn quantile_bins_have_equal_population() {
        let values: Vec<Option<f64>> = (0..9).map(|v| Some(v as f64)).collect();
        let binner = BinDiscretizer::fit(&values, 3, DiscretizationStrategy::Quantile).expect("fit");
        assert_eq!(binner.n_bins(), 3);
        let bins = binner.transform(&values);
        assert_eq!(bins, vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn quantile_merges_degenerate_edges() {
        let values: Vec<Option<f64>> = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0]
            .iter()
            .map(|v| Some(*v))
            .collect();
        let binner = BinDiscretizer::fit(&values, 3, DiscretizationStrategy::Quantile).expect("fit");
        assert!(binner.n_bins() < 3);
        assert!(binner.transform(&values).iter().all(|b| (0..3).contains(b)));
    }

    #[test]
    fn constant_column_collapses_to_one_bin() {
        let values = vec![Some(1.0); 4];
        let binner = BinDiscretizer::fit(&values, 2, DiscretizationStrategy::Quantile).expect("fit");
        assert_eq!(binner.n_bins(), 1);
        assert_eq!(binner.transform(&values), vec![0, 0, 0, 0]);
    }

    #[test]
    fn kmeans_separates_two_clusters() {
        let values: Vec<Option<f64>> = [0.0, 0.1, 0.2, 10.0, 10.1, 10.2]
            .iter()
            .map(|v| Some(*v))
            .collect();
        let binner = BinDiscretizer::fit(&values, 2, DiscretizationStrategy::KMeans).expect("fit");
        assert_eq!(binner.transform(&values), vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(binner.transform(&[None]), vec![MISSING_CLASS]);
    }

    #[test]
    fn fit_rejects_bad_input() {
        assert!(BinDiscretizer::fit(&[None, None], 3, DiscretizationStrategy::Quantile).is_err());
        assert!(BinDiscretizer::fit(&[Some(1.0)], 1, DiscretizationStrategy::Quantile).is_err());
    }
}
