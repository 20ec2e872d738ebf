use crate::error::{DatasetError, DatasetResult};

/// Keeps finite values, maps NaN and +/-inf to missing.
///
/// Every transform in this crate routes its arithmetic through this, so a division by zero
/// never leaks an infinity into a frame.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// A named time series: strictly increasing timestamps (epoch seconds) and values that are
/// either present or missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub index: Vec<i64>,
    pub values: Vec<Option<f64>>,
}

impl Series {
    pub fn new(
        name: impl Into<String>,
        index: Vec<i64>,
        values: Vec<Option<f64>>,
    ) -> DatasetResult<Self> {
        let name = name.into();
        if index.len() != values.len() {
            return Err(DatasetError::UpstreamData(format!(
                "series '{}' has {} timestamps but {} values",
                name,
                index.len(),
                values.len()
            )));
        }
        Ok(Self {
            name,
            index,
            values,
        })
    }

    /// Builds a series from dense floats; non-finite inputs become missing.
    pub fn from_dense(name: impl Into<String>, index: &[i64], values: &[f64]) -> Self {
        Self {
            name: name.into(),
            index: index.to_vec(),
            values: values.iter().copied().map(finite).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Shifts values by `periods` positions while keeping the index.
    ///
    /// Positive periods lag (`out[t] = self[t - periods]`), negative periods lead
    /// (`out[t] = self[t + |periods|]`). Positions without a source are missing.
    pub fn shift(&self, periods: isize) -> Series {
        let n = self.len();
        let values = (0..n)
            .map(|t| {
                let source = t as isize - periods;
                if source < 0 || source >= n as isize {
                    None
                } else {
                    self.values[source as usize]
                }
            })
            .collect();
        Series {
            name: self.name.clone(),
            index: self.index.clone(),
            values,
        }
    }

    /// Propagates the last present value forward over missing positions.
    pub fn ffill(&self) -> Series {
        let mut last = None;
        let values = self
            .values
            .iter()
            .map(|value| {
                if value.is_some() {
                    last = *value;
                }
                last
            })
            .collect();
        Series {
            name: self.name.clone(),
            index: self.index.clone(),
            values,
        }
    }

    /// `value[t] / value[t - periods] - 1`, computed on the forward-filled series.
    ///
    /// The first `periods` positions are missing, as is any position whose base is zero.
    pub fn pct_change(&self, periods: usize) -> Series {
        let filled = self.ffill();
        let values = (0..self.len())
            .map(|t| {
                if t < periods {
                    return None;
                }
                match (filled.values[t], filled.values[t - periods]) {
                    (Some(current), Some(base)) => finite(current / base - 1.0),
                    _ => None,
                }
            })
            .collect();
        Series {
            name: self.name.clone(),
            index: self.index.clone(),
            values,
        }
    }

    /// Element-wise difference of two series sharing one index.
    pub fn sub(&self, other: &Series) -> DatasetResult<Series> {
        if self.index != other.index {
            return Err(DatasetError::UpstreamData(format!(
                "cannot subtract '{}' from '{}': indices differ",
                other.name, self.name
            )));
        }
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => finite(a - b),
                _ => None,
            })
            .collect();
        Ok(Series {
            name: format!("{}_{}", self.name, other.name),
            index: self.index.clone(),
            values,
        })
    }

    /// Population standard deviation over a trailing window; a window containing a missing
    /// value yields missing.
    pub fn rolling_std(&self, window: usize) -> Series {
        let n = self.len();
        let mut values = vec![None; n];
        if window > 0 {
            for t in (window - 1)..n {
                let slice = &self.values[t + 1 - window..=t];
                if slice.iter().any(Option::is_none) {
                    continue;
                }
                let w = window as f64;
                let mean = slice.iter().flatten().sum::<f64>() / w;
                let var = slice
                    .iter()
                    .flatten()
                    .map(|v| (v - mean) * (v - mean))
                    .sum::<f64>()
                    / w;
                values[t] = finite(var.max(0.0).sqrt());
            }
        }
        Series {
            name: self.name.clone(),
            index: self.index.clone(),
            values,
        }
    }

    /// Values at the requested timestamps; timestamps absent from this series are missing.
    pub fn reindex(&self, index: &[i64]) -> Series {
        let values = if index == self.index.as_slice() {
            self.values.clone()
        } else {
            index
                .iter()
                .map(|ts| {
                    self.index
                        .binary_search(ts)
                        .ok()
                        .and_then(|pos| self.values[pos])
                })
                .collect()
        };
        Series {
            name: self.name.clone(),
            index: index.to_vec(),
            values,
        }
    }

    pub fn first_valid(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }

    pub fn last_valid(&self) -> Option<usize> {
        self.values.iter().rposition(Option::is_some)
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// All values if none is missing.
    pub fn dense(&self) -> Option<Vec<f64>> {
        self.values.iter().copied().collect()
    }
}
