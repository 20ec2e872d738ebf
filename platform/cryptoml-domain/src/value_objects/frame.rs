use super::series::Series;
use crate::error::{DatasetError, DatasetResult};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Keep only timestamps present in every frame.
    Inner,
    /// Keep the union of all timestamps.
    Outer,
}

/// Column-major table keyed by timestamp. Column names are unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    index: Vec<i64>,
    names: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl Frame {
    pub fn new(index: Vec<i64>) -> Self {
        Self {
            index,
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Builds a frame from series that may carry different indices; each one is aligned onto
    /// `index`.
    pub fn from_series(index: Vec<i64>, series: Vec<Series>) -> DatasetResult<Self> {
        let mut frame = Self::new(index);
        for s in series {
            frame.push_series(s)?;
        }
        Ok(frame)
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn height(&self) -> usize {
        self.index.len()
    }

    pub fn push(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> DatasetResult<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(DatasetError::UpstreamData(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.index.len()
            )));
        }
        if self.names.contains(&name) {
            return Err(DatasetError::IntegrityViolation { column: name });
        }
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    /// Adds a series, aligning it onto this frame's index by timestamp.
    pub fn push_series(&mut self, series: Series) -> DatasetResult<()> {
        let aligned = series.reindex(&self.index);
        self.push(aligned.name, aligned.values)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|pos| self.columns[pos].as_slice())
    }

    pub fn series(&self, name: &str) -> Option<Series> {
        self.column(name).map(|values| Series {
            name: name.to_string(),
            index: self.index.clone(),
            values: values.to_vec(),
        })
    }

    pub fn iter_series(&self) -> impl Iterator<Item = Series> + '_ {
        self.names.iter().zip(&self.columns).map(|(name, values)| Series {
            name: name.clone(),
            index: self.index.clone(),
            values: values.clone(),
        })
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.columns.get(col).and_then(|c| c.get(row).copied().flatten())
    }

    /// Appends `suffix` to every column name.
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        for name in &mut self.names {
            name.push_str(suffix);
        }
        self
    }

    /// Applies `f` to every column, keeping names and index.
    pub fn map_series(&self, f: impl Fn(&Series) -> Series) -> Frame {
        let mut out = Frame::new(self.index.clone());
        for s in self.iter_series() {
            let mapped = f(&s);
            out.names.push(s.name);
            out.columns.push(mapped.values);
        }
        out
    }

    /// Drops columns that are entirely missing or entirely infinite; returns their names.
    pub fn drop_unusable_columns(&mut self) -> Vec<String> {
        let mut dropped = Vec::new();
        let mut names = Vec::with_capacity(self.names.len());
        let mut columns = Vec::with_capacity(self.columns.len());
        for (name, values) in self.names.drain(..).zip(self.columns.drain(..)) {
            let unusable = values.iter().all(|v| v.map_or(true, |x| !x.is_finite()));
            if unusable {
                dropped.push(name);
            } else {
                names.push(name);
                columns.push(values);
            }
        }
        self.names = names;
        self.columns = columns;
        dropped
    }

    /// Fails fast on a non-increasing index.
    pub fn check_index(&self, label: &str) -> DatasetResult<()> {
        check_strictly_increasing(&self.index, label)
    }

    pub fn reindex(&self, index: &[i64]) -> Frame {
        let mut out = Frame::new(index.to_vec());
        for s in self.iter_series() {
            let aligned = s.reindex(index);
            out.names.push(aligned.name);
            out.columns.push(aligned.values);
        }
        out
    }

    /// Rows whose timestamp lies in `[start, end]`.
    pub fn slice_between(&self, start: i64, end: i64) -> Frame {
        let index: Vec<i64> = self
            .index
            .iter()
            .copied()
            .filter(|ts| *ts >= start && *ts <= end)
            .collect();
        self.reindex(&index)
    }

    /// Column-wise join on timestamp with a sorted result index.
    ///
    /// A column name appearing in two frames is an [`DatasetError::IntegrityViolation`].
    pub fn join(frames: &[Frame], kind: JoinKind) -> DatasetResult<Frame> {
        let mut seen: HashSet<&str> = HashSet::new();
        for frame in frames {
            for name in &frame.names {
                if !seen.insert(name.as_str()) {
                    return Err(DatasetError::IntegrityViolation {
                        column: name.clone(),
                    });
                }
            }
        }

        let index: Vec<i64> = match kind {
            JoinKind::Outer => frames
                .iter()
                .flat_map(|f| f.index.iter().copied())
                .collect::<BTreeSet<i64>>()
                .into_iter()
                .collect(),
            JoinKind::Inner => {
                let mut iter = frames.iter();
                let mut common: BTreeSet<i64> = match iter.next() {
                    Some(first) => first.index.iter().copied().collect(),
                    None => BTreeSet::new(),
                };
                for frame in iter {
                    let other: BTreeSet<i64> = frame.index.iter().copied().collect();
                    common = common.intersection(&other).copied().collect();
                }
                common.into_iter().collect()
            }
        };

        let mut out = Frame::new(index);
        for frame in frames {
            let aligned = frame.reindex(&out.index);
            out.names.extend(aligned.names);
            out.columns.extend(aligned.columns);
        }
        Ok(out)
    }
}

pub fn check_strictly_increasing(index: &[i64], label: &str) -> DatasetResult<()> {
    if let Some(pos) = index.windows(2).position(|w| w[1] <= w[0]) {
        let kind = if index[pos + 1] == index[pos] {
            "duplicate"
        } else {
            "out-of-order"
        };
        return Err(DatasetError::UpstreamData(format!(
            "{label}: {kind} timestamp {} at row {}",
            index[pos + 1],
            pos + 1
        )));
    }
    Ok(())
}
