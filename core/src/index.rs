use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use ndarray::SliceInfoElem;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("index has {given} entries but the array has {ndim} axes")]
    TooManyEntries { given: usize, ndim: usize },
    #[error("index may contain at most one ellipsis")]
    MultipleEllipses,
    #[error("step {step} on axis {axis} is not supported, axes must stay contiguous")]
    NonUnitStep { axis: usize, step: usize },
    #[error("index {index} is out of bounds for axis {axis} with length {len}")]
    OutOfBounds {
        index: usize,
        axis: usize,
        len: usize,
    },
}

/// A single entry of a NumPy-style index expression, before it has been
/// resolved against a concrete array shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexExpr {
    /// Select a single element, dropping the axis.
    At(usize),
    /// Select a half-open range, keeping the axis. `None` bounds default to
    /// the start/end of the axis. Only `step == 1` is accepted.
    Span {
        start: Option<usize>,
        end: Option<usize>,
        step: usize,
    },
    /// Expands to as many full spans as needed to cover unnamed axes.
    Ellipsis,
}

impl IndexExpr {
    pub fn all() -> Self {
        IndexExpr::Span {
            start: None,
            end: None,
            step: 1,
        }
    }

    pub fn span(start: usize, end: usize) -> Self {
        IndexExpr::Span {
            start: Some(start),
            end: Some(end),
            step: 1,
        }
    }
}

impl From<usize> for IndexExpr {
    fn from(i: usize) -> Self {
        IndexExpr::At(i)
    }
}

impl From<Range<usize>> for IndexExpr {
    fn from(r: Range<usize>) -> Self {
        IndexExpr::span(r.start, r.end)
    }
}

impl From<RangeFrom<usize>> for IndexExpr {
    fn from(r: RangeFrom<usize>) -> Self {
        IndexExpr::Span {
            start: Some(r.start),
            end: None,
            step: 1,
        }
    }
}

impl From<RangeTo<usize>> for IndexExpr {
    fn from(r: RangeTo<usize>) -> Self {
        IndexExpr::Span {
            start: None,
            end: Some(r.end),
            step: 1,
        }
    }
}

impl From<RangeFull> for IndexExpr {
    fn from(_: RangeFull) -> Self {
        IndexExpr::all()
    }
}

/// One entry of an index expression after resolution against a shape:
/// bounds filled in, clamped, and the ellipsis expanded away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisIndex {
    At(usize),
    /// Half-open `start..end` with unit step.
    Span { start: usize, end: usize },
}

impl AxisIndex {
    pub fn is_scalar(&self) -> bool {
        matches!(self, AxisIndex::At(_))
    }

    /// Length of the axis after indexing, `None` for a dropped axis.
    pub fn kept_len(&self) -> Option<usize> {
        match self {
            AxisIndex::At(_) => None,
            AxisIndex::Span { start, end } => Some(end - start),
        }
    }
}

/// Resolves an index expression against `shape`: expands the ellipsis and
/// missing trailing axes to full spans, fills in span bounds (out-of-range
/// span bounds clamp like NumPy), and bounds-checks scalar entries.
pub fn normalize(index: &[IndexExpr], shape: &[usize]) -> Result<Vec<AxisIndex>, Error> {
    let ndim = shape.len();
    let named = index
        .iter()
        .filter(|e| !matches!(e, IndexExpr::Ellipsis))
        .count();
    if named > ndim {
        return Err(Error::TooManyEntries { given: named, ndim });
    }
    if index
        .iter()
        .filter(|e| matches!(e, IndexExpr::Ellipsis))
        .count()
        > 1
    {
        return Err(Error::MultipleEllipses);
    }

    let mut expanded = Vec::with_capacity(ndim);
    for entry in index {
        match entry {
            IndexExpr::Ellipsis => {
                for _ in 0..(ndim - named) {
                    expanded.push(IndexExpr::all());
                }
            }
            other => expanded.push(*other),
        }
    }
    while expanded.len() < ndim {
        expanded.push(IndexExpr::all());
    }

    expanded
        .iter()
        .enumerate()
        .map(|(axis, entry)| {
            let len = shape[axis];
            match *entry {
                IndexExpr::At(i) => {
                    if i >= len {
                        return Err(Error::OutOfBounds { index: i, axis, len });
                    }
                    Ok(AxisIndex::At(i))
                }
                IndexExpr::Span { start, end, step } => {
                    if step != 1 {
                        return Err(Error::NonUnitStep { axis, step });
                    }
                    let start = start.unwrap_or(0).min(len);
                    let end = end.unwrap_or(len).min(len).max(start);
                    Ok(AxisIndex::Span { start, end })
                }
                IndexExpr::Ellipsis => unreachable!("ellipsis expanded above"),
            }
        })
        .collect()
}

/// ndarray slice arguments for a resolved index.
pub fn as_slice_info(resolved: &[AxisIndex]) -> Vec<SliceInfoElem> {
    resolved
        .iter()
        .map(|entry| match *entry {
            AxisIndex::At(i) => SliceInfoElem::Index(i as isize),
            AxisIndex::Span { start, end } => SliceInfoElem::Slice {
                start: start as isize,
                end: Some(end as isize),
                step: 1,
            },
        })
        .collect()
}

/// For each input axis, the axis number it maps to after indexing, or `None`
/// if a scalar entry dropped it.
pub fn surviving_axes(resolved: &[AxisIndex]) -> Vec<Option<usize>> {
    let mut next = 0;
    resolved
        .iter()
        .map(|entry| match entry {
            AxisIndex::At(_) => None,
            AxisIndex::Span { .. } => {
                let axis = next;
                next += 1;
                Some(axis)
            }
        })
        .collect()
}

/// Number of axes surviving the index, i.e. the count of non-scalar entries.
pub fn kept_ndim(resolved: &[AxisIndex]) -> usize {
    resolved.iter().filter(|e| !e.is_scalar()).count()
}
