//! Auxiliary named coordinates attached to specific array axes.

use std::collections::{BTreeMap, BTreeSet};
use std::mem::size_of;

use derive_more::Constructor;
use get_size::GetSize;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::index::{self, AxisIndex};

use super::Error;

/// One named coordinate: a value array spanning one or more array axes of
/// the owning cube, independent of the primary WCS.
#[derive(Debug, Clone, PartialEq, Constructor, Serialize, Deserialize)]
pub struct ExtraCoord {
    /// Array axes of the owning cube, one per dimension of `values`.
    pub axes: Vec<usize>,
    pub values: ArrayD<f64>,
    pub unit: String,
    pub physical_type: String,
}

/// The extra-coordinate table: name → coordinate, iterated in name order.
///
/// The table never references its owning cube; the cube (and the crop
/// engine) pass whatever geometry they need in explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraCoords {
    entries: BTreeMap<String, ExtraCoord>,
}

impl ExtraCoords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a coordinate. Names are unique; the value array must have
    /// one dimension per referenced axis (sizes are checked against the
    /// owning cube when the table is attached).
    pub fn add(&mut self, name: impl Into<String>, coord: ExtraCoord) -> Result<(), Error> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Error::DuplicateExtraCoord { name });
        }
        if coord.axes.is_empty() || coord.axes.len() != coord.values.ndim() {
            return Err(Error::ExtraCoordShapeMismatch {
                name,
                axes: coord.axes.clone(),
                shape: coord.values.shape().to_vec(),
            });
        }
        let mut unique = coord.axes.clone();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() != coord.axes.len() {
            return Err(Error::ExtraCoordShapeMismatch {
                name,
                axes: coord.axes.clone(),
                shape: coord.values.shape().to_vec(),
            });
        }
        self.entries.insert(name, coord);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ExtraCoord> {
        self.entries.get(name)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtraCoord)> {
        self.entries.iter().map(|(name, coord)| (name.as_str(), coord))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Array axes referenced by at least one entry.
    pub fn covered_axes(&self) -> BTreeSet<usize> {
        self.entries
            .values()
            .flat_map(|coord| coord.axes.iter().copied())
            .collect()
    }

    /// Checks every entry against the owning cube's array shape.
    pub(super) fn validate_against(&self, shape: &[usize]) -> Result<(), Error> {
        for (name, coord) in self.iter() {
            for (dim, &axis) in coord.axes.iter().enumerate() {
                if axis >= shape.len() || coord.values.shape()[dim] != shape[axis] {
                    return Err(Error::ExtraCoordShapeMismatch {
                        name: name.to_string(),
                        axes: coord.axes.clone(),
                        shape: coord.values.shape().to_vec(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Applies a resolved cube index to every entry. Entries whose axes are
    /// all consumed by scalar entries are dropped; survivors are sliced
    /// along their remaining axes and re-keyed to the renumbered axes.
    pub fn slice(&self, resolved: &[AxisIndex]) -> ExtraCoords {
        let renumbered = index::surviving_axes(resolved);
        let mut sliced = ExtraCoords::new();
        for (name, coord) in self.iter() {
            let entry_index: Vec<AxisIndex> =
                coord.axes.iter().map(|&axis| resolved[axis]).collect();
            let new_axes: Vec<usize> = coord
                .axes
                .iter()
                .filter_map(|&axis| renumbered[axis])
                .collect();
            if new_axes.is_empty() {
                continue;
            }
            let elems = index::as_slice_info(&entry_index);
            let values = coord.values.slice(elems.as_slice()).to_owned();
            sliced.entries.insert(
                name.to_string(),
                ExtraCoord {
                    axes: new_axes,
                    values,
                    unit: coord.unit.clone(),
                    physical_type: coord.physical_type.clone(),
                },
            );
        }
        sliced
    }
}

impl GetSize for ExtraCoord {
    fn get_heap_size(&self) -> usize {
        self.axes.capacity() * size_of::<usize>()
            + self.values.len() * size_of::<f64>()
            + self.unit.capacity()
            + self.physical_type.capacity()
    }
}

impl GetSize for ExtraCoords {
    fn get_heap_size(&self) -> usize {
        self.entries
            .iter()
            .map(|(name, coord)| name.capacity() + coord.get_size())
            .sum()
    }
}
