//! Materializes physical-world coordinate values for a cube's axes.

use ndarray::{ArrayD, Dimension, IxDyn};
use tracing::instrument;

use crate::wcs::{self, correlation};

use super::{Cube, Error};

/// How a caller names an axis: by array axis number (negative wraps around,
/// NumPy style) or by world-axis physical type. A physical-type selector
/// must match exactly one world axis, by equality or substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSelector<'a> {
    ArrayAxis(isize),
    PhysicalType(&'a str),
}

/// World coordinate values for one world axis, shaped by the array axes of
/// the dependent group that resolves it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldAxisValues {
    pub world_axis: usize,
    pub physical_type: String,
    pub unit: String,
    /// Ascending array axes the value array spans, one per dimension of
    /// `values`.
    pub array_axes: Vec<usize>,
    pub values: ArrayD<f64>,
}

impl Cube {
    /// Computes world coordinate arrays for the requested axes; an empty
    /// request means every world axis. Results are in ascending world-axis
    /// order.
    ///
    /// Correlated pixel axes are transformed jointly: one index grid is
    /// built per dependent group, at pixel centers, or at pixel corners
    /// (−0.5/+0.5, one extra sample per axis) when `edges` is set.
    #[instrument(skip_all)]
    pub fn axis_world_coords_values(
        &self,
        axes: &[AxisSelector],
        edges: bool,
    ) -> Result<Vec<WorldAxisValues>, Error> {
        let matrix = self.wcs.axis_correlation_matrix();
        let types = self.wcs.world_axis_physical_types();
        let units = self.wcs.world_axis_units();
        let ndim = self.ndim();

        let mut requested: Vec<usize> = if axes.is_empty() {
            (0..self.wcs.world_n_dim()).collect()
        } else {
            let mut out = Vec::new();
            for selector in axes {
                match *selector {
                    AxisSelector::ArrayAxis(axis) => {
                        let array_axis = self.resolve_array_axis(axis)?;
                        let pixel_axis = wcs::array_to_pixel_axis(ndim, array_axis);
                        out.extend(correlation::world_axes_for_pixel(matrix.view(), pixel_axis));
                    }
                    AxisSelector::PhysicalType(name) => {
                        let matches: Vec<usize> = types
                            .iter()
                            .enumerate()
                            .filter(|(_, t)| t.as_str() == name || t.contains(name))
                            .map(|(w, _)| w)
                            .collect();
                        match matches.as_slice() {
                            [] => {
                                return Err(Error::NoMatchingWorldAxis {
                                    selector: name.to_string(),
                                })
                            }
                            [world_axis] => out.push(*world_axis),
                            _ => {
                                return Err(Error::AmbiguousWorldAxis {
                                    selector: name.to_string(),
                                    matches: matches.iter().map(|&w| types[w].clone()).collect(),
                                })
                            }
                        }
                    }
                }
            }
            out.sort_unstable();
            out.dedup();
            out
        };
        requested.sort_unstable();

        let mut results: Vec<WorldAxisValues> = Vec::with_capacity(requested.len());
        for group in correlation::axis_groups(matrix.view()) {
            if !group.world_axes.iter().any(|w| requested.contains(w)) {
                continue;
            }

            let mut array_axes: Vec<usize> = group
                .pixel_axes
                .iter()
                .map(|&p| wcs::pixel_to_array_axis(ndim, p))
                .collect();
            array_axes.sort_unstable();
            let grid_shape: Vec<usize> = array_axes
                .iter()
                .map(|&a| self.data.shape()[a] + usize::from(edges))
                .collect();

            let mut arrays: Vec<ArrayD<f64>> = group
                .world_axes
                .iter()
                .map(|_| ArrayD::zeros(IxDyn(&grid_shape)))
                .collect();
            let offset = if edges { -0.5 } else { 0.0 };
            let mut pixel = vec![0.0; ndim];
            for idx in ndarray::indices(grid_shape.clone()) {
                for (dim, &array_axis) in array_axes.iter().enumerate() {
                    let pixel_axis = wcs::array_to_pixel_axis(ndim, array_axis);
                    pixel[pixel_axis] = idx.slice()[dim] as f64 + offset;
                }
                let world = self.wcs.pixel_to_world(&pixel)?;
                for (slot, &world_axis) in group.world_axes.iter().enumerate() {
                    arrays[slot][idx.slice()] = world[world_axis];
                }
            }

            for (slot, &world_axis) in group.world_axes.iter().enumerate() {
                if requested.contains(&world_axis) {
                    results.push(WorldAxisValues {
                        world_axis,
                        physical_type: types[world_axis].clone(),
                        unit: units[world_axis].clone(),
                        array_axes: array_axes.clone(),
                        values: arrays[slot].clone(),
                    });
                }
            }
        }

        // any requested axis not covered by a group has no pixel axis to
        // resolve it from
        if results.len() != requested.len() {
            for &world_axis in &requested {
                if !results.iter().any(|r| r.world_axis == world_axis) {
                    return Err(Error::UncorrelatedWorldAxis { world_axis });
                }
            }
        }

        results.sort_by_key(|r| r.world_axis);
        Ok(results)
    }
}
