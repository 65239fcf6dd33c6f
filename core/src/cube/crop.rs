//! Converts physical-coordinate corner pairs into array index ranges.

use std::sync::Arc;

use get_size::GetSize;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::index::IndexExpr;
use crate::wcs::{
    self, compound::CompoundWcs, correlation, linear::LinearWcs, tabular::TabularWcs, Wcs,
};

use super::{Cube, Error};

/// A world-space corner entry covering one dependent axis group: one value
/// per world axis of the group, in ascending world-axis order.
///
/// Units, when given, must equal the WCS axis units; converting between
/// units is the caller's business.
#[derive(Debug, Clone, PartialEq, GetSize, Serialize, Deserialize)]
pub struct WorldPoint {
    pub values: Vec<f64>,
    pub units: Option<Vec<String>>,
}

impl WorldPoint {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            units: None,
        }
    }

    pub fn with_units(values: Vec<f64>, units: Vec<String>) -> Self {
        Self {
            values,
            units: Some(units),
        }
    }

    /// Convenience for a group covering a single world axis.
    pub fn scalar(value: f64) -> Self {
        Self::new(vec![value])
    }
}

/// Corner sequences must pair up and cover every axis slot.
fn sanitize_corners<T>(
    lower: &[Option<T>],
    upper: &[Option<T>],
    expected: usize,
) -> Result<(), Error> {
    if lower.len() != upper.len() {
        return Err(Error::CornerLengthMismatch {
            lower: lower.len(),
            upper: upper.len(),
        });
    }
    if lower.len() != expected {
        return Err(Error::CornerCountMismatch {
            given: lower.len(),
            expected,
        });
    }
    Ok(())
}

fn check_unit(world_axis: usize, given: Option<&str>, expected: &str) -> Result<(), Error> {
    if let Some(given) = given {
        if given != expected {
            return Err(Error::UnitMismatch {
                world_axis,
                given: given.to_string(),
                expected: expected.to_string(),
            });
        }
    }
    Ok(())
}

/// Resolves per-world-axis bounds into half-open pixel-order index ranges.
///
/// `None` means no bound; if every axis is unbounded the whole crop is a
/// no-op and this returns `None`. Dependent groups are inverted jointly:
/// unbounded world axes are filled from the world point at the central
/// pixel, both corners go through `world_to_pixel` once, and each bounded
/// pixel axis takes the min/max of the two resolved indices (robust to
/// transforms that flip direction), extended by one for an exclusive end.
fn resolve_world_bounds(
    wcs: &dyn Wcs,
    lower: &[Option<f64>],
    upper: &[Option<f64>],
) -> Result<Option<Vec<(usize, usize)>>, Error> {
    if lower.iter().chain(upper).all(Option::is_none) {
        return Ok(None);
    }

    let matrix = wcs.axis_correlation_matrix();
    let groups = correlation::axis_groups(matrix.view());
    let shape = wcs.pixel_shape();

    let center: Vec<f64> = shape.iter().map(|&len| (len / 2) as f64).collect();
    let reference = wcs.pixel_to_world(&center)?;

    let mut bounded_pixel = vec![false; shape.len()];
    let mut lower_world = reference.clone();
    let mut upper_world = reference;
    for (group_idx, group) in groups.iter().enumerate() {
        let mentioned = group
            .world_axes
            .iter()
            .any(|&w| lower[w].is_some() || upper[w].is_some());
        if !mentioned {
            continue;
        }
        let fully_bounded = group
            .world_axes
            .iter()
            .all(|&w| lower[w].is_some() && upper[w].is_some());
        if !fully_bounded {
            return Err(Error::PartialGroupBound { group: group_idx });
        }
        for &p in &group.pixel_axes {
            bounded_pixel[p] = true;
        }
        for &w in &group.world_axes {
            lower_world[w] = lower[w].unwrap_or_default();
            upper_world[w] = upper[w].unwrap_or_default();
        }
    }

    let lower_pixel = wcs.world_to_pixel(&lower_world)?;
    let upper_pixel = wcs.world_to_pixel(&upper_world)?;

    let mut ranges = Vec::with_capacity(shape.len());
    for (p, &len) in shape.iter().enumerate() {
        if !bounded_pixel[p] {
            ranges.push((0, len));
            continue;
        }
        let a = lower_pixel[p].round() as i64;
        let b = upper_pixel[p].round() as i64;
        let (start, end) = (a.min(b), a.max(b) + 1);
        if end <= 0 || start >= len as i64 {
            return Err(Error::CropOutOfRange {
                array_axis: wcs::pixel_to_array_axis(shape.len(), p),
                start,
                end,
                len,
            });
        }
        ranges.push((start.max(0) as usize, end.min(len as i64) as usize));
    }
    Ok(Some(ranges))
}

impl Cube {
    /// Crops to the sub-array spanned by two world-space corners, one entry
    /// per dependent axis group (ordered by the group's lowest world axis).
    /// `None` entries leave their group unbounded; if every entry is `None`
    /// the cube is returned unchanged.
    #[instrument(skip_all)]
    pub fn crop(
        &self,
        lower: &[Option<WorldPoint>],
        upper: &[Option<WorldPoint>],
    ) -> Result<Cube, Error> {
        let matrix = self.wcs.axis_correlation_matrix();
        let groups = correlation::axis_groups(matrix.view());
        sanitize_corners(lower, upper, groups.len())?;
        let units = self.wcs.world_axis_units();

        let mut lower_world = vec![None; self.wcs.world_n_dim()];
        let mut upper_world = vec![None; self.wcs.world_n_dim()];
        for (group_idx, group) in groups.iter().enumerate() {
            for (bounds, corner) in [
                (&mut lower_world, &lower[group_idx]),
                (&mut upper_world, &upper[group_idx]),
            ] {
                let point = match corner {
                    Some(point) => point,
                    None => continue,
                };
                if point.values.len() != group.world_axes.len() {
                    return Err(Error::WorldPointSizeMismatch {
                        group: group_idx,
                        given: point.values.len(),
                        expected: group.world_axes.len(),
                    });
                }
                if let Some(point_units) = &point.units {
                    if point_units.len() != group.world_axes.len() {
                        return Err(Error::WorldPointSizeMismatch {
                            group: group_idx,
                            given: point_units.len(),
                            expected: group.world_axes.len(),
                        });
                    }
                    for (&w, unit) in group.world_axes.iter().zip(point_units) {
                        check_unit(w, Some(unit.as_str()), &units[w])?;
                    }
                }
                for (&w, &value) in group.world_axes.iter().zip(&point.values) {
                    bounds[w] = Some(value);
                }
            }
        }

        self.crop_resolved(self.wcs.as_ref(), &lower_world, &upper_world)
    }

    /// Like [`Cube::crop`], but with one raw scalar per world axis and an
    /// optional parallel sequence of unit overrides for bounded axes.
    #[instrument(skip_all)]
    pub fn crop_by_values(
        &self,
        lower: &[Option<f64>],
        upper: &[Option<f64>],
        units: Option<&[Option<&str>]>,
    ) -> Result<Cube, Error> {
        let world_n = self.wcs.world_n_dim();
        sanitize_corners(lower, upper, world_n)?;
        if let Some(units) = units {
            if units.len() != world_n {
                return Err(Error::CornerCountMismatch {
                    given: units.len(),
                    expected: world_n,
                });
            }
            let expected = self.wcs.world_axis_units();
            for (w, unit) in units.iter().enumerate() {
                if lower[w].is_some() || upper[w].is_some() {
                    check_unit(w, *unit, &expected[w])?;
                }
            }
        }
        self.crop_resolved(self.wcs.as_ref(), lower, upper)
    }

    /// Crops against the extra-coordinate table instead of the primary WCS:
    /// one corner entry per table entry, in name order. Cube axes the table
    /// does not cover ride along unbounded, behind transient identity dummy
    /// axes.
    #[instrument(skip_all)]
    pub fn crop_by_extra_coords(
        &self,
        lower: &[Option<f64>],
        upper: &[Option<f64>],
        units: Option<&[Option<&str>]>,
    ) -> Result<Cube, Error> {
        let table = &self.extra_coords;
        sanitize_corners(lower, upper, table.len())?;
        if let Some(units) = units {
            if units.len() != table.len() {
                return Err(Error::CornerCountMismatch {
                    given: units.len(),
                    expected: table.len(),
                });
            }
        }
        let ndim = self.ndim();

        let mut components: Vec<Arc<dyn Wcs>> = Vec::with_capacity(table.len());
        let mut mapping = Vec::with_capacity(ndim);
        let mut lower_world: Vec<Option<f64>> = Vec::with_capacity(ndim);
        let mut upper_world: Vec<Option<f64>> = Vec::with_capacity(ndim);
        for (entry_idx, (name, coord)) in table.iter().enumerate() {
            let axis = match coord.axes.as_slice() {
                [axis] => *axis,
                _ => {
                    return Err(Error::MultiAxisExtraCoordCrop {
                        name: name.to_string(),
                        axes: coord.axes.clone(),
                    })
                }
            };
            if let Some(units) = units {
                if lower[entry_idx].is_some() || upper[entry_idx].is_some() {
                    check_unit(entry_idx, units[entry_idx], &coord.unit)?;
                }
            }
            let values = Array1::from_iter(coord.values.iter().copied());
            let tabular =
                TabularWcs::new(name, values, coord.unit.clone(), coord.physical_type.clone())?;
            components.push(Arc::new(tabular));
            mapping.push(wcs::array_to_pixel_axis(ndim, axis));
            lower_world.push(lower[entry_idx]);
            upper_world.push(upper[entry_idx]);
        }

        let covered = table.covered_axes();
        for pixel_axis in 0..ndim {
            let array_axis = wcs::pixel_to_array_axis(ndim, pixel_axis);
            if covered.contains(&array_axis) {
                continue;
            }
            components.push(Arc::new(LinearWcs::identity(self.data.shape()[array_axis])));
            mapping.push(pixel_axis);
            lower_world.push(None);
            upper_world.push(None);
        }

        let compound = CompoundWcs::new(components, mapping)?;
        self.crop_resolved(&compound, &lower_world, &upper_world)
    }

    fn crop_resolved(
        &self,
        wcs: &dyn Wcs,
        lower_world: &[Option<f64>],
        upper_world: &[Option<f64>],
    ) -> Result<Cube, Error> {
        match resolve_world_bounds(wcs, lower_world, upper_world)? {
            None => Ok(self.clone()),
            Some(ranges) => {
                debug!(?ranges, "resolved crop ranges");
                let ndim = ranges.len();
                let index: Vec<IndexExpr> = (0..ndim)
                    .map(|array_axis| {
                        let (start, end) = ranges[wcs::array_to_pixel_axis(ndim, array_axis)];
                        IndexExpr::span(start, end)
                    })
                    .collect();
                self.index(&index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{assert_cubes_equal, cube_4d};

    /// World corner values at two array-index corner points, grouped as
    /// (time, wavelength, celestial pair).
    fn corner_worlds(cube: &Cube, array_point: &[usize]) -> Vec<f64> {
        let ndim = cube.ndim();
        let pixel: Vec<f64> = (0..ndim)
            .map(|p| array_point[wcs::pixel_to_array_axis(ndim, p)] as f64)
            .collect();
        cube.wcs().pixel_to_world(&pixel).unwrap()
    }

    #[test]
    fn crop_matches_the_equivalent_slice() {
        let cube = cube_4d();
        // world axes: 0 time, 1 wavelength, 2/3 the celestial pair
        let lo = corner_worlds(&cube, &[1, 0, 0, 0]);
        let up = corner_worlds(&cube, &[2, 1, 1, 2]);
        let lower = vec![
            Some(WorldPoint::scalar(lo[0])),
            Some(WorldPoint::scalar(lo[1])),
            Some(WorldPoint::new(vec![lo[2], lo[3]])),
        ];
        let upper = vec![
            Some(WorldPoint::scalar(up[0])),
            Some(WorldPoint::scalar(up[1])),
            Some(WorldPoint::new(vec![up[2], up[3]])),
        ];
        let output = cube.crop(&lower, &upper).unwrap();
        let expected = cube
            .index(&[
                IndexExpr::span(1, 3),
                IndexExpr::span(0, 2),
                IndexExpr::span(0, 2),
                IndexExpr::span(0, 3),
            ])
            .unwrap();
        assert_cubes_equal(&output, &expected);
    }

    #[test]
    fn unbounded_groups_keep_their_full_axes() {
        let cube = cube_4d();
        let lo = corner_worlds(&cube, &[1, 0, 0, 0]);
        let up = corner_worlds(&cube, &[2, 1, 1, 2]);
        let lower = vec![None, None, Some(WorldPoint::new(vec![lo[2], lo[3]]))];
        let upper = vec![None, None, Some(WorldPoint::new(vec![up[2], up[3]]))];
        let output = cube.crop(&lower, &upper).unwrap();
        let expected = cube
            .index(&[
                IndexExpr::span(1, 3),
                IndexExpr::span(0, 2),
                IndexExpr::all(),
                IndexExpr::all(),
            ])
            .unwrap();
        assert_cubes_equal(&output, &expected);
    }

    #[test]
    fn all_none_corners_are_a_no_op() {
        let cube = cube_4d();
        let output = cube.crop(&[None, None, None], &[None, None, None]).unwrap();
        assert_cubes_equal(&output, &cube);

        let output = cube
            .crop_by_values(&[None; 4], &[None; 4], None)
            .unwrap();
        assert_cubes_equal(&output, &cube);
    }

    #[test]
    fn crop_by_values_matches_the_equivalent_slice() {
        let cube = cube_4d();
        let lo = corner_worlds(&cube, &[1, 0, 0, 0]);
        let up = corner_worlds(&cube, &[2, 1, 1, 2]);
        let lower: Vec<Option<f64>> = lo.iter().copied().map(Some).collect();
        let upper: Vec<Option<f64>> = up.iter().copied().map(Some).collect();
        let units = [Some("min"), Some("m"), Some("deg"), Some("deg")];
        let output = cube.crop_by_values(&lower, &upper, Some(&units)).unwrap();
        let expected = cube
            .index(&[
                IndexExpr::span(1, 3),
                IndexExpr::span(0, 2),
                IndexExpr::span(0, 2),
                IndexExpr::span(0, 3),
            ])
            .unwrap();
        assert_cubes_equal(&output, &expected);
    }

    #[test]
    fn crop_by_values_with_one_bounded_axis() {
        let cube = cube_4d();
        // time runs 0.2, 0.6, 1.0, 1.4 min along array axis 3
        let lower = [Some(0.5), None, None, None];
        let upper = [Some(1.1), None, None, None];
        let units = [Some("min"), None, None, None];
        let output = cube.crop_by_values(&lower, &upper, Some(&units)).unwrap();
        let expected = cube
            .index(&[
                IndexExpr::all(),
                IndexExpr::all(),
                IndexExpr::all(),
                IndexExpr::span(1, 3),
            ])
            .unwrap();
        assert_cubes_equal(&output, &expected);
    }

    #[test]
    fn mismatched_units_are_rejected() {
        let cube = cube_4d();
        let lower = [Some(0.5), None, None, None];
        let upper = [Some(1.1), None, None, None];
        let units = [Some("s"), None, None, None];
        let err = cube.crop_by_values(&lower, &upper, Some(&units));
        assert!(matches!(err, Err(Error::UnitMismatch { world_axis: 0, .. })));
    }

    #[test]
    fn out_of_range_bounds_raise_an_index_error() {
        let cube = cube_4d();
        let lo = corner_worlds(&cube, &[1, 0, 0, 0]);
        let up = corner_worlds(&cube, &[2, 1, 1, 2]);
        // negated wavelengths resolve far below pixel zero
        let lower = [Some(lo[0]), Some(-lo[1]), None, None];
        let upper = [Some(up[0]), Some(-up[1]), None, None];
        let err = cube.crop_by_values(&lower, &upper, None);
        assert!(matches!(err, Err(Error::CropOutOfRange { .. })));
    }

    #[test]
    fn partially_bounded_dependent_groups_are_rejected() {
        let cube = cube_4d();
        // lat bounded, lon not: the pair can only be inverted together
        let lower = [None, None, Some(0.1), None];
        let upper = [None, None, Some(0.4), None];
        let err = cube.crop_by_values(&lower, &upper, None);
        assert!(matches!(err, Err(Error::PartialGroupBound { .. })));
    }

    #[test]
    fn corner_sequences_must_line_up() {
        let cube = cube_4d();
        let err = cube.crop(&[None, None], &[None, None, None]);
        assert!(matches!(err, Err(Error::CornerLengthMismatch { .. })));
        let err = cube.crop(&[None, None], &[None, None]);
        assert!(matches!(err, Err(Error::CornerCountMismatch { .. })));
    }

    #[test]
    fn crop_of_a_dependent_1d_cube_resolves_jointly() {
        let cube = cube_4d();
        let line = cube
            .index(&[
                IndexExpr::At(0),
                IndexExpr::all(),
                IndexExpr::At(0),
                IndexExpr::At(0),
            ])
            .unwrap();
        assert_eq!(line.ndim(), 1);
        assert_eq!(line.wcs().world_n_dim(), 2);
        let lo = line.wcs().pixel_to_world(&[0.0]).unwrap();
        let up = line.wcs().pixel_to_world(&[1.0]).unwrap();

        let output = line
            .crop(
                &[Some(WorldPoint::new(lo.clone()))],
                &[Some(WorldPoint::new(up.clone()))],
            )
            .unwrap();
        let expected = line.index(&[IndexExpr::span(0, 2)]).unwrap();
        assert_cubes_equal(&output, &expected);

        let lower: Vec<Option<f64>> = lo.into_iter().map(Some).collect();
        let upper: Vec<Option<f64>> = up.into_iter().map(Some).collect();
        let output = line.crop_by_values(&lower, &upper, None).unwrap();
        assert_cubes_equal(&output, &expected);
    }

    #[test]
    fn crop_by_extra_coords_pads_uncovered_axes() {
        let cube = cube_4d();
        // "exposure" lives on array axis 3 with values 0, 1, 2, 3 s
        let output = cube
            .crop_by_extra_coords(&[Some(1.0)], &[Some(2.0)], Some(&[Some("s")]))
            .unwrap();
        let expected = cube
            .index(&[
                IndexExpr::all(),
                IndexExpr::all(),
                IndexExpr::all(),
                IndexExpr::span(1, 3),
            ])
            .unwrap();
        assert_cubes_equal(&output, &expected);
    }

    #[test]
    fn world_point_sizes_are_checked_per_group() {
        let cube = cube_4d();
        let lower = [None, None, Some(WorldPoint::scalar(0.1))];
        let upper = [None, None, Some(WorldPoint::scalar(0.4))];
        let err = cube.crop(&lower, &upper);
        assert!(matches!(
            err,
            Err(Error::WorldPointSizeMismatch {
                group: 2,
                given: 1,
                expected: 2
            })
        ));
    }
}
