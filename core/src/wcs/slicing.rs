//! Reduces a WCS to the geometry left over after an array slicing operation.

use std::sync::Arc;

use ndarray::Array2;

use crate::index::{self, AxisIndex, IndexExpr};

use super::{check_pixel_len, check_world_len, Error, Wcs};

/// A view of another WCS after indexing, without recomputing any coordinate
/// solutions.
///
/// Scalar entries pin the pixel value of their axis and drop it; range
/// entries keep the axis with an offset origin. World axes survive exactly
/// when they are correlated with at least one kept pixel axis. Since the
/// wrapped WCS is only a trait object, slices of slices compose naturally.
#[derive(Debug, Clone)]
pub struct SlicedWcs {
    wcs: Arc<dyn Wcs>,
    /// Pixel-order entries, one per underlying pixel axis.
    slices: Vec<AxisIndex>,
    kept_pixel: Vec<usize>,
    kept_world: Vec<usize>,
    /// Underlying world point at the pinned/origin pixel; supplies values
    /// for dropped world axes during inversion.
    reference_world: Vec<f64>,
}

impl SlicedWcs {
    /// Wraps `wcs` with already-resolved pixel-order entries.
    pub fn new(wcs: Arc<dyn Wcs>, slices: Vec<AxisIndex>) -> Result<Self, Error> {
        if slices.len() != wcs.pixel_n_dim() {
            return Err(Error::SliceLengthMismatch {
                given: slices.len(),
                expected: wcs.pixel_n_dim(),
            });
        }
        let shape = wcs.pixel_shape();
        for (axis, entry) in slices.iter().enumerate() {
            let highest = match *entry {
                AxisIndex::At(i) => i,
                AxisIndex::Span { end, .. } => end.saturating_sub(1),
            };
            if highest >= shape[axis] {
                return Err(Error::Index(index::Error::OutOfBounds {
                    index: highest,
                    axis,
                    len: shape[axis],
                }));
            }
        }

        let matrix = wcs.axis_correlation_matrix();
        let kept_pixel: Vec<usize> = slices
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_scalar())
            .map(|(axis, _)| axis)
            .collect();
        let kept_world: Vec<usize> = (0..wcs.world_n_dim())
            .filter(|&w| kept_pixel.iter().any(|&p| matrix[[w, p]]))
            .collect();

        let origin: Vec<f64> = slices
            .iter()
            .map(|e| match *e {
                AxisIndex::At(i) => i as f64,
                AxisIndex::Span { start, .. } => start as f64,
            })
            .collect();
        let reference_world = wcs.pixel_to_world(&origin)?;

        Ok(Self {
            wcs,
            slices,
            kept_pixel,
            kept_world,
            reference_world,
        })
    }

    /// Normalizes a pixel-order index expression against the underlying
    /// pixel shape, then wraps.
    pub fn from_exprs(wcs: Arc<dyn Wcs>, index: &[IndexExpr]) -> Result<Self, Error> {
        let resolved = index::normalize(index, &wcs.pixel_shape())?;
        Self::new(wcs, resolved)
    }

    fn full_pixel(&self, pixel: &[f64]) -> Vec<f64> {
        let mut kept = pixel.iter();
        self.slices
            .iter()
            .map(|e| match *e {
                AxisIndex::At(i) => i as f64,
                AxisIndex::Span { start, .. } => {
                    // kept entries are in ascending pixel-axis order
                    start as f64 + kept.next().copied().unwrap_or(0.0)
                }
            })
            .collect()
    }
}

impl Wcs for SlicedWcs {
    fn pixel_n_dim(&self) -> usize {
        self.kept_pixel.len()
    }

    fn world_n_dim(&self) -> usize {
        self.kept_world.len()
    }

    fn pixel_shape(&self) -> Vec<usize> {
        self.slices
            .iter()
            .filter_map(|e| e.kept_len())
            .collect()
    }

    fn axis_correlation_matrix(&self) -> Array2<bool> {
        let full = self.wcs.axis_correlation_matrix();
        Array2::from_shape_fn((self.kept_world.len(), self.kept_pixel.len()), |(w, p)| {
            full[[self.kept_world[w], self.kept_pixel[p]]]
        })
    }

    fn world_axis_physical_types(&self) -> Vec<String> {
        let full = self.wcs.world_axis_physical_types();
        self.kept_world.iter().map(|&w| full[w].clone()).collect()
    }

    fn world_axis_units(&self) -> Vec<String> {
        let full = self.wcs.world_axis_units();
        self.kept_world.iter().map(|&w| full[w].clone()).collect()
    }

    fn pixel_to_world(&self, pixel: &[f64]) -> Result<Vec<f64>, Error> {
        check_pixel_len(self, pixel)?;
        let world = self.wcs.pixel_to_world(&self.full_pixel(pixel))?;
        Ok(self.kept_world.iter().map(|&w| world[w]).collect())
    }

    fn world_to_pixel(&self, world: &[f64]) -> Result<Vec<f64>, Error> {
        check_world_len(self, world)?;
        let mut full_world = self.reference_world.clone();
        for (&w_axis, value) in self.kept_world.iter().zip(world) {
            full_world[w_axis] = *value;
        }
        let full_pixel = self.wcs.world_to_pixel(&full_world)?;
        Ok(self
            .kept_pixel
            .iter()
            .map(|&p| match self.slices[p] {
                AxisIndex::Span { start, .. } => full_pixel[p] - start as f64,
                AxisIndex::At(_) => full_pixel[p],
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wcs::linear::LinearWcs;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn coupled() -> Arc<dyn Wcs> {
        let pc = array![
            [1.0, 0.0, 0.0],
            [0.0, 0.8, -0.6],
            [0.0, 0.6, 0.8],
        ];
        Arc::new(
            LinearWcs::with_pc(
                vec![4, 3, 2],
                vec![0.0; 3],
                vec![1.02e-9, 0.0, 1.0],
                vec![2e-11, 0.5, 0.4],
                pc,
                vec!["em.wl".into(), "lat".into(), "lon".into()],
                vec!["m".into(), "deg".into(), "deg".into()],
            )
            .unwrap(),
        )
    }

    #[test]
    fn dropping_an_independent_axis_drops_its_world_axis() {
        let sliced = SlicedWcs::from_exprs(
            coupled(),
            &[IndexExpr::At(1), IndexExpr::all(), IndexExpr::all()],
        )
        .unwrap();
        assert_eq!(sliced.pixel_n_dim(), 2);
        assert_eq!(sliced.world_n_dim(), 2);
        assert_eq!(
            sliced.world_axis_physical_types(),
            vec!["lat".to_string(), "lon".to_string()]
        );
        assert_eq!(
            sliced.axis_correlation_matrix(),
            array![[true, true], [true, true]]
        );
    }

    #[test]
    fn dropping_one_celestial_axis_keeps_all_world_axes() {
        // drop pixel axis 2 (one half of the coupled pair)
        let sliced = SlicedWcs::from_exprs(
            coupled(),
            &[IndexExpr::all(), IndexExpr::all(), IndexExpr::At(0)],
        )
        .unwrap();
        assert_eq!(sliced.pixel_n_dim(), 2);
        assert_eq!(sliced.world_n_dim(), 3);
        assert_eq!(
            sliced.axis_correlation_matrix(),
            array![[true, false], [false, true], [false, true]]
        );
    }

    #[test]
    fn range_entries_offset_the_origin() {
        let wcs = coupled();
        let sliced =
            SlicedWcs::from_exprs(Arc::clone(&wcs), &[IndexExpr::span(1, 3), IndexExpr::all(), IndexExpr::all()])
                .unwrap();
        assert_eq!(sliced.pixel_shape(), vec![2, 3, 2]);
        let sliced_world = sliced.pixel_to_world(&[0.0, 0.0, 0.0]).unwrap();
        let full_world = wcs.pixel_to_world(&[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(sliced_world, full_world);
    }

    #[test]
    fn inversion_uses_pinned_values_for_dropped_axes() {
        let wcs = coupled();
        let sliced = SlicedWcs::from_exprs(
            Arc::clone(&wcs),
            &[IndexExpr::At(2), IndexExpr::all(), IndexExpr::all()],
        )
        .unwrap();
        // world point at pixel (2, 1, 1) of the full WCS
        let full_world = wcs.pixel_to_world(&[2.0, 1.0, 1.0]).unwrap();
        let pixel = sliced.world_to_pixel(&full_world[1..]).unwrap();
        assert_abs_diff_eq!(pixel[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pixel[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn slices_compose() {
        let once = SlicedWcs::from_exprs(
            coupled(),
            &[IndexExpr::all(), IndexExpr::all(), IndexExpr::At(0)],
        )
        .unwrap();
        let twice = SlicedWcs::from_exprs(
            Arc::new(once),
            &[IndexExpr::At(0), IndexExpr::all()],
        )
        .unwrap();
        assert_eq!(twice.pixel_n_dim(), 1);
        assert_eq!(
            twice.world_axis_physical_types(),
            vec!["lat".to_string(), "lon".to_string()]
        );
    }
}
