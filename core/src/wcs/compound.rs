//! Concatenates several WCSes into one, with the pixel axes rearranged.

use std::sync::Arc;

use ndarray::Array2;

use super::{check_pixel_len, check_world_len, Error, Wcs};

/// Several component WCSes acting as one.
///
/// Component pixel axes are concatenated in component order; `mapping[k]`
/// gives the compound pixel axis the k-th concatenated component axis lands
/// on, and must be a permutation. World axes are concatenated in component
/// order. The crop engine builds one of these per call to pad a partial
/// coordinate source (extra coordinates) with identity dummy axes; it is
/// never persisted.
#[derive(Debug, Clone)]
pub struct CompoundWcs {
    components: Vec<Arc<dyn Wcs>>,
    mapping: Vec<usize>,
}

impl CompoundWcs {
    pub fn new(components: Vec<Arc<dyn Wcs>>, mapping: Vec<usize>) -> Result<Self, Error> {
        let total: usize = components.iter().map(|c| c.pixel_n_dim()).sum();
        let mut seen = vec![false; total];
        let valid = mapping.len() == total
            && mapping.iter().all(|&axis| {
                if axis < total && !seen[axis] {
                    seen[axis] = true;
                    true
                } else {
                    false
                }
            });
        if !valid {
            return Err(Error::InvalidAxisMapping { mapping, n: total });
        }
        Ok(Self {
            components,
            mapping,
        })
    }

    /// (component, concatenated-pixel-offset, world-offset) triples.
    fn offsets(&self) -> impl Iterator<Item = (&Arc<dyn Wcs>, usize, usize)> + '_ {
        let mut pixel_offset = 0;
        let mut world_offset = 0;
        self.components.iter().map(move |c| {
            let entry = (c, pixel_offset, world_offset);
            pixel_offset += c.pixel_n_dim();
            world_offset += c.world_n_dim();
            entry
        })
    }
}

impl Wcs for CompoundWcs {
    fn pixel_n_dim(&self) -> usize {
        self.mapping.len()
    }

    fn world_n_dim(&self) -> usize {
        self.components.iter().map(|c| c.world_n_dim()).sum()
    }

    fn pixel_shape(&self) -> Vec<usize> {
        let mut shape = vec![0; self.mapping.len()];
        for (component, pixel_offset, _) in self.offsets() {
            for (local, len) in component.pixel_shape().into_iter().enumerate() {
                shape[self.mapping[pixel_offset + local]] = len;
            }
        }
        shape
    }

    fn axis_correlation_matrix(&self) -> Array2<bool> {
        let mut matrix = Array2::from_elem((self.world_n_dim(), self.pixel_n_dim()), false);
        for (component, pixel_offset, world_offset) in self.offsets() {
            let local = component.axis_correlation_matrix();
            for w in 0..component.world_n_dim() {
                for p in 0..component.pixel_n_dim() {
                    matrix[[world_offset + w, self.mapping[pixel_offset + p]]] = local[[w, p]];
                }
            }
        }
        matrix
    }

    fn world_axis_physical_types(&self) -> Vec<String> {
        self.components
            .iter()
            .flat_map(|c| c.world_axis_physical_types())
            .collect()
    }

    fn world_axis_units(&self) -> Vec<String> {
        self.components
            .iter()
            .flat_map(|c| c.world_axis_units())
            .collect()
    }

    fn pixel_to_world(&self, pixel: &[f64]) -> Result<Vec<f64>, Error> {
        check_pixel_len(self, pixel)?;
        let mut world = Vec::with_capacity(self.world_n_dim());
        for (component, pixel_offset, _) in self.offsets() {
            let local: Vec<f64> = (0..component.pixel_n_dim())
                .map(|p| pixel[self.mapping[pixel_offset + p]])
                .collect();
            world.extend(component.pixel_to_world(&local)?);
        }
        Ok(world)
    }

    fn world_to_pixel(&self, world: &[f64]) -> Result<Vec<f64>, Error> {
        check_world_len(self, world)?;
        let mut pixel = vec![0.0; self.pixel_n_dim()];
        for (component, pixel_offset, world_offset) in self.offsets() {
            let local_world = &world[world_offset..world_offset + component.world_n_dim()];
            let local_pixel = component.world_to_pixel(local_world)?;
            for (p, value) in local_pixel.into_iter().enumerate() {
                pixel[self.mapping[pixel_offset + p]] = value;
            }
        }
        Ok(pixel)
    }
}
