//! A 1-D coordinate lookup table exposed through the WCS contract.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{check_pixel_len, check_world_len, Error, Wcs};

/// World values tabulated per pixel index along a single axis.
///
/// Forward transforms interpolate linearly between table entries; inversion
/// finds the bracketing segment and interpolates back, extrapolating with
/// the terminal slope outside the table. The table must be strictly
/// monotonic, otherwise it has no single-valued inverse and is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularWcs {
    name: String,
    values: Array1<f64>,
    unit: String,
    physical_type: String,
    ascending: bool,
}

impl TabularWcs {
    pub fn new(
        name: impl Into<String>,
        values: Array1<f64>,
        unit: impl Into<String>,
        physical_type: impl Into<String>,
    ) -> Result<Self, Error> {
        let name = name.into();
        if values.is_empty() {
            return Err(Error::EmptyTable { name });
        }
        let ascending = values.len() < 2 || values[1] > values[0];
        let monotonic = values
            .windows(2)
            .into_iter()
            .all(|w| if ascending { w[1] > w[0] } else { w[1] < w[0] });
        if !monotonic {
            return Err(Error::NonMonotonicTable { name });
        }
        Ok(Self {
            name,
            values,
            unit: unit.into(),
            physical_type: physical_type.into(),
            ascending,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Wcs for TabularWcs {
    fn pixel_n_dim(&self) -> usize {
        1
    }

    fn world_n_dim(&self) -> usize {
        1
    }

    fn pixel_shape(&self) -> Vec<usize> {
        vec![self.values.len()]
    }

    fn axis_correlation_matrix(&self) -> Array2<bool> {
        Array2::from_elem((1, 1), true)
    }

    fn world_axis_physical_types(&self) -> Vec<String> {
        vec![self.physical_type.clone()]
    }

    fn world_axis_units(&self) -> Vec<String> {
        vec![self.unit.clone()]
    }

    fn pixel_to_world(&self, pixel: &[f64]) -> Result<Vec<f64>, Error> {
        check_pixel_len(self, pixel)?;
        let n = self.values.len();
        if n == 1 {
            return Ok(vec![self.values[0]]);
        }
        let p = pixel[0];
        let segment = (p.floor() as i64).clamp(0, n as i64 - 2) as usize;
        let slope = self.values[segment + 1] - self.values[segment];
        Ok(vec![self.values[segment] + (p - segment as f64) * slope])
    }

    fn world_to_pixel(&self, world: &[f64]) -> Result<Vec<f64>, Error> {
        check_world_len(self, world)?;
        let n = self.values.len();
        if n == 1 {
            return Ok(vec![0.0]);
        }
        let w = world[0];
        let segment = (0..n - 1)
            .find(|&i| {
                let (lo, hi) = if self.ascending {
                    (self.values[i], self.values[i + 1])
                } else {
                    (self.values[i + 1], self.values[i])
                };
                lo <= w && w <= hi
            })
            .unwrap_or(if (self.ascending && w < self.values[0])
                || (!self.ascending && w > self.values[0])
            {
                0
            } else {
                n - 2
            });
        let slope = self.values[segment + 1] - self.values[segment];
        Ok(vec![segment as f64 + (w - self.values[segment]) / slope])
    }
}
