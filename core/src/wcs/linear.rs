//! Separable/affine implementation of the WCS contract.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{check_pixel_len, check_world_len, Error, Wcs};

/// `world = crval + cdelt ∘ (PC · (pixel − crpix))` with a square PC matrix.
///
/// The PC matrix couples pixel axes into world axes; its nonzero pattern is
/// the axis-correlation matrix. The inverse transform is precomputed at
/// construction, so a singular PC is rejected up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearWcs {
    shape: Vec<usize>,
    crpix: Vec<f64>,
    crval: Vec<f64>,
    cdelt: Vec<f64>,
    pc: Array2<f64>,
    pc_inv: Array2<f64>,
    ctype: Vec<String>,
    cunit: Vec<String>,
}

impl LinearWcs {
    /// Axis-aligned transform (identity PC).
    pub fn new(
        shape: Vec<usize>,
        crpix: Vec<f64>,
        crval: Vec<f64>,
        cdelt: Vec<f64>,
        ctype: Vec<String>,
        cunit: Vec<String>,
    ) -> Result<Self, Error> {
        let pc = Array2::eye(shape.len());
        Self::with_pc(shape, crpix, crval, cdelt, pc, ctype, cunit)
    }

    pub fn with_pc(
        shape: Vec<usize>,
        crpix: Vec<f64>,
        crval: Vec<f64>,
        cdelt: Vec<f64>,
        pc: Array2<f64>,
        ctype: Vec<String>,
        cunit: Vec<String>,
    ) -> Result<Self, Error> {
        let n = shape.len();
        for (name, len) in [
            ("crpix", crpix.len()),
            ("crval", crval.len()),
            ("cdelt", cdelt.len()),
            ("ctype", ctype.len()),
            ("cunit", cunit.len()),
        ] {
            if len != n {
                return Err(Error::MalformedTransform {
                    what: format!("{name} has {len} entries for {n} axes"),
                });
            }
        }
        if pc.nrows() != n || pc.ncols() != n {
            return Err(Error::MalformedTransform {
                what: format!("pc matrix is {}x{} for {n} axes", pc.nrows(), pc.ncols()),
            });
        }
        if let Some(axis) = cdelt.iter().position(|d| *d == 0.0) {
            return Err(Error::ZeroScale { axis });
        }
        let pc_inv = invert(&pc).ok_or(Error::SingularTransform)?;
        Ok(Self {
            shape,
            crpix,
            crval,
            cdelt,
            pc,
            pc_inv,
            ctype,
            cunit,
        })
    }

    /// Single identity axis (`world == pixel`), used as a dummy stand-in for
    /// cube axes a coordinate source does not cover.
    pub fn identity(len: usize) -> Self {
        Self {
            shape: vec![len],
            crpix: vec![0.0],
            crval: vec![0.0],
            cdelt: vec![1.0],
            pc: Array2::eye(1),
            pc_inv: Array2::eye(1),
            ctype: vec!["PIXEL".to_string()],
            cunit: vec!["pix".to_string()],
        }
    }
}

impl Wcs for LinearWcs {
    fn pixel_n_dim(&self) -> usize {
        self.shape.len()
    }

    fn world_n_dim(&self) -> usize {
        self.shape.len()
    }

    fn pixel_shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn axis_correlation_matrix(&self) -> Array2<bool> {
        self.pc.mapv(|v| v != 0.0)
    }

    fn world_axis_physical_types(&self) -> Vec<String> {
        self.ctype.clone()
    }

    fn world_axis_units(&self) -> Vec<String> {
        self.cunit.clone()
    }

    fn pixel_to_world(&self, pixel: &[f64]) -> Result<Vec<f64>, Error> {
        check_pixel_len(self, pixel)?;
        let offsets: Vec<f64> = pixel
            .iter()
            .zip(&self.crpix)
            .map(|(p, r)| p - r)
            .collect();
        Ok((0..self.shape.len())
            .map(|i| {
                let rotated: f64 = self
                    .pc
                    .row(i)
                    .iter()
                    .zip(&offsets)
                    .map(|(c, o)| c * o)
                    .sum();
                self.crval[i] + self.cdelt[i] * rotated
            })
            .collect())
    }

    fn world_to_pixel(&self, world: &[f64]) -> Result<Vec<f64>, Error> {
        check_world_len(self, world)?;
        let scaled: Vec<f64> = world
            .iter()
            .zip(&self.crval)
            .zip(&self.cdelt)
            .map(|((w, v), d)| (w - v) / d)
            .collect();
        Ok((0..self.shape.len())
            .map(|j| {
                let unrotated: f64 = self
                    .pc_inv
                    .row(j)
                    .iter()
                    .zip(&scaled)
                    .map(|(c, s)| c * s)
                    .sum();
                self.crpix[j] + unrotated
            })
            .collect())
    }
}

/// Gauss-Jordan elimination with partial pivoting; `None` for a singular
/// matrix.
fn invert(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    let n = matrix.nrows();
    let mut work = matrix.clone();
    let mut inv = Array2::eye(n);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| {
                work[[a, col]]
                    .abs()
                    .partial_cmp(&work[[b, col]].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if work[[pivot_row, col]].abs() < 1e-12 {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                work.swap([pivot_row, k], [col, k]);
                inv.swap([pivot_row, k], [col, k]);
            }
        }
        let pivot = work[[col, col]];
        for k in 0..n {
            work[[col, k]] /= pivot;
            inv[[col, k]] /= pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = work[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                work[[row, k]] -= factor * work[[col, k]];
                inv[[row, k]] -= factor * inv[[col, k]];
            }
        }
    }
    Some(inv)
}
