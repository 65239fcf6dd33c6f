pub mod compound;
pub mod correlation;
pub mod linear;
pub mod slicing;
pub mod tabular;

use std::fmt::Debug;

use ndarray::Array2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Index(#[from] crate::index::Error),
    #[error("slice has {given} entries but the WCS has {expected} pixel axes")]
    SliceLengthMismatch { given: usize, expected: usize },
    #[error("pixel point has {given} values, expected {expected}")]
    PixelDimensionMismatch { given: usize, expected: usize },
    #[error("world point has {given} values, expected {expected}")]
    WorldDimensionMismatch { given: usize, expected: usize },
    #[error("transform parameter lengths disagree ({what})")]
    MalformedTransform { what: String },
    #[error("cdelt must be non-zero on every axis (axis {axis})")]
    ZeroScale { axis: usize },
    #[error("transform matrix is singular and cannot be inverted")]
    SingularTransform,
    #[error("lookup table '{name}' is not strictly monotonic and cannot be inverted")]
    NonMonotonicTable { name: String },
    #[error("lookup table '{name}' is empty")]
    EmptyTable { name: String },
    #[error("compound axis mapping {mapping:?} is not a permutation of 0..{n}")]
    InvalidAxisMapping { mapping: Vec<usize>, n: usize },
}

/// The pixel ↔ world capability contract.
///
/// Pixel axes are in pixel (FITS) order; array axis `i` of the data cube
/// corresponds to pixel axis `n − 1 − i`. Any implementor is acceptable
/// polymorphically: a plain linear transform, a sliced view, a lookup table,
/// or a compound of several of these.
pub trait Wcs: Debug + Send + Sync {
    fn pixel_n_dim(&self) -> usize;
    fn world_n_dim(&self) -> usize;

    /// Axis lengths in pixel order.
    fn pixel_shape(&self) -> Vec<usize>;

    /// world × pixel boolean matrix; entry `[w, p]` states whether pixel
    /// axis `p` influences world axis `w`.
    fn axis_correlation_matrix(&self) -> Array2<bool>;

    fn world_axis_physical_types(&self) -> Vec<String>;
    fn world_axis_units(&self) -> Vec<String>;

    fn pixel_to_world(&self, pixel: &[f64]) -> Result<Vec<f64>, Error>;
    fn world_to_pixel(&self, world: &[f64]) -> Result<Vec<f64>, Error>;

    /// Axis lengths in array order (reverse of [`Self::pixel_shape`]).
    fn array_shape(&self) -> Vec<usize> {
        let mut shape = self.pixel_shape();
        shape.reverse();
        shape
    }
}

/// Pixel axis corresponding to the given array axis.
pub fn array_to_pixel_axis(ndim: usize, array_axis: usize) -> usize {
    ndim - 1 - array_axis
}

/// Array axis corresponding to the given pixel axis.
pub fn pixel_to_array_axis(ndim: usize, pixel_axis: usize) -> usize {
    ndim - 1 - pixel_axis
}

pub(crate) fn check_pixel_len(wcs: &dyn Wcs, pixel: &[f64]) -> Result<(), Error> {
    if pixel.len() != wcs.pixel_n_dim() {
        return Err(Error::PixelDimensionMismatch {
            given: pixel.len(),
            expected: wcs.pixel_n_dim(),
        });
    }
    Ok(())
}

pub(crate) fn check_world_len(wcs: &dyn Wcs, world: &[f64]) -> Result<(), Error> {
    if world.len() != wcs.world_n_dim() {
        return Err(Error::WorldDimensionMismatch {
            given: world.len(),
            expected: wcs.world_n_dim(),
        });
    }
    Ok(())
}
