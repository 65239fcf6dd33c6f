//! The data cube: an N-dimensional array bound to a WCS, with mask,
//! uncertainty, and extra coordinates kept in lockstep through indexing.

pub mod coords;
pub mod crop;
pub mod extra_coords;

pub use coords::{AxisSelector, WorldAxisValues};
pub use crop::WorldPoint;
pub use extra_coords::{ExtraCoord, ExtraCoords};

use std::mem::size_of;
use std::sync::Arc;

use get_size::GetSize;
use ndarray::ArrayD;
use thiserror::Error;
use tracing::instrument;

use crate::index::{self, IndexExpr};
use crate::wcs::{self, correlation, slicing::SlicedWcs, Wcs};

#[derive(Debug, Error)]
pub enum Error {
    #[error("WCS has {wcs} pixel dimensions but the data array has {data}")]
    WcsDimensionMismatch { wcs: usize, data: usize },
    #[error("WCS array shape {wcs:?} does not match data shape {data:?}")]
    WcsShapeMismatch { wcs: Vec<usize>, data: Vec<usize> },
    #[error("mask shape {mask:?} does not match data shape {data:?}")]
    MaskShapeMismatch { mask: Vec<usize>, data: Vec<usize> },
    #[error("uncertainty shape {uncertainty:?} does not match data shape {data:?}")]
    UncertaintyShapeMismatch {
        uncertainty: Vec<usize>,
        data: Vec<usize>,
    },
    #[error("extra coordinate '{name}' is already registered")]
    DuplicateExtraCoord { name: String },
    #[error("extra coordinate '{name}' with shape {shape:?} does not fit axes {axes:?}")]
    ExtraCoordShapeMismatch {
        name: String,
        axes: Vec<usize>,
        shape: Vec<usize>,
    },
    #[error("array axis {axis} is out of range for a {ndim}-dimensional cube")]
    AxisOutOfRange { axis: isize, ndim: usize },
    #[error("no world axis matches physical type '{selector}'")]
    NoMatchingWorldAxis { selector: String },
    #[error("physical type '{selector}' is ambiguous, it matches {matches:?}")]
    AmbiguousWorldAxis {
        selector: String,
        matches: Vec<String>,
    },
    #[error("world axis {world_axis} is not correlated with any pixel axis")]
    UncorrelatedWorldAxis { world_axis: usize },
    #[error("corner sequences have mismatched lengths ({lower} lower, {upper} upper)")]
    CornerLengthMismatch { lower: usize, upper: usize },
    #[error("{given} corner entries supplied for {expected} axis groups")]
    CornerCountMismatch { given: usize, expected: usize },
    #[error("corner for axis group {group} has {given} values, expected {expected}")]
    WorldPointSizeMismatch {
        group: usize,
        given: usize,
        expected: usize,
    },
    #[error("axis group {group} is bounded on only some of its world axes; jointly transformed axes need both or neither")]
    PartialGroupBound { group: usize },
    #[error("unit '{given}' does not match world axis {world_axis} unit '{expected}'")]
    UnitMismatch {
        world_axis: usize,
        given: String,
        expected: String,
    },
    #[error("extra coordinate '{name}' spans axes {axes:?} and cannot be used as a 1-D crop source")]
    MultiAxisExtraCoordCrop { name: String, axes: Vec<usize> },
    #[error("resolved crop range {start}..{end} is outside array axis {array_axis} with length {len}")]
    CropOutOfRange {
        array_axis: usize,
        start: i64,
        end: i64,
        len: usize,
    },
    #[error(transparent)]
    Index(#[from] index::Error),
    #[error(transparent)]
    Wcs(#[from] wcs::Error),
}

/// An N-dimensional data array with an attached WCS.
///
/// All components are owned except the WCS, which is shared by reference and
/// treated as immutable. Every operation returns a new cube; the source is
/// never touched.
#[derive(Debug, Clone)]
pub struct Cube {
    data: ArrayD<f64>,
    wcs: Arc<dyn Wcs>,
    mask: Option<ArrayD<bool>>,
    uncertainty: Option<ArrayD<f64>>,
    extra_coords: ExtraCoords,
}

impl Cube {
    /// Binds `data` to `wcs`. The WCS must have exactly one pixel axis per
    /// array dimension, with matching lengths.
    pub fn new(data: ArrayD<f64>, wcs: Arc<dyn Wcs>) -> Result<Self, Error> {
        if wcs.pixel_n_dim() != data.ndim() {
            return Err(Error::WcsDimensionMismatch {
                wcs: wcs.pixel_n_dim(),
                data: data.ndim(),
            });
        }
        if wcs.array_shape() != data.shape() {
            return Err(Error::WcsShapeMismatch {
                wcs: wcs.array_shape(),
                data: data.shape().to_vec(),
            });
        }
        Ok(Self {
            data,
            wcs,
            mask: None,
            uncertainty: None,
            extra_coords: ExtraCoords::new(),
        })
    }

    pub fn with_mask(mut self, mask: ArrayD<bool>) -> Result<Self, Error> {
        if mask.shape() != self.data.shape() {
            return Err(Error::MaskShapeMismatch {
                mask: mask.shape().to_vec(),
                data: self.data.shape().to_vec(),
            });
        }
        self.mask = Some(mask);
        Ok(self)
    }

    /// Uncertainty is either present with the full data shape or absent;
    /// nothing is ever zero-filled on its behalf.
    pub fn with_uncertainty(mut self, uncertainty: ArrayD<f64>) -> Result<Self, Error> {
        if uncertainty.shape() != self.data.shape() {
            return Err(Error::UncertaintyShapeMismatch {
                uncertainty: uncertainty.shape().to_vec(),
                data: self.data.shape().to_vec(),
            });
        }
        self.uncertainty = Some(uncertainty);
        Ok(self)
    }

    pub fn with_extra_coord(
        mut self,
        name: impl Into<String>,
        coord: ExtraCoord,
    ) -> Result<Self, Error> {
        self.extra_coords.add(name, coord)?;
        self.extra_coords.validate_against(self.data.shape())?;
        Ok(self)
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn wcs(&self) -> &Arc<dyn Wcs> {
        &self.wcs
    }

    pub fn mask(&self) -> Option<&ArrayD<bool>> {
        self.mask.as_ref()
    }

    pub fn uncertainty(&self) -> Option<&ArrayD<f64>> {
        self.uncertainty.as_ref()
    }

    pub fn extra_coords(&self) -> &ExtraCoords {
        &self.extra_coords
    }

    /// Axis lengths in array order.
    pub fn dimensions(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Physical types of the world axes correlated with each array axis.
    pub fn array_axis_physical_types(&self) -> Vec<Vec<String>> {
        let matrix = self.wcs.axis_correlation_matrix();
        let types = self.wcs.world_axis_physical_types();
        (0..self.ndim())
            .map(|array_axis| {
                let pixel_axis = wcs::array_to_pixel_axis(self.ndim(), array_axis);
                correlation::world_axes_for_pixel(matrix.view(), pixel_axis)
                    .into_iter()
                    .map(|w| types[w].clone())
                    .collect()
            })
            .collect()
    }

    /// Applies an array-order index expression to the cube: data, mask,
    /// uncertainty, WCS, and extra coordinates all see the same resolved
    /// index. The result has one dimension per non-scalar entry.
    #[instrument(skip(self, index))]
    pub fn index(&self, index: &[IndexExpr]) -> Result<Cube, Error> {
        let resolved = index::normalize(index, self.data.shape())?;
        let elems = index::as_slice_info(&resolved);

        let data = self.data.slice(elems.as_slice()).to_owned();
        let mask = self
            .mask
            .as_ref()
            .map(|m| m.slice(elems.as_slice()).to_owned());
        let uncertainty = self
            .uncertainty
            .as_ref()
            .map(|u| u.slice(elems.as_slice()).to_owned());

        // the WCS slicer works in pixel order
        let mut pixel_order = resolved.clone();
        pixel_order.reverse();
        let wcs: Arc<dyn Wcs> = Arc::new(SlicedWcs::new(Arc::clone(&self.wcs), pixel_order)?);

        let extra_coords = self.extra_coords.slice(&resolved);

        Ok(Cube {
            data,
            wcs,
            mask,
            uncertainty,
            extra_coords,
        })
    }

    pub(crate) fn resolve_array_axis(&self, axis: isize) -> Result<usize, Error> {
        let ndim = self.ndim() as isize;
        let wrapped = if axis < 0 { ndim + axis } else { axis };
        if wrapped < 0 || wrapped >= ndim {
            return Err(Error::AxisOutOfRange {
                axis,
                ndim: self.ndim(),
            });
        }
        Ok(wrapped as usize)
    }
}

impl GetSize for Cube {
    fn get_heap_size(&self) -> usize {
        let arrays = self.data.len()
            + self.uncertainty.as_ref().map_or(0, |u| u.len());
        arrays * size_of::<f64>()
            + self.mask.as_ref().map_or(0, |m| m.len() * size_of::<bool>())
            + self.extra_coords.get_heap_size()
    }
}
