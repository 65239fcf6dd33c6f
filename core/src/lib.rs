#![warn(clippy::complexity)]
#![warn(clippy::correctness)]
#![warn(clippy::perf)]
#![warn(clippy::style)]
#![warn(clippy::suspicious)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]

pub mod cube;
pub mod index;
pub mod wcs;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cube::{AxisSelector, Cube, ExtraCoord, ExtraCoords, WorldAxisValues, WorldPoint};
pub use index::IndexExpr;
pub use wcs::Wcs;
