//! Reconstruct a per-vertex elevation field for a sphere mesh from a
//! rasterized planetary relief image.
//!
//! The pipeline, in dependency order:
//!
//! - [`colormap`]: extract a calibrated color ramp from an embedded legend
//!   strip, then densify it by interpolation.
//! - [`classify`]: map arbitrary pixel colors to elevations by nearest ramp
//!   entry.
//! - [`projection`]: orthographic (hemisphere photographs) and
//!   equirectangular (full-planet rasters) mappings between pixel space,
//!   longitude/latitude and 3D cartesian coordinates.
//! - [`resample`]: join the scattered height samples against a canonical
//!   sphere tessellation via an R-tree nearest-neighbor search.
//! - [`mesh`]: the RMSH artifact written for downstream viewers, carrying
//!   vertex positions and one "Heights" scalar array.
//!
//! [`pipeline`] ties the stages together for the two supported source kinds;
//! the `topo2relief` binary is the batch front end.

pub mod classify;
pub mod colormap;
pub mod config;
pub mod mesh;
pub mod nearest;
pub mod pipeline;
pub mod projection;
pub mod raster;
pub mod resample;
pub mod sphere;
