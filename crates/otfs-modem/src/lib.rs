//! OTFS modulation, multipath channel simulation and pilot-aided channel
//! estimation over a delay-Doppler grid.
//!
//! Grids are `M x N` with `M` Doppler bins and `N` delay bins, stored
//! column-major with the Doppler index running fastest. Time-domain frames
//! use the same flattening.

pub mod channel;
mod error;
pub mod estimate;
pub mod grid;
pub mod guard;
pub mod interp;
pub mod link;
pub mod otfs;
pub mod pilot;

pub use rustfft::num_complex::Complex64;

pub use channel::{dd_bin_map, MultipathChannel, Path, PathSet};
pub use error::{OtfsError, Result};
pub use estimate::{ChannelEstimate, PilotEstimator};
pub use grid::DdGrid;
pub use guard::{GuardInterval, GuardMode};
pub use interp::{Interpolator, LinearTriangulation, NearestSite};
pub use link::{OtfsLink, TrialRecord};
pub use otfs::{OtfsDemodulator, OtfsModulator, OtfsParams, OtfsParamsBuilder};
pub use pilot::{Pilot, PilotSet};
