//! Scattered-data interpolation onto the delay-Doppler grid.
//!
//! An [`Interpolator`] is built once from the pilot coordinates and then
//! evaluated for each received frame with that frame's pilot estimates.
//! Points where a strategy has no answer return `None`; the estimator turns
//! those into zeros.

mod delaunay;

pub use delaunay::LinearTriangulation;

use rustfft::num_complex::Complex64;

use crate::error::{OtfsError, Result};

/// Strategy for spreading per-site values over the whole grid.
pub trait Interpolator: std::fmt::Debug + Send + Sync {
    /// Number of sites the interpolator was built on.
    fn site_count(&self) -> usize;

    /// Value at `(doppler, delay)` given `values` in site order, or `None`
    /// where the strategy is undefined.
    fn evaluate(&self, values: &[Complex64], doppler: usize, delay: usize) -> Option<Complex64>;
}

/// Takes the value of the closest site everywhere on the grid.
///
/// Ties go to the site listed first.
#[derive(Debug, Clone)]
pub struct NearestSite {
    sites: Vec<(usize, usize)>,
}

impl NearestSite {
    pub fn new(sites: &[(usize, usize)]) -> Result<Self> {
        if sites.is_empty() {
            return Err(OtfsError::config(
                "nearest-site interpolation needs at least one pilot",
            ));
        }
        Ok(Self {
            sites: sites.to_vec(),
        })
    }
}

impl Interpolator for NearestSite {
    fn site_count(&self) -> usize {
        self.sites.len()
    }

    fn evaluate(&self, values: &[Complex64], doppler: usize, delay: usize) -> Option<Complex64> {
        let (d, l) = (doppler as i64, delay as i64);
        let nearest = self
            .sites
            .iter()
            .enumerate()
            .min_by_key(|&(i, &(sd, sl))| {
                let dd = sd as i64 - d;
                let dl = sl as i64 - l;
                (dd * dd + dl * dl, i)
            })
            .map(|(i, _)| i)?;
        values.get(nearest).copied()
    }
}
