//! Pilot-aided channel estimation.
//!
//! The received value at each pilot cell divided by the known pilot symbol
//! gives a raw channel estimate at that cell. Those sparse estimates are then
//! spread over the whole grid by an [`Interpolator`]. Cells the interpolator
//! cannot reach, and any non-finite result, are set to zero.

use rustfft::num_complex::Complex64;

use crate::error::{OtfsError, Result};
use crate::grid::DdGrid;
use crate::interp::{Interpolator, LinearTriangulation};
use crate::pilot::PilotSet;

/// Output of one estimation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEstimate {
    /// Raw estimate at each pilot, in pilot order.
    pub per_pilot: Vec<Complex64>,
    /// Interpolated estimate for every cell. Always finite.
    pub grid: DdGrid,
}

#[derive(Debug)]
pub struct PilotEstimator {
    pilots: PilotSet,
    interpolator: Box<dyn Interpolator>,
}

impl PilotEstimator {
    /// Estimator using linear interpolation over the pilot triangulation.
    ///
    /// Fails if the pilots cannot be triangulated (fewer than three, or all
    /// on one line).
    pub fn new(pilots: PilotSet) -> Result<Self> {
        let interpolator = LinearTriangulation::new(&pilots.sites())?;
        Ok(Self {
            pilots,
            interpolator: Box::new(interpolator),
        })
    }

    /// Estimator with a caller-chosen interpolation strategy built on the
    /// same pilot sites.
    pub fn with_interpolator(pilots: PilotSet, interpolator: Box<dyn Interpolator>) -> Result<Self> {
        if interpolator.site_count() != pilots.len() {
            return Err(OtfsError::shape(
                "interpolator site count",
                pilots.len(),
                interpolator.site_count(),
            ));
        }
        Ok(Self {
            pilots,
            interpolator,
        })
    }

    pub fn pilots(&self) -> &PilotSet {
        &self.pilots
    }

    /// Estimate the channel from a demodulated grid.
    pub fn estimate(&self, ydd: &DdGrid) -> Result<ChannelEstimate> {
        self.pilots.check_grid(ydd)?;

        let per_pilot: Vec<Complex64> = self
            .pilots
            .pilots()
            .iter()
            .map(|p| ydd[(p.doppler, p.delay)] / p.value)
            .collect();

        let (m, n) = ydd.shape();
        let mut filled = 0usize;
        let grid = DdGrid::from_fn(m, n, |d, l| {
            match self.interpolator.evaluate(&per_pilot, d, l) {
                Some(v) if v.re.is_finite() && v.im.is_finite() => {
                    filled += 1;
                    v
                }
                _ => Complex64::new(0.0, 0.0),
            }
        })?;

        let zeroed = m * n - filled;
        if zeroed > 0 {
            tracing::debug!(zeroed, cells = m * n, "no estimate outside pilot support");
        }

        Ok(ChannelEstimate { per_pilot, grid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::interp::NearestSite;
    use crate::pilot::Pilot;

    fn pilot_value() -> Complex64 {
        Complex64::from_polar(1.0, 0.75 * std::f64::consts::PI)
    }

    fn corner_pilots(m: usize, n: usize) -> PilotSet {
        PilotSet::new(
            vec![
                Pilot::new(0, 4, pilot_value()),
                Pilot::new(m / 2 - 1, n / 2 - 1, pilot_value()),
                Pilot::new(m - 1, n - 1, pilot_value()),
            ],
            m,
            n,
        )
        .unwrap()
    }

    #[test]
    fn undistorted_grid_gives_unit_estimates() {
        let (m, n) = (64, 30);
        let pilots = corner_pilots(m, n);
        let mut grid = DdGrid::from_fn(m, n, |d, l| Complex64::new(d as f64, -(l as f64))).unwrap();
        pilots.overlay(&mut grid).unwrap();

        let estimate = PilotEstimator::new(pilots).unwrap().estimate(&grid).unwrap();
        assert_eq!(estimate.per_pilot.len(), 3);
        for h in &estimate.per_pilot {
            assert_relative_eq!(*h, Complex64::new(1.0, 0.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn outside_hull_is_exactly_zero_and_grid_is_finite() {
        let (m, n) = (64, 30);
        let pilots = corner_pilots(m, n);
        let mut grid = DdGrid::zeros(m, n).unwrap();
        pilots.overlay(&mut grid).unwrap();

        let estimate = PilotEstimator::new(pilots).unwrap().estimate(&grid).unwrap();
        assert!(estimate
            .grid
            .cells()
            .iter()
            .all(|v| v.re.is_finite() && v.im.is_finite()));
        assert_eq!(estimate.grid[(0, 29)], Complex64::new(0.0, 0.0));
        assert_eq!(estimate.grid[(63, 0)], Complex64::new(0.0, 0.0));
        assert_relative_eq!(estimate.grid[(31, 14)], Complex64::new(1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn non_finite_interpolation_becomes_zero() {
        let (m, n) = (8, 8);
        let pilots = PilotSet::new(
            vec![
                Pilot::new(0, 0, Complex64::new(1.0, 0.0)),
                Pilot::new(7, 0, Complex64::new(1.0, 0.0)),
                Pilot::new(0, 7, Complex64::new(1.0, 0.0)),
            ],
            m,
            n,
        )
        .unwrap();
        let mut grid = DdGrid::zeros(m, n).unwrap();
        grid[(0, 0)] = Complex64::new(f64::INFINITY, 0.0);
        grid[(7, 0)] = Complex64::new(1.0, 0.0);
        grid[(0, 7)] = Complex64::new(1.0, 0.0);

        let estimate = PilotEstimator::new(pilots).unwrap().estimate(&grid).unwrap();
        assert!(estimate
            .grid
            .cells()
            .iter()
            .all(|v| v.re.is_finite() && v.im.is_finite()));
        // Cells away from the bad pilot still carry a weight from it.
        assert_eq!(estimate.grid[(3, 3)], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn interpolates_a_linear_channel_inside_the_hull() {
        let (m, n) = (16, 12);
        let sites = [(0, 0), (15, 0), (0, 11), (15, 11), (7, 5)];
        let pilots = PilotSet::new(
            sites
                .iter()
                .map(|&(d, l)| Pilot::new(d, l, Complex64::new(0.0, 2.0)))
                .collect(),
            m,
            n,
        )
        .unwrap();
        let channel = |d: usize, l: usize| Complex64::new(1.0 + 0.1 * d as f64, 0.05 * l as f64);
        let mut tx = DdGrid::zeros(m, n).unwrap();
        pilots.overlay(&mut tx).unwrap();
        let rx = DdGrid::from_fn(m, n, |d, l| tx[(d, l)] * channel(d, l)).unwrap();

        let estimate = PilotEstimator::new(pilots).unwrap().estimate(&rx).unwrap();
        for (d, l) in rx.coords() {
            assert_relative_eq!(estimate.grid[(d, l)], channel(d, l), epsilon = 1e-9);
        }
    }

    #[test]
    fn rejects_untriangulable_pilots() {
        let collinear = PilotSet::new(
            vec![
                Pilot::new(0, 0, pilot_value()),
                Pilot::new(2, 2, pilot_value()),
                Pilot::new(4, 4, pilot_value()),
            ],
            8,
            8,
        )
        .unwrap();
        assert!(matches!(
            PilotEstimator::new(collinear),
            Err(OtfsError::Configuration(_))
        ));

        let two = PilotSet::new(
            vec![Pilot::new(0, 0, pilot_value()), Pilot::new(2, 5, pilot_value())],
            8,
            8,
        )
        .unwrap();
        assert!(PilotEstimator::new(two).is_err());
    }

    #[test]
    fn rejects_grid_of_wrong_shape() {
        let estimator = PilotEstimator::new(corner_pilots(64, 30)).unwrap();
        let grid = DdGrid::zeros(30, 64).unwrap();
        assert!(matches!(
            estimator.estimate(&grid),
            Err(OtfsError::Shape { .. })
        ));
    }

    #[test]
    fn nearest_site_strategy_fills_every_cell() {
        let pilots = corner_pilots(16, 10);
        let interp = NearestSite::new(&pilots.sites()).unwrap();
        let estimator = PilotEstimator::with_interpolator(pilots.clone(), Box::new(interp)).unwrap();
        let mut grid = DdGrid::zeros(16, 10).unwrap();
        pilots.overlay(&mut grid).unwrap();
        let estimate = estimator.estimate(&grid).unwrap();
        for v in estimate.grid.cells() {
            assert_relative_eq!(*v, Complex64::new(1.0, 0.0), epsilon = 1e-12);
        }

        let mismatched = NearestSite::new(&[(0, 0)]).unwrap();
        assert!(PilotEstimator::with_interpolator(pilots, Box::new(mismatched)).is_err());
    }
}
