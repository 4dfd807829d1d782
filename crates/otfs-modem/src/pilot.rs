//! Known pilot symbols embedded in the delay-Doppler grid.

use std::collections::HashSet;

use rustfft::num_complex::Complex64;

use crate::error::{OtfsError, Result};
use crate::grid::DdGrid;

/// A known symbol at a fixed grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pilot {
    pub doppler: usize,
    pub delay: usize,
    pub value: Complex64,
}

impl Pilot {
    pub fn new(doppler: usize, delay: usize, value: Complex64) -> Self {
        Self {
            doppler,
            delay,
            value,
        }
    }
}

/// Pilot layout agreed between transmitter and receiver.
///
/// Coordinates are distinct and inside an `M x N` grid, and every value is
/// finite and nonzero so the receiver can divide by it.
#[derive(Debug, Clone, PartialEq)]
pub struct PilotSet {
    doppler_bins: usize,
    delay_bins: usize,
    pilots: Vec<Pilot>,
}

impl PilotSet {
    pub fn new(pilots: Vec<Pilot>, doppler_bins: usize, delay_bins: usize) -> Result<Self> {
        if doppler_bins == 0 || delay_bins == 0 {
            return Err(OtfsError::config(format!(
                "pilot grid must be non-empty, got {}x{}",
                doppler_bins, delay_bins
            )));
        }
        let mut seen = HashSet::with_capacity(pilots.len());
        for (i, pilot) in pilots.iter().enumerate() {
            if pilot.doppler >= doppler_bins || pilot.delay >= delay_bins {
                return Err(OtfsError::config(format!(
                    "pilot {} at ({}, {}) lies outside the {}x{} grid",
                    i, pilot.doppler, pilot.delay, doppler_bins, delay_bins
                )));
            }
            if !seen.insert((pilot.doppler, pilot.delay)) {
                return Err(OtfsError::config(format!(
                    "pilot {} duplicates cell ({}, {})",
                    i, pilot.doppler, pilot.delay
                )));
            }
            if !(pilot.value.re.is_finite() && pilot.value.im.is_finite()) {
                return Err(OtfsError::config(format!("pilot {} value is not finite", i)));
            }
            if pilot.value.norm_sqr() == 0.0 {
                return Err(OtfsError::config(format!("pilot {} value is zero", i)));
            }
        }
        Ok(Self {
            doppler_bins,
            delay_bins,
            pilots,
        })
    }

    /// Grid shape the pilots were validated against.
    pub fn shape(&self) -> (usize, usize) {
        (self.doppler_bins, self.delay_bins)
    }

    pub fn pilots(&self) -> &[Pilot] {
        &self.pilots
    }

    pub fn len(&self) -> usize {
        self.pilots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pilots.is_empty()
    }

    /// Pilot coordinates as `(doppler, delay)`, in pilot order.
    pub fn sites(&self) -> Vec<(usize, usize)> {
        self.pilots.iter().map(|p| (p.doppler, p.delay)).collect()
    }

    /// Pilot values in pilot order.
    pub fn values(&self) -> Vec<Complex64> {
        self.pilots.iter().map(|p| p.value).collect()
    }

    pub fn contains(&self, doppler: usize, delay: usize) -> bool {
        self.pilots
            .iter()
            .any(|p| p.doppler == doppler && p.delay == delay)
    }

    /// Write the pilot values into `grid`.
    pub fn overlay(&self, grid: &mut DdGrid) -> Result<()> {
        self.check_grid(grid)?;
        for pilot in &self.pilots {
            grid[(pilot.doppler, pilot.delay)] = pilot.value;
        }
        Ok(())
    }

    /// Cells that carry data, in grid storage order.
    pub fn data_coords(&self) -> Vec<(usize, usize)> {
        let pilots: HashSet<_> = self.pilots.iter().map(|p| (p.doppler, p.delay)).collect();
        let mut coords = Vec::with_capacity(self.doppler_bins * self.delay_bins - pilots.len());
        for l in 0..self.delay_bins {
            for d in 0..self.doppler_bins {
                if !pilots.contains(&(d, l)) {
                    coords.push((d, l));
                }
            }
        }
        coords
    }

    pub(crate) fn check_grid(&self, grid: &DdGrid) -> Result<()> {
        if grid.shape() != self.shape() {
            return Err(OtfsError::shape(
                "pilot grid shape",
                format!("{}x{}", self.doppler_bins, self.delay_bins),
                format!("{}x{}", grid.doppler_bins(), grid.delay_bins()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Complex64 {
        Complex64::new(1.0, 0.0)
    }

    #[test]
    fn rejects_invalid_pilots() {
        let out_of_bounds = vec![Pilot::new(4, 0, unit())];
        assert!(PilotSet::new(out_of_bounds, 4, 4).is_err());

        let duplicate = vec![Pilot::new(1, 1, unit()), Pilot::new(1, 1, unit())];
        assert!(PilotSet::new(duplicate, 4, 4).is_err());

        let zero = vec![Pilot::new(1, 1, Complex64::new(0.0, 0.0))];
        assert!(matches!(
            PilotSet::new(zero, 4, 4),
            Err(OtfsError::Configuration(_))
        ));

        let nan = vec![Pilot::new(1, 1, Complex64::new(f64::NAN, 1.0))];
        assert!(PilotSet::new(nan, 4, 4).is_err());
    }

    #[test]
    fn overlay_writes_values() {
        let value = Complex64::from_polar(1.0, 0.75 * std::f64::consts::PI);
        let set = PilotSet::new(vec![Pilot::new(0, 2, value), Pilot::new(3, 1, unit())], 4, 3)
            .unwrap();
        let mut grid = DdGrid::zeros(4, 3).unwrap();
        set.overlay(&mut grid).unwrap();
        assert_eq!(grid[(0, 2)], value);
        assert_eq!(grid[(3, 1)], unit());
        assert_eq!(set.values(), vec![value, unit()]);
        assert!(set.contains(3, 1));
        assert!(!set.contains(1, 3));

        let mut wrong = DdGrid::zeros(3, 4).unwrap();
        assert!(matches!(
            set.overlay(&mut wrong),
            Err(OtfsError::Shape { .. })
        ));
    }

    #[test]
    fn data_coords_skip_pilots() {
        let set = PilotSet::new(vec![Pilot::new(1, 0, unit())], 2, 2).unwrap();
        assert_eq!(set.data_coords(), vec![(0, 0), (0, 1), (1, 1)]);
    }
}
