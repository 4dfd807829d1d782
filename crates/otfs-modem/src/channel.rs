//! Multipath Doppler channel.
//!
//! Every path delays the transmitted burst by a whole number of samples,
//! scales it by a real gain and rotates it by its Doppler shift. The delay is
//! linear: samples pushed past the start of the recording are lost, nothing
//! wraps around. The Doppler ramp runs on the receiver's time axis, after the
//! delay.

use std::f64::consts::TAU;

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{OtfsError, Result};
use crate::grid::DdGrid;

/// One propagation path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Delay in samples.
    pub delay: usize,
    /// Linear amplitude gain.
    pub gain: f64,
    /// Doppler shift in Hz.
    pub doppler_hz: f64,
}

impl Path {
    pub fn new(delay: usize, gain: f64, doppler_hz: f64) -> Self {
        Self {
            delay,
            gain,
            doppler_hz,
        }
    }
}

/// Validated, immutable set of paths.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathSet {
    paths: Vec<Path>,
}

impl PathSet {
    pub fn new(paths: Vec<Path>) -> Result<Self> {
        for (i, path) in paths.iter().enumerate() {
            if !path.gain.is_finite() || path.gain < 0.0 {
                return Err(OtfsError::config(format!(
                    "path {} gain must be finite and non-negative, got {}",
                    i, path.gain
                )));
            }
            if !path.doppler_hz.is_finite() {
                return Err(OtfsError::config(format!(
                    "path {} doppler must be finite, got {}",
                    i, path.doppler_hz
                )));
            }
        }
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter()
    }

    /// Largest delay of any path, in samples.
    pub fn max_delay(&self) -> usize {
        self.paths.iter().map(|p| p.delay).max().unwrap_or(0)
    }
}

/// Time-domain channel with a fixed sampling rate and path set.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipathChannel {
    sample_rate_hz: f64,
    paths: PathSet,
}

impl MultipathChannel {
    pub fn new(sample_rate_hz: f64, paths: PathSet) -> Result<Self> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(OtfsError::config(format!(
                "sample rate must be positive, got {} Hz",
                sample_rate_hz
            )));
        }
        Ok(Self {
            sample_rate_hz,
            paths,
        })
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn paths(&self) -> &PathSet {
        &self.paths
    }

    /// Pass `tx` through every path and sum the contributions.
    ///
    /// The output has the same length as the input.
    pub fn apply(&self, tx: &[Complex64]) -> Vec<Complex64> {
        let mut rx = vec![Complex64::new(0.0, 0.0); tx.len()];
        for path in self.paths.iter() {
            tracing::trace!(
                delay = path.delay,
                gain = path.gain,
                doppler_hz = path.doppler_hz,
                "applying path"
            );
            self.accumulate_path(path, tx, &mut rx);
        }
        rx
    }

    fn accumulate_path(&self, path: &Path, tx: &[Complex64], rx: &mut [Complex64]) {
        if path.delay >= tx.len() {
            return;
        }
        let phase_inc = TAU * path.doppler_hz / self.sample_rate_hz;
        for ((k, out), x) in rx.iter_mut().enumerate().skip(path.delay).zip(tx) {
            let rotation = Complex64::from_polar(path.gain, phase_inc * k as f64);
            *out += x * rotation;
        }
    }
}

/// Apply `paths` to `tx` at `sample_rate_hz`.
pub fn apply(tx: &[Complex64], sample_rate_hz: f64, paths: &PathSet) -> Result<Vec<Complex64>> {
    Ok(MultipathChannel::new(sample_rate_hz, paths.clone())?.apply(tx))
}

/// Heuristic delay-Doppler footprint of a path set.
///
/// Each path's gain is placed at Doppler bin `round(doppler / df * M) mod M`
/// and delay bin `delay mod N`; paths landing on the same bin add up. This is
/// a display aid only. It is not derived from the time-domain model above and
/// nothing in estimation depends on it.
pub fn dd_bin_map(
    paths: &PathSet,
    doppler_bins: usize,
    delay_bins: usize,
    subcarrier_spacing_hz: f64,
) -> Result<DdGrid> {
    if !subcarrier_spacing_hz.is_finite() || subcarrier_spacing_hz <= 0.0 {
        return Err(OtfsError::config(format!(
            "subcarrier spacing must be positive, got {} Hz",
            subcarrier_spacing_hz
        )));
    }
    let mut grid = DdGrid::zeros(doppler_bins, delay_bins)?;
    for path in paths.iter() {
        let (d, l) = dd_bin(path, doppler_bins, delay_bins, subcarrier_spacing_hz);
        grid[(d, l)] += Complex64::new(path.gain, 0.0);
    }
    Ok(grid)
}

fn dd_bin(path: &Path, doppler_bins: usize, delay_bins: usize, df: f64) -> (usize, usize) {
    let m = doppler_bins as i64;
    let doppler = (path.doppler_hz / df * doppler_bins as f64).round() as i64;
    let d = doppler.rem_euclid(m) as usize;
    let l = path.delay % delay_bins;
    (d, l)
}
