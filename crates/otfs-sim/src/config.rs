//! Scenario configuration read from YAML.

use std::path::Path as FsPath;

use anyhow::{bail, Context, Result};
use otfs_modem::{
    Complex64, GuardMode, MultipathChannel, OtfsLink, OtfsParams, Path, PathSet, Pilot,
    PilotEstimator, PilotSet,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Guard segment as written in a scenario file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    pub mode: GuardMode,
    pub len: usize,
}

/// Pilot at a 0-based `(doppler, delay)` cell with a polar value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PilotConfig {
    pub doppler: usize,
    pub delay: usize,
    #[serde(default = "unit_magnitude")]
    pub magnitude: f64,
    #[serde(default)]
    pub phase_rad: f64,
}

fn unit_magnitude() -> f64 {
    1.0
}

impl PilotConfig {
    fn to_pilot(self) -> Pilot {
        Pilot::new(
            self.doppler,
            self.delay,
            Complex64::from_polar(self.magnitude, self.phase_rad),
        )
    }
}

/// Everything one simulation run needs. Missing fields take the defaults,
/// which describe a 64x30 grid with a 10-sample zero pad, three paths and
/// three pilots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub doppler_bins: usize,
    pub delay_bins: usize,
    pub guard: GuardConfig,
    pub subcarrier_spacing_hz: f64,
    pub sample_rate_hz: f64,
    pub paths: Vec<Path>,
    pub pilots: Vec<PilotConfig>,
    pub snr_db: Vec<f64>,
    pub trials: usize,
    pub seed: u64,
    /// Divide data cells by the channel estimate before demapping.
    pub equalize: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        let phase_rad = 0.75 * std::f64::consts::PI;
        let pilot = |doppler, delay| PilotConfig {
            doppler,
            delay,
            magnitude: 1.0,
            phase_rad,
        };
        Self {
            doppler_bins: 64,
            delay_bins: 30,
            guard: GuardConfig {
                mode: GuardMode::ZeroPad,
                len: 10,
            },
            subcarrier_spacing_hz: 15_000.0,
            sample_rate_hz: 2.0 * 64.0 * 15_000.0,
            paths: vec![
                Path::new(0, 1.0, 0.0),
                Path::new(5, 0.7, -3.0),
                Path::new(8, 0.5, 5.0),
            ],
            pilots: vec![pilot(0, 4), pilot(31, 14), pilot(63, 29)],
            snr_db: vec![0.0, 5.0, 10.0, 15.0, 20.0],
            trials: 10,
            seed: 1,
            equalize: false,
        }
    }
}

impl SimConfig {
    /// Load a scenario from a YAML file.
    pub fn load(path: &FsPath) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Checks on the sweep itself. Link parameters are checked by `build_link`.
    pub fn validate(&self) -> Result<()> {
        if self.snr_db.is_empty() {
            bail!("snr_db must list at least one point");
        }
        if let Some(bad) = self.snr_db.iter().find(|s| !s.is_finite()) {
            bail!("snr_db contains a non-finite value: {}", bad);
        }
        if self.trials == 0 {
            bail!("trials must be at least 1");
        }
        Ok(())
    }

    pub fn params(&self) -> Result<OtfsParams> {
        OtfsParams::builder(self.doppler_bins, self.delay_bins)
            .guard(self.guard.mode, self.guard.len)
            .build()
            .context("invalid OTFS parameters")
    }

    pub fn path_set(&self) -> Result<PathSet> {
        PathSet::new(self.paths.clone()).context("invalid channel paths")
    }

    pub fn pilot_set(&self) -> Result<PilotSet> {
        let pilots = self.pilots.iter().map(|p| p.to_pilot()).collect();
        PilotSet::new(pilots, self.doppler_bins, self.delay_bins).context("invalid pilots")
    }

    /// Samples of delay spread that run past the guard, if any.
    ///
    /// A frame without a guard has nothing to absorb the spread, so every
    /// delayed path counts.
    pub fn guard_shortfall(&self, paths: &PathSet) -> Option<usize> {
        let guard = match self.guard.mode {
            GuardMode::None => 0,
            GuardMode::ZeroPad | GuardMode::CyclicPrefix => self.guard.len,
        };
        paths.max_delay().checked_sub(guard).filter(|&short| short > 0)
    }

    /// Build the link described by this scenario.
    pub fn build_link(&self) -> Result<OtfsLink> {
        let params = self.params()?;
        let paths = self.path_set()?;
        if let Some(shortfall) = self.guard_shortfall(&paths) {
            warn!(
                max_delay = paths.max_delay(),
                guard = %self.guard.mode,
                guard_len = self.guard.len,
                shortfall,
                "delay spread runs past the guard"
            );
        }
        let channel =
            MultipathChannel::new(self.sample_rate_hz, paths).context("invalid channel")?;
        let estimator =
            PilotEstimator::new(self.pilot_set()?).context("pilots cannot be triangulated")?;
        Ok(OtfsLink::new(params, channel, estimator)?)
    }
}
