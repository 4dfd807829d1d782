//! One pass through the whole link: modulate, channel, impair, demodulate,
//! estimate.

use rustfft::num_complex::Complex64;

use crate::channel::MultipathChannel;
use crate::error::{OtfsError, Result};
use crate::estimate::{ChannelEstimate, PilotEstimator};
use crate::grid::DdGrid;
use crate::otfs::{OtfsDemodulator, OtfsModulator, OtfsParams};
use crate::pilot::PilotSet;

/// Everything a single trial produced, for BER accounting or display.
#[derive(Debug, Clone)]
pub struct TrialRecord {
    /// Modulator output, guard included.
    pub tx_samples: Vec<Complex64>,
    /// Channel output after the caller's impairment.
    pub rx_samples: Vec<Complex64>,
    /// Demodulated delay-Doppler grid.
    pub rx_grid: DdGrid,
    pub estimate: ChannelEstimate,
}

/// Transmitter, channel and receiver sharing one set of parameters.
#[derive(Debug)]
pub struct OtfsLink {
    modulator: OtfsModulator,
    demodulator: OtfsDemodulator,
    channel: MultipathChannel,
    estimator: PilotEstimator,
}

impl OtfsLink {
    pub fn new(params: OtfsParams, channel: MultipathChannel, estimator: PilotEstimator) -> Result<Self> {
        let shape = (params.doppler_bins(), params.delay_bins());
        if estimator.pilots().shape() != shape {
            let (pm, pn) = estimator.pilots().shape();
            return Err(OtfsError::config(format!(
                "pilot layout is {}x{} but the link grid is {}x{}",
                pm, pn, shape.0, shape.1
            )));
        }
        Ok(Self {
            modulator: OtfsModulator::new(params),
            demodulator: OtfsDemodulator::new(params),
            channel,
            estimator,
        })
    }

    pub fn params(&self) -> &OtfsParams {
        self.modulator.params()
    }

    pub fn pilots(&self) -> &PilotSet {
        self.estimator.pilots()
    }

    /// Run one frame through the link.
    ///
    /// `impair` sees the channel output before demodulation and may change it
    /// in place, e.g. to add noise.
    pub fn run<F>(&self, grid: &DdGrid, impair: F) -> Result<TrialRecord>
    where
        F: FnOnce(&mut [Complex64]),
    {
        let tx_samples = self.modulator.modulate(grid)?;
        let mut rx_samples = self.channel.apply(&tx_samples);
        impair(&mut rx_samples);
        let rx_grid = self.demodulator.demodulate(&rx_samples);
        let estimate = self.estimator.estimate(&rx_grid)?;
        Ok(TrialRecord {
            tx_samples,
            rx_samples,
            rx_grid,
            estimate,
        })
    }

    /// Run one frame with no impairment after the channel.
    pub fn run_clean(&self, grid: &DdGrid) -> Result<TrialRecord> {
        self.run(grid, |_| {})
    }
}
