//! OTFS modulation and demodulation.
//!
//! The modulator takes an `M x N` delay-Doppler grid through a 2D inverse DFT
//! (Doppler axis first, then delay axis), flattens the result Doppler-fastest
//! and wraps it in the configured guard interval. The demodulator undoes each
//! step in reverse order. Forward DFTs are unscaled and the modulator carries
//! the whole `1 / (M * N)` factor, so the pair round-trips exactly.

use std::sync::Arc;

use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::error::{OtfsError, Result};
use crate::grid::DdGrid;
use crate::guard::{GuardInterval, GuardMode};

/// Grid dimensions and guard interval shared by both ends of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtfsParams {
    doppler_bins: usize,
    delay_bins: usize,
    guard: GuardInterval,
}

impl OtfsParams {
    /// Start building parameters for an `M x N` grid.
    pub fn builder(doppler_bins: usize, delay_bins: usize) -> OtfsParamsBuilder {
        OtfsParamsBuilder::new(doppler_bins, delay_bins)
    }

    pub fn doppler_bins(&self) -> usize {
        self.doppler_bins
    }

    pub fn delay_bins(&self) -> usize {
        self.delay_bins
    }

    pub fn guard(&self) -> GuardInterval {
        self.guard
    }

    /// Samples in one frame before the guard is added (`M * N`).
    pub fn frame_len(&self) -> usize {
        self.doppler_bins * self.delay_bins
    }

    /// Samples the modulator emits per frame.
    pub fn tx_len(&self) -> usize {
        self.frame_len() + self.guard.added_len()
    }
}

/// Builder for [`OtfsParams`].
pub struct OtfsParamsBuilder {
    doppler_bins: usize,
    delay_bins: usize,
    guard: GuardInterval,
}

impl OtfsParamsBuilder {
    /// Create a builder with no guard interval.
    pub fn new(doppler_bins: usize, delay_bins: usize) -> Self {
        Self {
            doppler_bins,
            delay_bins,
            guard: GuardInterval::none(),
        }
    }

    /// Set the guard mode and length in samples.
    pub fn guard(mut self, mode: GuardMode, len: usize) -> Self {
        self.guard = GuardInterval::new(mode, len);
        self
    }

    /// Validate and build the parameters.
    pub fn build(self) -> Result<OtfsParams> {
        if self.doppler_bins == 0 {
            return Err(OtfsError::config("doppler bins (M) must be positive"));
        }
        if self.delay_bins == 0 {
            return Err(OtfsError::config("delay bins (N) must be positive"));
        }
        let frame_len = self.doppler_bins * self.delay_bins;
        if self.guard.mode() == GuardMode::CyclicPrefix && self.guard.guard_len() > frame_len {
            return Err(OtfsError::config(format!(
                "cyclic prefix length {} exceeds frame length {}",
                self.guard.guard_len(),
                frame_len
            )));
        }
        Ok(OtfsParams {
            doppler_bins: self.doppler_bins,
            delay_bins: self.delay_bins,
            guard: self.guard,
        })
    }
}

/// Delay-Doppler grid to time-domain samples.
#[derive(Clone)]
pub struct OtfsModulator {
    params: OtfsParams,
    doppler_ifft: Arc<dyn Fft<f64>>,
    delay_ifft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for OtfsModulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtfsModulator")
            .field("params", &self.params)
            .finish()
    }
}

impl OtfsModulator {
    pub fn new(params: OtfsParams) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            doppler_ifft: planner.plan_fft_inverse(params.doppler_bins),
            delay_ifft: planner.plan_fft_inverse(params.delay_bins),
            params,
        }
    }

    pub fn params(&self) -> &OtfsParams {
        &self.params
    }

    /// Modulate one frame.
    ///
    /// The grid must have the configured shape. The output holds
    /// `M * N` samples plus the guard.
    pub fn modulate(&self, grid: &DdGrid) -> Result<Vec<Complex64>> {
        let (m, n) = (self.params.doppler_bins, self.params.delay_bins);
        if grid.shape() != (m, n) {
            return Err(OtfsError::shape(
                "modulator grid shape",
                format!("{}x{}", m, n),
                format!("{}x{}", grid.doppler_bins(), grid.delay_bins()),
            ));
        }

        let mut frame = grid.cells().to_vec();
        self.doppler_ifft.process(&mut frame);
        transform_rows(&mut frame, m, n, self.delay_ifft.as_ref());

        // Normalize: rustfft's inverse is unscaled.
        let scale = 1.0 / (m * n) as f64;
        for sample in &mut frame {
            *sample *= scale;
        }

        self.params.guard.insert(&frame)
    }
}

/// Time-domain samples to a delay-Doppler grid.
#[derive(Clone)]
pub struct OtfsDemodulator {
    params: OtfsParams,
    doppler_fft: Arc<dyn Fft<f64>>,
    delay_fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for OtfsDemodulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtfsDemodulator")
            .field("params", &self.params)
            .finish()
    }
}

impl OtfsDemodulator {
    pub fn new(params: OtfsParams) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            doppler_fft: planner.plan_fft_forward(params.doppler_bins),
            delay_fft: planner.plan_fft_forward(params.delay_bins),
            params,
        }
    }

    pub fn params(&self) -> &OtfsParams {
        &self.params
    }

    /// Demodulate one received frame.
    ///
    /// After the guard is stripped, a frame shorter than `M * N` is zero-padded
    /// on the right and a longer one is truncated; neither is an error.
    pub fn demodulate(&self, rx: &[Complex64]) -> DdGrid {
        let (m, n) = (self.params.doppler_bins, self.params.delay_bins);
        let frame_len = m * n;

        let mut frame = self.params.guard.remove(rx);
        if frame.len() != frame_len {
            tracing::debug!(
                received = frame.len(),
                frame_len,
                "reconciling demodulator input length"
            );
            frame.resize(frame_len, Complex64::new(0.0, 0.0));
        }

        transform_rows(&mut frame, m, n, self.delay_fft.as_ref());
        self.doppler_fft.process(&mut frame);

        DdGrid::from_parts(m, n, frame)
    }
}

/// Apply `fft` (length `n`) along the delay axis of a Doppler-fastest buffer.
///
/// Each Doppler row is strided by `m` in storage, so the rows are gathered
/// into contiguous runs, transformed together and scattered back.
fn transform_rows(frame: &mut [Complex64], m: usize, n: usize, fft: &dyn Fft<f64>) {
    let mut rows = vec![Complex64::new(0.0, 0.0); frame.len()];
    for l in 0..n {
        for d in 0..m {
            rows[d * n + l] = frame[d + l * m];
        }
    }
    fft.process(&mut rows);
    for l in 0..n {
        for d in 0..m {
            frame[d + l * m] = rows[d * n + l];
        }
    }
}
