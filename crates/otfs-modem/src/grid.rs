//! Delay-Doppler grid storage.
//!
//! A grid has `M` Doppler bins and `N` delay bins. Cells are stored
//! column-major with the Doppler index running fastest, so cell `(d, l)`
//! lives at flat index `d + l * M`. The modulator flattens and the
//! demodulator reshapes with this same convention.

use std::ops::{Index, IndexMut};

use rustfft::num_complex::Complex64;

use crate::error::{OtfsError, Result};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Complex matrix indexed by (Doppler bin, delay bin).
#[derive(Debug, Clone, PartialEq)]
pub struct DdGrid {
    doppler_bins: usize,
    delay_bins: usize,
    cells: Vec<Complex64>,
}

impl DdGrid {
    /// Create an all-zero grid.
    pub fn zeros(doppler_bins: usize, delay_bins: usize) -> Result<Self> {
        check_dims(doppler_bins, delay_bins)?;
        Ok(Self {
            doppler_bins,
            delay_bins,
            cells: vec![ZERO; doppler_bins * delay_bins],
        })
    }

    /// Wrap a column-major (Doppler-fastest) cell buffer.
    pub fn from_cells(doppler_bins: usize, delay_bins: usize, cells: Vec<Complex64>) -> Result<Self> {
        check_dims(doppler_bins, delay_bins)?;
        let expected = doppler_bins * delay_bins;
        if cells.len() != expected {
            return Err(OtfsError::shape("grid cell count", expected, cells.len()));
        }
        Ok(Self {
            doppler_bins,
            delay_bins,
            cells,
        })
    }

    /// Wrap a buffer whose shape the caller has already validated.
    pub(crate) fn from_parts(doppler_bins: usize, delay_bins: usize, cells: Vec<Complex64>) -> Self {
        debug_assert!(doppler_bins > 0 && delay_bins > 0);
        debug_assert_eq!(cells.len(), doppler_bins * delay_bins);
        Self {
            doppler_bins,
            delay_bins,
            cells,
        }
    }

    /// Build a grid by evaluating `f(doppler, delay)` for every cell.
    pub fn from_fn<F>(doppler_bins: usize, delay_bins: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> Complex64,
    {
        check_dims(doppler_bins, delay_bins)?;
        let mut cells = Vec::with_capacity(doppler_bins * delay_bins);
        for l in 0..delay_bins {
            for d in 0..doppler_bins {
                cells.push(f(d, l));
            }
        }
        Ok(Self {
            doppler_bins,
            delay_bins,
            cells,
        })
    }

    /// Number of Doppler bins (`M`).
    pub fn doppler_bins(&self) -> usize {
        self.doppler_bins
    }

    /// Number of delay bins (`N`).
    pub fn delay_bins(&self) -> usize {
        self.delay_bins
    }

    /// `(M, N)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.doppler_bins, self.delay_bins)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, doppler: usize, delay: usize) -> Option<Complex64> {
        if doppler < self.doppler_bins && delay < self.delay_bins {
            Some(self.cells[self.flat_index(doppler, delay)])
        } else {
            None
        }
    }

    pub fn set(&mut self, doppler: usize, delay: usize, value: Complex64) -> Result<()> {
        if doppler >= self.doppler_bins || delay >= self.delay_bins {
            return Err(OtfsError::shape(
                "grid coordinate",
                format!("< ({}, {})", self.doppler_bins, self.delay_bins),
                format!("({}, {})", doppler, delay),
            ));
        }
        let idx = self.flat_index(doppler, delay);
        self.cells[idx] = value;
        Ok(())
    }

    /// Column-major cell buffer.
    pub fn cells(&self) -> &[Complex64] {
        &self.cells
    }

    /// Iterate `(doppler, delay)` coordinates in storage order.
    pub fn coords(&self) -> impl Iterator<Item = (usize, usize)> {
        let m = self.doppler_bins;
        (0..self.cells.len()).map(move |i| (i % m, i / m))
    }

    fn flat_index(&self, doppler: usize, delay: usize) -> usize {
        doppler + delay * self.doppler_bins
    }
}

impl Index<(usize, usize)> for DdGrid {
    type Output = Complex64;

    fn index(&self, (doppler, delay): (usize, usize)) -> &Complex64 {
        assert!(
            doppler < self.doppler_bins && delay < self.delay_bins,
            "grid index ({}, {}) out of bounds for {}x{}",
            doppler,
            delay,
            self.doppler_bins,
            self.delay_bins
        );
        &self.cells[self.flat_index(doppler, delay)]
    }
}

impl IndexMut<(usize, usize)> for DdGrid {
    fn index_mut(&mut self, (doppler, delay): (usize, usize)) -> &mut Complex64 {
        assert!(
            doppler < self.doppler_bins && delay < self.delay_bins,
            "grid index ({}, {}) out of bounds for {}x{}",
            doppler,
            delay,
            self.doppler_bins,
            self.delay_bins
        );
        let idx = self.flat_index(doppler, delay);
        &mut self.cells[idx]
    }
}

fn check_dims(doppler_bins: usize, delay_bins: usize) -> Result<()> {
    if doppler_bins == 0 {
        return Err(OtfsError::config("doppler bins (M) must be positive"));
    }
    if delay_bins == 0 {
        return Err(OtfsError::config("delay bins (N) must be positive"));
    }
    Ok(())
}
