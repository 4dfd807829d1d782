use bitvec::slice::BitSlice;
use bitvec::vec::BitVec;
use num_complex::Complex64;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("QPSK needs an even number of bits, got {0}")]
    OddBitCount(usize),
}

/// Gray-coded QPSK with unit average symbol energy.
///
/// Bit pair `(b0, b1)` maps to `((1 - 2 b0) + i (1 - 2 b1)) / sqrt(2)`, so
/// neighbouring constellation points differ in one bit.
#[derive(Debug, Clone, Copy, Default)]
pub struct QpskMapper;

impl QpskMapper {
    pub fn new() -> Self {
        Self
    }

    pub fn bits_per_symbol(&self) -> usize {
        2
    }

    /// Map bits to symbols, two bits per symbol.
    pub fn map(&self, bits: &BitSlice) -> Result<Vec<Complex64>, MapError> {
        if bits.len() % 2 != 0 {
            return Err(MapError::OddBitCount(bits.len()));
        }
        let scale = std::f64::consts::FRAC_1_SQRT_2;
        Ok(bits
            .chunks_exact(2)
            .map(|pair| Complex64::new(level(pair[0]) * scale, level(pair[1]) * scale))
            .collect())
    }

    /// Hard-decision demapping on the sign of each component.
    ///
    /// A component of exactly zero decides bit 0.
    pub fn demap(&self, symbols: &[Complex64]) -> BitVec {
        let mut bits = BitVec::with_capacity(symbols.len() * 2);
        for s in symbols {
            bits.push(s.re < 0.0);
            bits.push(s.im < 0.0);
        }
        bits
    }
}

fn level(bit: bool) -> f64 {
    if bit {
        -1.0
    } else {
        1.0
    }
}
