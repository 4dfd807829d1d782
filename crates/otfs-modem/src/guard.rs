//! Guard-interval insertion and removal.

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{OtfsError, Result};

/// Kind of guard segment wrapped around a transmitted block.
///
/// Deserializes through [`GuardMode::parse`], so unknown names read as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardMode {
    /// No guard; insert and remove pass samples through.
    #[default]
    None,
    /// Zeros appended after the block.
    ZeroPad,
    /// Copy of the block tail prepended to its front.
    CyclicPrefix,
}

impl GuardMode {
    /// Parse a mode name. Unrecognised names select `None`.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "zp" | "zero_pad" | "zeropad" => GuardMode::ZeroPad,
            "cp" | "cyclic_prefix" | "cyclicprefix" => GuardMode::CyclicPrefix,
            _ => GuardMode::None,
        }
    }
}

impl<'de> Deserialize<'de> for GuardMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(GuardMode::parse(&name))
    }
}

impl std::fmt::Display for GuardMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardMode::None => write!(f, "none"),
            GuardMode::ZeroPad => write!(f, "zero_pad"),
            GuardMode::CyclicPrefix => write!(f, "cyclic_prefix"),
        }
    }
}

/// A guard mode together with its length in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardInterval {
    mode: GuardMode,
    len: usize,
}

impl GuardInterval {
    pub fn new(mode: GuardMode, len: usize) -> Self {
        Self { mode, len }
    }

    /// No guard at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    /// Configured guard length. Ignored when the mode is `None`.
    pub fn guard_len(&self) -> usize {
        self.len
    }

    /// Number of samples `insert` adds to a block.
    pub fn added_len(&self) -> usize {
        match self.mode {
            GuardMode::None => 0,
            GuardMode::ZeroPad | GuardMode::CyclicPrefix => self.len,
        }
    }

    /// Wrap `core` with the guard segment.
    ///
    /// A cyclic prefix longer than the block cannot be formed and is rejected.
    pub fn insert(&self, core: &[Complex64]) -> Result<Vec<Complex64>> {
        match self.mode {
            GuardMode::None => Ok(core.to_vec()),
            GuardMode::ZeroPad => {
                let mut out = Vec::with_capacity(core.len() + self.len);
                out.extend_from_slice(core);
                out.resize(core.len() + self.len, Complex64::new(0.0, 0.0));
                Ok(out)
            }
            GuardMode::CyclicPrefix => {
                if self.len > core.len() {
                    return Err(OtfsError::config(format!(
                        "cyclic prefix length {} exceeds block length {}",
                        self.len,
                        core.len()
                    )));
                }
                let mut out = Vec::with_capacity(core.len() + self.len);
                out.extend_from_slice(&core[core.len() - self.len..]);
                out.extend_from_slice(core);
                Ok(out)
            }
        }
    }

    /// Strip the guard segment from a received block.
    ///
    /// Zero-pad tails are dropped without being inspected. A block shorter
    /// than the guard yields an empty sequence.
    pub fn remove(&self, rx: &[Complex64]) -> Vec<Complex64> {
        match self.mode {
            GuardMode::None => rx.to_vec(),
            GuardMode::ZeroPad => rx[..rx.len().saturating_sub(self.len)].to_vec(),
            GuardMode::CyclicPrefix => rx[self.len.min(rx.len())..].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<Complex64> {
        (0..len)
            .map(|i| Complex64::new(i as f64, -(i as f64) * 0.5))
            .collect()
    }

    #[test]
    fn zero_pad_appends_zeros() {
        let guard = GuardInterval::new(GuardMode::ZeroPad, 3);
        let out = guard.insert(&ramp(5)).unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(&out[..5], &ramp(5)[..]);
        assert!(out[5..].iter().all(|v| *v == Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn cyclic_prefix_copies_tail_to_front() {
        let guard = GuardInterval::new(GuardMode::CyclicPrefix, 2);
        let out = guard.insert(&ramp(5)).unwrap();
        assert_eq!(out.len(), 7);
        assert_eq!(out[0], Complex64::new(3.0, -1.5));
        assert_eq!(out[1], Complex64::new(4.0, -2.0));
        assert_eq!(&out[2..], &ramp(5)[..]);
    }

    #[test]
    fn remove_inverts_insert() {
        let core = ramp(16);
        for mode in [GuardMode::None, GuardMode::ZeroPad, GuardMode::CyclicPrefix] {
            for len in [0, 1, 7, 16] {
                let guard = GuardInterval::new(mode, len);
                let wrapped = guard.insert(&core).unwrap();
                assert_eq!(guard.remove(&wrapped), core, "{} len {}", mode, len);
            }
        }
    }

    #[test]
    fn zero_pad_removal_ignores_tail_values() {
        let guard = GuardInterval::new(GuardMode::ZeroPad, 2);
        let mut rx = ramp(6);
        rx[5] = Complex64::new(9.0, 9.0);
        assert_eq!(guard.remove(&rx), ramp(4));
    }

    #[test]
    fn oversized_cyclic_prefix_is_rejected() {
        let guard = GuardInterval::new(GuardMode::CyclicPrefix, 6);
        assert!(matches!(
            guard.insert(&ramp(5)),
            Err(OtfsError::Configuration(_))
        ));
    }

    #[test]
    fn removal_from_short_block_is_empty() {
        let guard = GuardInterval::new(GuardMode::CyclicPrefix, 10);
        assert!(guard.remove(&ramp(4)).is_empty());
        let guard = GuardInterval::new(GuardMode::ZeroPad, 10);
        assert!(guard.remove(&ramp(4)).is_empty());
    }

    #[test]
    fn parse_falls_back_to_none() {
        assert_eq!(GuardMode::parse("ZP"), GuardMode::ZeroPad);
        assert_eq!(GuardMode::parse("cyclic_prefix"), GuardMode::CyclicPrefix);
        assert_eq!(GuardMode::parse("guard"), GuardMode::None);
        assert_eq!(GuardInterval::new(GuardMode::None, 12).added_len(), 0);
    }
}
