use otfs_modem::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;

/// Additive white complex Gaussian noise at a fixed SNR.
///
/// The noise level is set from the measured mean power of the samples it is
/// added to, split evenly between the I and Q components.
#[derive(Debug, Clone, Copy)]
pub struct AwgnChannel {
    snr_db: f64,
}

impl AwgnChannel {
    pub fn new(snr_db: f64) -> Self {
        Self { snr_db }
    }

    /// Per-component standard deviation for a signal of `signal_power`.
    pub fn noise_std(&self, signal_power: f64) -> f64 {
        let snr_linear = 10.0_f64.powf(self.snr_db / 10.0);
        (signal_power / (2.0 * snr_linear)).sqrt()
    }

    /// Add noise in place and return the per-component standard deviation used.
    pub fn add_noise<R: Rng + ?Sized>(&self, rng: &mut R, samples: &mut [Complex64]) -> f64 {
        let std = self.noise_std(mean_power(samples));
        if !(std.is_finite() && std > 0.0) {
            return 0.0;
        }
        for s in samples.iter_mut() {
            let re: f64 = rng.sample(StandardNormal);
            let im: f64 = rng.sample(StandardNormal);
            *s += Complex64::new(re * std, im * std);
        }
        std
    }
}

pub fn mean_power(samples: &[Complex64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.norm_sqr()).sum::<f64>() / samples.len() as f64
}
