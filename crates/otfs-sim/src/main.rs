use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use otfs_modem::dd_bin_map;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod montecarlo;
mod noise;
mod report;

use config::SimConfig;
use montecarlo::Simulation;

#[derive(Parser, Debug)]
#[command(name = "otfs-sim", about = "Monte Carlo BER sweep over an OTFS link")]
struct Args {
    /// YAML scenario file. The built-in scenario is used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// SNR points in dB, comma separated.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    snr_db: Option<Vec<f64>>,

    /// Frames per SNR point.
    #[arg(long)]
    trials: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Directory the CSV report is written to.
    #[arg(long, default_value = "reports")]
    report_dir: PathBuf,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Equalise data cells with the channel estimate.
    #[arg(long)]
    equalize: bool,
}

impl Args {
    fn apply(&self, config: &mut SimConfig) {
        if let Some(snr_db) = &self.snr_db {
            config.snr_db = snr_db.clone();
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.equalize |= self.equalize;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let link = config.build_link()?;
    log_path_footprint(&config)?;
    let sim = Simulation::new(link, config.equalize, config.seed);
    info!(
        doppler_bins = config.doppler_bins,
        delay_bins = config.delay_bins,
        guard = %config.guard.mode,
        guard_len = config.guard.len,
        bits_per_frame = sim.bits_per_frame(),
        trials = config.trials,
        "starting sweep"
    );

    let points = sim.sweep(&config.snr_db, config.trials)?;
    for p in &points {
        info!(
            snr_db = p.snr_db,
            bits = p.bits,
            bit_errors = p.bit_errors,
            ber = p.ber(),
            pilot_mse = p.pilot_mse,
            "snr point done"
        );
    }
    if let Some(last) = points.last() {
        let estimates: Vec<String> = last
            .last_estimate
            .iter()
            .map(|h| format!("{:.4}{:+.4}i", h.re, h.im))
            .collect();
        info!(snr_db = last.snr_db, estimates = ?estimates, "last per-pilot estimates");
    }

    let path = report::write_report(&args.report_dir, &points)
        .with_context(|| format!("writing report to {}", args.report_dir.display()))?;
    info!(path = %path.display(), "report written");
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn log_path_footprint(config: &SimConfig) -> Result<()> {
    let bins = dd_bin_map(
        &config.path_set()?,
        config.doppler_bins,
        config.delay_bins,
        config.subcarrier_spacing_hz,
    )?;
    for (d, l) in bins.coords() {
        let gain = bins[(d, l)];
        if gain.norm_sqr() > 0.0 {
            debug!(doppler_bin = d, delay_bin = l, gain = gain.re, "path footprint");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_sweep() {
        let args = Args::try_parse_from([
            "otfs-sim",
            "--snr-db",
            "-5,0,7.5",
            "--trials",
            "3",
            "--seed",
            "42",
            "--equalize",
        ])
        .expect("parses");
        let mut config = SimConfig::default();
        args.apply(&mut config);
        assert_eq!(config.snr_db, vec![-5.0, 0.0, 7.5]);
        assert_eq!(config.trials, 3);
        assert_eq!(config.seed, 42);
        assert!(config.equalize);
        assert_eq!(args.report_dir, PathBuf::from("reports"));
    }

    #[test]
    fn defaults_leave_config_alone() {
        let args = Args::try_parse_from(["otfs-sim"]).expect("parses");
        let mut config = SimConfig::default();
        args.apply(&mut config);
        assert_eq!(config, SimConfig::default());
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn default_paths_have_a_footprint() {
        log_path_footprint(&SimConfig::default()).expect("valid scenario");
    }
}
