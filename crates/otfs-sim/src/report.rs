use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::montecarlo::SnrPoint;

const HEADER: &str = "snr_db,bits,bit_errors,ber,pilot_mse";
const STAMP_FORMAT: &str = "[year][month][day]T[hour][minute][second]Z";

/// Write the sweep as CSV to `<dir>/ber-<UTC timestamp>.csv`.
pub fn write_report(dir: &Path, points: &[SnrPoint]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating report directory {}", dir.display()))?;
    let stamp_format =
        time::format_description::parse(STAMP_FORMAT).context("parsing report timestamp format")?;
    let stamp = OffsetDateTime::now_utc()
        .format(&stamp_format)
        .context("formatting report timestamp")?;
    let path = dir.join(format!("ber-{}.csv", stamp));

    let file = std::fs::File::create(&path)
        .with_context(|| format!("creating report {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    writer.write_all(render_csv(points).as_bytes())?;
    writer.flush()?;
    Ok(path)
}

pub fn render_csv(points: &[SnrPoint]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for p in points {
        out.push_str(&format!(
            "{},{},{},{:.6e},{:.6e}\n",
            p.snr_db,
            p.bits,
            p.bit_errors,
            p.ber(),
            p.pilot_mse
        ));
    }
    out
}
