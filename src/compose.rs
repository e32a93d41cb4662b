use bytesize::{GB, KB, MB, PB, TB};

use crate::config::DriveConfig;
use crate::error::{CompositionError, Error, ProbeError};
use crate::probe::DiskSpaceSample;

/// Values a mail template can reference.
#[derive(Debug, Clone, PartialEq)]
pub struct MailTemplateInput {
    pub hostname: String,
    pub path: String,
    pub free: String,
    pub total: String,
    pub used: String,
    pub limit: String,
    pub free_percent: f64,
    pub used_percent: f64,
    pub version: Option<String>,
}

const DECIMAL_UNITS: [(u64, &str); 5] = [(KB, "KB"), (MB, "MB"), (GB, "GB"), (TB, "TB"), (PB, "PB")];

/// Human readable size. Decimal units (KB, MB, GB) for every value in a message.
///
/// The unit is picked with integer comparisons, so exact powers of 1000 land
/// on the larger unit. A value that would round to 1000.0 moves up one unit.
pub fn human_bytes(bytes: u64) -> String {
    let Some(mut idx) = DECIMAL_UNITS.iter().rposition(|(unit, _)| bytes >= *unit) else {
        return format!("{bytes} B");
    };
    let mut value = bytes as f64 / DECIMAL_UNITS[idx].0 as f64;
    if (value * 10.0).round() >= 10_000.0 && idx + 1 < DECIMAL_UNITS.len() {
        idx += 1;
        value = bytes as f64 / DECIMAL_UNITS[idx].0 as f64;
    }
    format!("{value:.1} {}", DECIMAL_UNITS[idx].1)
}

pub fn compose(
    sample: &DiskSpaceSample,
    drive: &DriveConfig,
    hostname: &str,
    version: Option<&str>,
) -> Result<MailTemplateInput, Error> {
    let free = sample.usable();
    if free > sample.total {
        return Err(ProbeError::Inconsistent {
            path: drive.path.clone(),
            free: sample.free,
            available: sample.available,
            total: sample.total,
        }
        .into());
    }
    if sample.total == 0 {
        return Err(CompositionError::ZeroTotal(drive.path.clone()).into());
    }

    let free_percent = 100.0 * free as f64 / sample.total as f64;

    Ok(MailTemplateInput {
        hostname: hostname.to_string(),
        path: drive.path.clone(),
        free: human_bytes(free),
        total: human_bytes(sample.total),
        used: human_bytes(sample.total - free),
        limit: human_bytes(drive.limit_bytes),
        free_percent,
        used_percent: 100.0 - free_percent,
        version: version.map(str::to_string),
    })
}
