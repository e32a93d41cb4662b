use nix::sys::statvfs::statvfs;

use crate::error::ProbeError;
use crate::probe::DiskSpaceSample;

/// Query the filesystem containing `path` with statvfs(3).
///
/// Block counts are in units of the fragment size; fall back to the block
/// size when a filesystem leaves `f_frsize` unset.
pub fn disk_space(path: &str) -> Result<DiskSpaceSample, ProbeError> {
    let stat = statvfs(path).map_err(|errno| ProbeError::Query {
        path: path.to_string(),
        reason: errno.to_string(),
    })?;

    let unit = match u64::from(stat.fragment_size()) {
        0 => u64::from(stat.block_size()),
        frsize => frsize,
    };

    Ok(DiskSpaceSample {
        total: u64::from(stat.blocks()).saturating_mul(unit),
        free: u64::from(stat.blocks_free()).saturating_mul(unit),
        available: u64::from(stat.blocks_available()).saturating_mul(unit),
    })
}
