use crate::error::ProbeError;
use crate::system;

/// One reading of a filesystem's space, all values in bytes.
///
/// `free` counts every free block, including blocks reserved for the
/// superuser. `available` is what an unprivileged caller can actually use,
/// and it is the value alerting is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpaceSample {
    pub free: u64,
    pub total: u64,
    pub available: u64,
}

impl DiskSpaceSample {
    /// Bytes used for the threshold decision and the notification.
    pub fn usable(&self) -> u64 {
        self.available
    }

    /// Reject samples where a free count exceeds the total.
    pub fn check_consistent(&self, path: &str) -> Result<(), ProbeError> {
        if self.free > self.total || self.available > self.total {
            return Err(ProbeError::Inconsistent {
                path: path.to_string(),
                free: self.free,
                available: self.available,
                total: self.total,
            });
        }
        Ok(())
    }
}

pub trait DiskProbe {
    fn probe(&self, path: &str) -> Result<DiskSpaceSample, ProbeError>;
}

/// Probe backed by the OS statistics call compiled in for this platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl DiskProbe for SystemProbe {
    fn probe(&self, path: &str) -> Result<DiskSpaceSample, ProbeError> {
        system::disk_space(path)
    }
}
