use hostname::get as get_hostname;
use sysinfo::System;

use crate::error::ProbeError;
use crate::probe::DiskSpaceSample;

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os_name: String,
    pub os_version: String,
    pub architecture: String,
    pub hostname: String,
}

pub fn get_system_info() -> SystemInfo {
    let hostname = get_hostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    let os_name = System::name().unwrap_or_else(|| "Unknown OS".to_string());
    let os_version = System::os_version().unwrap_or_else(|| "Unknown Version".to_string());
    let architecture = if cfg!(target_arch = "x86_64") {
        "64-bit"
    } else if cfg!(target_arch = "x86") {
        "32-bit"
    } else if cfg!(target_arch = "aarch64") {
        "ARM64"
    } else if cfg!(target_arch = "arm") {
        "ARM32"
    } else {
        "Unknown"
    };

    SystemInfo {
        os_name,
        os_version,
        architecture: architecture.to_string(),
        hostname,
    }
}

#[cfg(unix)]
pub fn disk_space(path: &str) -> Result<DiskSpaceSample, ProbeError> {
    crate::unix::disk_space(path)
}

#[cfg(target_os = "windows")]
pub fn disk_space(path: &str) -> Result<DiskSpaceSample, ProbeError> {
    crate::windows::disk_space(path)
}

#[cfg(not(any(unix, target_os = "windows")))]
pub fn disk_space(path: &str) -> Result<DiskSpaceSample, ProbeError> {
    Err(ProbeError::Query {
        path: path.to_string(),
        reason: "disk statistics are not supported on this platform".to_string(),
    })
}
