use std::ffi::OsStr;
use std::iter::once;
use std::os::windows::ffi::OsStrExt;

use winapi::um::fileapi::GetDiskFreeSpaceExW;
use winapi::shared::ntdef::ULARGE_INTEGER;

use crate::error::ProbeError;
use crate::probe::DiskSpaceSample;

/// Query the volume containing `path` (a drive letter like `C:\` or any
/// directory on it) with GetDiskFreeSpaceExW.
pub fn disk_space(path: &str) -> Result<DiskSpaceSample, ProbeError> {
    let wide: Vec<u16> = OsStr::new(path).encode_wide().chain(once(0)).collect();

    let mut available: ULARGE_INTEGER = unsafe { std::mem::zeroed() };
    let mut total: ULARGE_INTEGER = unsafe { std::mem::zeroed() };
    let mut free: ULARGE_INTEGER = unsafe { std::mem::zeroed() };

    let ok = unsafe { GetDiskFreeSpaceExW(wide.as_ptr(), &mut available, &mut total, &mut free) };
    if ok == 0 {
        return Err(ProbeError::Query {
            path: path.to_string(),
            reason: std::io::Error::last_os_error().to_string(),
        });
    }

    // The API already reports bytes, no block arithmetic needed.
    unsafe {
        Ok(DiskSpaceSample {
            total: *total.QuadPart(),
            free: *free.QuadPart(),
            available: *available.QuadPart(),
        })
    }
}
