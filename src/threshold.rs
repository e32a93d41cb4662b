/// Notify when free space has dropped to the limit or below.
///
/// The boundary is inclusive: `free == limit` notifies, only `free > limit`
/// is considered healthy.
pub fn should_notify(free_bytes: u64, limit_bytes: u64) -> bool {
    free_bytes <= limit_bytes
}
