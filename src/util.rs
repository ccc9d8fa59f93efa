use bytesize::ByteSize;

pub const STATS_FILE: &str = "stats.json";
pub const CONSOLE_LOG: &str = "console.log";

pub const DEFAULT_TERM_PORT: u16 = 3456; // gem5 serial terminal listens here

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

/// Render a size the way the simulator scripts spell it: `16KiB`, `3GiB`,
/// no space, no fractional part. Falls back to raw bytes for odd sizes.
pub fn gem5_size(size: ByteSize) -> String {
    let b = size.as_u64();
    if b >= GIB && b % GIB == 0 {
        format!("{}GiB", b / GIB)
    } else if b >= MIB && b % MIB == 0 {
        format!("{}MiB", b / MIB)
    } else if b >= KIB && b % KIB == 0 {
        format!("{}KiB", b / KIB)
    } else {
        format!("{}B", b)
    }
}

/// File-name-safe form of a stat name like `outTransLatHist.SendReadNoSnp`.
pub fn sanitize_stat_name(name: &str) -> String {
    name.replace("::", "_").replace('/', "_")
}
