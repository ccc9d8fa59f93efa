use bytesize::ByteSize;

use crate::util::gem5_size;

/// Parameters of the CHI-based three-level hierarchy (private L1s, one
/// shared L2 per cluster, one shared L3). The run scripts hard-code these
/// values; they are kept here as the documented geometry and surface in
/// the launch log, not on the simulator command line.
#[derive(Debug, Clone, Copy)]
pub struct ChiL3Config {
    pub l1_size: ByteSize,
    pub l1_assoc: usize,
    pub l2_size: ByteSize,
    pub l2_assoc: usize,
    pub l3_size: ByteSize,
    pub l3_assoc: usize,
}

impl Default for ChiL3Config {
    fn default() -> ChiL3Config {
        ChiL3Config {
            l1_size: ByteSize::kib(16),
            l1_assoc: 8,
            l2_size: ByteSize::mib(1),
            l2_assoc: 16,
            l3_size: ByteSize::mib(16),
            l3_assoc: 32,
        }
    }
}

/// Parameters of the stock MESI three-level hierarchy, also fixed inside
/// the x86 run script.
#[derive(Debug, Clone, Copy)]
pub struct MesiThreeLevelConfig {
    pub l1i_size: ByteSize,
    pub l1i_assoc: usize,
    pub l1d_size: ByteSize,
    pub l1d_assoc: usize,
    pub l2_size: ByteSize,
    pub l2_assoc: usize,
    pub l3_size: ByteSize,
    pub l3_assoc: usize,
    pub num_l3_banks: usize,
}

impl Default for MesiThreeLevelConfig {
    fn default() -> MesiThreeLevelConfig {
        MesiThreeLevelConfig {
            l1i_size: ByteSize::kib(32),
            l1i_assoc: 8,
            l1d_size: ByteSize::kib(32),
            l1d_assoc: 8,
            l2_size: ByteSize::kib(256),
            l2_assoc: 4,
            l3_size: ByteSize::mib(16),
            l3_assoc: 16,
            num_l3_banks: 1,
        }
    }
}

impl ChiL3Config {
    pub fn summary(&self) -> String {
        format!(
            "l1 {}/{}-way, shared l2 {}/{}-way, shared l3 {}/{}-way",
            gem5_size(self.l1_size),
            self.l1_assoc,
            gem5_size(self.l2_size),
            self.l2_assoc,
            gem5_size(self.l3_size),
            self.l3_assoc,
        )
    }
}

impl MesiThreeLevelConfig {
    pub fn summary(&self) -> String {
        format!(
            "l1i {}/{}-way, l1d {}/{}-way, l2 {}/{}-way, l3 {}/{}-way ({} banks)",
            gem5_size(self.l1i_size),
            self.l1i_assoc,
            gem5_size(self.l1d_size),
            self.l1d_assoc,
            gem5_size(self.l2_size),
            self.l2_assoc,
            gem5_size(self.l3_size),
            self.l3_assoc,
            self.num_l3_banks,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chi_default_summary() {
        let summary = ChiL3Config::default().summary();
        assert_eq!(
            summary,
            "l1 16KiB/8-way, shared l2 1MiB/16-way, shared l3 16MiB/32-way"
        );
    }

    #[test]
    fn test_mesi_default_summary() {
        let summary = MesiThreeLevelConfig::default().summary();
        assert!(summary.starts_with("l1i 32KiB/8-way"));
        assert!(summary.contains("l2 256KiB/4-way"));
        assert!(summary.ends_with("(1 banks)"));
    }
}
