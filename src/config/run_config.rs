use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Result};
use bytesize::ByteSize;
use log::warn;

use crate::config::cache_config::{ChiL3Config, MesiThreeLevelConfig};
use crate::config::paths::{require_file, Layout};
use crate::util::gem5_size;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isa {
    X86,
    Riscv,
}

impl Isa {
    /// Name of the simulator build tree, e.g. `X86` in `build/X86_CHI`.
    pub fn build_name(&self) -> &'static str {
        match self {
            Isa::X86 => "X86",
            Isa::Riscv => "RISCV",
        }
    }

    pub fn from_name(name: &str) -> Result<Isa> {
        match name {
            "x86" => Ok(Isa::X86),
            "riscv" => Ok(Isa::Riscv),
            other => bail!("unknown isa {:?} (expected x86 or riscv)", other),
        }
    }
}

impl fmt::Display for Isa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Isa::X86 => write!(f, "x86"),
            Isa::Riscv => write!(f, "riscv"),
        }
    }
}

/// CPU model the run switches to after the KVM boot phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuType {
    Timing,
    O3,
    Minor,
}

impl CpuType {
    pub fn flag_value(&self) -> &'static str {
        match self {
            CpuType::Timing => "timing",
            CpuType::O3 => "o3",
            CpuType::Minor => "minor",
        }
    }

    pub fn from_name(name: &str) -> Result<CpuType> {
        match name {
            "timing" => Ok(CpuType::Timing),
            "o3" => Ok(CpuType::O3),
            "minor" => Ok(CpuType::Minor),
            other => bail!("unknown cpu type {:?} (expected timing, o3 or minor)", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    Chi,
    MesiThreeLevel,
    NoCache,
}

impl CacheClass {
    pub fn flag_value(&self) -> &'static str {
        match self {
            CacheClass::Chi => "chi",
            CacheClass::MesiThreeLevel => "mesi-three-level",
            CacheClass::NoCache => "no-cache",
        }
    }

    pub fn from_name(name: &str) -> Result<CacheClass> {
        match name {
            "chi" => Ok(CacheClass::Chi),
            "mesi-three-level" => Ok(CacheClass::MesiThreeLevel),
            "no-cache" => Ok(CacheClass::NoCache),
            other => bail!(
                "unknown cache class {:?} (expected chi, mesi-three-level or no-cache)",
                other
            ),
        }
    }
}

/// Save and load are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointMode {
    Disabled,
    Save,
    Load,
}

pub const PARSEC_BENCHMARKS: [&str; 13] = [
    "blackscholes",
    "bodytrack",
    "canneal",
    "dedup",
    "facesim",
    "ferret",
    "fluidanimate",
    "freqmine",
    "raytrace",
    "streamcluster",
    "swaptions",
    "vips",
    "x264",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchSize {
    SimSmall,
    SimMedium,
    SimLarge,
}

impl BenchSize {
    pub fn flag_value(&self) -> &'static str {
        match self {
            BenchSize::SimSmall => "simsmall",
            BenchSize::SimMedium => "simmedium",
            BenchSize::SimLarge => "simlarge",
        }
    }

    pub fn from_name(name: &str) -> Result<BenchSize> {
        match name {
            "simsmall" => Ok(BenchSize::SimSmall),
            "simmedium" => Ok(BenchSize::SimMedium),
            "simlarge" => Ok(BenchSize::SimLarge),
            other => bail!(
                "unknown simulation size {:?} (expected simsmall, simmedium or simlarge)",
                other
            ),
        }
    }
}

/// A PARSEC region-of-interest run instead of an interactive boot.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub program: String,
    pub size: BenchSize,
}

/// Everything that becomes the external simulator's argument list.
/// One field per script option, mapped 1:1 by `to_args`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub isa: Isa,
    pub num_cores: usize,
    /// Cores sharing one L2 in the CHI hierarchy.
    pub cores_per_cluster: usize,
    pub cache_class: CacheClass,
    pub chi: ChiL3Config,
    pub mesi: MesiThreeLevelConfig,
    pub cpu_type: CpuType,
    pub mem_size: ByteSize,
    pub disk_image: PathBuf,
    pub kernel: PathBuf,
    /// Required on riscv (OpenSBI), absent on x86.
    pub bootloader: Option<PathBuf>,
    pub checkpoint: CheckpointMode,
    pub checkpoint_path: PathBuf,
    pub benchmark: Option<BenchConfig>,
}

impl RunConfig {
    /// Defaults matching the conventional layout: 4 cores in single-core
    /// clusters, CHI hierarchy, timing CPU, Ubuntu images under `images/`.
    pub fn new(isa: Isa, layout: &Layout) -> RunConfig {
        let (mem_size, disk, kernel, bootloader) = match isa {
            Isa::X86 => (
                ByteSize::gib(3),
                layout.disk_dir().join("x86-ubuntu-22.04-img"),
                layout.kernel_dir().join("x86-linux-6.8.0-52"),
                None,
            ),
            Isa::Riscv => (
                ByteSize::gib(16),
                layout.disk_dir().join("riscv-ubuntu-24.04-img"),
                layout.kernel_dir().join("riscv-linux-5.15.180-kernel"),
                Some(
                    layout
                        .bootloader_dir()
                        .join("riscv-bootloader-opensbi-1.3.1-20231129"),
                ),
            ),
        };
        RunConfig {
            isa,
            num_cores: 4,
            cores_per_cluster: 1,
            cache_class: CacheClass::Chi,
            chi: ChiL3Config::default(),
            mesi: MesiThreeLevelConfig::default(),
            cpu_type: CpuType::Timing,
            mem_size,
            disk_image: disk,
            kernel,
            bootloader,
            checkpoint: CheckpointMode::Disabled,
            checkpoint_path: layout
                .checkpoint_dir()
                .join(format!("{}_ubuntu_checkpoint", isa)),
            benchmark: None,
        }
    }

    /// Fail fast on configurations the simulator would reject (or wedge on)
    /// far into the boot.
    pub fn validate(&self) -> Result<()> {
        if self.num_cores == 0 || self.cores_per_cluster == 0 {
            bail!("core counts must be non-zero");
        }
        if self.num_cores % self.cores_per_cluster != 0 {
            bail!(
                "num-cores ({}) must be a multiple of cores-per-cluster ({})",
                self.num_cores,
                self.cores_per_cluster
            );
        }
        // Boot happens on KVM cores pinned to host CPUs.
        let host_cpus = num_cpus::get();
        if self.num_cores > host_cpus {
            warn!(
                "requested {} cores but the host has {}; the KVM boot phase will oversubscribe",
                self.num_cores, host_cpus
            );
        }
        if self.isa == Isa::Riscv && self.cache_class == CacheClass::MesiThreeLevel {
            bail!("the riscv run script supports chi or no-cache only");
        }
        if let Some(bench) = &self.benchmark {
            if self.isa != Isa::X86 {
                bail!("benchmark runs use the x86 board only");
            }
            if self.checkpoint != CheckpointMode::Disabled {
                bail!("benchmark runs do not take checkpoints");
            }
            if !PARSEC_BENCHMARKS.contains(&bench.program.as_str()) {
                bail!("unknown benchmark program {:?}", bench.program);
            }
            return Ok(());
        }
        if self.isa == Isa::Riscv && self.bootloader.is_none() {
            bail!("riscv runs need a bootloader image");
        }
        require_file(&self.disk_image, "disk image")?;
        require_file(&self.kernel, "kernel image")?;
        if let Some(bootloader) = &self.bootloader {
            require_file(bootloader, "bootloader image")?;
        }
        if self.checkpoint == CheckpointMode::Load && !self.checkpoint_path.is_dir() {
            bail!(
                "checkpoint directory not found at {}",
                self.checkpoint_path.display()
            );
        }
        Ok(())
    }

    /// The geometry the run scripts hard-code for the selected hierarchy,
    /// for the launch log. None when caches are disabled.
    pub fn cache_geometry(&self) -> Option<String> {
        match self.cache_class {
            CacheClass::Chi => Some(self.chi.summary()),
            CacheClass::MesiThreeLevel => Some(self.mesi.summary()),
            CacheClass::NoCache => None,
        }
    }

    /// The simulator script's argument list. Call `validate` first; a
    /// validated config always renders a well-formed argv. Only flags the
    /// scripts' argparse actually defines are emitted; cache geometry is
    /// fixed inside the scripts.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--num-cores".into(),
            self.num_cores.to_string(),
            "--cores-per-cluster".into(),
            self.cores_per_cluster.to_string(),
        ];
        // The riscv script only knows --no-cache; the x86 and PARSEC
        // scripts take the full --cache-class choice.
        if self.isa == Isa::X86 {
            args.push("--cache-class".into());
            args.push(self.cache_class.flag_value().into());
        } else if self.cache_class == CacheClass::NoCache {
            args.push("--no-cache".into());
        }
        args.push("--mem-size".into());
        args.push(gem5_size(self.mem_size));

        if let Some(bench) = &self.benchmark {
            args.push("--benchmark".into());
            args.push(bench.program.clone());
            args.push("--size".into());
            args.push(bench.size.flag_value().into());
            return args;
        }

        if self.isa == Isa::X86 {
            // The riscv script pins the switch-target CPU model.
            args.push("--cpu-type".into());
            args.push(self.cpu_type.flag_value().into());
        }
        args.push("--disk-image".into());
        args.push(self.disk_image.display().to_string());
        args.push("--kernel".into());
        args.push(self.kernel.display().to_string());
        if let Some(bootloader) = &self.bootloader {
            args.push("--bootloader".into());
            args.push(bootloader.display().to_string());
        }
        match self.checkpoint {
            CheckpointMode::Disabled => {}
            CheckpointMode::Save => args.push("--save-checkpoint".into()),
            CheckpointMode::Load => args.push("--load-checkpoint".into()),
        }
        if self.checkpoint != CheckpointMode::Disabled {
            args.push("--checkpoint-path".into());
            args.push(self.checkpoint_path.display().to_string());
        }
        args
    }
}
