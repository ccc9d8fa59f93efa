use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::run_config::Isa;

/// Directory conventions for a co-simulation workspace. Everything the
/// external simulator reads or writes lives under `base`.
#[derive(Debug, Clone)]
pub struct Layout {
    pub base: PathBuf,
    /// Override for the simulator binary; when unset the binary is resolved
    /// from the conventional build tree under `base`.
    pub gem5_binary: Option<PathBuf>,
}

impl Layout {
    pub fn new(base: impl Into<PathBuf>) -> Layout {
        Layout {
            base: base.into(),
            gem5_binary: None,
        }
    }

    pub fn disk_dir(&self) -> PathBuf {
        self.base.join("images").join("disk")
    }

    pub fn kernel_dir(&self) -> PathBuf {
        self.base.join("images").join("kernel")
    }

    pub fn bootloader_dir(&self) -> PathBuf {
        self.base.join("images").join("bootloader")
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.base.join("checkpoints")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.base.join("runs")
    }

    pub fn run_dir(&self, name: &str) -> PathBuf {
        self.runs_dir().join(name)
    }

    pub fn plot_dir(&self) -> PathBuf {
        self.base.join("plots")
    }

    /// The simulator executable for a given build, e.g.
    /// `.gem5/build/X86_CHI/gem5.opt`.
    pub fn gem5_binary(&self, isa: Isa) -> PathBuf {
        match &self.gem5_binary {
            Some(path) => path.clone(),
            None => self
                .base
                .join(".gem5")
                .join("build")
                .join(format!("{}_CHI", isa.build_name()))
                .join("gem5.opt"),
        }
    }

    /// The run configuration script handed to the simulator.
    pub fn run_script(&self, isa: Isa, benchmark: bool) -> PathBuf {
        let config = self.base.join("config");
        if benchmark {
            config.join("bench").join("x86-parsec.py")
        } else {
            match isa {
                Isa::X86 => config.join("run").join("x86-ubuntu-run.py"),
                Isa::Riscv => config.join("run").join("riscv-ubuntu-run.py"),
            }
        }
    }

    /// Create the conventional directory tree. Idempotent.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.disk_dir(),
            self.kernel_dir(),
            self.bootloader_dir(),
            self.checkpoint_dir(),
            self.runs_dir(),
            self.plot_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Hard check that a referenced artifact is actually on disk.
pub fn require_file(path: &Path, what: &str) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("{} not found at {}", what, path.display());
    }
    Ok(())
}
