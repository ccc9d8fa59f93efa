use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context, Result};
use log::info;

use crate::config::paths::Layout;
use crate::config::run_config::Isa;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Disk,
    Kernel,
    Bootloader,
}

/// One downloadable boot artifact. The file contents are opaque; the crate
/// only places them at the conventional path.
pub struct Artifact {
    pub isa: Isa,
    pub kind: ArtifactKind,
    /// Final file name under the layout's images tree.
    pub name: &'static str,
    pub url: &'static str,
    pub gzipped: bool,
}

pub const ARTIFACTS: [Artifact; 5] = [
    Artifact {
        isa: Isa::X86,
        kind: ArtifactKind::Kernel,
        name: "x86-linux-6.8.0-52",
        url: "http://dist.gem5.org/dist/v24-0/kernels/x86/static/x86-linux-6.8.0-52",
        gzipped: false,
    },
    Artifact {
        isa: Isa::X86,
        kind: ArtifactKind::Disk,
        name: "x86-ubuntu-22.04-img",
        url: "http://dist.gem5.org/dist/v24-0/images/x86/ubuntu-22-04/x86-ubuntu-22.04-img.gz",
        gzipped: true,
    },
    Artifact {
        isa: Isa::Riscv,
        kind: ArtifactKind::Kernel,
        name: "riscv-linux-5.15.180-kernel",
        url: "http://dist.gem5.org/dist/v24-0/kernels/riscv/static/riscv-linux-5.15.180-kernel",
        gzipped: false,
    },
    Artifact {
        isa: Isa::Riscv,
        kind: ArtifactKind::Bootloader,
        name: "riscv-bootloader-opensbi-1.3.1-20231129",
        url: "http://dist.gem5.org/dist/v24-0/kernels/riscv/static/riscv-bootloader-opensbi-1.3.1-20231129",
        gzipped: false,
    },
    Artifact {
        isa: Isa::Riscv,
        kind: ArtifactKind::Disk,
        name: "riscv-ubuntu-24.04-img",
        url: "http://dist.gem5.org/dist/v24-0/images/riscv/ubuntu-24-04/riscv-ubuntu-24.04-img.gz",
        gzipped: true,
    },
];

impl Artifact {
    pub fn dest(&self, layout: &Layout) -> PathBuf {
        let dir = match self.kind {
            ArtifactKind::Disk => layout.disk_dir(),
            ArtifactKind::Kernel => layout.kernel_dir(),
            ArtifactKind::Bootloader => layout.bootloader_dir(),
        };
        dir.join(self.name)
    }

    fn download(&self, layout: &Layout) -> Result<()> {
        let dest = self.dest(layout);
        let staging = if self.gzipped {
            PathBuf::from(format!("{}.gz", dest.display()))
        } else {
            PathBuf::from(format!("{}.part", dest.display()))
        };

        info!("fetching {} from {}", self.name, self.url);
        let status = Command::new("curl")
            .args(["-L", "--fail", "-o"])
            .arg(&staging)
            .arg(self.url)
            .status()
            .context("spawning curl (is it installed?)")?;
        if !status.success() {
            let _ = fs::remove_file(&staging);
            bail!("download of {} failed with {}", self.url, status);
        }

        if self.gzipped {
            // gunzip drops the .gz suffix, which leaves the final name.
            let status = Command::new("gunzip")
                .arg("-f")
                .arg(&staging)
                .status()
                .context("spawning gunzip (is it installed?)")?;
            if !status.success() {
                let _ = fs::remove_file(&staging);
                bail!("decompressing {} failed with {}", staging.display(), status);
            }
        } else {
            fs::rename(&staging, &dest)
                .with_context(|| format!("moving {} into place", staging.display()))?;
        }
        info!("stored {}", dest.display());
        Ok(())
    }
}

pub fn artifacts_for(isa: Isa) -> impl Iterator<Item = &'static Artifact> {
    ARTIFACTS.iter().filter(move |a| a.isa == isa)
}

/// Fetch every boot artifact for an ISA into the layout. Artifacts already
/// on disk are skipped unless `force` is set; any failed transfer aborts
/// the whole fetch with no partial file left behind.
pub fn fetch(layout: &Layout, isa: Isa, force: bool) -> Result<()> {
    layout.ensure()?;
    for artifact in artifacts_for(isa) {
        let dest = artifact.dest(layout);
        if dest.is_file() && !force {
            info!("{} already present, skipping", dest.display());
            continue;
        }
        artifact.download(layout)?;
    }
    Ok(())
}
