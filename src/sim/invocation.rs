use std::fs;
use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use log::info;

use crate::config::paths::{require_file, Layout};
use crate::config::run_config::RunConfig;
use crate::util::{CONSOLE_LOG, STATS_FILE};

/// One fully assembled simulator launch: binary, output dir, run script and
/// the script's argument list.
pub struct Invocation {
    pub binary: PathBuf,
    pub script: PathBuf,
    pub outdir: PathBuf,
    pub args: Vec<String>,
}

/// Where a finished run left its artifacts.
#[derive(Debug)]
pub struct RunOutput {
    pub console_log: PathBuf,
    pub stats_file: PathBuf,
}

impl Invocation {
    pub fn new(config: &RunConfig, layout: &Layout, run_name: &str) -> Result<Invocation> {
        config.validate()?;
        layout.ensure()?;
        if let Some(geometry) = config.cache_geometry() {
            info!("cache geometry (fixed by the run script): {}", geometry);
        }
        Ok(Invocation {
            binary: layout.gem5_binary(config.isa),
            script: layout.run_script(config.isa, config.benchmark.is_some()),
            outdir: layout.run_dir(run_name),
            args: config.to_args(),
        })
    }

    /// The full command line, for logging and dry runs.
    pub fn command_line(&self) -> Vec<String> {
        let mut line = vec![
            self.binary.display().to_string(),
            format!("--outdir={}", self.outdir.display()),
            self.script.display().to_string(),
        ];
        line.extend(self.args.iter().cloned());
        line
    }

    /// Launch the simulator and wait for it. The child's stdout and stderr
    /// stream straight into `<outdir>/console.log` (a full-system boot
    /// writes far too much to buffer); a non-zero exit status is an error.
    /// Single synchronous child, no retry.
    pub fn run(&self) -> Result<RunOutput> {
        require_file(&self.binary, "simulator binary")?;
        require_file(&self.script, "run script")?;
        fs::create_dir_all(&self.outdir)
            .with_context(|| format!("creating {}", self.outdir.display()))?;

        let console_log = self.outdir.join(CONSOLE_LOG);
        let log_file = File::create(&console_log)
            .with_context(|| format!("creating {}", console_log.display()))?;
        let log_file_err = log_file
            .try_clone()
            .with_context(|| format!("duplicating handle to {}", console_log.display()))?;

        info!("launching: {}", self.command_line().join(" "));
        let status = Command::new(&self.binary)
            .arg(format!("--outdir={}", self.outdir.display()))
            .arg(&self.script)
            .args(&self.args)
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(log_file_err))
            .status()
            .with_context(|| format!("spawning {}", self.binary.display()))?;

        if !status.success() {
            bail!(
                "simulator exited with {} (console output in {})",
                status,
                console_log.display()
            );
        }
        info!("simulator finished, output in {}", self.outdir.display());
        Ok(RunOutput {
            console_log,
            stats_file: self.outdir.join(STATS_FILE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::run_config::Isa;

    #[cfg(unix)]
    fn fake_simulator(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("gem5.opt");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn fixture(tmp: &tempfile::TempDir) -> (Layout, RunConfig) {
        let mut layout = Layout::new(tmp.path());
        layout.ensure().unwrap();
        fs::create_dir_all(tmp.path().join("config/run")).unwrap();
        fs::write(tmp.path().join("config/run/x86-ubuntu-run.py"), b"# run").unwrap();
        let config = RunConfig::new(Isa::X86, &layout);
        fs::write(&config.disk_image, b"disk").unwrap();
        fs::write(&config.kernel, b"kernel").unwrap();
        layout.gem5_binary = Some(tmp.path().join("gem5.opt"));
        (layout, config)
    }

    #[test]
    fn test_command_line_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let (layout, config) = fixture(&tmp);
        let invocation = Invocation::new(&config, &layout, "boot").unwrap();
        let line = invocation.command_line();
        assert!(line[0].ends_with("gem5.opt"));
        assert!(line[1].starts_with("--outdir="));
        assert!(line[1].ends_with("runs/boot"));
        assert!(line[2].ends_with("x86-ubuntu-run.py"));
        assert!(line.contains(&"--cache-class".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streams_console_log() {
        let tmp = tempfile::tempdir().unwrap();
        let (layout, config) = fixture(&tmp);
        fake_simulator(tmp.path(), "echo booting; echo warm-up >&2");
        let invocation = Invocation::new(&config, &layout, "boot").unwrap();
        let output = invocation.run().unwrap();
        let console = fs::read_to_string(&output.console_log).unwrap();
        assert!(console.contains("booting"));
        // stderr lands in the same console log.
        assert!(console.contains("warm-up"));
        assert!(output.stats_file.ends_with("runs/boot/stats.json"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_exit_status() {
        let tmp = tempfile::tempdir().unwrap();
        let (layout, config) = fixture(&tmp);
        fake_simulator(tmp.path(), "echo panic; exit 3");
        let invocation = Invocation::new(&config, &layout, "boot").unwrap();
        let err = invocation.run().unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let (layout, config) = fixture(&tmp);
        let invocation = Invocation::new(&config, &layout, "boot").unwrap();
        let err = invocation.run().unwrap_err();
        assert!(err.to_string().contains("simulator binary"));
    }
}
