//! On-demand remediation when Chromium cannot be launched.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

/// Something that can try to make the rendering engine launchable.
#[async_trait]
pub trait Remediator: Send + Sync {
    async fn remediate(&self) -> Result<()>;
}

/// Never attempts a fix; the first launch failure is final.
pub struct NoRemediation;

#[async_trait]
impl Remediator for NoRemediation {
    async fn remediate(&self) -> Result<()> {
        bail!("remediation disabled")
    }
}

/// Downloads Chrome for Testing by running an external installer command.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandInstaller {
    /// `npx --yes @puppeteer/browsers install chrome@stable --path <dir>`.
    pub fn puppeteer(target_dir: PathBuf) -> Self {
        Self {
            program: "npx".to_string(),
            args: vec![
                "--yes".to_string(),
                "@puppeteer/browsers".to_string(),
                "install".to_string(),
                "chrome@stable".to_string(),
                "--path".to_string(),
                target_dir.display().to_string(),
            ],
        }
    }

    /// Installer targeting `~/.issuu-scout/chromium`, where discovery looks.
    pub fn default_location() -> Result<Self> {
        let dir = super::chromium::install_dir().context("cannot determine home directory")?;
        Ok(Self::puppeteer(dir))
    }
}

#[async_trait]
impl Remediator for CommandInstaller {
    async fn remediate(&self) -> Result<()> {
        let program = which::which(&self.program)
            .with_context(|| format!("`{}` not found on PATH", self.program))?;

        info!("installing Chromium: {} {}", self.program, self.args.join(" "));
        let output = tokio::process::Command::new(program)
            .args(&self.args)
            .output()
            .await
            .context("failed to run Chromium installer")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Chromium installer failed: {}", stderr.trim());
            bail!("installer exited with {}", output.status);
        }

        info!("Chromium installed");
        Ok(())
    }
}
