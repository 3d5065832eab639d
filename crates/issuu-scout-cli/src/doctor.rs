//! Environment readiness check.

use std::fmt::Write as _;

use issuu_scout::renderer::{chromium::install_dir, find_chromium};
use issuu_scout::ScrapeContext;

/// Outcome of the readiness probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    pub chromium: Option<String>,
    pub installer: Option<String>,
    pub install_dir: Option<String>,
    pub base_url: String,
}

impl DoctorReport {
    pub fn gather(ctx: &ScrapeContext) -> Self {
        Self {
            chromium: find_chromium(ctx.chromium_path.as_deref()).map(|p| p.display().to_string()),
            installer: which::which("npx").ok().map(|p| p.display().to_string()),
            install_dir: install_dir().map(|p| p.display().to_string()),
            base_url: ctx.base_url.clone(),
        }
    }

    /// Dynamic retrieval is possible now or after `install`.
    pub fn ready(&self) -> bool {
        self.chromium.is_some() || self.installer.is_some()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Issuu Scout Doctor");
        let _ = writeln!(out, "==================");
        let _ = writeln!(out);
        let _ = writeln!(out, "OS:   {}", std::env::consts::OS);
        let _ = writeln!(out, "Arch: {}", std::env::consts::ARCH);
        let _ = writeln!(out, "Base: {}", self.base_url);
        let _ = writeln!(out);

        match &self.chromium {
            Some(p) => {
                let _ = writeln!(out, "[OK] Chromium found: {p}");
            }
            None => {
                let _ = writeln!(out, "[!!] Chromium NOT found. Run `issuu-scout install`.");
            }
        }
        match &self.installer {
            Some(p) => {
                let _ = writeln!(out, "[OK] npx found: {p}");
            }
            None => {
                let _ = writeln!(out, "[!!] npx NOT found; automatic install unavailable");
            }
        }
        if let Some(dir) = &self.install_dir {
            let _ = writeln!(out, "     install dir: {dir}");
        }

        let _ = writeln!(out);
        if self.chromium.is_some() {
            let _ = writeln!(out, "Status: READY");
        } else if self.ready() {
            let _ = writeln!(out, "Status: READY (Chromium will be installed on first use)");
        } else {
            let _ = writeln!(out, "Status: STATIC ONLY");
        }
        out
    }
}
