use anyhow::{anyhow, Result};
use clap::Args;
use std::path::PathBuf;

/// Default Packer executable, resolved through `PATH`.
const DEFAULT_PACKER: &str = "packer";

/// Runtime settings, all settable from the command line.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Packer executable to invoke
    #[arg(long = "packer", value_name = "PATH", default_value = DEFAULT_PACKER)]
    pub packer: String,

    /// Directory holding aws.pkr.hcl and google.pkr.hcl
    #[arg(long = "template-dir", value_name = "DIR")]
    pub template_dir: Option<PathBuf>,

    /// Print the commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            packer: DEFAULT_PACKER.to_string(),
            template_dir: None,
            dry_run: false,
        }
    }
}

impl Settings {
    /// Template argument passed to Packer for `file_name`.
    pub fn template_arg(&self, file_name: &str) -> Result<String> {
        let Some(dir) = &self.template_dir else {
            return Ok(file_name.to_string());
        };

        let path = dir.join(file_name);
        path.to_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("template path {} is not valid UTF-8", path.display()))
    }
}
