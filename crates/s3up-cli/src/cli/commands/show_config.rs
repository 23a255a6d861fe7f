//! `s3up config` – show where config and logs live, and the effective config.

use anyhow::Result;
use s3up_core::config::{self, UploaderConfig};
use s3up_core::logging;

pub fn run_show_config(cfg: &UploaderConfig) -> Result<()> {
    println!("# config: {}", config::config_path()?.display());
    if let Ok(log) = logging::log_file_path() {
        println!("# log:    {}", log.display());
    }
    print!("{}", cfg.to_toml()?);
    Ok(())
}
