//! CLI command implementations

mod export;
mod import;
mod info;

pub use export::{export, ExportArgs};
pub use import::{import, ImportArgs};
pub use info::info;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Animated spinner on stderr
fn spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}
