//! Export command implementation

use super::spinner;
use anyhow::{Context, Result};
use clap::Args;
use folio_core::config::{DEFAULT_IMAGE_DIR, DEFAULT_PREFIX};
use folio_core::pipeline::{export_epub, write_bundle};
use folio_core::ExportOptions;
use std::path::{Path, PathBuf};

/// Default output directory in split mode
const DEFAULT_OUTDIR: &str = "md_chapters";

#[derive(Args)]
pub struct ExportArgs {
    /// Input EPUB file
    input: PathBuf,

    /// Output Markdown file (single mode; defaults to <input stem>.md)
    output: Option<PathBuf>,

    /// Write one file per chapter plus index.md
    #[arg(long)]
    split: bool,

    /// Output directory in split mode
    #[arg(long, default_value = DEFAULT_OUTDIR)]
    outdir: PathBuf,

    /// Chapter file name prefix
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Subdirectory for extracted images
    #[arg(long, default_value = DEFAULT_IMAGE_DIR)]
    imgdir: String,

    /// Keep image references as written and extract nothing
    #[arg(long)]
    no_images: bool,

    /// Leave the cover image out of the index or document top
    #[arg(long)]
    no_cover_banner: bool,
}

impl ExportArgs {
    fn options(&self) -> ExportOptions {
        let options = if self.split {
            ExportOptions::split()
        } else {
            ExportOptions::default()
        };
        options
            .with_prefix(self.prefix.as_str())
            .with_image_dir(self.imgdir.as_str())
            .with_extract_images(!self.no_images)
            .with_cover_banner(!self.no_cover_banner)
    }

    /// Directory to write into and the single-mode document name
    fn destination(&self) -> Result<(PathBuf, String)> {
        if self.split {
            if let Some(output) = &self.output {
                tracing::warn!(
                    "Ignoring {} in split mode; writing to {}",
                    output.display(),
                    self.outdir.display()
                );
            }
            return Ok((self.outdir.clone(), String::new()));
        }

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("md"));
        let name = output
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid output file name: {}", output.display()))?
            .to_string();
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((dir, name))
    }
}

/// Convert an EPUB to Markdown
pub fn export(args: ExportArgs) -> Result<()> {
    let options = args.options();
    options.validate().context("Invalid export options")?;
    let (dir, name) = args.destination()?;

    let pb = spinner()?;
    pb.set_message("Decoding...");
    let bundle = export_epub(&args.input, &options, &name)
        .with_context(|| format!("Failed to export {}", args.input.display()))?;

    pb.set_message("Writing Markdown...");
    let written = write_bundle(&bundle, &dir)
        .with_context(|| format!("Failed to write output to {}", dir.display()))?;

    tracing::info!(
        "Exported {} files ({} assets)",
        written.len(),
        bundle.assets.len()
    );
    let target = if options.is_split() {
        dir.display().to_string()
    } else {
        dir.join(&name).display().to_string()
    };
    pb.finish_with_message(format!(
        "Exported {} -> {}",
        args.input.display(),
        target
    ));

    Ok(())
}
