use std::path::PathBuf;

use anyhow::{Context, Result};
use dashgen::data::samples::SampleDataset;

/// Write the built-in sample CSVs to a directory (default: current dir).
fn main() -> Result<()> {
    env_logger::init();

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    for sample in SampleDataset::ALL {
        let text = sample
            .to_csv()
            .with_context(|| format!("generating {}", sample.filename()))?;
        let path = output_dir.join(sample.filename());
        std::fs::write(&path, &text).with_context(|| format!("writing {}", path.display()))?;
        log::info!("{}: {}", sample.filename(), sample.description());

        println!(
            "Wrote {} rows to {}",
            text.lines().count().saturating_sub(1),
            path.display()
        );
    }
    Ok(())
}
