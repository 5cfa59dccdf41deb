//! Part-file output

use mapfold_common::error::{CommonError, ErrorContext, Result};
use mapfold_core::JobOutput;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SUCCESS_MARKER: &str = "_SUCCESS";

pub fn part_file_name(partition: usize) -> String {
    format!("part-r-{partition:05}")
}

/// Fail early when the output directory is already there.
pub fn check_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Err(CommonError::configuration_error(format!(
            "Output directory {} already exists",
            dir.display()
        )));
    }
    Ok(())
}

/// Write one part file per final partition, then the success marker.
///
/// Empty partitions still get an (empty) part file.
pub fn write_output(dir: &Path, output: &JobOutput) -> Result<Vec<PathBuf>> {
    check_output_dir(dir)?;
    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_io_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::create_dir(dir).with_io_context(|| format!("Failed to create {}", dir.display()))?;

    let mut parts = Vec::with_capacity(output.partitions.len());
    for (partition, records) in output.partitions.iter().enumerate() {
        let path = dir.join(part_file_name(partition));
        let file = File::create(&path)
            .with_io_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for record in records {
            writeln!(writer, "{record}")?;
        }
        writer.flush()?;
        parts.push(path);
    }
    File::create(dir.join(SUCCESS_MARKER))
        .with_io_context(|| format!("Failed to write {} marker", SUCCESS_MARKER))?;

    info!(
        "Wrote {} record(s) to {} part file(s) in {}",
        output.num_records(),
        parts.len(),
        dir.display()
    );
    Ok(parts)
}
