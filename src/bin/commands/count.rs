// bin/commands/count.rs

use super::{expand_inputs, ReaderArgs};
use clap::Args;
use gzlines::error::GzLinesError;
use gzlines::{InputStream, LineRead};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;

/// How often the spinner is redrawn, in lines.
const PROGRESS_INTERVAL: u64 = 100_000;

#[derive(Args)]
pub struct CountArgs {
    /// Input files or glob patterns (e.g. 'logs/*.gz')
    #[arg(value_name = "FILE", required = true)]
    pub inputs: Vec<String>,

    #[command(flatten)]
    pub reader: ReaderArgs,

    /// Do not show a progress spinner
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn run(args: CountArgs) -> Result<(), GzLinesError> {
    let start = Instant::now();
    let options = args.reader.options()?;
    let paths = expand_inputs(&args.inputs)?;

    let mut total = 0;
    for path in &paths {
        let input = InputStream::new(path).options(options.clone());
        let lines = count_file(&input, args.quiet)?;
        println!("{}\t{}", lines, path.display());
        total += lines;
    }
    if paths.len() > 1 {
        println!("{}\ttotal", total);
    }

    tracing::info!(files = paths.len(), lines = total, elapsed = ?start.elapsed(), "count finished");
    Ok(())
}

fn count_file(input: &InputStream, quiet: bool) -> Result<u64, GzLinesError> {
    if quiet {
        return input.count_lines();
    }

    let pb = ProgressBar::new_spinner().with_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message(label(input.path()));

    let mut reader = input.open()?;
    while reader.read_line()?.is_some() {
        if reader.line_number() % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("{}: {} lines", label(input.path()), reader.line_number()));
            pb.tick();
        }
    }
    let lines = reader.line_number();
    reader.close();
    pb.finish_and_clear();
    Ok(lines)
}

fn label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gzlines::OutputStream;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_members(path: &Path, members: &[&str]) -> Result<(), GzLinesError> {
        for text in members {
            let output = OutputStream::builder()
                .filepath(Some(path))
                .append(true)
                .build();
            let mut writer = output.writer()?;
            writer.write_all(text.as_bytes())?;
            writer.finish()?;
        }
        Ok(())
    }

    #[test]
    fn test_count_file_with_and_without_progress() -> Result<(), GzLinesError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("counted.log.gz");
        write_members(&path, &["a\nb\n", "c\r\nd", "e\n"])?;

        let input = InputStream::new(&path);
        assert_eq!(count_file(&input, true)?, 5);
        assert_eq!(count_file(&input, false)?, 5);
        Ok(())
    }

    #[test]
    fn test_label() {
        assert_eq!(label(Path::new("logs/app.log.gz")), "app.log.gz");
        assert_eq!(label(Path::new("/")), "/");
    }
}
