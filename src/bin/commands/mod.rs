// bin/commands/mod.rs

#[cfg(feature = "cli")]
pub mod append;
#[cfg(feature = "cli")]
pub mod cat;
#[cfg(feature = "cli")]
pub mod count;
#[cfg(all(feature = "cli", feature = "dev"))]
pub mod random_lines;

use clap::Args;
use gzlines::error::GzLinesError;
use gzlines::{InputCompression, ReaderOptions, TextEncoding};
use std::path::PathBuf;

/// Reader settings shared by the commands that read input files.
#[derive(Args, Debug, Clone)]
pub struct ReaderArgs {
    /// Decompress and split lines on a background thread
    #[arg(short = 't', long)]
    pub threaded: bool,

    /// Text encoding label of the input (utf-8, latin1, shift_jis, ...); append -lossy to replace malformed input
    #[arg(short, long, default_value = "utf-8")]
    pub encoding: TextEncoding,

    /// Line reader buffer size, in characters
    #[arg(long, default_value_t = gzlines::line_reader::DEFAULT_BUFFER_CAPACITY)]
    pub buffer_size: usize,

    /// Lines the background thread may read ahead
    #[arg(long, default_value_t = gzlines::threaded::DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Detect gzip input by its magic bytes instead of the .gz extension
    #[arg(long)]
    pub sniff: bool,
}

impl ReaderArgs {
    pub fn options(&self) -> Result<ReaderOptions, GzLinesError> {
        let compression = if self.sniff {
            InputCompression::Sniff
        } else {
            InputCompression::Auto
        };
        ReaderOptions::builder()
            .background(self.threaded)
            .encoding(self.encoding)
            .buffer_capacity(self.buffer_size)
            .queue_capacity(self.queue_capacity)
            .compression(compression)
            .build()
    }
}

/// Expand glob patterns into the list of matching files, in pattern order.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>, GzLinesError> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let before = paths.len();
        for entry in glob::glob(pattern)? {
            let path = entry?;
            if path.is_file() {
                paths.push(path);
            }
        }
        if paths.len() == before {
            return Err(format!("No files match '{}'", pattern).into());
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_expand_inputs() -> Result<(), GzLinesError> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("a.log.gz"), b"")?;
        fs::write(dir.path().join("b.log.gz"), b"")?;
        fs::write(dir.path().join("c.txt"), b"")?;
        fs::create_dir(dir.path().join("d.log.gz"))?;

        let pattern = dir.path().join("*.log.gz").display().to_string();
        let paths = expand_inputs(&[pattern])?;
        let names: Vec<_> = paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.log.gz", "b.log.gz"]);
        Ok(())
    }

    #[test]
    fn test_expand_inputs_without_match_is_an_error() -> Result<(), GzLinesError> {
        let dir = TempDir::new()?;
        let pattern = dir.path().join("*.gz").display().to_string();
        assert!(matches!(
            expand_inputs(&[pattern]),
            Err(GzLinesError::StringError(_))
        ));
        assert!(expand_inputs(&["[".to_string()]).is_err());
        Ok(())
    }

    #[test]
    fn test_reader_options() -> Result<(), GzLinesError> {
        let args = ReaderArgs {
            threaded: true,
            encoding: "latin1-lossy".parse()?,
            buffer_size: 64,
            queue_capacity: 8,
            sniff: true,
        };
        let options = args.options()?;
        assert!(options.background);
        assert!(options.encoding.is_lossy());
        assert_eq!(options.buffer_capacity, 64);
        assert_eq!(options.queue_capacity, 8);
        assert_eq!(options.compression, InputCompression::Sniff);

        let args = ReaderArgs {
            buffer_size: 0,
            ..args
        };
        assert!(args.options().is_err());
        Ok(())
    }
}
