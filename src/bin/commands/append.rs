// bin/commands/append.rs

use clap::Args;
use flate2::Compression;
use gzlines::error::GzLinesError;
use gzlines::io::OutputStream;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(Args)]
pub struct AppendArgs {
    /// File to append to; created if missing. A .gz file gains one new member.
    #[arg(value_name = "FILE")]
    pub output: PathBuf,

    /// Gzip compression level (0-9)
    #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,
}

pub fn run(args: AppendArgs) -> Result<(), GzLinesError> {
    let copied = append_from(&mut io::stdin().lock(), &args)?;
    tracing::info!(bytes = copied, path = %args.output.display(), "appended");
    Ok(())
}

/// Copy `input` to the end of the output file and complete the member.
fn append_from<R: Read>(input: &mut R, args: &AppendArgs) -> Result<u64, GzLinesError> {
    let output = OutputStream::builder()
        .filepath(Some(&args.output))
        .compression_level(Some(Compression::new(args.level)))
        .append(true)
        .build();

    let mut output_writer = output.writer()?;
    let copied = io::copy(input, &mut output_writer)?;
    output_writer.finish()?;
    Ok(copied)
}
