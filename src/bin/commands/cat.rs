// bin/commands/cat.rs

use super::{expand_inputs, ReaderArgs};
use clap::Args;
use gzlines::error::GzLinesError;
use gzlines::io::OutputStream;
use gzlines::{InputStream, LineRead};
use std::io::Write;
use std::path::PathBuf;

#[derive(Args)]
pub struct CatArgs {
    /// Input files or glob patterns (e.g. 'logs/*.gz')
    #[arg(value_name = "FILE", required = true)]
    pub inputs: Vec<String>,

    #[command(flatten)]
    pub reader: ReaderArgs,

    /// Prefix each line with its line number within its file
    #[arg(short, long)]
    pub number: bool,

    /// Output file; compressed when it ends in .gz. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: CatArgs) -> Result<(), GzLinesError> {
    let options = args.reader.options()?;
    let paths = expand_inputs(&args.inputs)?;
    let mut output_writer = OutputStream::new(args.output).writer()?;

    for path in &paths {
        let mut reader = InputStream::new(path).options(options.clone()).open()?;
        while let Some(line) = reader.read_line()? {
            if args.number {
                writeln!(output_writer, "{:>6}\t{}", reader.line_number(), line)?;
            } else {
                writeln!(output_writer, "{}", line)?;
            }
        }
        reader.close();
    }
    output_writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gzlines::{InputCompression, ReaderOptions, TextEncoding};
    use std::fs;
    use tempfile::TempDir;

    fn reader_args() -> ReaderArgs {
        ReaderArgs {
            threaded: false,
            encoding: TextEncoding::default(),
            buffer_size: 16,
            queue_capacity: 4,
            sniff: false,
        }
    }

    fn append_member(path: &std::path::Path, text: &str) -> Result<(), GzLinesError> {
        let output = OutputStream::builder()
            .filepath(Some(path))
            .append(true)
            .build();
        let mut writer = output.writer()?;
        writer.write_all(text.as_bytes())?;
        writer.finish()?;
        Ok(())
    }

    #[test]
    fn test_cat_numbers_lines_across_members() -> Result<(), GzLinesError> {
        let dir = TempDir::new()?;
        let input = dir.path().join("input.log.gz");
        append_member(&input, "first\nsec")?;
        append_member(&input, "ond\r\nthird\n")?;
        let output = dir.path().join("out.txt");

        for threaded in [false, true] {
            let args = CatArgs {
                inputs: vec![input.display().to_string()],
                reader: ReaderArgs {
                    threaded,
                    ..reader_args()
                },
                number: true,
                output: Some(output.clone()),
            };
            run(args)?;
            assert_eq!(
                fs::read_to_string(&output)?,
                "     1\tfirst\n     2\tsecond\n     3\tthird\n"
            );
        }
        Ok(())
    }

    #[test]
    fn test_cat_to_gzip_output() -> Result<(), GzLinesError> {
        let dir = TempDir::new()?;
        let input = dir.path().join("input.txt");
        fs::write(&input, "x\ny\n")?;
        let output = dir.path().join("copy.txt.gz");

        let args = CatArgs {
            inputs: vec![input.display().to_string()],
            reader: reader_args(),
            number: false,
            output: Some(output.clone()),
        };
        run(args)?;

        let options = ReaderOptions::builder()
            .compression(InputCompression::Sniff)
            .build()?;
        let mut reader = InputStream::new(&output).options(options).open()?;
        assert_eq!(reader.read_line()?.as_deref(), Some("x"));
        assert_eq!(reader.read_line()?.as_deref(), Some("y"));
        assert_eq!(reader.read_line()?, None);
        Ok(())
    }
}
