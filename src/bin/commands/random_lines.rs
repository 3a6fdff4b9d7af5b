// bin/commands/random_lines.rs

use clap::Args;
use gzlines::error::GzLinesError;
use gzlines::io::OutputStream;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Args)]
pub struct RandomLinesArgs {
    /// Output file path (.log or .log.gz)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of lines to generate
    #[arg(short = 'n', long, default_value = "1000000")]
    pub num_lines: usize,

    /// Number of gzip members to spread the lines over
    #[arg(short, long, default_value = "4")]
    pub members: usize,

    /// Optional seed for random number generation
    #[arg(short, long)]
    pub seed: Option<u64>,
}

pub fn run(args: RandomLinesArgs) -> Result<(), GzLinesError> {
    if args.members == 0 {
        return Err("--members must be at least 1".into());
    }
    eprintln!(
        "Generating {} random lines in {} members to {}",
        args.num_lines,
        args.members,
        args.output.display()
    );

    if args.output.exists() {
        fs::remove_file(&args.output)?;
    }

    let lines = generate_random_lines(args.num_lines, args.seed);
    let per_member = lines.len().div_ceil(args.members).max(1);
    for chunk in lines.chunks(per_member) {
        let output = OutputStream::builder()
            .filepath(Some(&args.output))
            .append(true)
            .build();
        let mut output_writer = output.writer()?;
        for line in chunk {
            writeln!(output_writer, "{}", line)?;
        }
        output_writer.finish()?;
    }

    eprintln!("Done!");
    Ok(())
}

fn generate_random_lines(num_lines: usize, seed: Option<u64>) -> Vec<String> {
    const LEVELS: &[&str] = &["INFO", "WARN", "ERROR", "DEBUG"];
    const LINE_ENDINGS: &[&str] = &["", "", "", "\r"];

    let mut rng = match seed {
        Some(s) => rand::rngs::StdRng::seed_from_u64(s),
        None => rand::rngs::StdRng::from_entropy(),
    };

    (0..num_lines)
        .map(|i| {
            let level = LEVELS.choose(&mut rng).copied().unwrap_or("INFO");
            let width = rng.gen_range(0..120);
            let payload: String = (0..width)
                .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
                .collect();
            let ending = LINE_ENDINGS.choose(&mut rng).copied().unwrap_or("");
            format!("{} {} {}{}", i, level, payload, ending)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gzlines::InputStream;
    use tempfile::TempDir;

    #[test]
    fn test_reproducible_generation() {
        let seed = 42;
        let lines1 = generate_random_lines(100, Some(seed));
        let lines2 = generate_random_lines(100, Some(seed));
        assert_eq!(lines1, lines2);
    }

    #[test]
    fn test_output_file_creation() -> Result<(), GzLinesError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("random.log.gz");
        let args = RandomLinesArgs {
            output: path.clone(),
            num_lines: 10,
            members: 3,
            seed: Some(42),
        };

        run(args)?;

        assert_eq!(InputStream::new(&path).count_lines()?, 10);
        Ok(())
    }
}
