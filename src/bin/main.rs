#[cfg(feature = "cli")]
mod commands;

#[cfg(feature = "cli")]
mod cli {
    #[cfg(feature = "dev")]
    use crate::commands::random_lines;
    use crate::commands::{append, cat, count};
    use clap::Parser;
    use gzlines::error::GzLinesError;
    use tracing::Level;

    #[derive(Parser)]
    #[command(author, version, about, long_about = None)]
    pub struct Cli {
        /// Increase log verbosity (-v info, -vv debug, -vvv trace)
        #[arg(short, long, action = clap::ArgAction::Count, global = true)]
        verbose: u8,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(clap::Subcommand)]
    enum Commands {
        /// Count the lines of plain or (multi-member) gzip files.
        Count(count::CountArgs),
        /// Print the lines of plain or (multi-member) gzip files.
        Cat(cat::CatArgs),
        /// Append standard input to a file as one new gzip member.
        Append(append::AppendArgs),
        #[cfg(feature = "dev")]
        /// Generate a random multi-member gzip file for benchmarking (only with dev feature)
        RandomLines(random_lines::RandomLinesArgs),
    }

    fn init_logging(verbose: u8) {
        let level = match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    }

    pub fn run() -> Result<(), GzLinesError> {
        let cli = Cli::parse();
        init_logging(cli.verbose);
        match cli.command {
            Commands::Count(args) => count::run(args),
            Commands::Cat(args) => cat::run(args),
            Commands::Append(args) => append::run(args),
            #[cfg(feature = "dev")]
            Commands::RandomLines(args) => random_lines::run(args),
        }
    }
}

fn main() {
    #[cfg(feature = "cli")]
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("CLI feature not enabled. Please rebuild with --features cli");
        std::process::exit(1);
    }
}
