//! Command-line front end for the `bpress` library.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use bpress::{CompressorConfig, DelimiterMode};

#[derive(Parser)]
#[command(name = "bpress", about = "Streaming delimiter-bit / digest-code compressor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress a file.
    Compress {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value_t = bpress::config::DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,

        #[arg(long, default_value = "low")]
        delimiter_mode: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Compress {
            input,
            output,
            buffer_size,
            delimiter_mode,
        } => run_compress(&input, &output, buffer_size, &delimiter_mode),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bpress: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_compress(
    input: &std::path::Path,
    output: &std::path::Path,
    buffer_size: usize,
    delimiter_mode: &str,
) -> Result<(), bpress::BpressError> {
    let mode = DelimiterMode::parse(delimiter_mode)?;
    let config = CompressorConfig::new()
        .with_buffer_size(buffer_size)?
        .with_delimiter_mode(mode);

    let mut compressor = bpress::Compressor::new(config);
    match compressor.compress(input, output)? {
        Some(report) => {
            log::info!(
                "wrote {} bytes ({} -> {}, delimiter={}, stuffing={})",
                report.output_size,
                report.input_size,
                output.display(),
                report.delimiter_bit,
                report.bit_stuffing
            );
        }
        None => {
            log::info!("empty input, no output written");
        }
    }
    Ok(())
}
