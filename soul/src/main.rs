use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use soultts::utils::{trim, wav};
use soultts::TrimOptions;

#[derive(Subcommand, Debug)]
enum Mode {
    /// Remove trailing silence from a WAV file
    #[command(alias = "t")]
    Trim {
        /// WAV file to read
        input_path: PathBuf,

        /// Where to write the trimmed WAV; defaults to <INPUT>.trimmed.wav
        #[arg(short = 'o', long = "output", value_name = "OUTPUT_PATH")]
        output_path: Option<PathBuf>,

        /// Windows at or below this level (dBFS) count as silence
        #[arg(
            long = "threshold-db",
            value_name = "DB",
            default_value_t = -40.0,
            allow_negative_numbers = true
        )]
        threshold_db: f32,

        /// Minimum trailing silence before anything is trimmed
        #[arg(long = "min-silence-ms", value_name = "MS", default_value_t = 200)]
        min_silence_ms: u32,

        /// Audio kept after the last loud window
        #[arg(long = "pad-ms", value_name = "MS", default_value_t = 100)]
        pad_ms: u32,

        /// Only report what would be trimmed
        #[arg(long = "dry-run", default_value_t = false)]
        dry_run: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "soul")]
#[command(version)]
#[command(about = "Tools for the soultts voice-clone pipeline")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}.trimmed.wav"))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Trims one WAV file and returns where the result was written, or `None`
/// on a dry run.
fn run_trim(
    input_path: &Path,
    output_path: Option<PathBuf>,
    opts: &TrimOptions,
    dry_run: bool,
) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    tracing::debug!(?opts, input = %input_path.display(), "trimming");

    let (audio, sample_rate) = wav::read_wav_file(input_path)?;
    trim::ensure_finite(&audio)?;
    let trimmed = trim::trim_trailing_silence(&audio, sample_rate, opts)?;

    let sr = sample_rate as f32;
    println!(
        "{}: {:.2}s -> {:.2}s ({} samples removed)",
        input_path.display(),
        audio.len() as f32 / sr,
        trimmed.len() as f32 / sr,
        audio.len() - trimmed.len()
    );

    if dry_run {
        return Ok(None);
    }

    let output_file = output_path.unwrap_or_else(|| default_output_path(input_path));
    wav::write_wav_file(&output_file, trimmed, sample_rate)?;
    println!("Audio saved to {}", output_file.display());
    Ok(Some(output_file))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let Cli { mode } = Cli::parse();

    match mode {
        Mode::Trim {
            input_path,
            output_path,
            threshold_db,
            min_silence_ms,
            pad_ms,
            dry_run,
        } => {
            let opts = TrimOptions {
                threshold_db,
                min_silence_ms,
                pad_ms,
                ..TrimOptions::default()
            };
            run_trim(&input_path, output_path, &opts, dry_run)?;
        }
    }

    Ok(())
}
