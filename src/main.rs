use clap::{Parser, Subcommand};
use oldqmc::formats::{self, MaskMode, OLD_QMC_FORMATS, PLAIN_FORMATS};
use oldqmc::qmc::KeyTrailer;
use oldqmc::registry::DecoderRegistry;
use oldqmc::sniff::sniff_ext;
use oldqmc::unlock::{collect_inputs, format_id_of, unlock_all, BatchReport, UnlockOptions};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "oldqmc", about = "Unwrap legacy QMC audio containers", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode files (directories are expanded)
    Decode {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Output directory (default: next to each input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Walk directories recursively
        #[arg(short, long)]
        recursive: bool,
        /// Also copy inputs that are already plain audio
        #[arg(long)]
        include_plain: bool,
        /// Replace existing output files
        #[arg(long)]
        overwrite: bool,
        /// Print a JSON batch report on stdout
        #[arg(long)]
        json: bool,
    },
    /// List supported format identifiers
    Formats,
    /// Inspect one file without writing anything
    Probe {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let registry = DecoderRegistry::with_builtin_formats();

    match cli.command {

        // ── Decode ───────────────────────────────────────────────────────────
        Commands::Decode { input, output_dir, recursive, include_plain, overwrite, json } => {
            let inputs  = collect_inputs(&registry, &input, recursive);
            let options = UnlockOptions { output_dir, include_plain, overwrite };
            tracing::info!("Processing {} file(s)", inputs.len());

            let batch = BatchReport::from_results(unlock_all(&registry, &inputs, &options));
            if json {
                println!("{}", serde_json::to_string_pretty(&batch)?);
            } else {
                for f in &batch.errors {
                    println!("  failed   {}: {}", f.input.display(), f.error);
                }
                println!("Decoded {}, skipped {}, failed {}", batch.decoded, batch.skipped, batch.failed);
            }
            if batch.failed > 0 {
                std::process::exit(1);
            }
        }

        // ── Formats ──────────────────────────────────────────────────────────
        Commands::Formats => {
            println!("{:<10} {:<6} {:<8} Description", "Id", "Output", "Mask");
            for spec in OLD_QMC_FORMATS {
                let mode = match spec.mask_mode {
                    MaskMode::Default    => "default",
                    MaskMode::DetectFlac => "flac",
                    MaskMode::DetectOgg  => "ogg",
                };
                println!("{:<10} {:<6} {:<8} {}", spec.id.key(), spec.audio_ext, mode, spec.label);
            }
            println!("Passthrough: {}", PLAIN_FORMATS.join(", "));
        }

        // ── Probe ────────────────────────────────────────────────────────────
        Commands::Probe { input } => {
            let format_id = format_id_of(&input).unwrap_or_default();
            let raw = std::fs::read(&input)?;
            println!("── {} ──", input.display());
            println!("  Format id      {}", if format_id.is_empty() { "—" } else { format_id.as_str() });
            println!("  Size           {} B", raw.len());
            println!("  Raw head       {}", hex::encode(&raw[..raw.len().min(16)]));

            let Some(entry) = registry.entry(&format_id).ok() else {
                println!("  Supported      no");
                return Ok(());
            };
            println!("  Supported      yes{}", if entry.noop { " (plain audio)" } else { "" });

            if formats::find(&format_id).is_some_and(|s| s.mask_mode != MaskMode::Default) {
                match KeyTrailer::parse(&raw) {
                    Ok(t)  => println!("  Key trailer    {} B key, body {} B", t.key.len(), t.body_len),
                    Err(e) => println!("  Key trailer    invalid: {e}"),
                }
            }

            let mut decoder = registry.new_decoder(&format_id, raw)?;
            match decoder.validate().and_then(|()| decoder.decode()) {
                Ok(()) => {
                    let audio = decoder.audio_data();
                    println!("  Output ext     {}", decoder.audio_ext());
                    println!("  Sniffed        {}", sniff_ext(audio).unwrap_or("unknown"));
                    println!("  Decoded head   {}", hex::encode(&audio[..audio.len().min(16)]));
                }
                Err(e) => println!("  Decode         failed: {e}"),
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
