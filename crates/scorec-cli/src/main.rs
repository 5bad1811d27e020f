//! scorec CLI - The `scorec` command.
//!
//! Compiles music models written in TOML into Standard MIDI Files.
//!
//! # Architecture
//!
//! The CLI binary orchestrates the following crates:
//!
//! - **scorec-core**: Model, validation, timeline resolution and event scheduling
//! - **scorec-smf**: Standard MIDI File encoding

mod config;
mod error;
mod input;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use scorec_core::{validate, CompiledMusic, Compiler, Music, ValidationReport};
use std::path::{Path, PathBuf};

/// scorec - Music description compiler
#[derive(Parser, Debug)]
#[command(name = "scorec")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile music descriptions into Standard MIDI Files", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.config/scorec/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a music file into a .mid file
    Compile {
        /// Path to the music file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path (default: from config, or next to the input)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Skip precondition checks
        #[arg(long)]
        no_validate: bool,

        /// Compile tracks on separate threads
        #[arg(long)]
        parallel: bool,
    },

    /// Check a music file without compiling it
    Check {
        /// Path to the music file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the compiled event streams as JSON
    Events {
        /// Path to the music file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Create a default configuration file
    Init,

    /// Show the configuration file path
    ConfigPath,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    match args.command {
        Commands::Init => {
            let path = Config::create_default_config_file()?;
            println!("Created default config at: {}", path.display());
            Ok(())
        }
        Commands::ConfigPath => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Check { file } => {
            let music = load(&file)?;
            let report = validate(&music);
            print_report(&report);
            if !report.is_ok() {
                anyhow::bail!("{} has {} errors", file.display(), report.errors().count());
            }
            println!("{}: ok", file.display());
            Ok(())
        }
        Commands::Events { file, pretty } => {
            let config = load_config(args.config.as_deref())?;
            let music = load(&file)?;
            let compiled = compile(&music, &config, false)?;
            let json = if pretty {
                serde_json::to_string_pretty(&compiled)?
            } else {
                serde_json::to_string(&compiled)?
            };
            println!("{json}");
            Ok(())
        }
        Commands::Compile {
            file,
            output,
            no_validate,
            parallel,
        } => {
            let config = load_config(args.config.as_deref())?;
            let music = load(&file)?;

            if !no_validate {
                let report = validate(&music);
                print_report(&report);
                if !report.is_ok() {
                    anyhow::bail!("{} has {} errors", file.display(), report.errors().count());
                }
            }

            let compiled = compile(&music, &config, parallel)?;
            let output = output.unwrap_or_else(|| config.output_path(&file));
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            scorec_smf::write_to_path(&compiled, &config.encoder_options(), &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!(
                "{} -> {} ({} tracks)",
                file.display(),
                output.display(),
                compiled.tracks.len()
            );
            Ok(())
        }
    }
}

fn init_logger(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(Config::load_or_default()),
    }
}

fn load(file: &Path) -> Result<Music> {
    input::load_music(file).with_context(|| format!("Failed to load {}", file.display()))
}

fn compile(music: &Music, config: &Config, parallel: bool) -> Result<CompiledMusic> {
    let compiler = Compiler::new(config.compile_options());
    let compiled = if parallel {
        compiler.compile_parallel(music)
    } else {
        compiler.compile(music)
    };
    compiled.with_context(|| format!("Failed to compile '{}'", music.name))
}

fn print_report(report: &ValidationReport) {
    for issue in &report.issues {
        eprintln!("{issue}");
    }
}
