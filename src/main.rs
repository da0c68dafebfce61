//! stitchfile command-line entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use stitchfile::config::{AppConfig, ConfigError, LogLevel};
use stitchfile::format::FormatRegistry;
use stitchfile::{BoundsPolicy, ConversionError, Converter, FormatHint, InspectError};

#[derive(Parser)]
#[command(name = "stitchfile")]
#[command(about = "Convert and inspect embroidery machine files (DST, EXP, JEF, PEC, PES)")]
#[command(version)]
struct Cli {
    /// More log output (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a design to another format
    Convert {
        /// Input file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Input format, overriding the extension
        #[arg(long)]
        from: Option<String>,

        /// Output format, overriding the extension
        #[arg(long)]
        to: Option<String>,
    },

    /// Print design metadata
    Inspect {
        /// File to inspect
        file: PathBuf,

        /// Format, overriding the extension
        #[arg(long)]
        format: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Which commands count toward the extents
        #[arg(long, value_enum)]
        bounds: Option<BoundsArg>,
    },

    /// List supported formats
    Formats,

    /// Guess a file's format from its contents
    Identify {
        /// File to examine
        file: PathBuf,
    },

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the active configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Replace an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BoundsArg {
    Sewn,
    Traversed,
}

impl From<BoundsArg> for BoundsPolicy {
    fn from(arg: BoundsArg) -> Self {
        match arg {
            BoundsArg::Sewn => BoundsPolicy::Sewn,
            BoundsArg::Traversed => BoundsPolicy::Traversed,
        }
    }
}

/// A failed command: message for stderr plus exit code.
struct Failure {
    code: u8,
    message: String,
}

impl Failure {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ConversionError> for Failure {
    fn from(e: ConversionError) -> Self {
        Failure::new(e.kind().exit_code(), e.to_string())
    }
}

impl From<InspectError> for Failure {
    fn from(e: InspectError) -> Self {
        Failure::new(e.kind().exit_code(), e.to_string())
    }
}

impl From<ConfigError> for Failure {
    fn from(e: ConfigError) -> Self {
        Failure::new(1, e.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let creating = matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommands::Init { .. }
        }
    );
    let config = match load_config(cli.config.as_deref(), !creating) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e.message);
            return ExitCode::from(e.code);
        }
    };

    let level = if cli.quiet {
        LogLevel::Error
    } else {
        config.log_level.adjusted(i32::from(cli.verbose))
    };
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_env(env_logger::Env::default())
        .init();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            from,
            to,
        } => cmd_convert(&config, &input, &output, from.as_deref(), to.as_deref()),
        Commands::Inspect {
            file,
            format,
            json,
            bounds,
        } => cmd_inspect(config, &file, format.as_deref(), json, bounds),
        Commands::Formats => cmd_formats(),
        Commands::Identify { file } => cmd_identify(&file),
        Commands::Config { command } => cmd_config(&config, cli.config.as_deref(), command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e.message);
            ExitCode::from(e.code)
        }
    }
}

/// An explicit `--config` must load unless `required` is false; the default
/// location is always optional.
fn load_config(path: Option<&Path>, required: bool) -> Result<AppConfig, Failure> {
    match path {
        Some(path) => match AppConfig::load(path) {
            Ok(config) => Ok(config),
            Err(_) if !required => Ok(AppConfig::default()),
            Err(e) => Err(Failure::new(1, format!("config {:?}: {}", path, e))),
        },
        None => Ok(AppConfig::load_from_default_path().unwrap_or_default()),
    }
}

fn cmd_convert(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(), Failure> {
    let converter = Converter::new(config.to_settings());
    let summary = converter.convert_with(
        input,
        FormatHint::from_parts(from, input),
        output,
        FormatHint::from_parts(to, output),
    )?;
    println!(
        "Converted {} ({}) -> {} ({}): {} stitches, {} colors, {} bytes",
        input.display(),
        summary.source_format,
        output.display(),
        summary.target_format,
        summary.stitch_count,
        summary.thread_count,
        summary.bytes_written
    );
    Ok(())
}

fn cmd_inspect(
    config: AppConfig,
    file: &Path,
    format: Option<&str>,
    json: bool,
    bounds: Option<BoundsArg>,
) -> Result<(), Failure> {
    let mut settings = config.to_settings();
    if let Some(bounds) = bounds {
        settings.bounds_policy = bounds.into();
    }

    let metadata = Converter::new(settings).inspect_with(file, FormatHint::from_parts(format, file))?;
    if json {
        let text = serde_json::to_string_pretty(&metadata)
            .map_err(|e| Failure::new(1, e.to_string()))?;
        println!("{}", text);
    } else {
        println!("{}", metadata.report(file));
    }
    Ok(())
}

fn cmd_formats() -> Result<(), Failure> {
    for format in FormatRegistry::global().all() {
        let caps = format.capabilities();
        let mode = match (caps.can_read, caps.can_write) {
            (true, true) => "read/write",
            (true, false) => "read",
            (false, true) => "write",
            (false, false) => "-",
        };
        println!(
            "{:<4} {:<28} .{:<6} {}",
            format.id().as_str(),
            format.display_name(),
            format.extensions().join(" ."),
            mode
        );
    }
    Ok(())
}

fn cmd_identify(file: &Path) -> Result<(), Failure> {
    let bytes = std::fs::read(file)
        .map_err(|e| Failure::new(3, format!("cannot read {:?}: {}", file, e)))?;
    match FormatRegistry::global().sniff(&bytes) {
        Some(id) => {
            println!("{}: {}", file.display(), id);
            Ok(())
        }
        None => Err(Failure::new(
            2,
            format!("{}: no known signature (EXP files have none)", file.display()),
        )),
    }
}

fn cmd_config(
    config: &AppConfig,
    explicit: Option<&Path>,
    command: ConfigCommands,
) -> Result<(), Failure> {
    match command {
        ConfigCommands::Show => {
            println!("{}", config.to_json().map_err(ConfigError::from)?);
            Ok(())
        }
        ConfigCommands::Init { force } => {
            let path = match explicit {
                Some(path) => path.to_path_buf(),
                None => AppConfig::default_path()
                    .ok_or_else(|| Failure::new(1, "could not determine config directory"))?,
            };
            if path.exists() && !force {
                return Err(Failure::new(
                    1,
                    format!("{} exists; use --force to replace it", path.display()),
                ));
            }
            AppConfig::new().save_to(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}
