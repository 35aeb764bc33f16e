//! J1939 Decoder CLI Application
//!
//! This is the command-line interface for the J1939 decoder library.
//! It adds:
//! - Profile directory listing
//! - Signal discovery from a sample telemetry message
//! - Batch decoding of telemetry messages against a port configuration
//! - Signal metadata lookup

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use j1939_decoder::profiles::profile_display_map;
use j1939_decoder::protocols::{get_can_protocol, list_can_protocol_options, ProtocolRuntime};
use j1939_decoder::{discover_profiles, summarize_port_diagnostics, Profile};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

mod config;
mod report;
mod telemetry;

use config::{AppConfig, OutputFormat, PortConfig};
use report::{MessageReport, PortReport};

/// J1939 Decoder - Decode J1939 CAN telemetry with manufacturer profiles
#[derive(Parser, Debug)]
#[command(name = "j1939-cli")]
#[command(about = "Decode J1939 CAN telemetry messages", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered CAN protocols
    Protocols,

    /// List profiles found in a directory
    Profiles {
        /// Profile directory
        #[arg(short, long, value_name = "DIR", default_value = "profiles")]
        dir: PathBuf,

        /// Only show profiles extending this protocol
        #[arg(long, value_name = "ID")]
        protocol: Option<String>,
    },

    /// Discover selectable signals from a sample telemetry message
    Discover {
        /// Telemetry message (JSON)
        #[arg(value_name = "FILE")]
        message: PathBuf,

        #[command(flatten)]
        target: PortTarget,

        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode telemetry messages using a port configuration
    Decode {
        /// Path to configuration file (config.toml)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Telemetry messages (JSON), decoded in parallel
        #[arg(value_name = "FILE", required = true)]
        messages: Vec<PathBuf>,

        /// Output format (overrides the configuration)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Resolve display metadata for a signal key
    Meta {
        /// Signal key (e.g. can.can1.j1939.spn190)
        #[arg(value_name = "KEY")]
        key: String,

        #[command(flatten)]
        target: PortTarget,
    },
}

/// Protocol and profile selection for one port
#[derive(clap::Args, Debug)]
struct PortTarget {
    /// Port id as it appears in telemetry
    #[arg(long, default_value = "can1")]
    port: String,

    /// Protocol id
    #[arg(long, default_value = "j1939")]
    protocol: String,

    /// Profile filename to apply (can be repeated)
    #[arg(long = "profile", value_name = "FILE")]
    profiles: Vec<String>,

    /// Profile directory
    #[arg(long, value_name = "DIR", default_value = "profiles")]
    profiles_dir: PathBuf,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Txt,
    Json,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("J1939 Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", j1939_decoder::VERSION);

    match args.command {
        Command::Protocols => {
            for (id, label) in list_can_protocol_options() {
                println!("{:<10} {}", id, label);
            }
            Ok(())
        }
        Command::Profiles { dir, protocol } => list_profiles(&dir, protocol.as_deref()),
        Command::Discover {
            message,
            target,
            json,
        } => discover_mode(&message, &target, json),
        Command::Decode {
            config,
            messages,
            format,
        } => decode_mode(&config, &messages, format),
        Command::Meta { key, target } => {
            let runtime = build_target_runtime(&target)?;
            let meta = runtime.resolve_signal_meta(&key);
            println!("{}", serde_json::to_string_pretty(&meta)?);
            Ok(())
        }
    }
}

fn list_profiles(dir: &Path, protocol: Option<&str>) -> Result<()> {
    let profiles = discover_profiles(dir);
    let names = profile_display_map(&profiles, protocol);

    if names.is_empty() {
        println!("No profiles found in {:?}", dir);
        return Ok(());
    }

    for (filename, name) in names {
        let profile = &profiles[&filename];
        println!("{:<30} {:<25} [{}]", filename, name, profile.base_protocol);
        if !profile.description.is_empty() {
            println!("{:<30} {}", "", profile.description);
        }
    }
    Ok(())
}

/// Pick the named profiles out of a discovered set, in the requested order
fn select_profiles(available: &BTreeMap<String, Profile>, wanted: &[String]) -> Vec<Profile> {
    wanted
        .iter()
        .filter_map(|filename| {
            let profile = available.get(filename);
            if profile.is_none() {
                log::warn!("Profile {} not found; skipping", filename);
            }
            profile.cloned()
        })
        .collect()
}

fn build_runtime(protocol_id: &str, profiles: &[Profile]) -> Result<ProtocolRuntime> {
    let protocol = get_can_protocol(protocol_id)
        .with_context(|| format!("Unknown protocol '{}'", protocol_id))?;
    let (runtime, errors) = protocol.build_decoder(profiles);
    for error in errors {
        log::warn!("{}", error);
    }
    Ok(runtime)
}

fn build_target_runtime(target: &PortTarget) -> Result<ProtocolRuntime> {
    let available = if target.profiles.is_empty() {
        BTreeMap::new()
    } else {
        discover_profiles(&target.profiles_dir)
    };
    build_runtime(&target.protocol, &select_profiles(&available, &target.profiles))
}

fn discover_mode(message: &Path, target: &PortTarget, json: bool) -> Result<()> {
    let runtime = build_target_runtime(target)?;
    let msg = telemetry::load_message(message, &[target.port.as_str()])?;
    let frames = msg.ports.get(&target.port).map(Vec::as_slice).unwrap_or_default();
    log::info!("{} frame(s) on {} in {:?}", frames.len(), target.port, message);

    let discovered = runtime.discover_signals(frames, &target.port);

    if json {
        println!("{}", serde_json::to_string_pretty(&discovered)?);
        return Ok(());
    }

    for signal in discovered {
        let sample = signal
            .sample_value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let unit = signal.unit.unwrap_or_default();
        let mark = if signal.default_selected { "*" } else { " " };
        println!("{} {:<40} {:<45} {} {}", mark, signal.key, signal.name, sample, unit);
    }
    Ok(())
}

/// A configured port with its decoder built
struct PortRuntime {
    config: PortConfig,
    runtime: ProtocolRuntime,
    selected: HashSet<String>,
}

fn decode_mode(config_path: &Path, messages: &[PathBuf], format: Option<FormatArg>) -> Result<()> {
    log::info!("Loading configuration from: {:?}", config_path);
    let config: AppConfig = config::load_config(config_path)?;
    log::debug!("Configuration loaded successfully");

    let available = discover_profiles(&config.profiles_dir);
    let ports = config
        .ports
        .iter()
        .map(|port| {
            let profiles = select_profiles(&available, &port.profiles);
            Ok(PortRuntime {
                config: port.clone(),
                runtime: build_runtime(&port.protocol, &profiles)?,
                selected: port.selected_signals.iter().cloned().collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let port_ids: Vec<&str> = ports.iter().map(|p| p.config.id.as_str()).collect();
    let include_diagnostics = config.output.include_diagnostics;

    let reports = messages
        .par_iter()
        .map(|path| decode_message(path, &ports, &port_ids, include_diagnostics))
        .collect::<Result<Vec<_>>>()?;

    let format = match format {
        Some(FormatArg::Txt) => OutputFormat::Txt,
        Some(FormatArg::Json) => OutputFormat::Json,
        None => config.output.format,
    };
    match format {
        OutputFormat::Txt => print!("{}", report::render_text(&reports)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(())
}

fn decode_message(
    path: &Path,
    ports: &[PortRuntime],
    port_ids: &[&str],
    include_diagnostics: bool,
) -> Result<MessageReport> {
    let msg = telemetry::load_message(path, port_ids)?;
    let mut report = MessageReport::new(path, msg.timestamp_display());

    for port in ports {
        let Some(frames) = msg.ports.get(&port.config.id) else {
            continue;
        };
        let result = port.runtime.decode_runtime(frames, &port.config.id, &port.selected);
        let diagnostics = include_diagnostics
            .then(|| summarize_port_diagnostics(port.runtime.protocol_id(), &result.diagnostics));

        report.ports.insert(
            port.config.id.clone(),
            PortReport {
                protocol: port.config.protocol.clone(),
                has_valid_data: result.has_valid_data,
                values: result.values,
                diagnostics,
            },
        );
    }

    Ok(report)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
