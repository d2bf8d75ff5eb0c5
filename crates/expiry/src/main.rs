//! `expiry`: inspect expiry policy tokens and the dates they produce.
//!
//! # Usage
//!
//! ```bash
//! # Canonical token, display string and flags
//! expiry parse "3 months"
//!
//! # Expiry date a policy assigns when applied now
//! expiry target "90 Days"
//!
//! # ...or at a fixed instant, as JSON
//! expiry --json target "1 Days" --now 2024-03-10T10:00:00+01:00
//! ```

#![forbid(unsafe_code)]

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use clap::{Parser, Subcommand};
use expiry_core::logging::{LogFormat, init_logging};
use expiry_core::policy::EXPIRY_SENTINEL;
use expiry_core::{EngineConfig, PolicyValue};
use serde::Serialize;

/// Expiry policy inspector.
#[derive(Parser, Debug)]
#[command(name = "expiry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine config file (TOML). Defaults plus environment overrides
    /// when omitted.
    #[arg(long, global = true, env = "EXPIRY_CONFIG")]
    config: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log line format: pretty or json.
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a policy token and show how it is stored and displayed.
    Parse {
        /// Policy token, e.g. "30 Days", "Off", "inherit".
        token: String,
    },
    /// Compute the expiry date a policy assigns.
    Target {
        /// Policy token.
        token: String,

        /// Instant to compute from (RFC 3339). Its fixed offset decides where
        /// days end. Defaults to the local clock and zone.
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct ParseReport {
    input: String,
    token: String,
    display: String,
    unit: String,
    magnitude: i32,
    inherit: bool,
    off: bool,
    specific: bool,
}

#[derive(Debug, Serialize)]
struct TargetReport {
    policy: String,
    now: String,
    target: String,
    /// The policy has no unit; `target` is the "no date" sentinel.
    sentinel: bool,
}

impl TargetReport {
    /// Day ends follow `now`'s zone, including its daylight-saving rules.
    fn compute<Tz>(value: PolicyValue, now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let target = value.target_date(now);
        Self {
            policy: value.to_token(),
            now: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            target: target.to_rfc3339_opts(SecondsFormat::Secs, true),
            sentinel: target == EXPIRY_SENTINEL,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::from_env().context("reading environment overrides")?,
    };
    tracing::debug!(active = config.active, "Config ready");

    match cli.command {
        Command::Parse { token } => {
            let value = PolicyValue::parse(&token);
            let report = ParseReport {
                token: value.to_token(),
                display: value.to_display(&config.labels),
                unit: value.unit().to_string(),
                magnitude: value.magnitude(),
                inherit: value.is_inherit(),
                off: value.is_off(),
                specific: value.is_specific(),
                input: token,
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("token:     {}", report.token);
                println!("display:   {}", report.display);
                println!("unit:      {}", report.unit);
                println!("magnitude: {}", report.magnitude);
            }
        }
        Command::Target { token, now } => {
            let value = PolicyValue::parse(&token);
            let report = match now {
                Some(raw) => {
                    let now = DateTime::parse_from_rfc3339(&raw)
                        .with_context(|| format!("invalid --now '{raw}', expected RFC 3339"))?;
                    TargetReport::compute(value, &now)
                }
                None => TargetReport::compute(value, &Local::now()),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.sentinel {
                println!("{}: no expiry date", report.policy);
            } else {
                println!("{}", report.target);
            }
        }
    }
    Ok(())
}
