//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events; binaries call [`init_logging`]
//! once at startup. `RUST_LOG` takes precedence over the filter passed in.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{Error, Result};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::Logging(format!("unknown log format '{other}'"))),
        }
    }
}

/// Build the filter: `RUST_LOG` if set and valid, else `default_filter`.
pub fn build_filter(default_filter: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_filter)
        .map_err(|e| Error::Logging(format!("invalid filter '{default_filter}': {e}")))
}

/// Install the global subscriber, writing to stderr.
pub fn init_logging(default_filter: &str, format: LogFormat) -> Result<()> {
    let filter = build_filter(default_filter)?;
    let pretty = (format == LogFormat::Pretty).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });
    let json = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(false)
            .flatten_event(true)
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LogCapture {
        bytes: Arc<Mutex<Vec<u8>>>,
    }

    impl LogCapture {
        fn install_json(&self, filter: EnvFilter) -> tracing::subscriber::DefaultGuard {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(self.clone())
                .json()
                .with_ansi(false)
                .with_target(false)
                .with_current_span(false)
                .flatten_event(true);
            let subscriber = tracing_subscriber::registry().with(filter).with(layer);
            tracing::subscriber::set_default(subscriber)
        }

        fn jsonl(&self) -> String {
            let guard = self
                .bytes
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            String::from_utf8_lossy(&guard).to_string()
        }
    }

    struct LogCaptureWriter {
        bytes: Arc<Mutex<Vec<u8>>>,
    }

    impl Write for LogCaptureWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
        type Writer = LogCaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            LogCaptureWriter {
                bytes: Arc::clone(&self.bytes),
            }
        }
    }

    #[test]
    fn format_parses() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn saturated_target_date_is_logged() {
        use crate::policy::{PolicyUnit, PolicyValue};
        use chrono::{TimeZone, Utc};

        let capture = LogCapture::default();
        let _guard = capture.install_json(EnvFilter::new("warn"));

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap();
        let _ = PolicyValue::new(PolicyUnit::Years, i32::MAX).target_date(&now);

        let lines = capture.jsonl();
        let event: serde_json::Value =
            serde_json::from_str(lines.lines().next().unwrap()).unwrap();
        assert_eq!(event["message"], "Target date out of range; saturating");
        assert_eq!(event["policy"], format!("{} Years", i32::MAX));
    }
}
