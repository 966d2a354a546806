//! Logging bootstrap. Events go to stderr so stdout carries only command output.

use anyhow::anyhow;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use seed_kernel::settings::{LogFormat, TelemetrySettings};

/// Filter from `RUST_LOG` when set, otherwise the configured level
pub fn env_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level))
}

/// Fmt subscriber in the requested format, writing through `writer`
pub fn subscriber<W>(
    format: &LogFormat,
    filter: EnvFilter,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    match format {
        LogFormat::Pretty => Box::new(builder.finish()),
        LogFormat::Json => Box::new(builder.json().finish()),
    }
}

/// Install the global tracing subscriber
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    subscriber(&settings.log_format, env_filter(settings), std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))?;

    tracing::debug!(
        target: "seed-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn emit(format: LogFormat, level: &str) -> String {
        let captured = Captured::default();
        let subscriber = subscriber(&format, EnvFilter::new(level), captured.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(collection = "users", "indexes provisioned");
            tracing::info!(collection = "products", inserted = 3, "collection seeded");
        });
        captured.text()
    }

    #[test]
    fn json_format_writes_one_object_per_event() {
        let output = emit(LogFormat::Json, "info");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);

        let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(event["level"], "INFO");
        assert_eq!(event["fields"]["message"], "collection seeded");
        assert_eq!(event["fields"]["collection"], "products");
        assert_eq!(event["fields"]["inserted"], 3);
    }

    #[test]
    fn pretty_format_is_not_json() {
        let output = emit(LogFormat::Pretty, "info");

        assert!(output.contains("collection seeded"));
        assert!(serde_json::from_str::<serde_json::Value>(output.trim()).is_err());
    }

    #[test]
    fn configured_level_filters_events() {
        let output = emit(LogFormat::Json, "debug");
        assert_eq!(output.lines().count(), 2);
        assert!(output.contains("indexes provisioned"));
    }
}
