//! Process-wide log configuration
//!
//! Everything in this crate logs through `tracing`. The host application
//! either installs its own subscriber or calls [`init`] once, optionally
//! handing over a [`LogSink`] that receives every record.

use crate::config::{LogConfig, LogFormat};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Host-provided receiver for log records
pub trait LogSink: Send + Sync {
    fn output_log(&self, level: Level, target: &str, message: &str);
}

/// Layer forwarding each log record to a [`LogSink`]
pub struct CallbackLayer {
    sink: Arc<dyn LogSink>,
}

impl CallbackLayer {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for CallbackLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.sink
            .output_log(*metadata.level(), metadata.target(), &visitor.finish());
    }
}

/// Collects the message plus any structured fields as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let fields = self.fields.join(" ");
        if self.message.is_empty() {
            fields
        } else {
            format!("{} {}", self.message, fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter`. Fails with
/// [`Error::LoggingInitialized`] if a global subscriber is already set.
pub fn init(config: &LogConfig, sink: Option<Arc<dyn LogSink>>) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| Error::config(format!("log filter '{}': {}", config.filter, e)))?,
    };

    let text = (config.stdout && config.format == LogFormat::Text).then(fmt::layer);
    let json = (config.stdout && config.format == LogFormat::Json).then(|| fmt::layer().json());
    let callback = sink.map(CallbackLayer::new);

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .with(callback)
        .try_init()
        .map_err(|_| Error::LoggingInitialized)
}
