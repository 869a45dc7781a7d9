//! CLI command implementations

use crate::output::{format_event, format_output, OutputFormat};
use anyhow::Context;
use async_trait::async_trait;
use kino_telemetry::monitor::transport_for;
use kino_telemetry::{
    Clock, EnrichedEvent, FakeClock, PlaybackMonitor, PlayerHandle, PlayerSignal, SystemClock,
    TelemetryConfig, Transport,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// One line of a replay script
#[derive(Debug, Deserialize)]
pub struct ScriptLine {
    /// Offset from the start of the replay in milliseconds
    pub at_ms: u64,
    /// Player position reported from this line on
    #[serde(default)]
    pub position_ms: Option<u64>,
    pub signal: PlayerSignal,
}

/// Player whose position is driven by the script
#[derive(Default)]
struct ScriptedPlayer {
    position_ms: AtomicU64,
}

impl PlayerHandle for ScriptedPlayer {
    fn current_position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::Relaxed)
    }
}

/// Prints each event, then hands it to the collector transport if any
struct PrintTransport {
    format: OutputFormat,
    forward: Option<Arc<dyn Transport>>,
}

#[async_trait]
impl Transport for PrintTransport {
    async fn send(&self, event: &EnrichedEvent) -> kino_telemetry::Result<()> {
        println!("{}", format_event(event, self.format)?);
        match &self.forward {
            Some(transport) => transport.send(event).await,
            None => Ok(()),
        }
    }
}

/// Load configuration from `path` (or defaults), then apply environment
/// and command line overrides
pub fn load_config(
    path: Option<&Path>,
    collector: Option<Url>,
    verbose: bool,
) -> anyhow::Result<TelemetryConfig> {
    let mut config = match path {
        Some(path) => TelemetryConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TelemetryConfig::default(),
    };
    config.apply_env_overrides()?;

    if let Some(collector) = collector {
        config.collector_url = Some(collector);
        config.validate()?;
    }
    if verbose {
        config.log.filter = "debug".to_string();
    }
    Ok(config)
}

/// Parse a JSON Lines script, skipping blank lines and `#` comments
pub fn parse_script(text: &str) -> anyhow::Result<Vec<ScriptLine>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("script line {}", i + 1))
        })
        .collect()
}

/// Replay a signal script through a monitor
pub async fn replay(script: &Path, config: &TelemetryConfig, format: &str) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(script)
        .with_context(|| format!("reading script {}", script.display()))?;
    let lines = parse_script(&text)?;
    let format = OutputFormat::from(format);

    let forward = match config.collector_url {
        Some(_) => Some(transport_for(config)?),
        None => None,
    };
    let transport = Arc::new(PrintTransport { format, forward });

    let start_ms = SystemClock.now_ms();
    let clock = Arc::new(FakeClock::new(start_ms));
    let player = Arc::new(ScriptedPlayer::default());
    let handle: Arc<dyn PlayerHandle> = player.clone();

    let mut monitor =
        PlaybackMonitor::with_clock(config, Arc::downgrade(&handle), transport, clock.clone());
    info!(session_id = %monitor.session_id(), signals = lines.len(), "Replaying script");

    for line in lines {
        clock.set(start_ms + line.at_ms);
        if let Some(position_ms) = line.position_ms {
            player.position_ms.store(position_ms, Ordering::Relaxed);
        }
        monitor.handle(line.signal);
    }

    monitor.release().await;

    let stats = monitor.stats();
    if format == OutputFormat::Text {
        println!();
        println!("Session:   {}", monitor.session_id());
        println!("State:     {}", monitor.state());
        println!("Delivered: {}", stats.delivered);
        println!("Failed:    {}", stats.failed);
        println!("Dropped:   {}", stats.dropped);
        println!("Abandoned: {}", stats.abandoned);
    }

    Ok(())
}

/// Print the effective configuration
pub fn show_config(config: &TelemetryConfig, format: &str) -> anyhow::Result<()> {
    println!("{}", format_output(config, OutputFormat::from(format))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kino_telemetry::PlayerPlaybackState;

    #[test]
    fn test_parse_script() {
        let script = r#"
# startup
{ "at_ms": 0, "signal": { "type": "playback_state_changed", "state": "buffering" } }
{ "at_ms": 350, "position_ms": 0, "signal": { "type": "is_playing_changed", "is_playing": true } }

{ "at_ms": 900, "signal": { "type": "rendered_first_frame" } }
"#;
        let lines = parse_script(script).unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0].signal,
            PlayerSignal::PlaybackStateChanged {
                state: PlayerPlaybackState::Buffering
            }
        );
        assert_eq!(lines[1].position_ms, Some(0));
        assert_eq!(lines[2].at_ms, 900);
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("{ \"at_ms\": 0, \"signal\": {} }").unwrap_err();
        assert!(err.to_string().contains("script line 1"));
    }

    #[test]
    fn test_load_config_verbose() {
        let config = load_config(None, None, true).unwrap();
        assert_eq!(config.log.filter, "debug");
    }
}
