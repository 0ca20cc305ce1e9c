// # vddnsd - versioned DDNS daemon
//
// Thin integration layer: reads configuration from the environment, builds
// the Gandi zone API client and the HTTP IP source, and runs the vddns-core
// poll loop until SIGTERM or SIGINT. All update logic lives in vddns-core.
//
// ## Configuration
//
// ### Required
// - `VDDNS_API_KEY`: Gandi API key
// - `VDDNS_ZONE_ID`: Numeric zone id
// - `VDDNS_RECORD`: Name of the record to keep current (e.g. `home`)
//
// ### Optional
// - `VDDNS_REFRESH_SECS`: Delay between checks (default 300)
// - `VDDNS_TEST_PLATFORM`: `true`/`1` to use the OT&E platform
// - `VDDNS_IP_SOURCE_URL`: Plain-text IP service (default https://api.ipify.org)
// - `VDDNS_REQUEST_TIMEOUT_SECS`: Per-request deadline for both services (default 30)
// - `VDDNS_FAILURE_ALERT_THRESHOLD`: Failed updates in a row before escalating (default 5, 0 = never)
// - `VDDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `VDDNS_CONFIG_FILE`: JSON configuration file used instead of the variables above
//
// ## Example
//
// ```bash
// export VDDNS_API_KEY=your_key
// export VDDNS_ZONE_ID=123456
// export VDDNS_RECORD=home
//
// vddnsd
// ```

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;
use vddns_core::config::{DdnsConfig, Platform};
use vddns_core::traits::{PublicIpSource, ZoneApi, ZoneId};
use vddns_core::{DdnsEngine, EngineEvent, ZoneState};
use vddns_ip_http::HttpIpSource;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VddnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<VddnsExitCode> for ExitCode {
    fn from(code: VddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    ddns: DdnsConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_level = lookup("VDDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        if let Some(path) = lookup("VDDNS_CONFIG_FILE") {
            let ddns = DdnsConfig::from_file(&path)
                .with_context(|| format!("Failed to load VDDNS_CONFIG_FILE {}", path))?;
            return Ok(Self { ddns, log_level });
        }

        let api_key = required(&lookup, "VDDNS_API_KEY")?;
        let zone_id: i64 = parse(&lookup, "VDDNS_ZONE_ID")?.ok_or_else(|| missing("VDDNS_ZONE_ID"))?;
        let record = required(&lookup, "VDDNS_RECORD")?;

        let mut ddns = DdnsConfig::new(api_key, ZoneId(zone_id), record);

        if let Some(test) = lookup("VDDNS_TEST_PLATFORM")
            && parse_bool(&test).context("VDDNS_TEST_PLATFORM must be true/false or 1/0")?
        {
            ddns.zone_api.platform = Platform::Testing;
        }
        if let Some(refresh) = parse(&lookup, "VDDNS_REFRESH_SECS")? {
            ddns.engine.refresh_secs = refresh;
        }
        if let Some(url) = lookup("VDDNS_IP_SOURCE_URL") {
            ddns.ip_source.url = url;
        }
        if let Some(timeout) = parse(&lookup, "VDDNS_REQUEST_TIMEOUT_SECS")? {
            ddns.zone_api.request_timeout_secs = timeout;
            ddns.ip_source.request_timeout_secs = timeout;
        }
        if let Some(threshold) = parse(&lookup, "VDDNS_FAILURE_ALERT_THRESHOLD")? {
            ddns.engine.failure_alert_threshold = threshold;
        }

        Ok(Self { ddns, log_level })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.ddns.validate()?;

        // Check for obvious placeholder keys (common mistake)
        let key_lower = self.ddns.zone_api.api_key.to_lowercase();
        if key_lower.contains("your_key") || key_lower.contains("replace_me") {
            anyhow::bail!(
                "VDDNS_API_KEY appears to be a placeholder. \
                Use the API key from your Gandi account."
            );
        }

        log_level(&self.log_level)?;
        Ok(())
    }
}

fn missing(key: &str) -> anyhow::Error {
    anyhow::anyhow!("{} is required. Set it via: export {}=...", key, key)
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| missing(key))
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{} '{}' is not valid: {}", key, raw, e))
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => anyhow::bail!("'{}' is not a boolean", other),
    }
}

fn log_level(raw: &str) -> Result<Level> {
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "VDDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return VddnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return VddnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let level = log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return VddnsExitCode::ConfigError.into();
    }

    info!("Starting vddnsd daemon");
    info!(
        "Managing record {} in zone {} ({:?})",
        config.ddns.record_name, config.ddns.zone_id, config.ddns.zone_api
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return VddnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            VddnsExitCode::RuntimeError
        } else {
            VddnsExitCode::CleanShutdown
        }
    });

    result.into()
}

#[cfg(feature = "gandi")]
fn build_zone_api(config: &DdnsConfig) -> Result<Box<dyn ZoneApi>> {
    let api = vddns_zone_gandi::GandiZoneApi::from_config(&config.zone_api)?;
    Ok(Box::new(api))
}

#[cfg(not(feature = "gandi"))]
fn build_zone_api(_config: &DdnsConfig) -> Result<Box<dyn ZoneApi>> {
    anyhow::bail!("vddnsd was built without a zone API backend (enable the `gandi` feature)")
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let zone_api = build_zone_api(&config.ddns)?;
    let ip_source: Box<dyn PublicIpSource> =
        Box::new(HttpIpSource::from_config(&config.ddns.ip_source)?);
    info!("Public IP source: {}", ip_source.source_name());

    let (engine, events) = DdnsEngine::new(zone_api, ip_source, config.ddns)?;
    tokio::spawn(log_events(events));

    let state = run_until_signal(engine, wait_for_shutdown()).await?;
    info!(
        "Shutting down daemon ({} = {}, zone version {})",
        state.record.name,
        state.registered_value(),
        state.active_version
    );

    Ok(())
}

/// Run `engine` until `signal` resolves
///
/// If waiting for the signal fails, the engine is stopped and the error is
/// returned, so the daemon exits with a runtime error instead of a clean one.
async fn run_until_signal<S>(engine: DdnsEngine, signal: S) -> Result<ZoneState>
where
    S: Future<Output = Result<&'static str>> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let watcher = tokio::spawn(async move {
        let received = signal.await?;
        info!("Received shutdown signal: {}", received);
        let _ = shutdown_tx.send(());
        Ok::<_, anyhow::Error>(())
    });

    let state = match engine.run_with_shutdown(Some(shutdown_rx)).await {
        Ok(state) => state,
        Err(e) => {
            watcher.abort();
            return Err(e.into());
        }
    };

    // The engine only returns Ok after the watcher sent or dropped the sender
    watcher
        .await
        .context("Shutdown signal task panicked")?
        .context("Failed to wait for a shutdown signal")?;
    Ok(state)
}

/// Drain engine events so the channel never fills up
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Engine event: {:?}", event);
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(received)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
