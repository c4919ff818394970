//! CLI Command Implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::json;
use tracing::{info, warn};

use aqua::ipc::{Fault, Inbox, SimulatedEqualizer};
use aqua::response::ResponseEngine;
use aqua::state::{EqualizerState, Filter, FilterId, FilterType, Filters};
use aqua::{AquaConfig, EqualizerSession};

/// Parse `FREQ:GAIN:Q[:TYPE]`
pub fn parse_band(s: &str) -> std::result::Result<Filter, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(format!("expected FREQ:GAIN:Q[:TYPE], got '{}'", s));
    }

    let number = |name: &str, text: &str| {
        text.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid {} '{}'", name, text))
    };
    let frequency = number("frequency", parts[0])?;
    let gain = number("gain", parts[1])?;
    let quality = number("quality", parts[2])?;
    let filter_type = match parts.get(3) {
        Some(code) => code.parse::<FilterType>()?,
        None => FilterType::Peak,
    };

    let filter = Filter::new(FilterId::new(), frequency, gain, quality, filter_type);
    filter.validate().map_err(|e| e.to_string())?;
    Ok(filter)
}

/// Print the auto-preamp value, or the whole curve
pub fn response(bands: &[Filter], preamp: f64, curve: bool) -> Result<()> {
    aqua::state::check_gain(preamp)?;
    let filters: Filters = bands.iter().cloned().collect();

    let engine = ResponseEngine::new();
    let response = engine.compute(&filters, preamp);
    info!(bands = filters.len(), auto_preamp = response.auto_preamp, "response computed");

    if curve {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{:.2}", response.auto_preamp);
    }
    Ok(())
}

/// Health check followed by a short editing script against the simulated host
pub async fn simulate(fault: Option<Fault>, latency_ms: u64, timeout_ms: Option<u64>) -> Result<()> {
    let mut config = AquaConfig::from_env();
    if let Some(ms) = timeout_ms {
        config = config.with_ipc_timeout(Duration::from_millis(ms));
    }

    let inbox = Inbox::new();
    let host = Arc::new(SimulatedEqualizer::new(inbox.clone(), &EqualizerState::default()));
    host.set_fault(fault);
    host.set_latency(Duration::from_millis(latency_ms));

    let session = EqualizerSession::connect(host.clone(), inbox, config);

    if let Err(e) = session.health_check().await {
        if let Some(desc) = e.description() {
            println!("{}", serde_json::to_string_pretty(&json!({ "error": desc }))?);
        }
        bail!("health check failed: {}", e);
    }

    let snapshot = session.snapshot();
    let ids = snapshot.filters.ids();
    let mid = *ids.get(ids.len() / 2).context("no bands after health check")?;
    let first = ids[0];

    session.set_gain(mid, 6.0).await?;
    session.set_quality(mid, 1.4).await?;
    let added = session.add_band(None).await?;
    session.set_type(added, FilterType::HighShelfCornerQ).await?;
    session.set_gain(added, -3.0).await?;
    session.remove_band(first).await?;
    session.set_auto_preamp(true).await?;

    let local = session.snapshot();
    let remote = host.host_state();
    if local.filters.len() != remote.filters.len() || local.pre_amp != remote.pre_amp {
        warn!("local and host state diverged");
    }

    let report = json!({
        "commandsSent": host.received_count(),
        "autoPreamp": session.response().auto_preamp,
        "state": local.as_ref(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
