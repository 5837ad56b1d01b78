use anyhow::Result;
use autopush_core::{TriggerDecision, TriggerFilter};
use autopush_local_store::{LogLevel, LogStore};
use autopush_runtime_config::{ValidatedSettings, sanitize_key};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use crate::config::{load_config, open_log_store};
use crate::push_cmd::{push_now, validated};

pub async fn run_trigger(config_path: &Path, event: &str, args: &[String]) -> Result<()> {
    let cfg = load_config(config_path)?;
    let store = open_log_store(&cfg)?;
    let settings = validated(&cfg, &store).await?;

    match decide(&settings, &store, event, args) {
        TriggerDecision::Run => push_now(&settings, &store).await,
        TriggerDecision::IgnoredEvent => {
            println!(
                "Event `{event}` is not the configured trigger `{}`; nothing to do.",
                settings.trigger_action
            );
            Ok(())
        }
        TriggerDecision::ParameterMismatch => {
            println!("Action triggered but parameter did not match; nothing to do.");
            Ok(())
        }
    }
}

fn decide(
    settings: &ValidatedSettings,
    store: &LogStore,
    event: &str,
    args: &[String],
) -> TriggerDecision {
    let filter = TriggerFilter::new(
        settings.trigger_action.clone(),
        settings.trigger_param.clone(),
    );
    let values: Vec<Value> = args.iter().map(String::as_str).map(parse_arg).collect();
    let decision = filter.evaluate(&sanitize_key(event), &values);

    if decision == TriggerDecision::ParameterMismatch {
        if let Err(e) = store.log(
            LogLevel::Info,
            "Action triggered but parameter did not match",
        ) {
            warn!("Failed to write event log: {e}");
        }
    } else if decision == TriggerDecision::Run {
        info!(event, "Trigger matched");
    }
    decision
}

/// JSON scalars keep their type; anything else is a plain string.
fn parse_arg(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::String(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}
