use serde_json::Value;
use tracing::{debug, info};

/// Whether an incoming event should start a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Run,
    /// The event is not the configured trigger.
    IgnoredEvent,
    /// A match value is configured and no scalar argument equals it.
    ParameterMismatch,
}

/// Event filter in front of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerFilter {
    action: String,
    match_value: Option<String>,
}

impl TriggerFilter {
    pub fn new(action: impl Into<String>, match_value: Option<String>) -> Self {
        Self {
            action: action.into(),
            match_value: match_value.filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn match_value(&self) -> Option<&str> {
        self.match_value.as_deref()
    }

    pub fn evaluate(&self, event: &str, args: &[Value]) -> TriggerDecision {
        if event != self.action {
            debug!(event, expected = %self.action, "event is not the configured trigger");
            return TriggerDecision::IgnoredEvent;
        }

        let Some(expected) = self.match_value.as_deref() else {
            return TriggerDecision::Run;
        };

        if args
            .iter()
            .filter_map(scalar_string)
            .any(|arg| arg == expected.trim())
        {
            TriggerDecision::Run
        } else {
            info!(event, "Action triggered but parameter did not match");
            TriggerDecision::ParameterMismatch
        }
    }
}

/// String form of a scalar argument; arrays, objects and null are not scalars.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn other_events_are_ignored() {
        let filter = TriggerFilter::new("publish", None);
        assert_eq!(filter.evaluate("save", &[]), TriggerDecision::IgnoredEvent);
        assert_eq!(filter.evaluate("publish", &[]), TriggerDecision::Run);
    }

    #[test]
    fn match_value_requires_a_matching_scalar() {
        let filter = TriggerFilter::new("publish", Some("42".to_string()));
        assert_eq!(
            filter.evaluate("publish", &[json!("7"), json!({"id": "42"})]),
            TriggerDecision::ParameterMismatch
        );
        assert_eq!(
            filter.evaluate("publish", &[json!("7"), json!(42)]),
            TriggerDecision::Run
        );
        assert_eq!(
            filter.evaluate("publish", &[json!(" 42 ")]),
            TriggerDecision::Run
        );
        assert_eq!(filter.evaluate("publish", &[]), TriggerDecision::ParameterMismatch);
    }

    #[test]
    fn booleans_compare_by_string_form() {
        let filter = TriggerFilter::new("publish", Some("true".to_string()));
        assert_eq!(filter.evaluate("publish", &[json!(true)]), TriggerDecision::Run);
        assert_eq!(
            filter.evaluate("publish", &[json!(null), json!([true])]),
            TriggerDecision::ParameterMismatch
        );
    }

    #[test]
    fn blank_match_value_counts_as_unset() {
        let filter = TriggerFilter::new("publish", Some("  ".to_string()));
        assert_eq!(filter.match_value(), None);
        assert_eq!(filter.evaluate("publish", &[json!("x")]), TriggerDecision::Run);
    }
}
