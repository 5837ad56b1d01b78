use std::path::Path;

use crate::error::PushError;
use crate::pipeline::PushOutcome;

/// Observer of push lifecycle events.
///
/// Notifiers react to a push; they cannot change its outcome.
pub trait PushNotifier {
    fn on_start(&self, _source_root: &Path) {}

    fn on_success(&self, _outcome: &PushOutcome) {}

    fn on_failure(&self, _error: &PushError) {}
}
