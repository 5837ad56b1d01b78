//! Mirror a local directory into a remote repository as one new commit.
//!
//! The pipeline drives the low-level Git Data API directly (blob → tree →
//! commit → ref) instead of pushing packs:
//!
//! 1. [`rate_limit::RateLimitGuard`] reads the quota once and may wait or abort.
//! 2. [`branch::resolve_default_branch`] probes `master`, then `main`.
//! 3. The head commit's tree becomes the base tree.
//! 4. [`walk::walk`] lists every regular file under the source root.
//! 5. [`upload::upload_blobs`] creates one blob per file, sequentially.
//! 6. [`objects`] creates the tree, the commit and force-moves the branch.
//!
//! [`pipeline::Pusher`] sequences the stages and owns the single failure
//! boundary. Nothing is persisted locally between pushes.

pub mod branch;
pub mod error;
pub mod notify;
pub mod objects;
pub mod pipeline;
pub mod rate_limit;
pub mod trigger;
pub mod upload;
pub mod walk;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{ErrorKind, PushError, Result};
pub use notify::PushNotifier;
pub use pipeline::{DEFAULT_COMMIT_MESSAGE, PushOptions, PushOutcome, PushReport, Pusher};
pub use rate_limit::DEFAULT_MAX_RATE_LIMIT_WAIT;
pub use trigger::{TriggerDecision, TriggerFilter};
