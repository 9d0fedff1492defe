//! Exit code policy

use serde::{Deserialize, Serialize};

/// Whether a normal non-zero exit counts as a failure.
///
/// Signal deaths and spawn failures are failures under either policy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExitCodePolicy {
    /// Non-zero exit is a failure
    #[default]
    Fail,
    /// Non-zero exit is treated like success
    Ignore,
}
