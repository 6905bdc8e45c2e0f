//! Site-wide singleton settings (e.g. the namecard image).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A keyed site setting with an open-ended JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSetting {
    pub key: String,
    pub value: Value,
}
