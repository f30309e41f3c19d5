//! Human readable durations (`"10s"`, `"1m 30s"`) for config files.

use serde::{
    Deserialize,
    Deserializer,
    Serializer,
};
use std::time::Duration;

pub mod humantime_serde {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
    }
}

pub(crate) fn format(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}
