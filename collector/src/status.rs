//! # Status report model
//!
//! Typed view of the JSON document printed by `tirex-status -r`. Only the parts the exporter
//! cares about are modelled; everything else in the report is ignored so newer tirex versions
//! keep decoding.
//!
//! ```json
//! {
//!   "queue": { "size": 5, "prioqueues": [ { "prio": 1, "size": 2 }, { "prio": 3, "size": 3 } ] },
//!   "rm": {
//!     "num_rendering": 4,
//!     "stats": { "count_error": 0, "count_timeouted": 1, "count_requested": 10, "count_expired": 0 }
//!   }
//! }
//! ```
//!
//! Every field is optional. Missing values decode to zero, a missing or `null` priority queue
//! list decodes to an empty list. A document with invalid syntax or a field of the wrong type
//! fails as a whole.

use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};

#[derive(thiserror::Error, Debug)]
#[error("failed to decode tirex status report: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TirexStatus {
    #[serde(default)]
    pub queue: QueueStatus,
    #[serde(default)]
    pub rm: RenderManagerStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    #[serde(default)]
    pub size: i64,
    /// tirex itself prints `prioqueues`.
    #[serde(
        default,
        rename = "prio_queues",
        alias = "prioqueues",
        deserialize_with = "null_as_empty"
    )]
    pub prio_queues: Vec<PrioQueue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioQueue {
    #[serde(default)]
    pub prio: i64,
    #[serde(default)]
    pub size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderManagerStatus {
    #[serde(default)]
    pub num_rendering: i64,
    #[serde(default)]
    pub stats: RenderStats,
}

/// Cumulative counters kept by the tirex render manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    #[serde(default)]
    pub count_error: i64,
    #[serde(default)]
    pub count_timeouted: i64,
    #[serde(default)]
    pub count_requested: i64,
    #[serde(default)]
    pub count_expired: i64,
}

impl TirexStatus {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn queue_size(&self) -> i64 {
        self.queue.size
    }

    pub fn prio_queues(&self) -> &[PrioQueue] {
        &self.queue.prio_queues
    }

    pub fn num_rendering(&self) -> i64 {
        self.rm.num_rendering
    }

    pub fn stats(&self) -> &RenderStats {
        &self.rm.stats
    }
}

impl PrioQueue {
    /// Label value used for this queue, the decimal priority.
    pub fn label(&self) -> String {
        self.prio.to_string()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<PrioQueue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<PrioQueue>>::deserialize(deserializer)?.unwrap_or_default())
}



#[cfg(test)]
mod properties {
    use super::{
        strategies::tirex_status,
        *,
    };
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn serialized_status_always_decodes_to_itself(status in tirex_status()) {
            let bytes = serde_json::to_vec(&status).unwrap();
            prop_assert_eq!(TirexStatus::decode(&bytes).unwrap(), status);
        }

        #[test]
        fn tirex_key_spelling_decodes_the_same(status in tirex_status()) {
            let mut value = serde_json::to_value(&status).unwrap();
            let queue = value["queue"].as_object_mut().unwrap();
            let list = queue.remove("prio_queues").unwrap();
            queue.insert("prioqueues".to_string(), list);

            let bytes = serde_json::to_vec(&value).unwrap();
            prop_assert_eq!(TirexStatus::decode(&bytes).unwrap(), status);
        }
    }
}
