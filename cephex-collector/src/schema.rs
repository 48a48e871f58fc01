//! Typed views of the `counter schema` and `counter dump` replies.
//!
//! Both replies are keyed by counter group, and each group is an array whose
//! entries line up positionally: schema entry `i` describes dump entry `i`.
//!
//! ```json
//! {"osd": [{"counters": {"op": {"type": 10, "metric_type": "counter",
//!                               "description": "Client operations",
//!                               "priority": 8}},
//!           "labels": {}}]}
//! {"osd": [{"counters": {"op": 7}}]}
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use cephex_metrics::SampleValue;

/// Counter type bits as reported in the schema's `type` field.
pub mod type_bits {
    pub const TIME: u64 = 0x1;
    pub const U64: u64 = 0x2;
    pub const LONGRUNAVG: u64 = 0x4;
    pub const COUNTER: u64 = 0x8;
    pub const HISTOGRAM: u64 = 0x10;
}

/// `counter schema` reply: group name -> entries.
pub type CounterSchema = BTreeMap<String, Vec<SchemaEntry>>;

/// `counter dump` reply: group name -> entries.
pub type CounterDump = BTreeMap<String, Vec<DumpEntry>>;

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaEntry {
    #[serde(default)]
    pub counters: BTreeMap<String, CounterInfo>,
    #[serde(default)]
    pub labels: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CounterInfo {
    #[serde(rename = "type")]
    pub type_bits: u64,
    #[serde(default)]
    pub metric_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i64,
}

impl CounterInfo {
    pub fn is_long_running_avg(&self) -> bool {
        self.type_bits & type_bits::LONGRUNAVG != 0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DumpEntry {
    #[serde(default)]
    pub counters: BTreeMap<String, Value>,
}

/// A dump value interpreted against its schema entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CounterValue {
    Scalar(SampleValue),
    Average { count: SampleValue, sum: SampleValue },
}

impl CounterValue {
    /// `None` when the JSON shape does not match what the schema promises.
    pub fn from_json(info: &CounterInfo, value: &Value) -> Option<Self> {
        if info.is_long_running_avg() {
            let count = value.get("avgcount").and_then(number)?;
            let sum = value.get("sum").and_then(number)?;
            Some(CounterValue::Average { count, sum })
        } else {
            number(value).map(CounterValue::Scalar)
        }
    }
}

/// A JSON number as a sample, keeping integer vs float.
pub fn number(value: &Value) -> Option<SampleValue> {
    let n = value.as_number()?;
    if let Some(v) = n.as_i64() {
        Some(SampleValue::Int(v))
    } else if let Some(v) = n.as_u64() {
        Some(SampleValue::UInt(v))
    } else {
        n.as_f64().map(SampleValue::Float)
    }
}

/// A schema label value as plain text; strings are taken verbatim.
pub fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
