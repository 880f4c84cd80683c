//! Values returned by the automation server.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::proto::system_get_signal_reply::RetVal;

/// A typed signal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Float(f64),
    Int(i64),
    UInt(u64),
    Text(String),
}

impl SignalValue {
    /// Numeric view of the value, if it has one.
    ///
    /// Text values are parsed, so `"0.87"` yields `Some(0.87)`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Float(x) => Some(*x),
            SignalValue::Int(i) => Some(*i as f64),
            SignalValue::UInt(u) => Some(*u as f64),
            SignalValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Float(x) => write!(f, "{}", x),
            SignalValue::Int(i) => write!(f, "{}", i),
            SignalValue::UInt(u) => write!(f, "{}", u),
            SignalValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<RetVal> for SignalValue {
    fn from(value: RetVal) -> Self {
        match value {
            RetVal::RetValDouble(x) => SignalValue::Float(x),
            RetVal::RetValInt64(i) => SignalValue::Int(i),
            RetVal::RetValUint64(u) => SignalValue::UInt(u),
            RetVal::RetValString(s) => SignalValue::Text(s),
        }
    }
}

/// Overall test result reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestResult {
    /// Outcome code as reported by the server.
    pub code: i32,
    /// Secondary result value.
    pub additional_code: i32,
    /// Whether the server adds the result to its protocol.
    pub add_to_protocol: bool,
}
