use std::fmt;

/// Identifier for an inbound SMS as assigned by the edge node, e.g. an IMEI
/// plus a monotonic counter. Opaque to the bridge beyond the length bound
/// enforced at the Ingest Facade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SmsId(String);

impl SmsId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SmsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SmsId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SmsId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Identifier for a cellular edge node, e.g. a device serial or IMEI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
