use serde::{Deserialize, Serialize};

/// The server-declared type of a feature's value. Determines which typed
/// accessor on [crate::FeatureStateHolder] yields a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureValueType {
    Boolean,
    String,
    Number,
    Json,
}

/// One raw feature-state record as delivered by the edge.
///
/// Every field is optional at the wire level so that an individual malformed
/// record can be rejected on its own (when it is promoted to a
/// [crate::FeatureStateHolder]) rather than failing deserialization of the
/// whole batch it arrived in.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct FeatureState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Whether the feature's strategies are administratively locked. Carried
    /// through for downstream consumers, not interpreted here.
    #[serde(rename = "l", default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub feature_type: Option<FeatureValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Targeting-rule descriptors, carried through unevaluated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategies: Vec<serde_json::Value>,
}

/// One feature group from a snapshot payload: the edge returns a sequence of
/// these, one per environment the client's API keys resolve to. Either field
/// may be absent or null.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct FeatureEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<FeatureState>>,
}
