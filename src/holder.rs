use std::fmt;

use log::warn;

use crate::feature_state::{FeatureState, FeatureValueType};

/// IncompleteFeatureState is returned when a raw [FeatureState] record lacks
/// a field the cache cannot do without. Such records are dropped per-record;
/// they never abort the batch they arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncompleteFeatureState {
    MissingKey,
    MissingId,
    MissingVersion,
    MissingType,
}

impl fmt::Display for IncompleteFeatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match self {
            IncompleteFeatureState::MissingKey => "key",
            IncompleteFeatureState::MissingId => "id",
            IncompleteFeatureState::MissingVersion => "version",
            IncompleteFeatureState::MissingType => "type",
        };
        write!(f, "feature state record is missing its {}", field)
    }
}

impl std::error::Error for IncompleteFeatureState {}

/// The cached representation of one feature's current server-declared state.
///
/// A holder is immutable once constructed; the repository replaces it
/// wholesale on a qualifying update, so a reader holding a reference always
/// sees an internally consistent `(type, value)` pair.
#[derive(Clone, Debug)]
pub struct FeatureStateHolder {
    id: String,
    key: String,
    locked: bool,
    version: u64,
    feature_type: FeatureValueType,
    value: Option<serde_json::Value>,
    strategies: Vec<serde_json::Value>,
}

impl TryFrom<FeatureState> for FeatureStateHolder {
    type Error = IncompleteFeatureState;

    fn try_from(state: FeatureState) -> Result<Self, Self::Error> {
        let key = match state.key {
            Some(key) if !key.is_empty() => key,
            _ => return Err(IncompleteFeatureState::MissingKey),
        };
        let id = state.id.ok_or(IncompleteFeatureState::MissingId)?;
        let version = state.version.ok_or(IncompleteFeatureState::MissingVersion)?;
        let feature_type = state.feature_type.ok_or(IncompleteFeatureState::MissingType)?;

        Ok(FeatureStateHolder {
            id,
            key,
            locked: state.locked,
            version,
            feature_type,
            value: state.value,
            strategies: state.strategies,
        })
    }
}

// strategies is deliberately left out: strategy-list churn without a version
// bump is not a state change for merge purposes.
impl PartialEq for FeatureStateHolder {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.key == other.key
            && self.locked == other.locked
            && self.version == other.version
            && self.feature_type == other.feature_type
            && self.value == other.value
    }
}

impl FeatureStateHolder {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn feature_type(&self) -> FeatureValueType {
        self.feature_type
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The targeting-rule descriptors carried on the record, unevaluated.
    pub fn strategies(&self) -> &[serde_json::Value] {
        &self.strategies
    }

    pub(crate) fn value(&self) -> Option<&serde_json::Value> {
        self.value.as_ref()
    }

    /// True if the feature carries a value at all.
    pub fn is_set(&self) -> bool {
        !matches!(self.value, None | Some(serde_json::Value::Null))
    }

    pub fn get_boolean(&self) -> Option<bool> {
        match self.feature_type {
            FeatureValueType::Boolean => self.value.as_ref().and_then(serde_json::Value::as_bool),
            other => {
                warn!("feature {} is not a boolean but {:?}", self.key, other);
                None
            }
        }
    }

    pub fn get_string(&self) -> Option<String> {
        match self.feature_type {
            FeatureValueType::String => self
                .value
                .as_ref()
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
            other => {
                warn!("feature {} is not a string but {:?}", self.key, other);
                None
            }
        }
    }

    pub fn get_number(&self) -> Option<f64> {
        match self.feature_type {
            FeatureValueType::Number => self.value.as_ref().and_then(serde_json::Value::as_f64),
            other => {
                warn!("feature {} is not a number but {:?}", self.key, other);
                None
            }
        }
    }

    /// Returns the feature's value as a serialized-JSON string. The edge
    /// normally sends JSON values pre-serialized as strings; a structured
    /// value is re-serialized for the caller.
    pub fn get_raw_json(&self) -> Option<String> {
        match self.feature_type {
            FeatureValueType::Json => match self.value.as_ref() {
                None | Some(serde_json::Value::Null) => None,
                Some(serde_json::Value::String(raw)) => Some(raw.clone()),
                Some(value) => Some(value.to_string()),
            },
            other => {
                warn!("feature {} is not json but {:?}", self.key, other);
                None
            }
        }
    }

    /// Synonym for [FeatureStateHolder::get_boolean].
    pub fn get_flag(&self) -> Option<bool> {
        self.get_boolean()
    }

    /// True iff the feature is a boolean and its value is literally true.
    pub fn is_enabled(&self) -> bool {
        self.get_boolean() == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spectral::prelude::*;
    use test_case::test_case;

    fn boolean_state(value: bool) -> FeatureState {
        FeatureState {
            id: Some("x".to_string()),
            key: Some("A".to_string()),
            locked: true,
            version: Some(1),
            feature_type: Some(FeatureValueType::Boolean),
            value: Some(json!(value)),
            strategies: vec![],
        }
    }

    fn holder(state: FeatureState) -> FeatureStateHolder {
        FeatureStateHolder::try_from(state).expect("should build")
    }

    #[test]
    fn construction_populates_all_fields() {
        let held = holder(boolean_state(false));

        assert_that!(held.key()).is_equal_to("A");
        assert_that!(held.id()).is_equal_to("x");
        assert_that!(held.version()).is_equal_to(1);
        assert_that!(held.feature_type()).is_equal_to(FeatureValueType::Boolean);
        assert_that!(held.is_locked()).is_true();
        assert_that!(held.strategies().len()).is_equal_to(0);
    }

    #[test_case(FeatureState { key: None, ..boolean_state(true) }, IncompleteFeatureState::MissingKey; "missing key")]
    #[test_case(FeatureState { key: Some(String::new()), ..boolean_state(true) }, IncompleteFeatureState::MissingKey; "empty key")]
    #[test_case(FeatureState { id: None, ..boolean_state(true) }, IncompleteFeatureState::MissingId; "missing id")]
    #[test_case(FeatureState { version: None, ..boolean_state(true) }, IncompleteFeatureState::MissingVersion; "missing version")]
    #[test_case(FeatureState { feature_type: None, ..boolean_state(true) }, IncompleteFeatureState::MissingType; "missing type")]
    fn rejects_incomplete_records(state: FeatureState, expected: IncompleteFeatureState) {
        let result = FeatureStateHolder::try_from(state);
        assert_that!(result).is_err_containing(expected);
    }

    #[test_case(FeatureValueType::Boolean, json!(true); "boolean")]
    #[test_case(FeatureValueType::String, json!("blue"); "string")]
    #[test_case(FeatureValueType::Number, json!(16.5); "number")]
    #[test_case(FeatureValueType::Json, json!("{\"a\":1}"); "json")]
    fn accessors_require_matching_type(
        feature_type: FeatureValueType,
        value: serde_json::Value,
    ) {
        let held = holder(FeatureState {
            feature_type: Some(feature_type),
            value: Some(value),
            ..boolean_state(true)
        });

        assert_that!(held.get_boolean().is_some())
            .is_equal_to(feature_type == FeatureValueType::Boolean);
        assert_that!(held.get_string().is_some())
            .is_equal_to(feature_type == FeatureValueType::String);
        assert_that!(held.get_number().is_some())
            .is_equal_to(feature_type == FeatureValueType::Number);
        assert_that!(held.get_raw_json().is_some())
            .is_equal_to(feature_type == FeatureValueType::Json);
    }

    #[test]
    fn typed_accessors_return_the_stored_value() {
        assert_that!(holder(boolean_state(true)).get_boolean()).contains_value(true);

        let string_holder = holder(FeatureState {
            feature_type: Some(FeatureValueType::String),
            value: Some(json!("orange")),
            ..boolean_state(true)
        });
        assert_that!(string_holder.get_string()).contains_value("orange".to_string());

        let number_holder = holder(FeatureState {
            feature_type: Some(FeatureValueType::Number),
            value: Some(json!(42.0)),
            ..boolean_state(true)
        });
        assert_that!(number_holder.get_number()).contains_value(42.0);
    }

    #[test]
    fn raw_json_passes_preserialized_strings_through() {
        let held = holder(FeatureState {
            feature_type: Some(FeatureValueType::Json),
            value: Some(json!("{\"sample\": true}")),
            ..boolean_state(true)
        });
        assert_that!(held.get_raw_json()).contains_value("{\"sample\": true}".to_string());
    }

    #[test]
    fn raw_json_serializes_structured_values() {
        let held = holder(FeatureState {
            feature_type: Some(FeatureValueType::Json),
            value: Some(json!({"sample": true})),
            ..boolean_state(true)
        });
        assert_that!(held.get_raw_json()).contains_value("{\"sample\":true}".to_string());
    }

    #[test_case(Some(json!(true)), true; "true value")]
    #[test_case(Some(json!(false)), false; "false value")]
    #[test_case(None, false; "absent value")]
    fn is_enabled_requires_literal_true(value: Option<serde_json::Value>, expected: bool) {
        let held = holder(FeatureState {
            value,
            ..boolean_state(true)
        });
        assert_that!(held.is_enabled()).is_equal_to(expected);
        assert_that!(held.get_flag()).is_equal_to(held.get_boolean());
    }

    #[test_case(None, false; "no value")]
    #[test_case(Some(json!(null)), false; "null value")]
    #[test_case(Some(json!(false)), true; "false is still set")]
    fn is_set_tracks_value_presence(value: Option<serde_json::Value>, expected: bool) {
        let held = holder(FeatureState {
            value,
            ..boolean_state(true)
        });
        assert_that!(held.is_set()).is_equal_to(expected);
    }

    #[test]
    fn equality_ignores_strategies() {
        let base = boolean_state(true);
        let with_strategies = FeatureState {
            strategies: vec![json!({"percentage": 50})],
            ..base.clone()
        };

        assert_that!(holder(base.clone())).is_equal_to(holder(with_strategies));

        let bumped = FeatureState {
            version: Some(2),
            ..base
        };
        assert_that!(holder(boolean_state(true)) == holder(bumped)).is_false();
    }
}
