//! Dynamic application settings and typed value coercion.
//!
//! Settings are stored as strings and coerced to a typed JSON value on
//! read according to their declared [`SettingType`]. Encrypted entries are
//! decrypted by the application layer before coercion.

use std::str::FromStr;

use cambo_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::permission::Slug;

/// Value type declared for a setting entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    /// Free-form text.
    Text,
    /// Integer or floating point number.
    Number,
    /// Boolean flag.
    Boolean,
    /// Single choice from a fixed option list.
    Select,
    /// Multiple choices from a fixed option list.
    Multiselect,
    /// Arbitrary JSON document.
    Json,
    /// CSS color value.
    Color,
    /// Stored file reference.
    File,
}

impl SettingType {
    /// Returns a stable storage value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Select => "select",
            Self::Multiselect => "multiselect",
            Self::Json => "json",
            Self::Color => "color",
            Self::File => "file",
        }
    }
}

impl FromStr for SettingType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "select" => Ok(Self::Select),
            "multiselect" => Ok(Self::Multiselect),
            "json" => Ok(Self::Json),
            "color" => Ok(Self::Color),
            "file" => Ok(Self::File),
            _ => Err(AppError::Validation(format!(
                "unknown setting type '{value}'"
            ))),
        }
    }
}

/// One dynamic setting entry.
///
/// `value` holds the raw stored string (ciphertext when `is_encrypted`);
/// callers coerce through [`Setting::typed_value`] after decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    key: Slug,
    group: NonEmptyString,
    label: NonEmptyString,
    description: Option<String>,
    setting_type: SettingType,
    value: Option<String>,
    default_value: Option<String>,
    options: Option<Value>,
    is_public: bool,
    is_encrypted: bool,
    order: i32,
}

impl Setting {
    /// Creates a setting entry with validated attributes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: impl Into<String>,
        group: impl Into<String>,
        label: impl Into<String>,
        description: Option<String>,
        setting_type: SettingType,
        value: Option<String>,
        default_value: Option<String>,
        options: Option<Value>,
        is_public: bool,
        is_encrypted: bool,
        order: i32,
    ) -> AppResult<Self> {
        Ok(Self {
            key: Slug::new(key)?,
            group: NonEmptyString::new(group)?,
            label: NonEmptyString::new(label)?,
            description: description.filter(|text| !text.trim().is_empty()),
            setting_type,
            value,
            default_value,
            options,
            is_public,
            is_encrypted,
            order,
        })
    }

    /// Returns the unique setting key.
    #[must_use]
    pub fn key(&self) -> &Slug {
        &self.key
    }

    /// Returns the display group.
    #[must_use]
    pub fn group(&self) -> &str {
        self.group.as_str()
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the declared value type.
    #[must_use]
    pub fn setting_type(&self) -> SettingType {
        self.setting_type
    }

    /// Returns the raw stored value, if any.
    #[must_use]
    pub fn raw_value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns the raw default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Returns the option list for select/multiselect entries.
    #[must_use]
    pub fn options(&self) -> Option<&Value> {
        self.options.as_ref()
    }

    /// Returns whether the value is exposed without authentication.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// Returns whether the value is encrypted at rest.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.is_encrypted
    }

    /// Returns the display sort order within the group.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Replaces the raw stored value.
    pub fn set_raw_value(&mut self, value: Option<String>) {
        self.value = value;
    }

    /// Coerces the stored value (falling back to the default) into a typed
    /// JSON value.
    ///
    /// `plaintext` overrides the stored value for encrypted entries that
    /// were decrypted by the caller.
    pub fn typed_value(&self, plaintext: Option<&str>) -> AppResult<Value> {
        let raw = plaintext
            .or(self.value.as_deref())
            .or(self.default_value.as_deref());

        let Some(raw) = raw else {
            return Ok(Value::Null);
        };

        coerce(self.setting_type, raw)
    }
}

fn coerce(setting_type: SettingType, raw: &str) -> AppResult<Value> {
    match setting_type {
        SettingType::Text | SettingType::Select | SettingType::Color | SettingType::File => {
            Ok(Value::String(raw.to_owned()))
        }
        SettingType::Boolean => Ok(Value::Bool(parse_boolean(raw))),
        SettingType::Number => parse_number(raw),
        SettingType::Json => serde_json::from_str(raw).map_err(|error| {
            AppError::Validation(format!("setting value is not valid JSON: {error}"))
        }),
        SettingType::Multiselect => Ok(parse_multiselect(raw)),
    }
}

fn parse_boolean(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

fn parse_number(raw: &str) -> AppResult<Value> {
    let trimmed = raw.trim();

    if let Ok(integer) = trimmed.parse::<i64>() {
        return Ok(Value::from(integer));
    }

    let float = trimmed.parse::<f64>().map_err(|_| {
        AppError::Validation(format!("setting value '{trimmed}' is not a number"))
    })?;

    serde_json::Number::from_f64(float)
        .map(Value::Number)
        .ok_or_else(|| AppError::Validation(format!("setting value '{trimmed}' is not finite")))
}

fn parse_multiselect(raw: &str) -> Value {
    // Accept either a stored JSON array or a legacy comma-separated list.
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) {
        return Value::Array(items);
    }

    Value::Array(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_owned()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::{Value, json};

    use super::{Setting, SettingType};

    fn setting(setting_type: SettingType, value: Option<&str>, default: Option<&str>) -> Setting {
        Setting::new(
            "app_name",
            "general",
            "Application name",
            None,
            setting_type,
            value.map(str::to_owned),
            default.map(str::to_owned),
            None,
            true,
            false,
            0,
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn boolean_coercion_accepts_common_truthy_forms() {
        for raw in ["1", "true", "on", "YES"] {
            let result = setting(SettingType::Boolean, Some(raw), None).typed_value(None);
            assert!(result.is_ok_and(|value| value == Value::Bool(true)), "{raw}");
        }

        let result = setting(SettingType::Boolean, Some("0"), None).typed_value(None);
        assert!(result.is_ok_and(|value| value == Value::Bool(false)));
    }

    #[test]
    fn number_coercion_prefers_integers() {
        let result = setting(SettingType::Number, Some("42"), None).typed_value(None);
        assert!(result.is_ok_and(|value| value == json!(42)));

        let result = setting(SettingType::Number, Some("2.5"), None).typed_value(None);
        assert!(result.is_ok_and(|value| value == json!(2.5)));

        let result = setting(SettingType::Number, Some("not-a-number"), None).typed_value(None);
        assert!(result.is_err());
    }

    #[test]
    fn multiselect_splits_comma_separated_values() {
        let result = setting(SettingType::Multiselect, Some("fr, en ,km"), None).typed_value(None);
        assert!(result.is_ok_and(|value| value == json!(["fr", "en", "km"])));
    }

    #[test]
    fn multiselect_accepts_json_arrays() {
        let result =
            setting(SettingType::Multiselect, Some(r#"["fr","en"]"#), None).typed_value(None);
        assert!(result.is_ok_and(|value| value == json!(["fr", "en"])));
    }

    #[test]
    fn missing_value_falls_back_to_default() {
        let result = setting(SettingType::Text, None, Some("CamboAdmin")).typed_value(None);
        assert!(result.is_ok_and(|value| value == json!("CamboAdmin")));

        let result = setting(SettingType::Text, None, None).typed_value(None);
        assert!(result.is_ok_and(|value| value == Value::Null));
    }

    #[test]
    fn plaintext_overrides_stored_ciphertext() {
        let entry = setting(SettingType::Text, Some("ciphertext-blob"), None);
        let result = entry.typed_value(Some("decrypted"));
        assert!(result.is_ok_and(|value| value == json!("decrypted")));
    }

    proptest! {
        #[test]
        fn integer_values_coerce_losslessly(number in proptest::num::i64::ANY) {
            let raw = number.to_string();
            let entry = setting(SettingType::Number, Some(raw.as_str()), None);
            prop_assert!(entry.typed_value(None).is_ok_and(|value| value == Value::from(number)));
        }
    }
}
