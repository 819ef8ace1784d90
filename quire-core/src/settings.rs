//! Inline `key=value` settings and the schemas that validate them.
//!
//! Reader components declare a [`Schema`]; the text captured by a pattern's
//! `settings` group is parsed against it. Extensions use the same machinery
//! for their YAML configuration blocks.

use crate::error::SettingsError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Start of a `key=` pair. Values run until the next key or the end of the text.
static KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)(?P<key>[^\s=]+)=").expect("valid settings regex"));

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Convert raw settings text: `true`/`false`, `none`, integers, floats, else a string
    pub fn parse(raw: &str) -> Value {
        match raw {
            "true" | "True" => Value::Bool(true),
            "false" | "False" => Value::Bool(false),
            "none" | "None" => Value::Null,
            _ => {
                if let Ok(i) = raw.parse::<i64>() {
                    Value::Int(i)
                } else if let Ok(f) = raw.parse::<f64>() {
                    Value::Float(f)
                } else {
                    Value::Str(raw.to_string())
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn from_yaml(value: &serde_yaml::Value) -> Option<Value> {
        match value {
            serde_yaml::Value::Null => Some(Value::Null),
            serde_yaml::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_yaml::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float)),
            serde_yaml::Value::String(s) => Some(Value::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Option<&str>> for Value {
    fn from(s: Option<&str>) -> Self {
        s.map(Value::from).unwrap_or(Value::Null)
    }
}

/// Expected type of a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Any,
    Str,
    Int,
    Float,
    Bool,
}

impl Kind {
    fn name(&self) -> &'static str {
        match self {
            Kind::Any => "any value",
            Kind::Str => "a string",
            Kind::Int => "an integer",
            Kind::Float => "a number",
            Kind::Bool => "true or false",
        }
    }

    /// Coerce raw inline text; strings keep the text exactly as written
    fn coerce_text(&self, key: &str, raw: &str) -> Result<Value, SettingsError> {
        let parsed = Value::parse(raw);
        if parsed.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Kind::Str => Ok(Value::Str(raw.to_string())),
            _ => self.check(key, parsed),
        }
    }

    fn check(&self, key: &str, value: Value) -> Result<Value, SettingsError> {
        let ok = match (self, &value) {
            (_, Value::Null) | (Kind::Any, _) => true,
            (Kind::Str, Value::Str(_)) => true,
            (Kind::Int, Value::Int(_)) => true,
            (Kind::Float, Value::Int(_) | Value::Float(_)) => true,
            (Kind::Bool, Value::Bool(_)) => true,
            _ => false,
        };
        if ok {
            return Ok(value);
        }
        // Numbers and booleans are acceptable spellings of a string
        if let (Kind::Str, Value::Int(_) | Value::Float(_) | Value::Bool(_)) = (self, &value) {
            return Ok(Value::Str(value.to_string()));
        }
        Err(SettingsError::TypeMismatch {
            key: key.to_string(),
            expected: self.name(),
            found: value.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingSpec {
    pub name: String,
    pub kind: Kind,
    pub default: Value,
    pub required: bool,
    pub description: String,
}

impl SettingSpec {
    pub fn new(
        name: impl Into<String>,
        kind: Kind,
        default: impl Into<Value>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            default: default.into(),
            required: false,
            description: description.into(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Ordered set of recognized settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    specs: Vec<SettingSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `id`, `class` and `style` settings every reader component accepts
    pub fn attributes() -> Self {
        Self::new()
            .with(SettingSpec::new("id", Kind::Str, Value::Null, "The object id."))
            .with(SettingSpec::new("class", Kind::Str, Value::Null, "The object class."))
            .with(SettingSpec::new("style", Kind::Str, Value::Null, "The object style."))
    }

    /// Add or replace a setting
    pub fn with(mut self, spec: SettingSpec) -> Self {
        match self.specs.iter_mut().find(|s| s.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&SettingSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettingSpec> {
        self.specs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn defaults(&self) -> Settings {
        Settings {
            values: self
                .specs
                .iter()
                .map(|s| (s.name.clone(), s.default.clone()))
                .collect(),
        }
    }

    /// Parse inline `key=value` text against this schema
    pub fn parse(&self, raw: &str) -> Result<Settings, SettingsError> {
        let mut settings = self.defaults();
        let mut supplied = Vec::new();

        let keys: Vec<_> = KEY_RE.captures_iter(raw).collect();
        let leading = match keys.first().and_then(|c| c.get(0)) {
            Some(first) => &raw[..first.start()],
            None => raw,
        };
        if !leading.trim().is_empty() {
            return Err(SettingsError::Malformed(leading.trim().to_string()));
        }

        for (i, caps) in keys.iter().enumerate() {
            let (Some(whole), Some(key)) = (caps.get(0), caps.name("key")) else {
                continue;
            };
            let end = keys
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(raw.len());
            let text = raw[whole.end()..end].trim();

            let spec = self.lookup(key.as_str())?;
            let value = spec.kind.coerce_text(&spec.name, text)?;
            settings.insert(&spec.name, value);
            supplied.push(spec.name.as_str());
        }

        self.check_required(&settings, &supplied)?;
        Ok(settings)
    }

    /// Validate a YAML mapping (extension configuration) against this schema
    pub fn apply_yaml(&self, map: &serde_yaml::Mapping) -> Result<Settings, SettingsError> {
        let mut settings = self.defaults();
        let mut supplied = Vec::new();

        for (key, value) in map {
            let key = match key.as_str() {
                Some(key) => key,
                None => return Err(SettingsError::Malformed(format!("{:?}", key))),
            };
            let spec = self.lookup(key)?;
            let value = Value::from_yaml(value).ok_or_else(|| SettingsError::TypeMismatch {
                key: key.to_string(),
                expected: spec.kind.name(),
                found: "a nested value".to_string(),
            })?;
            settings.insert(&spec.name, spec.kind.check(key, value)?);
            supplied.push(spec.name.as_str());
        }

        self.check_required(&settings, &supplied)?;
        Ok(settings)
    }

    fn lookup(&self, key: &str) -> Result<&SettingSpec, SettingsError> {
        self.get(key).ok_or_else(|| SettingsError::UnknownKey {
            key: key.to_string(),
            known: self
                .specs
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    fn check_required(&self, settings: &Settings, supplied: &[&str]) -> Result<(), SettingsError> {
        for spec in self.specs.iter().filter(|s| s.required) {
            let present = supplied.contains(&spec.name.as_str())
                && !settings.get(&spec.name).map(Value::is_null).unwrap_or(true);
            if !present {
                return Err(SettingsError::MissingRequired(spec.name.clone()));
            }
        }
        Ok(())
    }
}

/// Validated settings for one component invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    values: Vec<(String, Value)>,
}

impl Settings {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// String value, `None` when unset or null
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        match self.values.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.values.push((key.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_schema() -> Schema {
        Schema::attributes()
            .with(SettingSpec::new("language", Kind::Str, "text", "Code language."))
            .with(SettingSpec::new("caption", Kind::Str, Value::Null, "Caption text."))
            .with(SettingSpec::new("line", Kind::Int, 1_i64, "First line number."))
            .with(SettingSpec::new("numbered", Kind::Bool, false, "Show numbers."))
    }

    #[test]
    fn test_values_may_contain_spaces() {
        let settings = code_schema()
            .parse("language=rust caption=A short example numbered=true")
            .unwrap();

        assert_eq!(settings.str("language"), Some("rust"));
        assert_eq!(settings.str("caption"), Some("A short example"));
        assert_eq!(settings.bool("numbered"), Some(true));
        assert_eq!(settings.int("line"), Some(1));
        assert_eq!(settings.str("id"), None);
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(Value::parse("true"), Value::Bool(true));
        assert_eq!(Value::parse("none"), Value::Null);
        assert_eq!(Value::parse("42"), Value::Int(42));
        assert_eq!(Value::parse("2.5"), Value::Float(2.5));
        assert_eq!(Value::parse("x y"), Value::Str("x y".into()));
    }

    #[test]
    fn test_string_settings_keep_text() {
        let settings = code_schema().parse("caption=42 id=none").unwrap();
        assert_eq!(settings.str("caption"), Some("42"));
        assert_eq!(settings.get("id"), Some(&Value::Null));
    }

    #[test]
    fn test_unknown_key_is_reported() {
        let err = code_schema().parse("language=c colour=red").unwrap_err();
        assert!(matches!(err, SettingsError::UnknownKey { ref key, .. } if key == "colour"));
    }

    #[test]
    fn test_type_mismatch() {
        let err = code_schema().parse("line=first").unwrap_err();
        assert_eq!(
            err,
            SettingsError::TypeMismatch {
                key: "line".into(),
                expected: "an integer",
                found: "first".into(),
            }
        );
    }

    #[test]
    fn test_required() {
        let schema =
            Schema::new().with(SettingSpec::new("prefix", Kind::Str, Value::Null, "").required());
        assert_eq!(
            schema.parse(""),
            Err(SettingsError::MissingRequired("prefix".into()))
        );
        assert_eq!(schema.parse("prefix=Table").unwrap().str("prefix"), Some("Table"));
    }

    #[test]
    fn test_malformed_leading_text() {
        let err = code_schema().parse("rust caption=x").unwrap_err();
        assert_eq!(err, SettingsError::Malformed("rust".into()));
    }

    #[test]
    fn test_apply_yaml() {
        let schema = Schema::new()
            .with(SettingSpec::new("smart_punctuation", Kind::Bool, true, ""))
            .with(SettingSpec::new("ratio", Kind::Float, 1.0_f64, ""));
        let map: serde_yaml::Mapping =
            serde_yaml::from_str("smart_punctuation: false\nratio: 2").unwrap();

        let settings = schema.apply_yaml(&map).unwrap();
        assert_eq!(settings.bool("smart_punctuation"), Some(false));
        assert_eq!(settings.get("ratio"), Some(&Value::Int(2)));

        let bad: serde_yaml::Mapping = serde_yaml::from_str("smart_punctuation: [1]").unwrap();
        assert!(matches!(
            schema.apply_yaml(&bad),
            Err(SettingsError::TypeMismatch { .. })
        ));
    }
}
