use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tracing::warn;

/// The guided-form key/value mapping a single compile works from. Rebuilt
/// from scratch on every compile, insertion-ordered.
pub type GuidedProperties = Map<String, Value>;

/// Per-field type hint declared by the host form. `Checkbox` carries its
/// checked state; `Boolean` additionally accepts yes/true/on text values
/// (useful for `<select>` style fields with no input type of their own).
#[derive(
    Serialize, Deserialize, Display, EnumString, Debug, Clone, Copy, Eq, PartialEq,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TypeHint {
    Number,
    Boolean,
    Checkbox,
    Text,
    Textarea,
    Hidden,
}

/// Raw value captured from a form field: free text, or the checked state of
/// a checkbox-like control.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Checked(bool),
}

/// A named form field with its declared type hint and raw value, produced by
/// the host UI layer. The encoder never inspects a live widget.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub hint: TypeHint,
    pub value: RawValue,
}

impl FieldDescriptor {
    pub fn new(name: &str, hint: TypeHint, value: RawValue) -> Self {
        Self {
            name: name.to_string(),
            hint,
            value,
        }
    }

    /// A plain text field.
    pub fn text(name: &str, value: &str) -> Self {
        Self::new(name, TypeHint::Text, RawValue::Text(value.to_string()))
    }

    /// A numeric field holding its raw (unparsed) text.
    pub fn number(name: &str, value: &str) -> Self {
        Self::new(name, TypeHint::Number, RawValue::Text(value.to_string()))
    }

    /// A checkbox field.
    pub fn checkbox(name: &str, checked: bool) -> Self {
        Self::new(name, TypeHint::Checkbox, RawValue::Checked(checked))
    }
}

/// Encode a list of form fields into typed JSON properties.
///
/// Numeric fields left empty are absent rather than zero; a present but
/// unparsable numeric value falls back to 0 with a warning. Boolean and
/// checkbox fields only appear when true. Text fields only appear when
/// non-empty. A later field with the same name overrides an earlier one.
pub fn encode_fields(fields: &[FieldDescriptor]) -> GuidedProperties {
    let mut props = GuidedProperties::new();
    for field in fields {
        match encode_field(field) {
            Some(value) => {
                props.insert(field.name.clone(), value);
            }
            None => {
                props.remove(&field.name);
            }
        }
    }
    props
}

fn encode_field(field: &FieldDescriptor) -> Option<Value> {
    match field.hint {
        TypeHint::Number => match &field.value {
            RawValue::Text(raw) if raw.trim().is_empty() => None,
            RawValue::Text(raw) => {
                let parsed = match raw.trim().parse::<i64>() {
                    Ok(number) => number,
                    Err(err) => {
                        warn!(
                            "failed parsing number for \"{}\": {}, substituting 0",
                            field.name, err
                        );
                        0
                    }
                };
                Some(Value::from(parsed))
            }
            RawValue::Checked(_) => None,
        },
        TypeHint::Boolean => {
            let truthy = match &field.value {
                RawValue::Checked(checked) => *checked,
                RawValue::Text(raw) => {
                    matches!(raw.to_lowercase().as_str(), "yes" | "true" | "on")
                }
            };
            truthy.then_some(Value::Bool(true))
        }
        TypeHint::Checkbox => match &field.value {
            RawValue::Checked(true) => Some(Value::Bool(true)),
            _ => None,
        },
        TypeHint::Text | TypeHint::Textarea | TypeHint::Hidden => match &field.value {
            RawValue::Text(raw) if !raw.is_empty() => Some(Value::String(raw.clone())),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_number_is_absent() {
        let props = encode_fields(&[FieldDescriptor::number("ram", "")]);
        assert!(!props.contains_key("ram"));
    }

    #[test]
    fn test_zero_number_is_preserved() {
        let props = encode_fields(&[FieldDescriptor::number("cpu_cap", "0")]);
        assert_eq!(props.get("cpu_cap"), Some(&json!(0)));
    }

    #[test]
    fn test_unparsable_number_falls_back_to_zero() {
        let props = encode_fields(&[FieldDescriptor::number("ram", "lots")]);
        assert_eq!(props.get("ram"), Some(&json!(0)));
    }

    #[test]
    fn test_number_parses_base_ten() {
        let props = encode_fields(&[FieldDescriptor::number("ram", " 1024 ")]);
        assert_eq!(props.get("ram"), Some(&json!(1024)));
    }

    #[test]
    fn test_boolean_text_values() {
        for raw in ["yes", "TRUE", "on", "Yes"] {
            let field =
                FieldDescriptor::new("autoboot", TypeHint::Boolean, RawValue::Text(raw.into()));
            let props = encode_fields(&[field]);
            assert_eq!(props.get("autoboot"), Some(&json!(true)), "raw {:?}", raw);
        }
        let field =
            FieldDescriptor::new("autoboot", TypeHint::Boolean, RawValue::Text("no".into()));
        let props = encode_fields(&[field]);
        assert!(!props.contains_key("autoboot"));
    }

    #[test]
    fn test_unchecked_checkbox_is_absent() {
        let props = encode_fields(&[
            FieldDescriptor::checkbox("firewall_enabled", false),
            FieldDescriptor::checkbox("delegate_dataset", true),
        ]);
        assert!(!props.contains_key("firewall_enabled"));
        assert_eq!(props.get("delegate_dataset"), Some(&json!(true)));
    }

    #[test]
    fn test_empty_text_is_absent() {
        let props = encode_fields(&[
            FieldDescriptor::text("alias", ""),
            FieldDescriptor::text("brand", "joyent"),
        ]);
        assert!(!props.contains_key("alias"));
        assert_eq!(props.get("brand"), Some(&json!("joyent")));
    }

    #[test]
    fn test_later_field_overrides_earlier() {
        let props = encode_fields(&[
            FieldDescriptor::text("alias", "one"),
            FieldDescriptor::text("alias", "two"),
        ]);
        assert_eq!(props.get("alias"), Some(&json!("two")));
    }

    #[test]
    fn test_later_empty_field_removes_earlier() {
        let props = encode_fields(&[
            FieldDescriptor::text("alias", "one"),
            FieldDescriptor::text("alias", ""),
        ]);
        assert!(!props.contains_key("alias"));
    }
}
