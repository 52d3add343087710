//! Generic payload validation driven by a [`Schema`] table
//!
//! Both entry points are all-or-nothing: every problem in the payload is
//! collected and returned together, and nothing is returned for storage
//! unless the whole payload is clean.

use serde_json::{Number, Value};

use super::{Access, Document, FieldError, FieldKind, FieldSpec, Schema, TextCase, ValidationError};

/// Why an update payload was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The update object carried no fields at all
    #[error("No fields provided for update")]
    EmptyUpdate,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Validate and normalize a creation payload.
///
/// Unknown, read-only and derived fields are rejected; required fields
/// must be present; optional fields with a default receive it. The result
/// holds only writable fields; the caller adds identity and timestamps.
pub fn validate_create(schema: &Schema, payload: &Value) -> Result<Document, ValidationError> {
    let object = as_object(payload)?;
    let mut errors = ValidationError::default();
    let mut document = Document::new();

    for (name, value) in object {
        let Some(spec) = writable_field(schema, name, &mut errors) else {
            continue;
        };
        match normalize(spec, value) {
            Ok(Some(v)) => {
                document.insert(name.clone(), v);
            }
            // blank optional text and explicit nulls count as absent
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }

    for spec in schema.fields.iter().filter(|f| f.is_writable()) {
        if document.contains_key(spec.name) {
            continue;
        }
        if let Some(default) = spec.default {
            document.insert(spec.name.to_string(), default());
        } else if spec.required && !errors.errors.iter().any(|e| e.field == spec.name) {
            errors.push(FieldError::new(spec.name, "missing", "field is required"));
        }
    }

    errors.into_result(document)
}

/// Validate and normalize a partial update.
///
/// Only supplied fields are checked. In the returned patch, `Value::Null`
/// marks an optional field the client cleared.
pub fn validate_update(schema: &Schema, payload: &Value) -> Result<Document, PayloadError> {
    let object = as_object(payload)?;
    if object.is_empty() {
        return Err(PayloadError::EmptyUpdate);
    }

    let mut errors = ValidationError::default();
    let mut patch = Document::new();

    for (name, value) in object {
        let Some(spec) = writable_field(schema, name, &mut errors) else {
            continue;
        };
        match normalize(spec, value) {
            Ok(Some(v)) => {
                patch.insert(name.clone(), v);
            }
            Ok(None) if spec.required => errors.push(FieldError::new(
                name.as_str(),
                "missing",
                "field is required and cannot be cleared",
            )),
            Ok(None) => {
                patch.insert(name.clone(), Value::Null);
            }
            Err(e) => errors.push(e),
        }
    }

    Ok(errors.into_result(patch)?)
}

fn as_object(payload: &Value) -> Result<&serde_json::Map<String, Value>, ValidationError> {
    payload
        .as_object()
        .ok_or_else(|| ValidationError::single("body", "not_an_object", "request body must be a JSON object"))
}

/// Look up a client-supplied field name, recording why it is refused
fn writable_field<'s>(schema: &'s Schema, name: &str, errors: &mut ValidationError) -> Option<&'s FieldSpec> {
    match schema.field(name) {
        None => {
            errors.push(FieldError::new(name, "unknown_field", "is not a recognised field"));
            None
        }
        Some(spec) => match spec.access {
            Access::Writable => Some(spec),
            Access::ReadOnly => {
                errors.push(FieldError::new(name, "read_only", "is assigned by the server and cannot be set"));
                None
            }
            Access::Derived(_) => {
                errors.push(FieldError::new(
                    name,
                    "derived",
                    "is derived from other fields and cannot be set",
                ));
                None
            }
        },
    }
}

/// Check one value against its spec.
///
/// `Ok(None)` means "absent": JSON null, or optional text that is blank.
fn normalize(spec: &FieldSpec, value: &Value) -> Result<Option<Value>, FieldError> {
    if value.is_null() {
        return Ok(None);
    }

    match spec.kind {
        FieldKind::Text { min_len, max_len, case } => normalize_text(spec, value, min_len, max_len, case),
        FieldKind::Integer { min, max } => {
            let n = as_integer(value).ok_or_else(|| FieldError::new(spec.name, "not_an_integer", "must be an integer"))?;
            if n < min {
                return Err(FieldError::new(
                    spec.name,
                    "too_small",
                    format!("must be greater than or equal to {min}"),
                ));
            }
            if let Some(max) = max.map(|m| m.resolve()) {
                if n > max {
                    return Err(FieldError::new(
                        spec.name,
                        "too_large",
                        format!("must be less than or equal to {max}"),
                    ));
                }
            }
            Ok(Some(Value::from(n)))
        }
        FieldKind::Float {
            min,
            min_exclusive,
            max,
            decimals,
        } => {
            let raw = value
                .as_f64()
                .filter(|f| f.is_finite())
                .ok_or_else(|| FieldError::new(spec.name, "not_a_number", "must be a number"))?;
            let n = match decimals {
                Some(places) => round_to(raw, places),
                None => raw,
            };
            if let Some(min) = min {
                if min_exclusive && n <= min {
                    return Err(FieldError::new(spec.name, "too_small", format!("must be greater than {min}")));
                }
                if !min_exclusive && n < min {
                    return Err(FieldError::new(
                        spec.name,
                        "too_small",
                        format!("must be greater than or equal to {min}"),
                    ));
                }
            }
            if let Some(max) = max {
                if n > max {
                    return Err(FieldError::new(
                        spec.name,
                        "too_large",
                        format!("must be less than or equal to {max}"),
                    ));
                }
            }
            Number::from_f64(n)
                .map(|num| Some(Value::Number(num)))
                .ok_or_else(|| FieldError::new(spec.name, "not_a_number", "must be a number"))
        }
        FieldKind::Boolean => as_boolean(value)
            .map(|b| Some(Value::Bool(b)))
            .ok_or_else(|| FieldError::new(spec.name, "not_a_boolean", "must be true or false")),
        FieldKind::Timestamp => Err(FieldError::new(
            spec.name,
            "read_only",
            "is assigned by the server and cannot be set",
        )),
    }
}

fn normalize_text(
    spec: &FieldSpec,
    value: &Value,
    min_len: usize,
    max_len: usize,
    case: TextCase,
) -> Result<Option<Value>, FieldError> {
    let raw = value
        .as_str()
        .ok_or_else(|| FieldError::new(spec.name, "not_a_string", "must be a string"))?;
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        if spec.required {
            return Err(FieldError::new(spec.name, "blank", "must not be blank"));
        }
        return Ok(None);
    }

    let text = match case {
        TextCase::Preserve => trimmed.to_string(),
        TextCase::Title => title_case(trimmed),
    };

    let len = text.chars().count();
    if len < min_len {
        return Err(FieldError::new(
            spec.name,
            "too_short",
            format!("must be at least {min_len} characters"),
        ));
    }
    if len > max_len {
        return Err(FieldError::new(
            spec.name,
            "too_long",
            format!("must be at most {max_len} characters"),
        ));
    }

    Ok(Some(Value::String(text)))
}

/// Integers, and floats with no fractional part
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn as_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Uppercase every cased letter that follows an uncased character and
/// lowercase the rest. Spacing is kept as given, and letters after `'` or
/// `-` start a new word ("o'neil" becomes "O'Neil").
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_cased = false;

    for c in text.chars() {
        let cased = c.is_uppercase() || c.is_lowercase();
        if cased && after_cased {
            out.extend(c.to_lowercase());
        } else if cased {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        after_cased = cased;
    }

    out
}
