//! Runtime validation of dynamic form submissions.
//!
//! A submission is a flat JSON object keyed by field key. Validation is a single
//! pass over the variant's fields with one match over the primitive field type;
//! every problem is collected so clients can highlight all fields at once.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use models::form_field::{self, FieldType};

use crate::errors::FieldError;

/// Field definition as the validator sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub options: Vec<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldSpec {
    pub fn new(key: &str, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            label: key.into(),
            field_type,
            required: false,
            options: Vec::new(),
            min: None,
            max: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }
}

impl TryFrom<&form_field::Model> for FieldSpec {
    type Error = models::errors::ModelError;

    fn try_from(m: &form_field::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            key: m.key.clone(),
            label: m.label.clone(),
            field_type: m.field_type()?,
            required: m.required,
            options: m.option_values(),
            min: m.min,
            max: m.max,
        })
    }
}

fn fmt_bound(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

fn check_range(value: f64, min: Option<f64>, max: Option<f64>, unit: &str) -> Result<(), String> {
    if let Some(lo) = min {
        if value < lo {
            return Err(format!("must be at least {}{unit}", fmt_bound(lo)));
        }
    }
    if let Some(hi) = max {
        if value > hi {
            return Err(format!("must be at most {}{unit}", fmt_bound(hi)));
        }
    }
    Ok(())
}

/// Null and blank strings count as not submitted.
fn is_absent(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_empty_array(v: &Value) -> bool {
    matches!(v, Value::Array(a) if a.is_empty())
}

/// Largest magnitude an f64 holds with every whole number exact.
const MAX_EXACT_F64: f64 = 9_007_199_254_740_992.0;

fn is_email(s: &str) -> bool {
    let mut parts = s.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !s.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn is_url(s: &str) -> bool {
    let rest = s.strip_prefix("https://").or_else(|| s.strip_prefix("http://"));
    matches!(rest, Some(r) if !r.is_empty() && !r.chars().any(char::is_whitespace))
}

/// Check one present, non-blank value and return its normalized form.
fn check_value(field: &FieldSpec, value: &Value) -> Result<Value, String> {
    match field.field_type {
        FieldType::Text | FieldType::Textarea => {
            let s = value.as_str().ok_or("must be a string")?.trim();
            check_range(s.chars().count() as f64, field.min, field.max, " characters")?;
            Ok(Value::String(s.to_string()))
        }
        FieldType::Number => {
            let n = value.as_f64().ok_or("must be a number")?;
            check_range(n, field.min, field.max, "")?;
            Ok(value.clone())
        }
        FieldType::Integer => {
            let n = value.as_f64().ok_or("must be an integer")?;
            if n.fract() != 0.0 {
                return Err("must be an integer".into());
            }
            let whole = match value.as_i64() {
                Some(i) => i,
                None if value.as_u64().is_none() && n.abs() <= MAX_EXACT_F64 => n as i64,
                None => return Err("is out of the supported integer range".into()),
            };
            check_range(n, field.min, field.max, "")?;
            Ok(Value::Number(Number::from(whole)))
        }
        FieldType::Boolean => {
            value.as_bool().ok_or("must be true or false")?;
            Ok(value.clone())
        }
        FieldType::Date => {
            const BAD_DATE: &str = "must be a date formatted YYYY-MM-DD";
            let s = value.as_str().ok_or("must be a date string")?.trim();
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| BAD_DATE)?;
            if s.len() != 10 || date.format("%Y-%m-%d").to_string() != s {
                return Err(BAD_DATE.into());
            }
            Ok(Value::String(s.to_string()))
        }
        FieldType::Email => {
            let s = value.as_str().ok_or("must be a string")?.trim();
            if !is_email(s) {
                return Err("must be a valid email address".into());
            }
            Ok(Value::String(s.to_string()))
        }
        FieldType::Url => {
            let s = value.as_str().ok_or("must be a string")?.trim();
            if !is_url(s) {
                return Err("must be an http(s) URL".into());
            }
            Ok(Value::String(s.to_string()))
        }
        FieldType::Select => {
            let s = value.as_str().ok_or("must be a string")?;
            if !field.options.iter().any(|o| o == s) {
                return Err(format!("must be one of: {}", field.options.join(", ")));
            }
            Ok(Value::String(s.to_string()))
        }
        FieldType::Multiselect => {
            let arr = value.as_array().ok_or("must be an array of options")?;
            let mut picked: Vec<&str> = Vec::with_capacity(arr.len());
            for item in arr {
                let s = item.as_str().ok_or("must contain only strings")?;
                if !field.options.iter().any(|o| o == s) {
                    return Err(format!("'{s}' is not one of: {}", field.options.join(", ")));
                }
                if picked.contains(&s) {
                    return Err(format!("'{s}' selected more than once"));
                }
                picked.push(s);
            }
            check_range(picked.len() as f64, field.min, field.max, " selections")?;
            Ok(Value::Array(picked.into_iter().map(|s| Value::String(s.to_string())).collect()))
        }
    }
}

/// Validate `values` against `fields`.
///
/// Returns the normalized submission (strings trimmed, absent optional fields
/// omitted) or every field error found. `null` is treated as an empty submission.
pub fn validate_submission(
    fields: &[FieldSpec],
    values: &Value,
) -> Result<Map<String, Value>, Vec<FieldError>> {
    let empty = Map::new();
    let obj = match values {
        Value::Object(m) => m,
        Value::Null => &empty,
        _ => return Err(vec![FieldError::new("form_data", "must be a JSON object")]),
    };

    let mut errors = Vec::new();
    for key in obj.keys() {
        if !fields.iter().any(|f| &f.key == key) {
            errors.push(FieldError::new(key.as_str(), "unknown field"));
        }
    }

    let mut out = Map::new();
    for field in fields {
        match obj.get(&field.key).filter(|v| !is_absent(v)) {
            Some(v) if field.required && is_empty_array(v) => {
                errors.push(FieldError::new(field.key.as_str(), "required"));
            }
            Some(v) => match check_value(field, v) {
                Ok(normalized) => {
                    out.insert(field.key.clone(), normalized);
                }
                Err(msg) => errors.push(FieldError::new(field.key.as_str(), msg)),
            },
            None if field.required => errors.push(FieldError::new(field.key.as_str(), "required")),
            None => {}
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}
