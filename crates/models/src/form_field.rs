use std::fmt;
use std::str::FromStr;

use sea_orm::{entity::prelude::*, Set, ConnectionTrait};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors, form_variant};

/// Primitive input types understood by the submission validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Integer,
    Boolean,
    Date,
    Email,
    Url,
    Select,
    Multiselect,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Select => "select",
            FieldType::Multiselect => "multiselect",
        }
    }

    pub fn has_options(&self) -> bool { matches!(self, FieldType::Select | FieldType::Multiselect) }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FieldType {
    type Err = errors::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "number" => FieldType::Number,
            "integer" => FieldType::Integer,
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "email" => FieldType::Email,
            "url" => FieldType::Url,
            "select" => FieldType::Select,
            "multiselect" => FieldType::Multiselect,
            other => return Err(errors::ModelError::Validation(format!("unknown field type: {other}"))),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_field")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub variant_id: Uuid,
    pub key: String,
    pub label: String,
    pub field_type: String,
    pub required: bool,
    pub position: i32,
    pub options: Option<Json>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn field_type(&self) -> Result<FieldType, errors::ModelError> { self.field_type.parse() }

    /// Option labels for select fields; empty for other types.
    pub fn option_values(&self) -> Vec<String> {
        self.options
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|o| o.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Variant }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Variant => Entity::belongs_to(form_variant::Entity)
                .from(Column::VariantId)
                .to(form_variant::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Keys are the JSON property names of a submission: `[a-z0-9_]+`, at most 64 chars.
pub fn validate_key(key: &str) -> Result<(), errors::ModelError> {
    if key.is_empty() || key.len() > 64 {
        return Err(errors::ModelError::Validation("field key must be 1..=64 chars".into()));
    }
    if !key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(errors::ModelError::Validation("field key must match [a-z0-9_]+".into()));
    }
    Ok(())
}

pub fn validate_label(label: &str) -> Result<(), errors::ModelError> {
    if label.trim().is_empty() { return Err(errors::ModelError::Validation("field label required".into())); }
    if label.len() > 255 { return Err(errors::ModelError::Validation("field label too long (<=255)".into())); }
    Ok(())
}

/// Check a field definition is self-consistent before it is stored.
pub fn validate_definition(
    field_type: FieldType,
    options: &[String],
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), errors::ModelError> {
    if field_type.has_options() {
        if options.is_empty() {
            return Err(errors::ModelError::Validation(format!("{field_type} field requires at least one option")));
        }
        let mut seen = std::collections::HashSet::new();
        for o in options {
            if o.trim().is_empty() {
                return Err(errors::ModelError::Validation("options must not be empty strings".into()));
            }
            if !seen.insert(o.as_str()) {
                return Err(errors::ModelError::Validation(format!("duplicate option: {o}")));
            }
        }
    } else if !options.is_empty() {
        return Err(errors::ModelError::Validation(format!("{field_type} field does not take options")));
    }
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi { return Err(errors::ModelError::Validation("min must be <= max".into())); }
    }
    let counts = matches!(field_type, FieldType::Text | FieldType::Textarea | FieldType::Multiselect);
    if counts && (min.is_some_and(|v| v < 0.0) || max.is_some_and(|v| v < 0.0)) {
        return Err(errors::ModelError::Validation("length bounds must be non-negative".into()));
    }
    Ok(())
}

pub struct NewField<'a> {
    pub key: &'a str,
    pub label: &'a str,
    pub field_type: FieldType,
    pub required: bool,
    pub position: i32,
    pub options: Vec<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    variant_id: Uuid,
    f: NewField<'_>,
) -> Result<Model, errors::ModelError> {
    validate_key(f.key)?;
    validate_label(f.label)?;
    validate_definition(f.field_type, &f.options, f.min, f.max)?;
    let now = Utc::now().into();
    let options = if f.field_type.has_options() { Some(serde_json::json!(f.options)) } else { None };
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        variant_id: Set(variant_id),
        key: Set(f.key.to_string()),
        label: Set(f.label.trim().to_string()),
        field_type: Set(f.field_type.as_str().to_string()),
        required: Set(f.required),
        position: Set(f.position),
        options: Set(options),
        min: Set(f.min),
        max: Set(f.max),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(errors::ModelError::from)
}
