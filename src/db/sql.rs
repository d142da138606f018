//! Statement-text generation from table definitions.
//!
//! Stateless: value escaping is injected by the owning gateway, so the same
//! generator serves every transport. Errors here are programmer errors
//! (mismatched value variants, missing primary key) and abort the operation.

use crate::db::schema::{FieldDef, FieldMap, FieldType, TableDef, Value};
use crate::error::{NestPayError, Result};

/// Idempotent CREATE TABLE statement for the given definition.
pub fn create_table_sql(table: &TableDef) -> String {
    let mut clauses: Vec<String> = Vec::new();

    for f in table.fields() {
        let type_text = match (f.field_type, f.len) {
            (FieldType::Varchar, Some(len)) => format!("varchar({})", len),
            (FieldType::Varchar, None) => "varchar(255)".to_string(),
            (FieldType::Integer, Some(len)) => format!("int({})", len),
            (FieldType::Integer, None) => "int(11)".to_string(),
            (FieldType::Decimal, Some(len)) => format!("decimal({})", len),
            (FieldType::Decimal, None) => "decimal(20,2)".to_string(),
            (FieldType::Timestamp, _) => "timestamp".to_string(),
            (FieldType::Text, _) => "text".to_string(),
        };

        let mut words = vec![format!("`{}`", f.name), type_text];
        words.push(if f.nullable { "NULL" } else { "NOT NULL" }.to_string());
        if let Some(default) = f.default {
            words.push(format!("DEFAULT '{}'", default));
        } else if f.nullable {
            words.push("DEFAULT NULL".to_string());
        }
        if f.primary_key {
            words.push("AUTO_INCREMENT".to_string());
        }
        clauses.push(format!("  {}", words.join(" ")));
    }

    for f in table.fields() {
        if f.primary_key {
            clauses.push(format!("  PRIMARY KEY (`{}`)", f.name));
        } else if f.indexed {
            clauses.push(format!("  KEY `{}` (`{}`)", f.name, f.name));
        }
    }

    for columns in table.unique_keys() {
        let quoted: Vec<String> = columns.iter().map(|c| format!("`{}`", c)).collect();
        clauses.push(format!(
            "  UNIQUE KEY `{}` ({})",
            columns.join("_"),
            quoted.join(", ")
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS `{}` (\n{}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8",
        table.name(),
        clauses.join(",\n")
    )
}

/// INSERT statement over all non-primary-key fields.
pub fn insert_sql(
    table: &TableDef,
    values: &FieldMap,
    escape: &dyn Fn(&str) -> String,
) -> Result<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut literals: Vec<String> = Vec::new();

    for f in table.fields() {
        if f.primary_key {
            continue;
        }
        columns.push(format!("`{}`", f.name));
        literals.push(format_value(f, values.get(f.name), escape)?);
    }

    Ok(format!(
        "INSERT INTO `{}` ({}) VALUES ({})",
        table.name(),
        columns.join(", "),
        literals.join(", ")
    ))
}

/// UPDATE statement over all non-primary-key fields, keyed on the single
/// primary-key field's value.
pub fn update_sql(
    table: &TableDef,
    values: &FieldMap,
    escape: &dyn Fn(&str) -> String,
) -> Result<String> {
    let pk = table.primary_key_field().ok_or_else(|| {
        NestPayError::Schema(format!("update on table {} without primary key", table.name()))
    })?;
    let pk_value = values.get(pk.name);
    if pk_value.is_null() {
        return Err(NestPayError::Schema(format!(
            "update on table {} without value for primary key {}",
            table.name(),
            pk.name
        )));
    }

    let mut pairs: Vec<String> = Vec::new();
    for f in table.fields() {
        if f.primary_key {
            continue;
        }
        pairs.push(format!(
            "`{}`={}",
            f.name,
            format_value(f, values.get(f.name), escape)?
        ));
    }

    Ok(format!(
        "UPDATE `{}` SET {} WHERE `{}`={}",
        table.name(),
        pairs.join(", "),
        pk.name,
        format_value(pk, pk_value, escape)?
    ))
}

/// Per-type literal formatting. Empty or unset values become SQL NULL;
/// a value variant that contradicts the declared type is a schema defect.
fn format_value(f: &FieldDef, value: &Value, escape: &dyn Fn(&str) -> String) -> Result<String> {
    match (f.field_type, value) {
        (_, Value::Null) => Ok("NULL".to_string()),
        (FieldType::Varchar | FieldType::Text | FieldType::Timestamp, Value::Text(s)) => {
            if s.is_empty() {
                Ok("NULL".to_string())
            } else {
                Ok(format!("\"{}\"", escape(s)))
            }
        }
        (FieldType::Decimal, Value::Decimal(d)) => Ok(d.to_string()),
        (FieldType::Decimal, Value::Int(i)) => Ok(i.to_string()),
        (FieldType::Integer, Value::Int(i)) => Ok(i.to_string()),
        (ty, v) => Err(NestPayError::Schema(format!(
            "field {} declared {:?} but got value {:?}",
            f.name, ty, v
        ))),
    }
}
