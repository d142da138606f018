//! Table and field definitions plus the typed value that crosses the
//! persistence boundary. Pure data; statement text is produced by
//! [`crate::db::sql`] and typed structs never leak these maps into
//! business logic.

use bigdecimal::BigDecimal;
use std::collections::HashMap;

/// Closed set of column types the SQL generator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Varchar,
    Integer,
    Decimal,
    Timestamp,
    Text,
}

/// One column: name, type, length/precision and the flags the generator
/// turns into key clauses. Integer primary keys are auto-incrementing.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub field_type: FieldType,
    pub len: Option<&'static str>,
    pub default: Option<&'static str>,
    pub nullable: bool,
    pub primary_key: bool,
    pub indexed: bool,
}

impl FieldDef {
    pub fn new(name: &'static str, field_type: FieldType, len: &'static str) -> Self {
        FieldDef {
            name,
            field_type,
            len: Some(len),
            default: None,
            nullable: true,
            primary_key: false,
            indexed: false,
        }
    }

    /// Column without a length suffix (timestamp, text).
    pub fn unsized_field(name: &'static str, field_type: FieldType) -> Self {
        FieldDef {
            name,
            field_type,
            len: None,
            default: None,
            nullable: true,
            primary_key: false,
            indexed: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// Ordered list of fields making up one table, plus any multi-column
/// uniqueness constraints enforced at the storage layer.
#[derive(Debug, Clone)]
pub struct TableDef {
    name: String,
    fields: Vec<FieldDef>,
    unique_keys: Vec<Vec<&'static str>>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        TableDef {
            name: name.into(),
            fields: Vec::new(),
            unique_keys: Vec::new(),
        }
    }

    pub fn field(mut self, f: FieldDef) -> Self {
        self.fields.push(f);
        self
    }

    /// Declare a composite UNIQUE KEY over the named columns.
    pub fn unique(mut self, columns: &[&'static str]) -> Self {
        self.unique_keys.push(columns.to_vec());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn unique_keys(&self) -> &[Vec<&'static str>] {
        &self.unique_keys
    }

    pub fn primary_key_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }
}

/// Typed column value at the serialization edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Decimal(BigDecimal),
}

impl Value {
    pub fn from_opt_text(v: Option<&str>) -> Value {
        match v {
            Some(s) if !s.is_empty() => Value::Text(s.to_string()),
            _ => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Field-name → value map handed to the generator and returned from row
/// decoding. Lookups coerce between numeric variants so a store that hands
/// back an integer literal for a decimal column still decodes.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    values: HashMap<String, Value>,
}

impl FieldMap {
    pub fn new() -> Self {
        FieldMap::default()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&Value::Null)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Value::Text(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::Null => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn id(&self, name: &str) -> Option<u64> {
        self.int(name).and_then(|i| u64::try_from(i).ok())
    }

    pub fn decimal(&self, name: &str) -> Option<BigDecimal> {
        match self.get(name) {
            Value::Decimal(d) => Some(d.clone()),
            Value::Int(i) => Some(BigDecimal::from(*i)),
            Value::Text(s) => s.parse().ok(),
            Value::Null => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_builder_flags() {
        let t = TableDef::new("t")
            .field(FieldDef::new("id", FieldType::Integer, "11").primary_key())
            .field(FieldDef::new("oid", FieldType::Varchar, "64").not_null().indexed())
            .unique(&["oid", "xid"]);

        assert_eq!(t.name(), "t");
        assert_eq!(t.fields().len(), 2);
        let pk = t.primary_key_field().unwrap();
        assert_eq!(pk.name, "id");
        assert!(!pk.nullable);
        assert!(t.fields()[1].indexed);
        assert_eq!(t.unique_keys(), &[vec!["oid", "xid"]]);
    }

    #[test]
    fn test_field_map_coercions() {
        let mut m = FieldMap::new();
        m.set("amount", Value::Int(100));
        m.set("status", Value::Text("2".to_string()));
        m.set("oid", Value::Text("A1".to_string()));

        assert_eq!(m.decimal("amount"), Some(BigDecimal::from(100)));
        assert_eq!(m.int("status"), Some(2));
        assert_eq!(m.text("oid").as_deref(), Some("A1"));
        assert_eq!(m.text("missing"), None);
        assert!(m.get("missing").is_null());
    }

    #[test]
    fn test_from_opt_text_treats_empty_as_null() {
        assert_eq!(Value::from_opt_text(Some("")), Value::Null);
        assert_eq!(Value::from_opt_text(None), Value::Null);
        assert_eq!(
            Value::from_opt_text(Some("x")),
            Value::Text("x".to_string())
        );
        let d = BigDecimal::from_str("100.00").unwrap();
        assert_eq!(Value::Decimal(d.clone()), Value::Decimal(d));
    }
}
