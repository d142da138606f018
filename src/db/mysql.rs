//! MySQL-backed gateway implementation. Thin by design: it runs generated
//! statement text and decodes rows; everything schema-aware lives above it.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::db::schema::{FieldMap, FieldType, TableDef, Value};
use crate::db::DbGateway;
use crate::error::Result;

pub struct MySqlGateway {
    pool: MySqlPool,
    // Pool connections make LAST_INSERT_ID() unreliable across calls, so the
    // id is captured from each execute result instead.
    last_id: AtomicU64,
}

impl MySqlGateway {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlGateway {
            pool,
            last_id: AtomicU64::new(0),
        }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(url).await?;
        Ok(MySqlGateway::new(pool))
    }
}

#[async_trait]
impl DbGateway for MySqlGateway {
    async fn execute(&self, sql: &str) -> Result<()> {
        let result = sqlx::query(sql).execute(&self.pool).await?;
        let id = result.last_insert_id();
        if id != 0 {
            self.last_id.store(id, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn rows(&self, sql: &str, table: &TableDef) -> Result<Vec<FieldMap>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        let mut maps = Vec::with_capacity(rows.len());
        for row in rows {
            let mut map = FieldMap::new();
            for f in table.fields() {
                let value = match f.field_type {
                    FieldType::Varchar | FieldType::Text => {
                        let v: Option<String> = row.try_get(f.name)?;
                        v.map(Value::Text).unwrap_or(Value::Null)
                    }
                    FieldType::Integer => {
                        let v: Option<i64> = row.try_get(f.name)?;
                        v.map(Value::Int).unwrap_or(Value::Null)
                    }
                    FieldType::Decimal => {
                        let v: Option<BigDecimal> = row.try_get(f.name)?;
                        v.map(Value::Decimal).unwrap_or(Value::Null)
                    }
                    FieldType::Timestamp => {
                        let v: Option<DateTime<Utc>> = row.try_get(f.name)?;
                        v.map(|t| Value::Text(t.format("%Y-%m-%d %H:%M:%S").to_string()))
                            .unwrap_or(Value::Null)
                    }
                };
                map.set(f.name, value);
            }
            maps.push(map);
        }
        Ok(maps)
    }

    fn escape(&self, value: &str) -> String {
        escape_mysql(value)
    }

    async fn last_insert_id(&self) -> Result<u64> {
        Ok(self.last_id.load(Ordering::SeqCst))
    }
}

/// Backslash-style escaping for MySQL string literals.
pub(crate) fn escape_mysql(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out
}
