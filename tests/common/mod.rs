//! In-memory [`DbGateway`] used by the integration tests.
//!
//! Understands exactly the statement shapes the SQL generator and the
//! stores produce; anything else fails loudly so a changed statement shows
//! up as a test failure instead of silently matching nothing. Unique keys
//! declared on a table are enforced and surface as
//! [`NestPayError::UniqueViolation`], matching the production gateway's
//! contract.

// not every test binary uses every fixture
#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use nestpay::db::schema::{FieldMap, FieldType, TableDef, Value};
use nestpay::db::tables::Tables;
use nestpay::db::DbGateway;
use nestpay::error::{NestPayError, Result};
use nestpay::Config;

pub struct MemoryGateway {
    state: Mutex<State>,
}

struct State {
    tables: HashMap<String, TableState>,
    last_insert_id: u64,
}

struct TableState {
    def: TableDef,
    rows: Vec<FieldMap>,
    next_id: i64,
}

impl MemoryGateway {
    pub fn new(config: &Config) -> Self {
        let tables = Tables::new(config);
        let mut by_name = HashMap::new();
        for def in [
            tables.orders,
            tables.address,
            tables.items,
            tables.transactions,
        ] {
            by_name.insert(
                def.name().to_string(),
                TableState {
                    def,
                    rows: Vec::new(),
                    next_id: 1,
                },
            );
        }
        MemoryGateway {
            state: Mutex::new(State {
                tables: by_name,
                last_insert_id: 0,
            }),
        }
    }

    pub fn row_count(&self, table: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    fn table<'a>(state: &'a mut State, name: &str) -> Result<&'a mut TableState> {
        state
            .tables
            .get_mut(name)
            .ok_or_else(|| NestPayError::Database(format!("unknown table: {}", name)))
    }

    fn insert(table: &mut TableState, columns: &str, literals: &str) -> Result<u64> {
        let names: Vec<String> = columns
            .split(", ")
            .map(|c| unquote_ident(c))
            .collect::<Result<_>>()?;
        let values = split_literals(literals);
        if names.len() != values.len() {
            return Err(NestPayError::Database(format!(
                "column/value count mismatch: {} vs {}",
                names.len(),
                values.len()
            )));
        }

        let mut row = FieldMap::new();
        for (name, literal) in names.iter().zip(values.iter()) {
            row.set(name, parse_literal(&table.def, name, literal)?);
        }

        if let Some(key) = unique_conflict(&table.def, &table.rows, &row, None) {
            return Err(NestPayError::UniqueViolation(format!(
                "duplicate entry for key {} in {}",
                key,
                table.def.name()
            )));
        }

        let pk = table.def.primary_key_field().ok_or_else(|| {
            NestPayError::Database(format!("insert into {} without primary key", table.def.name()))
        })?;
        let id = table.next_id;
        table.next_id += 1;
        row.set(pk.name, Value::Int(id));
        table.rows.push(row);
        Ok(id as u64)
    }

    fn update(table: &mut TableState, pairs: &str, pk_column: &str, pk_literal: &str) -> Result<()> {
        let pk_value = parse_literal(&table.def, pk_column, pk_literal)?;
        let mut changes: Vec<(String, Value)> = Vec::new();
        for pair in split_literals(pairs) {
            let (column, literal) = pair
                .split_once('=')
                .ok_or_else(|| NestPayError::Database(format!("bad SET pair: {}", pair)))?;
            let name = unquote_ident(column)?;
            let value = parse_literal(&table.def, &name, literal)?;
            changes.push((name, value));
        }

        let mut candidate = table
            .rows
            .iter()
            .find(|r| *r.get(pk_column) == pk_value)
            .cloned()
            .ok_or_else(|| {
                NestPayError::Database(format!(
                    "update matched no row in {} for {}={}",
                    table.def.name(),
                    pk_column,
                    pk_literal
                ))
            })?;
        for (name, value) in &changes {
            candidate.set(name, value.clone());
        }
        if let Some(key) = unique_conflict(&table.def, &table.rows, &candidate, Some(&pk_value)) {
            return Err(NestPayError::UniqueViolation(format!(
                "duplicate entry for key {} in {}",
                key,
                table.def.name()
            )));
        }

        if let Some(row) = table.rows.iter_mut().find(|r| *r.get(pk_column) == pk_value) {
            *row = candidate;
        }
        Ok(())
    }
}

#[async_trait]
impl DbGateway for MemoryGateway {
    async fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            let (name, _) = take_ident(rest)?;
            // table defs are registered up front; creation is a no-op
            Self::table(&mut state, &name)?;
            return Ok(());
        }

        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let (name, rest) = take_ident(rest)?;
            let rest = expect_prefix(rest, " (")?;
            let (columns, rest) = split_at_str(rest, ") VALUES (")?;
            let literals = rest.strip_suffix(')').ok_or_else(|| bad_statement(sql))?;
            let id = {
                let table = Self::table(&mut state, &name)?;
                Self::insert(table, columns, literals)?
            };
            state.last_insert_id = id;
            return Ok(());
        }

        if let Some(rest) = sql.strip_prefix("UPDATE ") {
            let (name, rest) = take_ident(rest)?;
            let rest = expect_prefix(rest, " SET ")?;
            let where_at = rest.rfind(" WHERE `").ok_or_else(|| bad_statement(sql))?;
            let pairs = &rest[..where_at];
            let (pk_column, pk_literal) = parse_condition(&rest[where_at + " WHERE ".len()..])?;
            let table = Self::table(&mut state, &name)?;
            return Self::update(table, pairs, &pk_column, pk_literal);
        }

        if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            let (name, rest) = take_ident(rest)?;
            let rest = expect_prefix(rest, " WHERE ")?;
            let (column, literal) = parse_condition(rest)?;
            let table = Self::table(&mut state, &name)?;
            let value = parse_literal(&table.def, &column, literal)?;
            table.rows.retain(|r| *r.get(&column) != value);
            return Ok(());
        }

        Err(bad_statement(sql))
    }

    async fn rows(&self, sql: &str, _table: &TableDef) -> Result<Vec<FieldMap>> {
        let mut state = self.state.lock().unwrap();
        let rest = sql
            .strip_prefix("SELECT * FROM ")
            .ok_or_else(|| bad_statement(sql))?;
        let (name, rest) = take_ident(rest)?;

        let (rest, order_by) = match rest.rfind(" ORDER BY `") {
            Some(at) => {
                let clause = &rest[at + " ORDER BY ".len()..];
                let (column, direction) = clause
                    .split_once(' ')
                    .ok_or_else(|| bad_statement(sql))?;
                (&rest[..at], Some((unquote_ident(column)?, direction == "DESC")))
            }
            None => (rest, None),
        };

        let mut conditions: Vec<(String, Value)> = Vec::new();
        if !rest.is_empty() {
            let rest = expect_prefix(rest, " WHERE ")?;
            let table = Self::table(&mut state, &name)?;
            for clause in rest.split(" AND ") {
                let (column, literal) = parse_condition(clause)?;
                let value = parse_literal(&table.def, &column, literal)?;
                conditions.push((column, value));
            }
        }

        let table = Self::table(&mut state, &name)?;
        let mut matched: Vec<FieldMap> = table
            .rows
            .iter()
            .filter(|row| conditions.iter().all(|(column, value)| *row.get(column) == *value))
            .cloned()
            .collect();

        if let Some((column, descending)) = order_by {
            matched.sort_by_key(|row| row.int(&column).unwrap_or(0));
            if descending {
                matched.reverse();
            }
        }
        Ok(matched)
    }

    fn escape(&self, value: &str) -> String {
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

    async fn last_insert_id(&self) -> Result<u64> {
        Ok(self.state.lock().unwrap().last_insert_id)
    }
}

fn bad_statement(sql: &str) -> NestPayError {
    NestPayError::Database(format!("unsupported statement: {}", sql))
}

/// Read a leading backquoted identifier, returning it and the rest.
fn take_ident(s: &str) -> Result<(String, &str)> {
    let inner = s
        .strip_prefix('`')
        .ok_or_else(|| NestPayError::Database(format!("expected identifier at: {}", s)))?;
    let end = inner
        .find('`')
        .ok_or_else(|| NestPayError::Database(format!("unterminated identifier at: {}", s)))?;
    Ok((inner[..end].to_string(), &inner[end + 1..]))
}

fn unquote_ident(s: &str) -> Result<String> {
    let (ident, rest) = take_ident(s.trim())?;
    if !rest.is_empty() {
        return Err(NestPayError::Database(format!("trailing text after identifier: {}", s)));
    }
    Ok(ident)
}

/// Split `s` around the first occurrence of `sep`.
fn split_at_str<'a>(s: &'a str, sep: &str) -> Result<(&'a str, &'a str)> {
    s.split_once(sep)
        .ok_or_else(|| NestPayError::Database(format!("expected '{}' in: {}", sep, s)))
}

fn expect_prefix<'a>(s: &'a str, prefix: &str) -> Result<&'a str> {
    s.strip_prefix(prefix)
        .ok_or_else(|| NestPayError::Database(format!("expected '{}' at: {}", prefix, s)))
}

/// `` `column`=literal `` → (column, literal).
fn parse_condition(clause: &str) -> Result<(String, &str)> {
    let (column, rest) = take_ident(clause)?;
    let literal = expect_prefix(rest, "=")?;
    Ok((column, literal))
}

/// Split a comma-separated literal (or SET-pair) list, honoring quoted
/// strings and backslash escapes inside them.
fn split_literals(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            ',' if !in_quote => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if !s[start..].trim().is_empty() || !parts.is_empty() {
        parts.push(s[start..].trim());
    }
    parts
}

/// Turn a statement literal into a typed [`Value`] for the named column.
fn parse_literal(def: &TableDef, column: &str, literal: &str) -> Result<Value> {
    if literal == "NULL" {
        return Ok(Value::Null);
    }
    if let Some(inner) = literal.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Ok(Value::Text(unescape(inner)));
    }

    let field = def
        .fields()
        .iter()
        .find(|f| f.name == column)
        .ok_or_else(|| {
            NestPayError::Database(format!("unknown column {} in {}", column, def.name()))
        })?;
    match field.field_type {
        FieldType::Decimal => BigDecimal::from_str(literal)
            .map(Value::Decimal)
            .map_err(|e| NestPayError::Database(format!("bad decimal literal {}: {}", literal, e))),
        _ => literal
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| NestPayError::Database(format!("bad integer literal {}: {}", literal, e))),
    }
}

/// Reverse of [`MemoryGateway::escape`].
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('\0'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('Z') => out.push('\u{1a}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// First unique key the candidate row would violate, if any. Rows matching
/// `skip_pk` (the row being updated) are ignored, as are keys with any NULL
/// component, matching storage semantics.
/// Configuration shared by the integration tests. Also installs the test
/// log subscriber, once, so `RUST_LOG` works under `cargo test`.
pub fn test_config() -> Config {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Config {
        merchant_id: "MERCH123".to_string(),
        store_key: "SECRET_KEY".to_string(),
        api_user: "apiuser".to_string(),
        api_pass: "apipass".to_string(),
        test_mode: true,
        ..Config::default()
    }
}

/// Gateway callback parameters with a valid signature, the way the hosted
/// page posts them back after a payment attempt.
pub fn signed_callback(
    config: &Config,
    oid: &str,
    xid: &str,
    proc_return_code: &str,
) -> HashMap<String, String> {
    let approved = proc_return_code == "00";
    let mut params: HashMap<String, String> = [
        ("clientid", config.merchant_id.as_str()),
        ("oid", oid),
        ("ReturnOid", oid),
        ("merchantID", config.merchant_id.as_str()),
        ("xid", xid),
        ("AuthCode", if approved { "308641" } else { "" }),
        ("ProcReturnCode", proc_return_code),
        ("Response", if approved { "Approved" } else { "Declined" }),
        ("mdStatus", "1"),
        ("TransId", "26316696"),
        ("MaskedPan", "435508***4358"),
        ("EXTRA_CARDBRAND", "VISA"),
        ("EXTRA_TRXDATE", "20260829 14:03:05"),
        ("clientIp", "192.0.2.17"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let hash_keys = [
        "clientid",
        "oid",
        "AuthCode",
        "ProcReturnCode",
        "Response",
        "mdStatus",
        "xid",
    ];
    let values: Vec<String> = hash_keys
        .iter()
        .map(|k| params.get(*k).cloned().unwrap_or_default())
        .collect();
    params.insert("HASHPARAMS".to_string(), hash_keys.join("|"));
    params.insert(
        "HASH".to_string(),
        nestpay::sign::sign_fields(values, &config.store_key),
    );
    params
}

fn unique_conflict(
    def: &TableDef,
    rows: &[FieldMap],
    candidate: &FieldMap,
    skip_pk: Option<&Value>,
) -> Option<String> {
    let pk_column = def.primary_key_field().map(|f| f.name);
    for key in def.unique_keys() {
        if key.iter().any(|column| candidate.get(column).is_null()) {
            continue;
        }
        for row in rows {
            if let (Some(pk), Some(column)) = (skip_pk, pk_column) {
                if row.get(column) == pk {
                    continue;
                }
            }
            if key.iter().all(|column| row.get(column) == candidate.get(column)) {
                return Some(key.join("_"));
            }
        }
    }
    None
}
