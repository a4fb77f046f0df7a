//! JSON-lines logging on top of `env_logger`.
//!
//! Each record becomes one object with `ts`, `level`, `message`, `service`,
//! `target`, plus every structured field passed to the `log` macros, e.g.
//! `log::info!(request_id = id; "task created")`.

use chrono::{SecondsFormat, Utc};
use log::kv::{self, Key, VisitSource};
use log::{Record, SetLoggerError};
use serde_json::{Map, Number, Value};
use std::io::Write;

/// Installs the process-wide logger. `level` accepts `env_logger` filter syntax.
pub fn init(service: &'static str, level: &str) -> Result<(), SetLoggerError> {
    env_logger::Builder::new()
        .parse_filters(level)
        .format(move |buf, record| writeln!(buf, "{}", render(service, record)))
        .try_init()
}

/// Renders a record as the JSON object written to stdout.
pub fn render(service: &str, record: &Record) -> Value {
    let mut line = Map::new();
    line.insert(
        "ts".into(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)),
    );
    line.insert("level".into(), Value::String(record.level().as_str().to_lowercase()));
    line.insert("message".into(), Value::String(record.args().to_string()));
    line.insert("service".into(), Value::String(service.to_string()));
    line.insert("target".into(), Value::String(record.target().to_string()));

    let mut fields = JsonFields(&mut line);
    // The visitor never fails.
    let _ = record.key_values().visit(&mut fields);

    Value::Object(line)
}

struct JsonFields<'a>(&'a mut Map<String, Value>);

impl<'kvs> VisitSource<'kvs> for JsonFields<'_> {
    fn visit_pair(&mut self, key: Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        self.0.insert(key.as_str().to_string(), to_json(&value));
        Ok(())
    }
}

fn to_json(value: &kv::Value<'_>) -> Value {
    if let Some(flag) = value.to_bool() {
        Value::Bool(flag)
    } else if let Some(n) = value.to_u64() {
        Value::Number(n.into())
    } else if let Some(n) = value.to_i64() {
        Value::Number(n.into())
    } else if let Some(n) = value.to_f64() {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    } else {
        Value::String(value.to_string())
    }
}
