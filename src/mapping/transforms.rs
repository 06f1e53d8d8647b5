// ABOUTME: Value conversions between engine wire values and domain values.
// ABOUTME: Decode helpers normalize; encode helpers accept several input shapes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

use super::field::Object;

/// Errors from a single value conversion.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("expected {expected}, got {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing '{separator}' in {value:?}")]
    MissingSeparator { value: String, separator: char },

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("missing key {0:?}")]
    MissingKey(&'static str),

    #[error("row has {found} columns, expected at least {expected}")]
    ShortRow { expected: usize, found: usize },
}

/// JSON type name for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn unexpected(expected: &'static str, value: &Value) -> TransformError {
    TransformError::UnexpectedType {
        expected,
        found: type_name(value),
    }
}

fn array(value: Value) -> Result<Vec<Value>, TransformError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        other => Err(unexpected("array", &other)),
    }
}

fn object(value: Value) -> Result<Object, TransformError> {
    match value {
        Value::Null => Ok(Object::new()),
        Value::Object(map) => Ok(map),
        other => Err(unexpected("object", &other)),
    }
}

fn string(value: Value) -> Result<String, TransformError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(unexpected("string", &other)),
    }
}

/// Text form of a string or number.
fn scalar_text(value: &Value) -> Result<String, TransformError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(unexpected("string or number", other)),
    }
}

fn parse_port(text: &str) -> Result<u16, TransformError> {
    text.parse()
        .map_err(|_| TransformError::InvalidPort(text.to_string()))
}

fn split_required(text: &str, separator: char) -> Result<(&str, &str), TransformError> {
    text.split_once(separator)
        .ok_or_else(|| TransformError::MissingSeparator {
            value: text.to_string(),
            separator,
        })
}

/// `"80/tcp"` into port and protocol.
fn split_port_key(key: &str) -> Result<(u16, String), TransformError> {
    let (port, protocol) = split_required(key, '/')?;
    Ok((parse_port(port)?, protocol.to_string()))
}

// =============================================================================
// Decode
// =============================================================================

/// Seconds since the epoch into an RFC 3339 UTC timestamp.
pub fn from_unix_time(value: Value) -> Result<Value, TransformError> {
    let secs = match &value {
        Value::Null => return Ok(Value::Null),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| unexpected("integer", &value))?,
        other => return Err(unexpected("number", other)),
    };
    let time = DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
        TransformError::InvalidTimestamp {
            value: secs.to_string(),
            reason: "out of range".to_string(),
        }
    })?;
    Ok(Value::String(time.to_rfc3339_opts(SecondsFormat::Secs, true)))
}

/// ISO 8601 timestamp into normalized RFC 3339 UTC. Empty strings become null.
pub fn from_iso_time(value: Value) -> Result<Value, TransformError> {
    let text = match value {
        Value::Null => return Ok(Value::Null),
        other => string(other)?,
    };
    if text.is_empty() {
        return Ok(Value::Null);
    }
    let time = DateTime::parse_from_rfc3339(&text).map_err(|e| TransformError::InvalidTimestamp {
        value: text.clone(),
        reason: e.to_string(),
    })?;
    Ok(Value::String(
        time.with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
    ))
}

/// `["K=V", "FLAG"]` into `[["K","V"], ["FLAG",null]]`.
pub fn from_env(value: Value) -> Result<Value, TransformError> {
    let pairs = array(value)?
        .into_iter()
        .map(|item| {
            let entry = string(item)?;
            Ok(match entry.split_once('=') {
                Some((key, val)) => json!([key, val]),
                None => json!([entry, null]),
            })
        })
        .collect::<Result<Vec<_>, TransformError>>()?;
    Ok(Value::Array(pairs))
}

/// `{"80/tcp": {}}` into `[{"port": 80, "protocol": "tcp"}]`.
pub fn from_exposed_ports(value: Value) -> Result<Value, TransformError> {
    let ports = object(value)?
        .keys()
        .map(|key| {
            let (port, protocol) = split_port_key(key)?;
            Ok(json!({ "port": port, "protocol": protocol }))
        })
        .collect::<Result<Vec<_>, TransformError>>()?;
    Ok(Value::Array(ports))
}

/// `["a:b"]` into `[["a","b"]]`. Used for extra hosts and links.
pub fn from_colon_pairs(value: Value) -> Result<Value, TransformError> {
    let pairs = array(value)?
        .into_iter()
        .map(|item| {
            let entry = string(item)?;
            let (left, right) = split_required(&entry, ':')?;
            Ok(json!([left, right]))
        })
        .collect::<Result<Vec<_>, TransformError>>()?;
    Ok(Value::Array(pairs))
}

/// `{"80/tcp": [{"HostIp": "", "HostPort": "8080"}]}` into a flat binding list.
pub fn from_port_bindings(value: Value) -> Result<Value, TransformError> {
    let mut bindings = Vec::new();
    for (key, hosts) in object(value)? {
        let (port, protocol) = split_port_key(&key)?;
        for host in array(hosts)? {
            let host = object(host)?;
            let host_port = match host.get("HostPort") {
                Some(Value::String(p)) if p.is_empty() => Value::Null,
                Some(p) => json!(parse_port(&scalar_text(p)?)?),
                None => Value::Null,
            };
            let host_ip = match host.get("HostIp") {
                Some(Value::String(ip)) if !ip.is_empty() => json!(ip),
                _ => Value::Null,
            };
            bindings.push(json!({
                "port": port,
                "protocol": protocol,
                "host_ip": host_ip,
                "host_port": host_port,
            }));
        }
    }
    Ok(Value::Array(bindings))
}

/// `{"/data": {}}` into `["/data"]`.
pub fn from_volumes(value: Value) -> Result<Value, TransformError> {
    Ok(Value::Array(
        object(value)?.into_iter().map(|(k, _)| Value::String(k)).collect(),
    ))
}

/// `["web", "db:ro"]` into `[["web",null], ["db","ro"]]`.
pub fn from_volumes_from(value: Value) -> Result<Value, TransformError> {
    let pairs = array(value)?
        .into_iter()
        .map(|item| {
            let entry = string(item)?;
            Ok(match entry.split_once(':') {
                Some((container, mode)) => json!([container, mode]),
                None => json!([entry, null]),
            })
        })
        .collect::<Result<Vec<_>, TransformError>>()?;
    Ok(Value::Array(pairs))
}

// =============================================================================
// Encode
// =============================================================================

/// Bind mounts into `"host:container[:ro]"` strings.
///
/// Accepts objects with `host_path`, `container_path`, `ro`; arrays of
/// `[host, container, "ro"?]`; or preformatted strings.
pub fn to_binds(value: Value) -> Result<Value, TransformError> {
    let binds = array(value)?
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => {
                let host = map
                    .get("host_path")
                    .ok_or(TransformError::MissingKey("host_path"))?;
                let container = map
                    .get("container_path")
                    .ok_or(TransformError::MissingKey("container_path"))?;
                let mut bind = format!("{}:{}", scalar_text(host)?, scalar_text(container)?);
                if map.get("ro").and_then(Value::as_bool).unwrap_or(false) {
                    bind.push_str(":ro");
                }
                Ok(Value::String(bind))
            }
            Value::Array(parts) if parts.len() >= 2 => {
                let mut bind = format!("{}:{}", scalar_text(&parts[0])?, scalar_text(&parts[1])?);
                if parts.get(2).and_then(Value::as_str) == Some("ro") {
                    bind.push_str(":ro");
                }
                Ok(Value::String(bind))
            }
            Value::String(s) => Ok(Value::String(s)),
            other => Err(unexpected("bind object, pair or string", &other)),
        })
        .collect::<Result<Vec<_>, TransformError>>()?;
    Ok(Value::Array(binds))
}

/// Environment into `["K=V"]`.
///
/// Accepts a `{"K": "V"}` map, a list of strings or `[k, v]` pairs, or a
/// single `"K=V"` string.
pub fn to_env(value: Value) -> Result<Value, TransformError> {
    let entries = match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| Ok(format!("{}={}", k, scalar_text(&v)?)))
            .collect::<Result<Vec<_>, TransformError>>()?,
        Value::String(s) => vec![s],
        other => array(other)?
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Array(pair) if pair.len() == 2 => {
                    Ok(format!("{}={}", scalar_text(&pair[0])?, scalar_text(&pair[1])?))
                }
                other => Err(unexpected("string or pair", &other)),
            })
            .collect::<Result<Vec<_>, TransformError>>()?,
    };
    Ok(Value::Array(entries.into_iter().map(Value::String).collect()))
}

/// Ports into `{"80/tcp": {}}`.
///
/// Accepts `{"port", "protocol"}` objects, `[port, protocol]` pairs or
/// `"80/tcp"` strings. Protocol defaults to tcp.
pub fn to_exposed_ports(value: Value) -> Result<Value, TransformError> {
    let mut ports = Object::new();
    for item in array(value)? {
        let key = match item {
            Value::String(s) => s,
            Value::Array(parts) if !parts.is_empty() => port_key(
                &parts[0],
                parts.get(1).unwrap_or(&Value::Null),
            )?,
            Value::Object(map) => port_key(
                map.get("port").ok_or(TransformError::MissingKey("port"))?,
                map.get("protocol").unwrap_or(&Value::Null),
            )?,
            other => return Err(unexpected("port object, pair or string", &other)),
        };
        ports.insert(key, json!({}));
    }
    Ok(Value::Object(ports))
}

fn port_key(port: &Value, protocol: &Value) -> Result<String, TransformError> {
    let port = parse_port(&scalar_text(port)?)?;
    let protocol = match protocol {
        Value::Null => "tcp".to_string(),
        other => scalar_text(other)?,
    };
    Ok(format!("{}/{}", port, protocol))
}

/// Extra hosts into `["host:ip"]`.
///
/// Accepts a `{"host": "ip"}` map, `{"hostname", "ip"}` objects, pairs or
/// strings.
pub fn to_extra_hosts(value: Value) -> Result<Value, TransformError> {
    match value {
        Value::Object(map) => Ok(Value::Array(
            map.into_iter()
                .map(|(host, ip)| Ok(Value::String(format!("{}:{}", host, scalar_text(&ip)?))))
                .collect::<Result<Vec<_>, TransformError>>()?,
        )),
        other => colon_joined(other, "hostname", "ip"),
    }
}

/// Links into `["container:alias"]`.
pub fn to_links(value: Value) -> Result<Value, TransformError> {
    colon_joined(value, "container_name", "alias")
}

fn colon_joined(
    value: Value,
    left_key: &'static str,
    right_key: &'static str,
) -> Result<Value, TransformError> {
    let entries = array(value)?
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => {
                let left = map.get(left_key).ok_or(TransformError::MissingKey(left_key))?;
                let right = map
                    .get(right_key)
                    .ok_or(TransformError::MissingKey(right_key))?;
                Ok(Value::String(format!(
                    "{}:{}",
                    scalar_text(left)?,
                    scalar_text(right)?
                )))
            }
            Value::Array(pair) if pair.len() >= 2 => Ok(Value::String(format!(
                "{}:{}",
                scalar_text(&pair[0])?,
                scalar_text(&pair[1])?
            ))),
            Value::String(s) => Ok(Value::String(s)),
            other => Err(unexpected("object, pair or string", &other)),
        })
        .collect::<Result<Vec<_>, TransformError>>()?;
    Ok(Value::Array(entries))
}

/// Port bindings into `{"80/tcp": [{"HostPort": "8080"}]}`.
///
/// Accepts `{"port", "protocol", "host_port", "host_ip"?}` objects or
/// `[port, protocol, host_port]` triples. Several bindings of one port are
/// collected under the same key.
pub fn to_port_bindings(value: Value) -> Result<Value, TransformError> {
    let mut bindings = Object::new();
    for item in array(value)? {
        let (key, host_port, host_ip) = match item {
            Value::Object(map) => (
                port_key(
                    map.get("port").ok_or(TransformError::MissingKey("port"))?,
                    map.get("protocol").unwrap_or(&Value::Null),
                )?,
                map.get("host_port")
                    .ok_or(TransformError::MissingKey("host_port"))?
                    .clone(),
                map.get("host_ip").cloned().unwrap_or(Value::Null),
            ),
            Value::Array(parts) if parts.len() >= 3 => (
                port_key(&parts[0], &parts[1])?,
                parts[2].clone(),
                Value::Null,
            ),
            other => return Err(unexpected("binding object or triple", &other)),
        };

        let mut host = Object::new();
        if !host_ip.is_null() {
            host.insert("HostIp".to_string(), Value::String(scalar_text(&host_ip)?));
        }
        host.insert(
            "HostPort".to_string(),
            Value::String(parse_port(&scalar_text(&host_port)?)?.to_string()),
        );

        let entry = bindings
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(hosts) = entry {
            hosts.push(Value::Object(host));
        }
    }
    Ok(Value::Object(bindings))
}

/// Volume paths into `{"/data": {}}`.
pub fn to_volumes(value: Value) -> Result<Value, TransformError> {
    match value {
        Value::Object(map) => Ok(Value::Object(map)),
        other => {
            let mut volumes = Object::new();
            for item in array(other)? {
                volumes.insert(string(item)?, json!({}));
            }
            Ok(Value::Object(volumes))
        }
    }
}

/// Volumes-from entries into `["container[:mode]"]`.
pub fn to_volumes_from(value: Value) -> Result<Value, TransformError> {
    let entries = array(value)?
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(Value::String(s)),
            Value::Array(parts) if !parts.is_empty() => {
                let container = scalar_text(&parts[0])?;
                Ok(Value::String(match parts.get(1) {
                    None | Some(Value::Null) => container,
                    Some(mode) => format!("{}:{}", container, scalar_text(mode)?),
                }))
            }
            other => Err(unexpected("string or pair", &other)),
        })
        .collect::<Result<Vec<_>, TransformError>>()?;
    Ok(Value::Array(entries))
}
