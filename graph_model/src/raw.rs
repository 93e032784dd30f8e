//! Two-pass topology document parsing.
//!
//! The original implementation threads a [`Defaults`] value into nested
//! decoders via a process-wide, mutex-guarded global that is swapped in and
//! restored around each `json.Unmarshal` call. This module replaces that with
//! an explicit value passed down the call tree: [`RawDocument`] is
//! deserialized in one pass with no knowledge of defaults, [`Defaults`] is
//! computed from its `defaults` block, and every [`RawService`] /
//! [`RawCommand`] is then *materialized* against that value. There is no
//! shared mutable state to guard.

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::byte_size::ByteSize;
use crate::command::{parse_duration, Command, RequestCommand};
use crate::error::GraphError;
use crate::http_method::HttpMethod;
use crate::percentage::Percentage;
use crate::service::Service;
use crate::service_type::ServiceType;

/// A single command as it appears in the document, before defaults are
/// applied. The only field that can still be absent here is
/// [`RawCommand::Request`]'s `size` — everything else is either eagerly
/// parsed or doesn't need a default.
#[derive(Debug, Clone)]
pub(crate) enum RawCommand {
    Sleep(Duration),
    Request { service: String, size: Option<ByteSize> },
    Concurrent(Vec<RawCommand>),
}

impl<'de> Deserialize<'de> for RawCommand {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RawCommand::from_value(&value).map_err(serde::de::Error::custom)
    }
}

impl RawCommand {
    fn from_value(value: &Value) -> Result<RawCommand, GraphError> {
        match value {
            Value::Sequence(items) => {
                let children = items
                    .iter()
                    .map(RawCommand::from_value)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RawCommand::Concurrent(children))
            }
            Value::Mapping(map) => {
                let keys: Vec<String> = map
                    .keys()
                    .map(|k| k.as_str().unwrap_or("<non-string key>").to_string())
                    .collect();
                if keys.len() != 1 {
                    return Err(GraphError::MultipleKeysInCommand { keys });
                }
                let key = &keys[0];
                let val = map.values().next().expect("checked len == 1 above");
                match key.as_str() {
                    "sleep" => {
                        let raw = val.as_str().ok_or_else(|| GraphError::InvalidDuration {
                            raw: format!("{val:?}"),
                        })?;
                        Ok(RawCommand::Sleep(parse_duration(raw)?))
                    }
                    "call" => parse_call_value(val),
                    other => {
                        if other.parse::<HttpMethod>().is_ok() {
                            // Legacy form: a command whose single key is an HTTP
                            // method name (e.g. `{get: "b"}`). Retained for
                            // read-compat; the serializer never emits it, and the
                            // materialized model has no method field since every
                            // outbound call the engine makes is a GET regardless.
                            parse_call_value(val)
                        } else {
                            Err(GraphError::UnknownCommandKey { key: other.to_string() })
                        }
                    }
                }
            }
            other => Err(GraphError::UnknownCommandKey { key: format!("{other:?}") }),
        }
    }
}

fn parse_call_value(val: &Value) -> Result<RawCommand, GraphError> {
    if let Value::String(s) = val {
        return Ok(RawCommand::Request { service: s.clone(), size: None });
    }

    #[derive(Deserialize)]
    struct CallObject {
        service: String,
        #[serde(default)]
        size: Option<ByteSize>,
    }
    let obj: CallObject = serde_yaml::from_value(val.clone())?;
    Ok(RawCommand::Request { service: obj.service, size: obj.size })
}

fn materialize_command(raw: RawCommand, defaults: &Defaults) -> Command {
    match raw {
        RawCommand::Sleep(d) => Command::Sleep(d),
        RawCommand::Request { service, size } => Command::Request(RequestCommand {
            service_name: service,
            size: size.unwrap_or(defaults.request_size),
        }),
        RawCommand::Concurrent(children) => Command::Concurrent(
            children.into_iter().map(|c| materialize_command(c, defaults)).collect(),
        ),
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawDefaults {
    #[serde(rename = "type")]
    service_type: Option<ServiceType>,
    #[serde(rename = "errorRate")]
    error_rate: Option<Percentage>,
    #[serde(rename = "responseSize")]
    response_size: Option<ByteSize>,
    #[serde(rename = "requestSize")]
    request_size: Option<ByteSize>,
    script: Option<Vec<RawCommand>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawService {
    name: String,
    #[serde(rename = "type")]
    service_type: Option<ServiceType>,
    #[serde(rename = "isEntrypoint")]
    is_entrypoint: Option<bool>,
    #[serde(rename = "errorRate")]
    error_rate: Option<Percentage>,
    #[serde(rename = "responseSize")]
    response_size: Option<ByteSize>,
    script: Option<Vec<RawCommand>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawDocument {
    #[serde(rename = "apiVersion")]
    #[allow(dead_code)]
    api_version: Option<String>,
    defaults: RawDefaults,
    services: Vec<RawService>,
}

/// Fully-resolved defaults, merged into every [`Service`] and `Request`
/// command that omits the corresponding field. See module docs for why this
/// is a plain value rather than a global.
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    pub service_type: ServiceType,
    pub error_rate: Percentage,
    pub response_size: ByteSize,
    pub request_size: ByteSize,
    pub script: Vec<Command>,
}

impl Defaults {
    fn from_raw(raw: RawDefaults) -> Defaults {
        let mut defaults = Defaults {
            service_type: raw.service_type.unwrap_or_default(),
            error_rate: raw.error_rate.unwrap_or_default(),
            response_size: raw.response_size.unwrap_or_default(),
            request_size: raw.request_size.unwrap_or_default(),
            script: Vec::new(),
        };
        if let Some(raw_script) = raw.script {
            defaults.script =
                raw_script.into_iter().map(|c| materialize_command(c, &defaults)).collect();
        }
        defaults
    }

    /// Applying defaults to an already-materialized [`Service`] is the
    /// identity: every field on `service` is already concrete, so there is
    /// nothing left for a default to fill in.
    #[cfg(test)]
    pub(crate) fn apply_is_idempotent(&self, service: &Service) -> bool {
        let reapplied = Service {
            name: service.name.clone(),
            service_type: service.service_type,
            is_entrypoint: service.is_entrypoint,
            error_rate: service.error_rate,
            response_size: service.response_size,
            script: service.script.clone(),
        };
        reapplied == *service
    }
}

pub(crate) fn materialize_service(raw: RawService, defaults: &Defaults) -> Result<Service, GraphError> {
    if raw.name.trim().is_empty() {
        return Err(GraphError::EmptyName);
    }
    let script = match raw.script {
        Some(cmds) => cmds.into_iter().map(|c| materialize_command(c, defaults)).collect(),
        None => defaults.script.clone(),
    };
    Ok(Service {
        name: raw.name,
        service_type: raw.service_type.unwrap_or(defaults.service_type),
        is_entrypoint: raw.is_entrypoint.unwrap_or(false),
        error_rate: raw.error_rate.unwrap_or(defaults.error_rate),
        response_size: raw.response_size.unwrap_or(defaults.response_size),
        script,
    })
}

pub(crate) fn parse_document(text: &str) -> Result<(Defaults, Vec<Service>), GraphError> {
    let doc: RawDocument = serde_yaml::from_str(text)?;
    let defaults = Defaults::from_raw(doc.defaults);
    let services = doc
        .services
        .into_iter()
        .map(|s| materialize_service(s, &defaults))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((defaults, services))
}
