use serde::Serialize;

use crate::byte_size::ByteSize;
use crate::command::Command;
use crate::percentage::Percentage;
use crate::service_type::ServiceType;

/// A single node in a [`ServiceGraph`](crate::ServiceGraph).
///
/// Every field here is fully resolved — defaults have already been merged in
/// by [`crate::raw::materialize_service`]. There is no `Option` left to
/// chase; a `Service` is always ready to hand to the request engine or the
/// manifest generator as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: String,
    pub service_type: ServiceType,
    pub is_entrypoint: bool,
    pub error_rate: Percentage,
    pub response_size: ByteSize,
    pub script: Vec<Command>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Document shape for a single service entry, used only by
/// [`crate::ServiceGraph`]'s serializer. Field order here fixes the field
/// order in the emitted YAML.
#[derive(Serialize)]
pub(crate) struct ServiceDoc<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    service_type: ServiceType,
    #[serde(rename = "isEntrypoint", skip_serializing_if = "is_false")]
    is_entrypoint: bool,
    #[serde(rename = "errorRate")]
    error_rate: Percentage,
    #[serde(rename = "responseSize")]
    response_size: ByteSize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    script: &'a [Command],
}

impl<'a> From<&'a Service> for ServiceDoc<'a> {
    fn from(service: &'a Service) -> Self {
        ServiceDoc {
            name: &service.name,
            service_type: service.service_type,
            is_entrypoint: service.is_entrypoint,
            error_rate: service.error_rate,
            response_size: service.response_size,
            script: &service.script,
        }
    }
}
