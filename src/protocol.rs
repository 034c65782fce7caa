use serde_json::{Value, json};
use uuid::Uuid;

use crate::event::{Header, OutboundEvent};

pub const PAYLOAD_VERSION: &str = "2";

pub const NAMESPACE_DISCOVERY: &str = "Alexa.ConnectedHome.Discovery";
pub const NAMESPACE_CONTROL: &str = "Alexa.ConnectedHome.Control";
pub const NAMESPACE_QUERY: &str = "Alexa.ConnectedHome.Query";
pub const NAMESPACE_SYSTEM: &str = "Alexa.ConnectedHome.System";

pub const HEALTH_CHECK_REQUEST: &str = "HealthCheckRequest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Response,
    Confirmation,
}

impl ReplyKind {
    fn as_str(&self) -> &'static str {
        match self {
            ReplyKind::Response => "Response",
            ReplyKind::Confirmation => "Confirmation",
        }
    }
}

/// Header for a successful reply: `XxxRequest` becomes `XxxResponse` or
/// `XxxConfirmation`, namespace and message id are carried over.
pub fn reply_header(request: &Header, kind: ReplyKind) -> Header {
    Header {
        namespace: request.namespace.clone(),
        name: request.name.replacen("Request", kind.as_str(), 1),
        payload_version: PAYLOAD_VERSION.to_string(),
        message_id: request.message_id.clone(),
    }
}

pub fn reply(request: &Header, kind: ReplyKind, payload: Value) -> OutboundEvent {
    OutboundEvent {
        header: reply_header(request, kind),
        payload,
    }
}

/// `DependentServiceUnavailableError` envelope. The error contract requires a
/// message id, so one is minted when the request did not carry any.
pub fn dependent_service_error(message_id: Option<&str>, reason: &str) -> OutboundEvent {
    OutboundEvent {
        header: Header {
            namespace: NAMESPACE_CONTROL.to_string(),
            name: "DependentServiceUnavailableError".to_string(),
            payload_version: PAYLOAD_VERSION.to_string(),
            message_id: Some(message_or_new(message_id)),
        },
        payload: json!({ "dependentServiceName": reason }),
    }
}

/// Reply for a namespace this adapter does not handle.
pub fn unexpected_information(request: &Header) -> OutboundEvent {
    OutboundEvent {
        header: Header {
            namespace: NAMESPACE_CONTROL.to_string(),
            name: "UnexpectedInformationReceivedError".to_string(),
            payload_version: request.payload_version.clone(),
            message_id: Some(message_or_new(request.message_id.as_deref())),
        },
        payload: json!({ "faultingParameter": request.namespace }),
    }
}

pub fn health_check(request: &Header) -> OutboundEvent {
    reply(
        request,
        ReplyKind::Response,
        json!({
            "description": "The system is currently healthy",
            "isHealthy": true
        }),
    )
}

fn message_or_new(message_id: Option<&str>) -> String {
    message_id
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
