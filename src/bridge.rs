use serde_json::Value;
use tracing::{debug, warn};

use crate::event::{Directive, Header, InboundEvent, OutboundEvent, validate_request_name};
use crate::handlers;
use crate::hub::Hub;
use crate::protocol::{self, HEALTH_CHECK_REQUEST};
use crate::{Error, Result};

/// Routes Alexa events to the handlers and always produces a reply.
pub struct Bridge<H> {
    hub: H,
}

impl<H: Hub> Bridge<H> {
    pub fn new(hub: H) -> Self {
        Self { hub }
    }

    pub async fn handle(&self, event: &InboundEvent) -> OutboundEvent {
        let header = &event.header;
        debug!(namespace = %header.namespace, name = %header.name, "handling event");

        let result = match header.namespace.as_str() {
            protocol::NAMESPACE_DISCOVERY => self.discover(header).await,
            protocol::NAMESPACE_CONTROL | protocol::NAMESPACE_QUERY => self.control(event).await,
            protocol::NAMESPACE_SYSTEM if header.name == HEALTH_CHECK_REQUEST => {
                Ok(protocol::health_check(header))
            }
            other => {
                warn!(namespace = other, name = %header.name, "unexpected namespace");
                return protocol::unexpected_information(header);
            }
        };

        result.unwrap_or_else(|e| {
            warn!(name = %header.name, error = %e, "request failed");
            protocol::dependent_service_error(header.message_id.as_deref(), e.reason())
        })
    }

    /// Like [`handle`](Self::handle) for an undecoded event body.
    pub async fn handle_json(&self, raw: Value) -> OutboundEvent {
        let message_id = raw
            .pointer("/header/messageId")
            .and_then(Value::as_str)
            .map(str::to_string);
        match serde_json::from_value::<InboundEvent>(raw) {
            Ok(event) => self.handle(&event).await,
            Err(e) => {
                let err = Error::MalformedEvent(e.to_string());
                warn!(error = %err, "could not decode event");
                protocol::dependent_service_error(message_id.as_deref(), err.reason())
            }
        }
    }

    async fn discover(&self, header: &Header) -> Result<OutboundEvent> {
        validate_request_name(header)?;
        handlers::discover_appliances(&self.hub, header).await
    }

    async fn control(&self, event: &InboundEvent) -> Result<OutboundEvent> {
        let header = &event.header;
        validate_request_name(header)?;
        let hub = &self.hub;

        match Directive::parse(event)? {
            Directive::Switch { appliance, power } => {
                handlers::switch(hub, header, &appliance, power).await
            }
            Directive::Percentage {
                appliance,
                adjustment,
            } => handlers::percentage(hub, header, &appliance, adjustment).await,
            Directive::SetColor {
                appliance,
                color,
                requested,
            } => handlers::set_color(hub, header, &appliance, color, &requested).await,
            Directive::GetTemperatureReading { appliance } => {
                handlers::current_temperature(hub, header, &appliance).await
            }
            Directive::GetTargetTemperature { appliance } => {
                handlers::target_temperature(hub, header, &appliance).await
            }
            Directive::TargetTemperature {
                appliance,
                adjustment,
            } => handlers::set_target_temperature(hub, header, &appliance, adjustment).await,
        }
    }
}
