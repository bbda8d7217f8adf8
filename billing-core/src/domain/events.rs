use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::customer::Customer;

/// AMQP routing key each event variant is published under.
pub const ROUTING_KEY_CUSTOMER_CREATED: &str = "customer.created";
pub const ROUTING_KEY_CUSTOMER_UPDATED: &str = "customer.updated";
pub const ROUTING_KEY_CUSTOMER_DELINQUENCY_CHANGED: &str = "customer.delinquency.changed";

/// A customer-state change that must be propagated to the notify service.
///
/// Every successful `CustomerService` mutation publishes exactly one of
/// these. The payload always carries a full snapshot of the customer so
/// the notify-side projection can upsert without a round trip back to
/// billing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    CustomerCreated { payload: CustomerEventPayload },
    CustomerUpdated { payload: CustomerEventPayload },
    #[serde(rename_all = "camelCase")]
    CustomerDelinquencyChanged {
        payload: CustomerEventPayload,
        old_status: bool,
        new_status: bool,
    },
}

impl DomainEvent {
    pub fn routing_key(&self) -> &'static str {
        match self {
            DomainEvent::CustomerCreated { .. } => ROUTING_KEY_CUSTOMER_CREATED,
            DomainEvent::CustomerUpdated { .. } => ROUTING_KEY_CUSTOMER_UPDATED,
            DomainEvent::CustomerDelinquencyChanged { .. } => ROUTING_KEY_CUSTOMER_DELINQUENCY_CHANGED,
        }
    }

    pub fn customer_id(&self) -> Uuid {
        match self {
            DomainEvent::CustomerCreated { payload } => payload.customer_id,
            DomainEvent::CustomerUpdated { payload } => payload.customer_id,
            DomainEvent::CustomerDelinquencyChanged { payload, .. } => payload.customer_id,
        }
    }
}

/// The wire shape of a `Customer` snapshot carried on an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerEventPayload {
    pub customer_id: Uuid,
    pub name: String,
    pub address: String,
    pub is_delinquent: bool,
    pub active: bool,
    pub loan_id: Option<i64>,
    pub create_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Customer> for CustomerEventPayload {
    fn from(c: &Customer) -> Self {
        CustomerEventPayload {
            customer_id: c.customer_id,
            name: c.name.as_str().to_string(),
            address: c.address.as_str().to_string(),
            is_delinquent: c.is_delinquent,
            active: c.active,
            loan_id: c.loan_id,
            create_date: c.create_date,
            updated_at: c.updated_at,
        }
    }
}

/// The envelope every message on the topic exchange is wrapped in:
/// a server-assigned timestamp, the publishing application's identifier,
/// and the domain event itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub app_id: String,
    #[serde(flatten)]
    pub event: DomainEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CustomerEventPayload {
        let now = Utc::now();
        CustomerEventPayload {
            customer_id: Uuid::new_v4(),
            name: "Alice".to_string(),
            address: "1 Main".to_string(),
            is_delinquent: false,
            active: true,
            loan_id: None,
            create_date: now,
            updated_at: now,
        }
    }

    #[test]
    fn routing_key_matches_each_variant() {
        let payload = payload();
        assert_eq!(
            DomainEvent::CustomerCreated { payload: payload.clone() }.routing_key(),
            ROUTING_KEY_CUSTOMER_CREATED
        );
        assert_eq!(
            DomainEvent::CustomerUpdated { payload: payload.clone() }.routing_key(),
            ROUTING_KEY_CUSTOMER_UPDATED
        );
        assert_eq!(
            DomainEvent::CustomerDelinquencyChanged {
                payload,
                old_status: false,
                new_status: true,
            }
            .routing_key(),
            ROUTING_KEY_CUSTOMER_DELINQUENCY_CHANGED
        );
    }

    #[test]
    fn delinquency_changed_serializes_old_and_new_status_as_camel_case() {
        let event = DomainEvent::CustomerDelinquencyChanged {
            payload: payload(),
            old_status: false,
            new_status: true,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["oldStatus"], false);
        assert_eq!(json["newStatus"], true);
        assert!(json.get("old_status").is_none());
        assert!(json.get("new_status").is_none());
    }

    #[test]
    fn envelope_round_trips_through_json_with_the_flattened_tag() {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            app_id: "billing-engine".to_string(),
            event: DomainEvent::CustomerUpdated { payload: payload() },
        };

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "customerUpdated");

        let decoded: EventEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.event.routing_key(), ROUTING_KEY_CUSTOMER_UPDATED);
        assert_eq!(decoded.event.customer_id(), envelope.event.customer_id());
    }
}
