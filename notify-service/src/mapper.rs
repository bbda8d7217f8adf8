use billing_amqp::AmqpError;
use billing_core::domain::CustomerEventPayload;
use heapless::String as HeaplessString;
use notify_core::domain::NotifyCustomer;

/// Converts the wire payload carried on a `DomainEvent` into the
/// projection's own snapshot type. The only failure mode is a field that
/// no longer fits its bound — which would mean billing-side validation
/// regressed, not a transient condition, hence the hard rejection.
pub fn to_notify_customer(payload: CustomerEventPayload) -> Result<NotifyCustomer, AmqpError> {
    Ok(NotifyCustomer {
        customer_id: payload.customer_id,
        name: to_heapless(&payload.name, "name")?,
        address: to_heapless(&payload.address, "address")?,
        is_delinquent: payload.is_delinquent,
        active: payload.active,
        loan_id: payload.loan_id,
        create_date: payload.create_date,
        updated_at: payload.updated_at,
    })
}

fn to_heapless<const N: usize>(s: &str, field: &str) -> Result<HeaplessString<N>, AmqpError> {
    HeaplessString::try_from(s).map_err(|_| {
        AmqpError::Handler(format!("payload field {field} exceeds {N} characters"))
    })
}
