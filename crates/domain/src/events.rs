use common::messages::Event;
use event_bus::{EventBus, EventBusExt};

use crate::ServiceError;

/// Publishes `event` on its subject.
pub(crate) async fn publish<B, E>(bus: &B, event: &E) -> Result<(), ServiceError>
where
    B: EventBus + ?Sized,
    E: Event,
{
    bus.publish_json(E::SUBJECT, event).await?;
    tracing::debug!(subject = E::SUBJECT, "event published");
    Ok(())
}
