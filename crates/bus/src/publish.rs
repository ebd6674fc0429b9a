use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::warn;

use crate::event::PushEvent;
use crate::topic::Topic;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("push transport unavailable: {0}")]
    Transport(String),
}

/// Fire-and-forget publisher to named channels. Delivery is at-most-once and
/// best-effort: implementations drop events for channels nobody is
/// subscribed to, and callers must never treat a failure as fatal.
#[async_trait]
pub trait PushBus: Send + Sync {
    async fn publish(&self, topic: Topic, event: PushEvent) -> Result<(), PublishError>;
}

/// Transport used when no real-time layer is configured.
#[derive(Default)]
pub struct NoopBus;

#[async_trait]
impl PushBus for NoopBus {
    async fn publish(&self, _topic: Topic, _event: PushEvent) -> Result<(), PublishError> {
        Ok(())
    }
}

/// A delivered event as a subscriber sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub channel: String,
    pub event: &'static str,
    pub payload: Value,
}

const CHANNEL_CAPACITY: usize = 64;

/// In-process hub backed by one lossy broadcast channel per topic.
/// Subscribers that fall behind lose the oldest events, matching the
/// at-most-once contract of the external real-time layer.
#[derive(Default)]
pub struct BroadcastHub {
    channels: RwLock<HashMap<String, broadcast::Sender<Envelope>>>,
}

impl BroadcastHub {
    pub async fn subscribe(&self, topic: &Topic) -> broadcast::Receiver<Envelope> {
        let mut channels = self.channels.write().await;
        channels
            .entry(topic.channel())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

#[async_trait]
impl PushBus for BroadcastHub {
    async fn publish(&self, topic: Topic, event: PushEvent) -> Result<(), PublishError> {
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(&topic.channel()) {
            // send only fails when every receiver is gone; that is the
            // "nobody listening" case, not an error on this bus.
            let _ = sender.send(Envelope {
                channel: topic.channel(),
                event: event.name(),
                payload: event.payload(),
            });
        }

        Ok(())
    }
}

/// Test spy capturing every publish in order.
#[derive(Default)]
pub struct RecordingBus {
    sent: Mutex<Vec<(Topic, PushEvent)>>,
    fail: bool,
}

impl RecordingBus {
    /// A bus whose every publish fails, for exercising best-effort paths.
    pub fn failing() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail: true }
    }

    pub async fn recorded(&self) -> Vec<(Topic, PushEvent)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, topic: &Topic) -> Vec<PushEvent> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

#[async_trait]
impl PushBus for RecordingBus {
    async fn publish(&self, topic: Topic, event: PushEvent) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::Transport("recording bus configured to fail".to_string()));
        }

        self.sent.lock().await.push((topic, event));
        Ok(())
    }
}

/// Publishes without letting a transport failure escape: the failure is
/// logged and swallowed, so the surrounding write path always completes.
pub async fn publish_best_effort(bus: &Arc<dyn PushBus>, topic: Topic, event: PushEvent) {
    let channel = topic.channel();
    let name = event.name();
    if let Err(error) = bus.publish(topic, event).await {
        warn!(
            event_name = "bus.publish_failed",
            channel = %channel,
            push_event = name,
            error = %error,
            "push delivery failed; continuing"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fixbid_core::ProviderId;

    use crate::event::{PushEvent, RequestAssignedToOther};
    use crate::topic::Topic;

    use super::{publish_best_effort, BroadcastHub, PushBus, RecordingBus};

    fn assigned_event() -> PushEvent {
        PushEvent::RequestAssignedToOther(RequestAssignedToOther {
            request_id: "r1".into(),
            message: "This service request has been assigned to another provider".into(),
        })
    }

    #[tokio::test]
    async fn hub_delivers_to_current_subscribers() {
        let hub = BroadcastHub::default();
        let topic = Topic::Provider(ProviderId("p1".into()));
        let mut receiver = hub.subscribe(&topic).await;

        hub.publish(topic.clone(), assigned_event()).await.expect("publish");

        let envelope = receiver.recv().await.expect("delivery");
        assert_eq!(envelope.channel, "provider_p1");
        assert_eq!(envelope.event, "request_assigned_to_other");
        assert_eq!(envelope.payload["request_id"], "r1");
    }

    #[tokio::test]
    async fn hub_drops_events_for_unsubscribed_channels() {
        let hub = BroadcastHub::default();
        hub.publish(Topic::AllProviders, assigned_event()).await.expect("publish is best-effort");
    }

    #[tokio::test]
    async fn best_effort_swallows_transport_failure() {
        let bus: Arc<dyn PushBus> = Arc::new(RecordingBus::failing());
        publish_best_effort(&bus, Topic::AllProviders, assigned_event()).await;
    }

    #[tokio::test]
    async fn recording_bus_replays_in_order() {
        let bus = RecordingBus::default();
        let topic = Topic::Provider(ProviderId("p1".into()));

        bus.publish(topic.clone(), assigned_event()).await.expect("record");
        bus.publish(Topic::AllProviders, assigned_event()).await.expect("record");

        assert_eq!(bus.recorded().await.len(), 2);
        assert_eq!(bus.sent_to(&topic).await.len(), 1);
    }
}
