use std::sync::Arc;

use nostr_sdk::prelude::*;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{FeedError, Result};
use crate::viewport::{RelatedDataSink, RelatedDataTransport};

/// Related-data subscriptions over a shared `nostr_sdk::Client`.
///
/// `open` blocks on the runtime to send the REQ, so it must be called from a thread
/// that is not driving that runtime.
#[derive(Clone)]
pub struct NostrRelatedDataTransport {
    client: Client,
    rt: Handle,
}

/// An open window subscription and the task forwarding its events.
pub struct RelatedSubscription {
    pub id: SubscriptionId,
    task: JoinHandle<()>,
}

impl NostrRelatedDataTransport {
    pub fn new(client: Client, rt: Handle) -> Self {
        Self { client, rt }
    }
}

impl RelatedDataTransport for NostrRelatedDataTransport {
    type Handle = RelatedSubscription;

    fn open(
        &mut self,
        filter: Filter,
        sink: Arc<dyn RelatedDataSink>,
    ) -> Result<RelatedSubscription> {
        let id = SubscriptionId::generate();
        let mut notifications = self.client.notifications();

        self.rt.block_on(async {
            if self.client.relays().await.is_empty() {
                return Err(FeedError::NotConnected);
            }
            self.client
                .subscribe_with_id(id.clone(), filter, None)
                .await
                .map_err(|e| FeedError::SubscriptionOpen(e.to_string()))?;
            Ok(())
        })?;

        let sub_id = id.clone();
        let task = self.rt.spawn(async move {
            // Everything before the first EOSE is stored history, delivered as one batch
            let mut stored: Vec<Event> = Vec::new();
            let mut live = false;

            loop {
                match notifications.recv().await {
                    Ok(RelayPoolNotification::Event { subscription_id, event, .. }) => {
                        if subscription_id != sub_id {
                            continue;
                        }
                        if live {
                            sink.on_event(&event);
                        } else {
                            stored.push(*event);
                        }
                    }
                    Ok(RelayPoolNotification::Message {
                        message: RelayMessage::EndOfStoredEvents(eose_id),
                        ..
                    }) => {
                        if !live && *eose_id == sub_id {
                            live = true;
                            debug!(
                                subscription = %sub_id,
                                count = stored.len(),
                                "related data backlog"
                            );
                            sink.on_events_batch(&std::mem::take(&mut stored));
                        }
                    }
                    Ok(RelayPoolNotification::Message { .. }) => {}
                    Ok(RelayPoolNotification::Shutdown) | Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(subscription = %sub_id, skipped, "related data listener lagging");
                    }
                }
            }
        });

        Ok(RelatedSubscription { id, task })
    }

    fn close(&mut self, handle: RelatedSubscription) {
        handle.task.abort();
        let client = self.client.clone();
        self.rt.spawn(async move {
            client.unsubscribe(&handle.id).await;
        });
    }
}
