use std::collections::HashSet;
use std::sync::mpsc::Sender;

use anyhow::Result;
use nostr_sdk::prelude::*;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::FeedSignal;
use crate::store::SettleSource;

/// Feeds one subscription's events into a `FeedSession` owned by another thread.
///
/// The local database is replayed first and reported as the cache source. The relay
/// subscription follows, and counts as settled once every relay in the pool has sent
/// EOSE (or CLOSED) for it.
pub struct FeedDriver {
    subscription_id: SubscriptionId,
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FeedDriver {
    pub fn spawn(
        rt: &Handle,
        client: Client,
        filter: Filter,
        signal_tx: Sender<FeedSignal>,
    ) -> Self {
        let subscription_id = SubscriptionId::generate();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let id = subscription_id.clone();
        let task = rt.spawn(async move {
            if let Err(e) = run_feed(&client, filter, &id, signal_tx, cancel_rx).await {
                warn!(subscription = %id, "feed driver stopped: {}", e);
            }
            client.unsubscribe(&id).await;
            debug!(subscription = %id, "feed driver finished");
        });

        Self {
            subscription_id,
            cancel_tx,
            task,
        }
    }

    pub fn subscription_id(&self) -> &SubscriptionId {
        &self.subscription_id
    }

    /// Signal the driver task to unsubscribe and exit.
    pub fn stop(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FeedDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_feed(
    client: &Client,
    filter: Filter,
    sub_id: &SubscriptionId,
    signal_tx: Sender<FeedSignal>,
    mut cancel_rx: watch::Receiver<bool>,
) -> Result<()> {
    // Subscribe to the pool before the REQ goes out so no relay event slips past
    let mut notifications = client.notifications();

    let cached = client.database().query(filter.clone()).await?;
    debug!(subscription = %sub_id, count = cached.len(), "replaying cached events");
    for event in cached {
        signal_tx.send(FeedSignal::Event(Box::new(event)))?;
    }
    signal_tx.send(FeedSignal::EndOfStoredEvents(SettleSource::Cache))?;

    let expected_relays = client.relays().await.len().max(1);
    client.subscribe_with_id(sub_id.clone(), filter, None).await?;
    info!(subscription = %sub_id, relays = expected_relays, "feed subscription open");

    let mut finished_relays: HashSet<RelayUrl> = HashSet::new();
    let mut network_settled = false;

    loop {
        tokio::select! {
            _ = cancel_rx.changed() => {
                if *cancel_rx.borrow() {
                    debug!(subscription = %sub_id, "feed driver cancelled");
                    break;
                }
            }
            result = notifications.recv() => {
                match result {
                    Ok(RelayPoolNotification::Event { subscription_id, event, .. }) => {
                        if subscription_id == *sub_id {
                            signal_tx.send(FeedSignal::Event(event))?;
                        }
                    }
                    Ok(RelayPoolNotification::Message { relay_url, message }) => {
                        let done = match &message {
                            RelayMessage::EndOfStoredEvents(id) => **id == *sub_id,
                            RelayMessage::Closed { subscription_id, message } => {
                                if **subscription_id == *sub_id {
                                    warn!(
                                        relay = %relay_url,
                                        "relay closed feed subscription: {}",
                                        message
                                    );
                                    true
                                } else {
                                    false
                                }
                            }
                            _ => false,
                        };

                        if done
                            && finished_relays.insert(relay_url)
                            && !network_settled
                            && finished_relays.len() >= expected_relays
                        {
                            network_settled = true;
                            signal_tx.send(FeedSignal::EndOfStoredEvents(SettleSource::Network))?;
                        }
                    }
                    Ok(RelayPoolNotification::Shutdown) => {
                        debug!("relay pool shut down");
                        break;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(subscription = %sub_id, skipped, "feed driver lagging");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}
