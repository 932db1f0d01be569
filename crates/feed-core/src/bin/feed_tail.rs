use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use nostr_sdk::prelude::*;
use parking_lot::Mutex;
use tokio::runtime::Runtime;

use feed_core::constants::{kinds, RELAY_URL};
use feed_core::models::tag_utils::{extract_tag_str, referenced_event_ids};
use feed_core::nostr::{FeedDriver, NostrRelatedDataTransport};
use feed_core::tracing_setup::init_tracing;
use feed_core::{FeedConfig, FeedItem, FeedSession, RelatedDataSink, SystemClock};

/// Counts reactions and zap receipts per referenced note
#[derive(Default)]
struct ReactionTally {
    counts: Mutex<HashMap<EventId, (u64, u64)>>,
}

impl ReactionTally {
    fn get(&self, id: &EventId) -> (u64, u64) {
        self.counts.lock().get(id).copied().unwrap_or_default()
    }
}

impl RelatedDataSink for ReactionTally {
    fn on_event(&self, event: &Event) {
        let mut counts = self.counts.lock();
        for id in referenced_event_ids(event) {
            let (reactions, zaps) = counts.entry(id).or_default();
            if event.kind.as_u16() == kinds::ZAP_RECEIPT {
                *zaps += 1;
            } else {
                *reactions += 1;
            }
        }
    }

    fn on_events_batch(&self, events: &[Event]) {
        for event in events {
            self.on_event(event);
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let relay = args.next().unwrap_or_else(|| RELAY_URL.to_string());
    let run_for = Duration::from_secs(args.next().and_then(|s| s.parse().ok()).unwrap_or(30));

    let rt = Runtime::new()?;
    let client = Client::default();

    println!("Connecting to {}...", relay);
    rt.block_on(async {
        client.add_relay(relay.as_str()).await?;
        tokio::time::timeout(Duration::from_secs(5), client.connect()).await.ok();
        Ok::<_, anyhow::Error>(())
    })?;
    println!("Connected!");

    let feed_kinds = kinds::CONTENT
        .iter()
        .chain([
            kinds::REPOST,
            kinds::GENERIC_REPOST,
            kinds::BOOKMARK_LIST,
            kinds::DELETION,
        ]
        .iter())
        .map(|k| Kind::from(*k));
    let filter = Filter::new().kinds(feed_kinds).limit(100);

    let (signal_tx, signal_rx) = mpsc::channel();
    let driver = FeedDriver::spawn(rt.handle(), client.clone(), filter, signal_tx);

    let tally = Arc::new(ReactionTally::default());
    let transport = NostrRelatedDataTransport::new(client.clone(), rt.handle().clone());
    let mut session = FeedSession::new(
        FeedConfig::default(),
        None,
        transport,
        tally.clone(),
        Arc::new(SystemClock),
    );
    session.set_active_index(Some(0));

    let deadline = Instant::now() + run_for;
    while Instant::now() < deadline {
        match signal_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(signal) => {
                session.apply(signal);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        session.tick();

        if session.is_settled() && session.pending_count() > 0 {
            println!("  {} new entries", session.pending_count());
            session.flush("tail");
        }
    }

    println!("\n=== Feed ({} entries) ===", session.reconciler().rendered_ids().len());
    for item in session.render_list() {
        let Some(entry) = item.as_entry() else {
            if let FeedItem::Prepend(header) = item {
                println!("[{}]", header.key);
            }
            continue;
        };
        let Some(event) = entry.event.as_ref() else {
            continue;
        };

        let summary = if event.kind.as_u16() == kinds::LONG_FORM {
            extract_tag_str(event, "title").unwrap_or("(untitled article)").to_string()
        } else {
            event.content.chars().take(80).collect::<String>().replace('\n', " ")
        };
        let (reactions, zaps) = tally.get(&entry.id);

        println!("  id: {}", &entry.id.to_hex()[..16]);
        println!("  kind: {}  at: {}", event.kind.as_u16(), entry.timestamp.as_secs());
        if let Some(reposter) = entry.latest_reposter() {
            println!("  reposted by: {}", &reposter.to_hex()[..16]);
        }
        println!("  reactions: {}  zaps: {}", reactions, zaps);
        println!("  {}", summary);
        println!();
    }

    let stats = session.stats().snapshot();
    println!("=== Stats ===");
    println!(
        "events: {}  duplicates: {}  unrecognized: {}  flushes: {}",
        stats.total, stats.duplicates, stats.unrecognized, stats.flushes
    );
    println!(
        "window subscriptions: {} open, {} opened in total",
        stats.subscriptions_open(),
        stats.subscriptions_opened
    );
    for (kind, count) in stats.kinds_by_count() {
        println!("  kind {}: {}", kind, count);
    }

    driver.stop();
    drop(session);
    rt.block_on(client.disconnect());

    println!("\n=== Done ===");
    Ok(())
}
