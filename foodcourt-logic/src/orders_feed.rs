use std::{collections::HashSet, sync::Arc, time::Duration};

use log::warn;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{backend::Backend, model::LiveOrder, tracker::StateUpdateSender};

/// Raises user-facing notifications for the admin dashboard.
pub trait Notifier: Send + Sync + 'static {
    fn notify_new_orders(&self, count: usize);
}

/// The admin's live view of active orders. Polls [Backend] on a fixed cadence
/// (even while backgrounded) and raises one notification per poll that brings
/// order ids the previous successful poll did not have.
///
/// The first successful poll seeds the baseline silently, otherwise every
/// order that existed before the view mounted would be reported as new.
/// Callers must verify the admin role before constructing the feed, a
/// non-admin never gets a polling loop at all.
pub struct LiveOrdersFeed<B: Backend, S: StateUpdateSender, N: Notifier> {
    backend: Arc<B>,
    updates: S,
    notifier: N,
    interval: Duration,
    orders: RwLock<Vec<LiveOrder>>,
    cancel: CancellationToken,
}

impl<B: Backend, S: StateUpdateSender, N: Notifier> LiveOrdersFeed<B, S, N> {
    pub fn new(backend: Arc<B>, updates: S, notifier: N, interval: Duration) -> Self {
        Self {
            backend,
            updates,
            notifier,
            interval,
            orders: RwLock::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn orders(&self) -> Vec<LiveOrder> {
        self.orders.read().await.clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    async fn poll(&self, seen: &mut Option<HashSet<Uuid>>) {
        let orders = match self.backend.fetch_active_orders().await {
            Ok(orders) => orders,
            Err(why) => {
                // A failed poll is logged and leaves the baseline untouched
                warn!("Failed to fetch active orders: {why:?}");
                return;
            }
        };

        let ids = orders.iter().map(|order| order.order_id).collect::<HashSet<_>>();

        if let Some(previous) = seen {
            let new_count = ids.difference(previous).count();
            if new_count > 0 {
                self.notifier.notify_new_orders(new_count);
            }
        }
        *seen = Some(ids);

        *self.orders.write().await = orders;
        self.updates.send_update();
    }

    pub async fn main_loop(&self) {
        let mut interval = tokio::time::interval(self.interval);
        // Baseline of the previous successful poll
        let mut seen: Option<HashSet<Uuid>> = None;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break;
                }

                _ = interval.tick() => {
                    self.poll(&mut seen).await;
                }
            }
        }
    }
}
