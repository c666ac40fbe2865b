//! Poll driver for backends without push notifications

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace};

use crate::provider::{AnyProvider, EventSender, SpaceEvent};

/// Handle to a running poll task
///
/// The task refreshes once immediately, then on every interval tick and
/// every activity notification, until stopped.
pub struct PollDriver {
    shutdown: watch::Sender<bool>,
    _task: JoinHandle<()>,
}

impl PollDriver {
    pub fn spawn(
        provider: Arc<AnyProvider>,
        interval: Option<Duration>,
        activity: Arc<Notify>,
        events: EventSender,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_poll_loop(
            provider,
            interval,
            activity,
            events,
            shutdown_rx,
        ));
        Self {
            shutdown,
            _task: task,
        }
    }

    /// Ask the task to exit; a refresh already in flight still completes
    pub fn stop(self) {
        let _ = self.shutdown.send(true);
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Query once and forward the snapshot; `false` once nobody is listening
async fn refresh(provider: &AnyProvider, events: &EventSender) -> bool {
    let spaces = provider.get_spaces_with_windows().await.unwrap_or_default();
    trace!(spaces = spaces.len(), "Polled spaces");
    events.send(SpaceEvent::InitialState(spaces)).await.is_ok()
}

async fn run_poll_loop(
    provider: Arc<AnyProvider>,
    interval: Option<Duration>,
    activity: Arc<Notify>,
    events: EventSender,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval.map(|period| {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });

    debug!(interval = ?interval, "Poll driver started");

    if !refresh(&provider, &events).await {
        return;
    }

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = activity.notified() => trace!("Refresh requested"),
            _ = tick(&mut ticker) => {}
        }

        if !refresh(&provider, &events).await {
            break;
        }
    }

    debug!("Poll driver stopped");
}
