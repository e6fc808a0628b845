//! Periodic live data polling.
//!
//! A worker thread performs the blocking HTTP round (topology, trains,
//! signals and optionally blocks) and sends the decoded outcomes back over a
//! channel. The UI thread calls [`LivePoller::tick`] to schedule rounds and
//! [`LivePoller::pump`] to merge finished rounds into the scene, so the scene
//! is only ever mutated on the thread that owns it.
//!
//! A round is started at most once per interval and never while another is
//! in flight; failed feeds are simply retried on the next round. Each round
//! carries the poller generation; disposing bumps the generation so a late
//! round is dropped instead of touching the scene.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use crate::config::FeedEndpoints;
use crate::error::Result;
use crate::feed::{
    FeedKind, Transport, decode_blocks, decode_signals, decode_topology, decode_trains,
    unwrap_payload,
};
use crate::model::{Signal, Topology, TrackStateReport, Train};
use crate::scene::SceneModel;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedPayload {
    Topology(Topology),
    Trains(Vec<Train>),
    Signals(Vec<Signal>),
    Blocks(Vec<TrackStateReport>),
}

pub type RoundOutcome = Vec<(FeedKind, Result<FeedPayload>)>;

/// Fetch and decode one feed.
pub fn fetch_feed(transport: &dyn Transport, kind: FeedKind, url: &str) -> Result<FeedPayload> {
    let resp = transport.get(url)?;
    let value = unwrap_payload(&resp)?;
    Ok(match kind {
        FeedKind::Topology => FeedPayload::Topology(decode_topology(&value)?),
        FeedKind::Trains => FeedPayload::Trains(decode_trains(&value)?),
        FeedKind::Signals => FeedPayload::Signals(decode_signals(&value)?),
        FeedKind::Blocks => FeedPayload::Blocks(decode_blocks(&value)?),
    })
}

/// Fetch every configured feed once.
pub fn fetch_round(transport: &dyn Transport, endpoints: &FeedEndpoints) -> RoundOutcome {
    let mut feeds = vec![
        (FeedKind::Topology, endpoints.url(&endpoints.network)),
        (FeedKind::Trains, endpoints.url(&endpoints.trains)),
        (FeedKind::Signals, endpoints.url(&endpoints.signals)),
    ];
    if let Some(blocks) = &endpoints.blocks {
        feeds.push((FeedKind::Blocks, endpoints.url(blocks)));
    }
    feeds
        .into_iter()
        .map(|(kind, url)| (kind, fetch_feed(transport, kind, &url)))
        .collect()
}

/// Observable poll state for the status banner.
#[derive(Debug, Clone, Default)]
pub struct PollStatus {
    pub rounds: u64,
    /// Errors of the last merged round, by feed.
    pub errors: BTreeMap<FeedKind, String>,
    pub last_success: Option<Instant>,
}

impl PollStatus {
    pub fn is_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn banner(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(k, e)| format!("{}: {e}", k.label()))
            .collect();
        Some(format!("Live data unavailable, showing last snapshot ({})", parts.join("; ")))
    }
}

/// Merge a finished round into the scene. Failed feeds keep their previous
/// slice. Returns whether anything was applied.
pub fn merge_round(scene: &mut SceneModel, status: &mut PollStatus, outcome: RoundOutcome) -> bool {
    status.rounds += 1;
    status.errors.clear();
    let mut topology = None;
    let mut trains = None;
    let mut signals = None;
    let mut blocks = None;
    for (kind, res) in outcome {
        match res {
            Ok(FeedPayload::Topology(t)) => topology = Some(t),
            Ok(FeedPayload::Trains(t)) => trains = Some(t),
            Ok(FeedPayload::Signals(s)) => signals = Some(s),
            Ok(FeedPayload::Blocks(b)) => blocks = Some(b),
            Err(e) => {
                log::warn!("{} feed failed, keeping previous data: {e}", kind.label());
                status.errors.insert(kind, e.to_string());
            }
        }
    }

    let mut changed = false;
    if let Some(t) = topology {
        // Lines are configuration-level; the feed's own line list is ignored.
        let lines = scene.config().lines.clone();
        scene.apply_topology(t.stations, lines, t.segments);
        changed = true;
    }
    if trains.is_some() || signals.is_some() {
        let trains = trains.unwrap_or_else(|| scene.trains().to_vec());
        let signals = signals.unwrap_or_else(|| scene.signals().to_vec());
        scene.apply_live_entities(trains, signals);
        changed = true;
    }
    if let Some(b) = blocks {
        scene.apply_track_states(b);
        changed = true;
    }
    if status.errors.is_empty() {
        status.last_success = Some(Instant::now());
    }
    changed
}

struct RoundResult {
    generation: u64,
    outcome: RoundOutcome,
}

pub struct LivePoller {
    transport: Arc<dyn Transport>,
    endpoints: FeedEndpoints,
    interval: Duration,
    next_due: Option<Instant>,
    generation: Arc<AtomicU64>,
    requests: Option<Sender<u64>>,
    results: Receiver<RoundResult>,
    in_flight: bool,
    status: PollStatus,
}

impl LivePoller {
    /// Create the poller and start its worker thread. No request is made
    /// until the first [`tick`](Self::tick).
    pub fn spawn(transport: Arc<dyn Transport>, endpoints: FeedEndpoints, interval: Duration) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let (req_tx, req_rx) = mpsc::channel::<u64>();
        let (res_tx, res_rx) = mpsc::channel::<RoundResult>();
        {
            let transport = transport.clone();
            let endpoints = endpoints.clone();
            let generation = generation.clone();
            std::thread::spawn(move || {
                while let Ok(req_gen) = req_rx.recv() {
                    if generation.load(Ordering::Relaxed) != req_gen {
                        continue;
                    }
                    let outcome = fetch_round(transport.as_ref(), &endpoints);
                    if res_tx
                        .send(RoundResult {
                            generation: req_gen,
                            outcome,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                log::debug!("live data worker stopped");
            });
        }
        Self {
            transport,
            endpoints,
            interval,
            next_due: None,
            generation,
            requests: Some(req_tx),
            results: res_rx,
            in_flight: false,
            status: PollStatus::default(),
        }
    }

    pub fn status(&self) -> &PollStatus {
        &self.status
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_disposed(&self) -> bool {
        self.requests.is_none()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Time until the next round may start, for scheduling repaints.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Start a round if one is due and none is in flight.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(requests) = &self.requests else {
            return false;
        };
        if self.in_flight || self.next_due.is_some_and(|due| now < due) {
            return false;
        }
        let generation = self.generation.load(Ordering::Relaxed);
        if requests.send(generation).is_err() {
            log::warn!("live data worker is gone; polling stopped");
            self.requests = None;
            return false;
        }
        self.in_flight = true;
        self.next_due = Some(now + self.interval);
        true
    }

    /// Merge any finished round into `scene`. Returns whether it changed.
    pub fn pump(&mut self, scene: &mut SceneModel) -> bool {
        let mut changed = false;
        while let Ok(round) = self.results.try_recv() {
            if self.is_disposed() || round.generation != self.generation.load(Ordering::Relaxed) {
                log::debug!("dropping stale live data round (generation {})", round.generation);
                continue;
            }
            self.in_flight = false;
            changed |= merge_round(scene, &mut self.status, round.outcome);
        }
        changed
    }

    /// Fetch and merge one round on the calling thread.
    pub fn poll_now(&mut self, scene: &mut SceneModel) -> bool {
        if self.is_disposed() {
            return false;
        }
        let outcome = fetch_round(self.transport.as_ref(), &self.endpoints);
        merge_round(scene, &mut self.status, outcome)
    }

    /// Stop polling. Rounds still in flight are discarded when they arrive.
    pub fn dispose(&mut self) {
        if self.requests.take().is_some() {
            self.generation.fetch_add(1, Ordering::Relaxed);
            self.in_flight = false;
        }
    }
}

impl Drop for LivePoller {
    fn drop(&mut self) {
        self.dispose();
    }
}
