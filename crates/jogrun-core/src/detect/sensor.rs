//! Sensor subscriptions and signal conditioning.
//!
//! Platform sources (pedometer, GPS) live outside the core. They implement
//! [`SensorSource`] and push scalar readings through the [`SensorFeed`] they
//! were handed on subscribe. A feed stops delivering the moment its
//! [`Subscription`] is cancelled, and every reading carries its subscription
//! id so the consumer can drop readings that were already queued.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::timer::AutoDetectMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Steps per minute.
    Cadence,
    /// Metres per second.
    GpsSpeed,
}

impl SensorKind {
    pub fn for_mode(mode: AutoDetectMode) -> Option<Self> {
        match mode {
            AutoDetectMode::Off => None,
            AutoDetectMode::Treadmill => Some(SensorKind::Cadence),
            AutoDetectMode::Outdoor => Some(SensorKind::GpsSpeed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub subscription: SubscriptionId,
    pub kind: SensorKind,
    pub value: f64,
}

/// Delivery callback; returns `false` once the consumer is gone.
pub type Deliver = Arc<dyn Fn(SensorReading) -> bool + Send + Sync>;

/// Push side of a subscription, handed to a [`SensorSource`].
#[derive(Clone)]
pub struct SensorFeed {
    id: SubscriptionId,
    kind: SensorKind,
    active: Arc<AtomicBool>,
    deliver: Deliver,
}

impl SensorFeed {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Deliver one reading. No-op after the subscription is cancelled.
    pub fn push(&self, value: f64) -> bool {
        if !self.is_active() {
            return false;
        }
        (self.deliver)(SensorReading {
            subscription: self.id,
            kind: self.kind,
            value,
        })
    }
}

impl fmt::Debug for SensorFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorFeed")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Cancellation handle for one feed. Dropping it cancels.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    kind: SensorKind,
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A platform data source delivering one scalar metric.
pub trait SensorSource: Send {
    fn kind(&self) -> SensorKind;

    /// Hardware present and permission granted.
    fn is_available(&self) -> bool {
        true
    }

    /// Begin pushing readings into `feed`.
    fn subscribe(&mut self, feed: SensorFeed);

    /// Stop pushing. The feed is already cancelled when this runs.
    fn unsubscribe(&mut self);
}

/// Owns the sensor sources and keeps at most one of them subscribed.
#[derive(Default)]
pub struct SensorHub {
    sources: Vec<Box<dyn SensorSource>>,
    active: Option<Subscription>,
    /// Kind that failed to subscribe; not probed again until the mode changes.
    unavailable: Option<SensorKind>,
    next_id: u64,
}

impl SensorHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, replacing any earlier one of the same kind.
    pub fn with_source(mut self, source: Box<dyn SensorSource>) -> Self {
        let kind = source.kind();
        self.sources.retain(|s| s.kind() != kind);
        self.sources.push(source);
        self
    }

    pub fn active_subscription(&self) -> Option<&Subscription> {
        self.active.as_ref()
    }

    /// Subscribe the source matching `mode`, cancelling any other.
    pub fn sync(&mut self, mode: AutoDetectMode, deliver: &Deliver) {
        let wanted = SensorKind::for_mode(mode);
        if wanted.is_some() && self.unavailable == wanted {
            return;
        }
        self.unavailable = None;
        if self.active.as_ref().map(|s| s.kind()) == wanted {
            return;
        }
        self.unsubscribe_all();

        let Some(kind) = wanted else {
            return;
        };
        let Some(source) = self.sources.iter_mut().find(|s| s.kind() == kind) else {
            tracing::warn!(?kind, "no sensor source registered; metric stays at 0");
            self.unavailable = Some(kind);
            return;
        };
        if !source.is_available() {
            tracing::warn!(?kind, "sensor unavailable; metric stays at 0");
            self.unavailable = Some(kind);
            return;
        }

        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let active = Arc::new(AtomicBool::new(true));
        source.subscribe(SensorFeed {
            id,
            kind,
            active: Arc::clone(&active),
            deliver: Arc::clone(deliver),
        });
        tracing::debug!(%id, ?kind, "sensor subscribed");
        self.active = Some(Subscription { id, kind, active });
    }

    /// Cancel the active feed and tell its source to stop.
    pub fn unsubscribe_all(&mut self) {
        let Some(sub) = self.active.take() else {
            return;
        };
        sub.cancel();
        if let Some(source) = self.sources.iter_mut().find(|s| s.kind() == sub.kind()) {
            source.unsubscribe();
        }
        tracing::debug!(id = %sub.id(), "sensor unsubscribed");
    }

    /// Whether a reading belongs to the live subscription.
    pub fn accepts(&self, reading: &SensorReading) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.is_active() && s.id() == reading.subscription)
    }
}

impl fmt::Debug for SensorHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorHub")
            .field("sources", &self.sources.iter().map(|s| s.kind()).collect::<Vec<_>>())
            .field("active", &self.active)
            .field("unavailable", &self.unavailable)
            .finish()
    }
}

impl Drop for SensorHub {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

/// Converts cumulative step counts into steps per minute over a rolling window.
#[derive(Debug, Clone)]
pub struct CadenceWindow {
    window_ms: u64,
    samples: VecDeque<(u64, u64)>,
}

impl CadenceWindow {
    pub const DEFAULT_WINDOW_MS: u64 = 5_000;

    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            samples: VecDeque::new(),
        }
    }

    /// Record the cumulative step count observed at `at_ms`.
    ///
    /// Returns the cadence once the window holds two samples spanning a
    /// positive time.
    pub fn push(&mut self, at_ms: u64, total_steps: u64) -> Option<f64> {
        self.samples.push_back((at_ms, total_steps));
        let cutoff = at_ms.saturating_sub(self.window_ms);
        while self.samples.front().is_some_and(|&(t, _)| t < cutoff) {
            self.samples.pop_front();
        }
        let (&(t0, s0), &(t1, s1)) = (self.samples.front()?, self.samples.back()?);
        if self.samples.len() < 2 || t1 <= t0 {
            return None;
        }
        let secs = (t1 - t0) as f64 / 1000.0;
        Some(s1.saturating_sub(s0) as f64 / secs * 60.0)
    }
}

impl Default for CadenceWindow {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW_MS)
    }
}

/// Drops GPS speeds reported as unavailable (negative or non-finite).
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedFilter {
    last: f64,
}

impl SpeedFilter {
    /// Returns the speed if it is usable; the last good value is kept otherwise.
    pub fn accept(&mut self, speed: f64) -> Option<f64> {
        if !speed.is_finite() || speed < 0.0 {
            return None;
        }
        self.last = speed;
        Some(speed)
    }

    pub fn current(&self) -> f64 {
        self.last
    }
}
