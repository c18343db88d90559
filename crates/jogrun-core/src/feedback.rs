//! Feedback sinks.
//!
//! The core decides *when* something happened and hands the event to a
//! sink. Audio, haptics or printing are the sink's business. A failing sink
//! never affects timer progression: errors are logged and dropped by
//! [`deliver`].

use std::io::Write;

use thiserror::Error;

use crate::events::Event;

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait FeedbackSink {
    fn emit(&mut self, event: &Event) -> Result<(), FeedbackError>;
}

impl<S: FeedbackSink + ?Sized> FeedbackSink for Box<S> {
    fn emit(&mut self, event: &Event) -> Result<(), FeedbackError> {
        (**self).emit(event)
    }
}

/// Hand every event to the sink, swallowing failures.
pub fn deliver<S: FeedbackSink + ?Sized>(sink: &mut S, events: &[Event]) {
    for event in events {
        if let Err(e) = sink.emit(event) {
            tracing::warn!(event = event.kind(), error = %e, "feedback sink failed");
        }
    }
}

/// Logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FeedbackSink for TracingSink {
    fn emit(&mut self, event: &Event) -> Result<(), FeedbackError> {
        match event {
            Event::StateSnapshot { .. } | Event::PhaseDetected { .. } => {
                tracing::debug!(?event, "feedback");
            }
            _ => {
                tracing::info!(event = event.kind(), "feedback");
            }
        }
        Ok(())
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<Event>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.iter().map(Event::kind).collect()
    }
}

impl FeedbackSink for RecordingSink {
    fn emit(&mut self, event: &Event) -> Result<(), FeedbackError> {
        self.events.push(event.clone());
        Ok(())
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FeedbackSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &Event) -> Result<(), FeedbackError> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}
