//! Engine event sink port
//!
//! Observers (UI, logging) receive every lifecycle event through this port.
//! Events are emitted in order, one stream per run.

use montage_domain::EngineEvent;

/// Port for observing engine lifecycle events
pub trait EngineEventSink: Send + Sync {
    fn emit(&self, event: &EngineEvent);
}

/// Sink that drops every event
pub struct NullEventSink;

impl EngineEventSink for NullEventSink {
    fn emit(&self, _event: &EngineEvent) {}
}
