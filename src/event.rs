//! Discrete notifications for the rendering layer.
//!
//! Events queue up inside the engine and are handed out by `drain_events`;
//! the renderer redraws on its own schedule.

use serde::Serialize;

use crate::builder::Diagnostic;

/// Something a renderer may want to react to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayoutEvent {
    /// Part of a binding snapshot was skipped.
    Diagnostic(Diagnostic),
    /// The simulation was re-energized by a pin or a structural change.
    Reheat { alpha: f64 },
    /// Alpha reached the settle threshold.
    Settle { steps: u64 },
}
