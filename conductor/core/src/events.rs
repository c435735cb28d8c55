//! Surface Events
//!
//! Events sent from the UI surface to the turn controller. The surface does
//! not interpret what they mean; it just reports what the user did.

use serde::{Deserialize, Serialize};

/// Events from the UI surface to the controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    /// User pressed Enter (or Send) with the current input text
    Submit {
        /// Raw input text, untrimmed
        text: String,
    },

    /// User asked to abandon the pending turn
    Cancel,

    /// User wants to quit
    Quit,
}

impl SurfaceEvent {
    /// Build a submit event
    pub fn submit(text: impl Into<String>) -> Self {
        Self::Submit { text: text.into() }
    }
}
