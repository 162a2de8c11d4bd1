//! Session services for WunderBubble: the single-flight weather pipeline,
//! the participant roster, and the session object hosts embed.

pub mod fetch;
pub mod fetch_state;
pub mod roster;
pub mod session;

pub use fetch::{FetchError, FetchFailure, FetchOrchestrator, FetchOutcome};
pub use fetch_state::FetchState;
pub use roster::{MapMarker, Roster, RosterEntry};
pub use session::{BubbleMode, BubbleSession, SessionParts, SharePrompt};
