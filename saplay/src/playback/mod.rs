//! Playback state machines
//!
//! - [`Connection`]: the session to the playback service
//! - [`PlaybackStream`]: one stream and its decode session
//! - [`Scheduler`]: the slots and the per-tick (re)start decisions
//! - [`Player`]: the context object tying them together for the event loop

pub mod connection;
pub mod player;
pub mod scheduler;
pub mod stream;

pub use connection::{Connection, ConnectionOutcome, ConnectionPhase};
pub use player::{Player, PlayerOptions};
pub use scheduler::{Scheduler, Slot, SlotFault};
pub use stream::{PlaybackStream, StreamPhase};
