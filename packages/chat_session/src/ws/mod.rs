//! Realtime channel: wire protocol, session state, reducer, and the actor
//! that ties them to a live websocket.

pub mod dispatch;
pub mod handle;
pub mod protocol;
mod session;
pub mod state;

pub use handle::{SessionHandle, spawn_session};
