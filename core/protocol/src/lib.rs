//! Wire layer of a CDP-style remote debugging protocol.
//!
//! This crate holds the typed shapes that travel between a debugging client and a
//! script runtime. It knows nothing about session state.
//!
//! # Architecture
//!
//! - [`types`]: identifiers and payloads shared by several domains
//! - [`runtime`] and [`debugger`]: per-domain payloads and typed commands
//! - [`events`]: the out-of-band events, as one tagged [`ProtocolEvent`] enum
//! - [`transport`]: the [`Transport`] seam, the [`Command`] trait and [`ProtocolError`]
//!
//! Commands are plain structs. Each implements [`Command`], which names its wire
//! method and its response type, so `send(transport, &command)` is fully typed
//! from parameters to response.
//!
//! # References
//!
//! - [Chrome DevTools Protocol](https://chromedevtools.github.io/devtools-protocol/)

pub mod debugger;
pub mod events;
pub mod runtime;
pub mod transport;
pub mod types;

pub use events::ProtocolEvent;
pub use transport::{Command, LocalBoxFuture, ProtocolError, Transport, send};
pub use types::*;
