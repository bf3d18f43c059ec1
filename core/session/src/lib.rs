//! Session core of a remote script-debugging client.
//!
//! This crate keeps the client-side state of a debugging session on top of the
//! typed wire layer in [`inspector_protocol`]. It never frames or parses protocol
//! messages itself; every request goes through a [`Transport`].
//!
//! # Architecture
//!
//! - [`script_registry`]: scripts by id and by URL, discardable anonymous scripts
//!   and source map identities
//! - [`debugger`]: the [`DebuggerSession`]: enablement, breakpoints, pause/resume,
//!   stepping and call frames
//! - [`runtime`]: the [`RuntimeSession`]: execution contexts, evaluation and the
//!   side-effect policy
//! - [`remote`]: [`RemoteValue`], handles and mirrors of runtime values
//! - [`target`]: the [`Target`] pairing both sessions and routing protocol events
//!
//! Strategies in [`policy`], the [`Scheduler`] and the [`SourceMapManager`] are the
//! seams embedders plug into.
//!
//! # Threading
//!
//! Sessions are single-threaded. They are shared as `Rc` and use `Cell`/`RefCell`
//! for their state, so every future they return is `!Send`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//!
//! use futures_lite::future::block_on;
//! use inspector_session::{SmolScheduler, TargetBuilder};
//!
//! let executor = Rc::new(smol::LocalExecutor::new());
//! let target = TargetBuilder::new(transport, Rc::new(SmolScheduler::new(executor))).build();
//! block_on(target.start());
//! let result = block_on(target.debugger().set_breakpoint_by_url("file:///app.js", 3, None, None));
//! ```
//!
//! [`Transport`]: inspector_protocol::Transport

pub mod config;
pub mod debugger;
pub mod error;
pub mod events;
pub mod location;
pub mod policy;
pub mod registry;
pub mod remote;
pub mod runtime;
pub mod scheduler;
pub mod script;
pub mod script_registry;
pub mod source_map;
pub mod target;

pub use config::SessionConfig;
pub use debugger::{DebuggerEvent, DebuggerPausedDetails, DebuggerSession};
pub use error::{SessionError, SessionResult};
pub use events::{EventDispatcher, ListenerId};
pub use location::{Location, LocationRange};
pub use registry::SessionRegistry;
pub use remote::RemoteValue;
pub use runtime::{EvaluationOptions, EvaluationResult, RuntimeEvent, RuntimeSession};
pub use scheduler::{Scheduler, SmolScheduler};
pub use script::Script;
pub use script_registry::ScriptRegistry;
pub use source_map::{NoSourceMaps, SourceMapManager};
pub use target::{Target, TargetBuilder};
