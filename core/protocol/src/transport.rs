//! Transport seam and typed command dispatch.
//!
//! Framing, reconnects and request/response correlation all live behind
//! [`Transport`]. The session core only ever calls [`Transport::invoke`].

use std::{future::Future, pin::Pin};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

/// A boxed, non-`Send` future. Sessions are single threaded.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Errors produced while talking to the backend.
///
/// Every variant is recoverable: callers turn them into empty results or
/// `{error}` values rather than aborting the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The backend answered with an `error` field.
    #[error("{0}")]
    Remote(String),

    /// The command parameters could not be encoded.
    #[error("failed to serialize params for {method}: {message}")]
    Serialize {
        /// Wire method of the command.
        method: &'static str,
        /// Encoder message.
        message: String,
    },

    /// The response did not match the expected shape.
    #[error("malformed response for {method}: {message}")]
    Deserialize {
        /// Wire method of the command.
        method: &'static str,
        /// Decoder message.
        message: String,
    },

    /// The connection is gone.
    #[error("connection closed")]
    Closed,
}

impl ProtocolError {
    /// Returns the backend message, if the error came from the backend.
    #[must_use]
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Remote(message) => Some(message),
            _ => None,
        }
    }
}

/// A trait for transporting protocol requests.
///
/// Implementations must put the request on the wire when `invoke` is called. The
/// returned future only waits for the matching response, so commands issued back
/// to back reach the backend in issue order even when awaited later.
pub trait Transport {
    /// Sends `method` with `params` and resolves to the raw `result` object.
    ///
    /// A response carrying an `error` field resolves to [`ProtocolError::Remote`].
    fn invoke(&self, method: &'static str, params: Value)
    -> LocalBoxFuture<'_, Result<Value, ProtocolError>>;
}

/// A typed protocol command.
pub trait Command: Serialize {
    /// Wire method, e.g. `Debugger.enable`.
    const NAME: &'static str;

    /// Shape of the `result` object.
    type Response: DeserializeOwned;
}

/// Sends `command` through `transport` and decodes its response.
///
/// The request is issued before this function returns; only decoding waits on
/// the returned future.
pub fn send<'t, C: Command>(
    transport: &'t dyn Transport,
    command: &C,
) -> impl Future<Output = Result<C::Response, ProtocolError>> + use<'t, C> {
    let call = serde_json::to_value(command)
        .map(|params| transport.invoke(C::NAME, params))
        .map_err(|err| ProtocolError::Serialize {
            method: C::NAME,
            message: err.to_string(),
        });

    async move {
        let value = call?.await?;
        serde_json::from_value(value).map_err(|err| ProtocolError::Deserialize {
            method: C::NAME,
            message: err.to_string(),
        })
    }
}

/// Implements [`Command`] for a params struct.
macro_rules! command {
    ($params:ty => $name:literal, $response:ty) => {
        impl $crate::transport::Command for $params {
            const NAME: &'static str = $name;
            type Response = $response;
        }
    };
}

pub(crate) use command;
