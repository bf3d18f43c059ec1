//! Session configuration.
//!
//! [`SessionConfig`] carries the user-facing debugger settings. It can be built
//! in code or parsed from a partial JSON document; missing keys keep their
//! defaults.

use inspector_protocol::debugger::PauseOnExceptionsState;
use serde::{Deserialize, Serialize};

/// Async call chains collected while async stack traces are enabled.
pub const MAX_ASYNC_STACK_CHAIN_DEPTH: u32 = 32;

const SCRIPTS_CACHE_SIZE: f64 = 100e6;
const REMOTE_SCRIPTS_CACHE_SIZE: f64 = 10e6;

/// Debugger settings of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct SessionConfig {
    /// Pause when an exception is thrown.
    pub pause_on_exception_enabled: bool,
    /// Also pause on caught exceptions.
    pub pause_on_caught_exception: bool,
    /// Do not collect async stack traces.
    pub disable_async_stack_traces: bool,
    /// Whether breakpoints are active.
    pub breakpoints_active: bool,
    /// Whether source maps are resolved.
    pub js_source_maps_enabled: bool,
    /// The frontend talks to a remote backend; keeps the script cache small.
    pub remote_frontend: bool,
    /// Stop before every script runs so breakpoints can be synchronized.
    pub instrumentation_breakpoints: bool,
    /// Enable custom object formatters.
    pub custom_formatters: bool,
    /// Rewrite `file://` URLs into Windows paths.
    pub windows_paths: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pause_on_exception_enabled: false,
            pause_on_caught_exception: false,
            disable_async_stack_traces: false,
            breakpoints_active: true,
            js_source_maps_enabled: true,
            remote_frontend: false,
            instrumentation_breakpoints: false,
            custom_formatters: false,
            windows_paths: cfg!(windows),
        }
    }
}

impl SessionConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when `json` is not a valid configuration object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Pause-on-exceptions state sent to the backend.
    #[must_use]
    pub const fn pause_on_exceptions_state(&self) -> PauseOnExceptionsState {
        match (self.pause_on_exception_enabled, self.pause_on_caught_exception) {
            (false, _) => PauseOnExceptionsState::None,
            (true, false) => PauseOnExceptionsState::Uncaught,
            (true, true) => PauseOnExceptionsState::All,
        }
    }

    /// Async call stack depth sent to the backend.
    #[must_use]
    pub const fn async_stack_depth(&self) -> u32 {
        if self.disable_async_stack_traces {
            0
        } else {
            MAX_ASYNC_STACK_CHAIN_DEPTH
        }
    }

    /// Script cache size requested when the debugger is enabled.
    #[must_use]
    pub const fn max_scripts_cache_size(&self) -> f64 {
        if self.remote_frontend {
            REMOTE_SCRIPTS_CACHE_SIZE
        } else {
            SCRIPTS_CACHE_SIZE
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let config = SessionConfig::from_json(r#"{ "remoteFrontend": true }"#).unwrap();
        assert!(config.remote_frontend);
        assert!(config.breakpoints_active);
        assert_eq!(config.max_scripts_cache_size(), 10e6);
        assert_eq!(config.async_stack_depth(), 32);
    }

    #[test_case(false, false, PauseOnExceptionsState::None)]
    #[test_case(false, true, PauseOnExceptionsState::None)]
    #[test_case(true, false, PauseOnExceptionsState::Uncaught)]
    #[test_case(true, true, PauseOnExceptionsState::All)]
    fn pause_on_exceptions(enabled: bool, caught: bool, expected: PauseOnExceptionsState) {
        let config = SessionConfig {
            pause_on_exception_enabled: enabled,
            pause_on_caught_exception: caught,
            ..SessionConfig::default()
        };
        assert_eq!(config.pause_on_exceptions_state(), expected);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(SessionConfig::from_json(r#"{ "breakpointsActive": "yes" }"#).is_err());
    }
}
