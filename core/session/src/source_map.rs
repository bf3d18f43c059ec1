//! Boundary to the source map collaborator.

use std::rc::Rc;

use inspector_protocol::ExecutionContextId;

use crate::script::Script;

/// Attaches and detaches source maps for scripts.
///
/// Fetching and parsing maps happens behind this trait; the session core only
/// decides when a script gains or loses its map.
pub trait SourceMapManager {
    /// Starts resolving `source_map_url` for `script`.
    fn attach(&self, script: &Rc<Script>, source_url: &str, source_map_url: &str);

    /// Drops the map of `script`.
    fn detach(&self, script: &Rc<Script>);

    /// Turns map resolution on or off.
    fn set_enabled(&self, enabled: bool);

    /// Releases everything held by the manager.
    fn dispose(&self);
}

/// A manager that ignores every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSourceMaps;

impl SourceMapManager for NoSourceMaps {
    fn attach(&self, _script: &Rc<Script>, _source_url: &str, _source_map_url: &str) {}

    fn detach(&self, _script: &Rc<Script>) {}

    fn set_enabled(&self, _enabled: bool) {}

    fn dispose(&self) {}
}

/// Identity under which a script's source map is tracked.
///
/// A script evaluated again with the same URL in the same context shares the
/// identity of its previous incarnation. Scripts without a map have none.
#[must_use]
pub fn source_map_id(
    execution_context_id: ExecutionContextId,
    source_url: &str,
    source_map_url: Option<&str>,
) -> Option<String> {
    source_map_url
        .filter(|url| !url.is_empty())
        .map(|map_url| format!("{execution_context_id}:{source_url}:{map_url}"))
}
