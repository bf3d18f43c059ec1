//! Bookkeeping of parsed scripts.
//!
//! The registry is embedded in the debugger session and does no I/O. Methods
//! that drop scripts or source map identities hand them back to the caller,
//! which is responsible for detaching maps and firing events.

use std::{
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use indexmap::IndexMap;
use inspector_protocol::{ExecutionContextId, ScriptId};

use crate::{location::Location, script::Script};

/// Number of discardable scripts that triggers an eviction.
pub const DISCARDABLE_SCRIPTS_LIMIT: usize = 1000;

/// Number of discardable scripts evicted at once.
pub const DISCARDABLE_SCRIPTS_EVICTION_BATCH: usize = 100;

/// Scripts of one debugger session.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: IndexMap<ScriptId, Rc<Script>>,
    // Newest first.
    by_source_url: HashMap<String, Vec<Rc<Script>>>,
    discardable: VecDeque<Rc<Script>>,
    source_maps: HashMap<String, Rc<Script>>,
}

impl ScriptRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a script by id.
    #[must_use]
    pub fn get(&self, script_id: &ScriptId) -> Option<Rc<Script>> {
        self.scripts.get(script_id).cloned()
    }

    /// Every registered script, in registration order.
    #[must_use]
    pub fn scripts(&self) -> Vec<Rc<Script>> {
        self.scripts.values().cloned().collect()
    }

    /// Number of registered scripts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Returns `true` if no script is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Adds a script. Scripts with a URL become the first entry of their URL list.
    pub fn register(&mut self, script: Rc<Script>) {
        self.scripts.insert(script.script_id.clone(), Rc::clone(&script));
        if script.is_anonymous_script() {
            return;
        }
        self.by_source_url
            .entry(script.source_url.clone())
            .or_default()
            .insert(0, script);
    }

    /// Removes a script and its URL list entry.
    pub fn unregister(&mut self, script: &Script) {
        self.scripts.shift_remove(&script.script_id);
        if script.is_anonymous_script() {
            return;
        }
        if let Some(list) = self.by_source_url.get_mut(&script.source_url) {
            list.retain(|candidate| candidate.script_id != script.script_id);
            if list.is_empty() {
                self.by_source_url.remove(&script.source_url);
            }
        }
    }

    /// Scripts sharing `source_url`, newest first.
    #[must_use]
    pub fn scripts_for_source_url(&self, source_url: Option<&str>) -> Vec<Rc<Script>> {
        source_url
            .and_then(|url| self.by_source_url.get(url))
            .cloned()
            .unwrap_or_default()
    }

    /// Scripts compiled in a given execution context.
    #[must_use]
    pub fn scripts_for_execution_context(
        &self,
        execution_context_id: ExecutionContextId,
    ) -> Vec<Rc<Script>> {
        self.scripts
            .values()
            .filter(|script| script.execution_context_id == execution_context_id)
            .cloned()
            .collect()
    }

    /// Smallest column offset among scripts of `source_url` that start on `line_number`.
    ///
    /// A zero offset counts as "not found yet", so a later non-zero offset
    /// replaces it.
    #[must_use]
    pub fn min_column_for_line(&self, source_url: &str, line_number: u32) -> u32 {
        self.scripts_for_source_url(Some(source_url))
            .iter()
            .filter(|script| script.line_offset == line_number)
            .fold(0, |min, script| {
                if min == 0 {
                    script.column_offset
                } else {
                    min.min(script.column_offset)
                }
            })
    }

    /// Returns a location in the newest script of `source_url` that covers the position.
    #[must_use]
    pub fn raw_location_by_url(
        &self,
        source_url: &str,
        line_number: u32,
        column_number: Option<u32>,
        inline_frame_index: u32,
    ) -> Option<Location> {
        self.by_source_url
            .get(source_url)?
            .iter()
            .find(|script| script.contains_location(line_number, column_number))
            .map(|script| {
                let mut location = script.raw_location(line_number, column_number);
                location.inline_frame_index = inline_frame_index;
                location
            })
    }

    /// Queues an anonymous script that failed to parse.
    ///
    /// Once the queue reaches [`DISCARDABLE_SCRIPTS_LIMIT`], the oldest
    /// [`DISCARDABLE_SCRIPTS_EVICTION_BATCH`] scripts are unregistered and returned.
    pub fn push_discardable(&mut self, script: Rc<Script>) -> Vec<Rc<Script>> {
        self.discardable.push_back(script);
        if self.discardable.len() < DISCARDABLE_SCRIPTS_LIMIT {
            return Vec::new();
        }
        let evicted: Vec<Rc<Script>> = self
            .discardable
            .drain(..DISCARDABLE_SCRIPTS_EVICTION_BATCH)
            .collect();
        for script in &evicted {
            self.unregister(script);
        }
        evicted
    }

    /// Number of queued discardable scripts.
    #[must_use]
    pub fn discardable_count(&self) -> usize {
        self.discardable.len()
    }

    /// Binds a source map identity to `script`, returning the script it replaced.
    pub fn bind_source_map(&mut self, source_map_id: String, script: Rc<Script>) -> Option<Rc<Script>> {
        self.source_maps.insert(source_map_id, script)
    }

    /// Unbinds `source_map_id` if it is bound to `script`.
    pub fn unbind_source_map(&mut self, source_map_id: &str, script: &Rc<Script>) {
        if self
            .source_maps
            .get(source_map_id)
            .is_some_and(|bound| Rc::ptr_eq(bound, script))
        {
            self.source_maps.remove(source_map_id);
        }
    }

    /// Unbinds every source map of an execution context and returns the scripts.
    pub fn unbind_source_maps_of_context(
        &mut self,
        execution_context_id: ExecutionContextId,
    ) -> Vec<Rc<Script>> {
        let mut unbound = Vec::new();
        self.source_maps.retain(|_, script| {
            if script.execution_context_id == execution_context_id {
                unbound.push(Rc::clone(script));
                false
            } else {
                true
            }
        });
        unbound
    }

    /// Forgets everything and returns the scripts that had a source map bound.
    pub fn clear(&mut self) -> Vec<Rc<Script>> {
        let with_maps = self.source_maps.drain().map(|(_, script)| script).collect();
        self.scripts.clear();
        self.by_source_url.clear();
        self.discardable.clear();
        with_maps
    }
}
