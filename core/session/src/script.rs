//! Parsed scripts.

use std::{cell::RefCell, fmt, rc::Rc};

use inspector_protocol::{
    ExecutionContextId, ProtocolError, ScriptId, StackTrace, Transport,
    debugger::{GetScriptSource, ScriptLanguage},
    events::ScriptParsedEvent,
    send,
};
use smol::lock::OnceCell;

use crate::location::Location;

/// Source text of a script, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    /// JavaScript source, or a disassembly for WebAssembly.
    pub text: String,
    /// Base64 WebAssembly bytecode, if any.
    pub bytecode: Option<String>,
}

/// A script reported by the backend.
///
/// Scripts are owned by the debugger session's registry and shared as
/// `Rc<Script>`. Everything except the source map URL is fixed at parse time.
pub struct Script {
    /// Session-unique id.
    pub script_id: ScriptId,
    /// `sourceURL` or resource URL; empty for anonymous scripts.
    pub source_url: String,
    /// First line of the script inside its resource.
    pub line_offset: u32,
    /// First column on `line_offset`.
    pub column_offset: u32,
    /// Last line.
    pub end_line: u32,
    /// Last column on `end_line`.
    pub end_column: u32,
    /// Context the script was compiled in.
    pub execution_context_id: ExecutionContextId,
    /// Content hash computed by the backend.
    pub hash: String,
    /// Compiled in a non-default (extension) context.
    pub is_content_script: bool,
    /// Result of a live edit.
    pub is_live_edit: bool,
    /// The URL came from a `//# sourceURL` comment.
    pub has_source_url: bool,
    /// Length of the source in UTF-16 code units.
    pub length: u32,
    /// Parsed as an ES module.
    pub is_module: bool,
    /// Source language.
    pub language: ScriptLanguage,
    /// Compilation failed.
    pub has_syntax_error: bool,
    /// Where the script was created from, if the backend recorded it.
    pub origin_stack_trace: Option<StackTrace>,
    /// Name given by the embedder, if any.
    pub embedder_name: Option<String>,
    source_map_url: RefCell<Option<String>>,
    content: OnceCell<ScriptSource>,
    transport: Rc<dyn Transport>,
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("script_id", &self.script_id)
            .field("source_url", &self.source_url)
            .field("line_offset", &self.line_offset)
            .field("column_offset", &self.column_offset)
            .field("end_line", &self.end_line)
            .field("end_column", &self.end_column)
            .field("execution_context_id", &self.execution_context_id)
            .field("has_syntax_error", &self.has_syntax_error)
            .finish_non_exhaustive()
    }
}

impl Script {
    /// Creates a script from a parse event.
    #[must_use]
    pub fn from_event(
        event: ScriptParsedEvent,
        has_syntax_error: bool,
        is_content_script: bool,
        transport: Rc<dyn Transport>,
    ) -> Self {
        Self {
            script_id: event.script_id,
            source_url: event.url,
            line_offset: event.start_line,
            column_offset: event.start_column,
            end_line: event.end_line,
            end_column: event.end_column,
            execution_context_id: event.execution_context_id,
            hash: event.hash,
            is_content_script,
            is_live_edit: event.is_live_edit,
            has_source_url: event.has_source_url,
            length: event.length,
            is_module: event.is_module,
            language: event.script_language,
            has_syntax_error,
            origin_stack_trace: event.stack_trace,
            embedder_name: event.embedder_name,
            source_map_url: RefCell::new(event.source_map_url.filter(|url| !url.is_empty())),
            content: OnceCell::new(),
            transport,
        }
    }

    /// Returns `true` if the script has no URL.
    #[must_use]
    pub fn is_anonymous_script(&self) -> bool {
        self.source_url.is_empty()
    }

    /// Returns `true` for WebAssembly modules.
    #[must_use]
    pub fn is_wasm(&self) -> bool {
        self.language == ScriptLanguage::WebAssembly
    }

    /// Returns `true` if the script does not start at the top of its resource,
    /// e.g. a `<script>` block inside an HTML document.
    #[must_use]
    pub fn is_inline_script(&self) -> bool {
        !self.is_wasm() && (self.line_offset != 0 || self.column_offset != 0)
    }

    /// Source map URL, if the script has one.
    #[must_use]
    pub fn source_map_url(&self) -> Option<String> {
        self.source_map_url.borrow().clone()
    }

    pub(crate) fn set_source_map_url(&self, url: Option<String>) {
        *self.source_map_url.borrow_mut() = url.filter(|url| !url.is_empty());
    }

    /// Returns `true` if the script's range covers the given position.
    ///
    /// When `column_number` is `None` only the lines are compared.
    #[must_use]
    pub fn contains_location(&self, line_number: u32, column_number: Option<u32>) -> bool {
        let after_start = line_number > self.line_offset
            || (line_number == self.line_offset
                && column_number.is_none_or(|column| column >= self.column_offset));
        let before_end = line_number < self.end_line
            || (line_number == self.end_line
                && column_number.is_none_or(|column| column <= self.end_column));
        after_start && before_end
    }

    /// Creates a location inside this script.
    #[must_use]
    pub fn raw_location(&self, line_number: u32, column_number: Option<u32>) -> Location {
        Location::new(self.script_id.clone(), line_number, column_number)
    }

    /// Fetches the source text.
    ///
    /// The first successful fetch is kept; concurrent callers share a single
    /// request. A failed fetch is not cached, so a later call tries again.
    ///
    /// # Errors
    ///
    /// Returns the protocol error of the failed fetch.
    pub async fn content(&self) -> Result<&ScriptSource, ProtocolError> {
        self.content
            .get_or_try_init(|| async {
                let response = send(
                    &*self.transport,
                    &GetScriptSource {
                        script_id: self.script_id.clone(),
                    },
                )
                .await?;
                Ok::<_, ProtocolError>(ScriptSource {
                    text: response.script_source,
                    bytecode: response.bytecode,
                })
            })
            .await
    }
}
