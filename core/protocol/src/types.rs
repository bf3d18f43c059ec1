//! Identifiers and payloads shared by more than one protocol domain.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a parsed script, unique within a session.
    ScriptId
);
string_id!(
    /// Opaque breakpoint identifier handed out by the backend.
    BreakpointId
);
string_id!(
    /// Identifier of a call frame in a paused stack.
    CallFrameId
);
string_id!(
    /// Identifier of a remote object handle.
    RemoteObjectId
);
string_id!(
    /// Process-unique identity of a debugger agent.
    UniqueDebuggerId
);

/// Identifier of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContextId(pub i64);

impl fmt::Display for ExecutionContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Remote objects
// ============================================================================

/// Primitive type tag of a remote value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ValueType {
    Object,
    Function,
    #[default]
    Undefined,
    String,
    Number,
    Boolean,
    Symbol,
    Bigint,
}

/// Object subtype hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ValueSubtype {
    Array,
    Null,
    Node,
    Regexp,
    Date,
    Map,
    Set,
    Weakmap,
    Weakset,
    Iterator,
    Generator,
    Error,
    Proxy,
    Promise,
    Typedarray,
    Arraybuffer,
    Dataview,
    Webassemblymemory,
    Wasmvalue,
    #[serde(rename = "internal#location")]
    InternalLocation,
    #[serde(other)]
    Other,
}

/// Mirror object referencing original JavaScript object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObjectPayload {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<ValueSubtype>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unserializable_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<ObjectPreview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_preview: Option<Value>,
}

/// Abbreviated object contents used for inline rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPreview {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<ValueSubtype>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub overflow: bool,
    #[serde(default)]
    pub properties: Vec<PropertyPreview>,
}

/// One property inside an [`ObjectPreview`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPreview {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<ValueSubtype>,
}

/// Argument of a function call: a handle, a plain JSON value or an
/// unserializable primitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallArgument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unserializable_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
}

// ============================================================================
// Stack traces and exceptions
// ============================================================================

/// A frame of a runtime (non-paused) stack trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeCallFrame {
    pub function_name: String,
    pub script_id: ScriptId,
    pub url: String,
    pub line_number: u32,
    pub column_number: u32,
}

/// Reference to a stack trace stored in a (possibly other) debugger agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceId {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger_id: Option<UniqueDebuggerId>,
}

/// Call frames plus the async chain that led to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub call_frames: Vec<RuntimeCallFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<StackTrace>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<StackTraceId>,
}

/// Details of an exception raised during evaluation or reported by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub exception_id: i64,
    pub text: String,
    pub line_number: u32,
    pub column_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_id: Option<ScriptId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<RemoteObjectPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_context_id: Option<ExecutionContextId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_meta_data: Option<Value>,
}

/// Response body with no fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_subtypes_decode_as_other() {
        let payload: RemoteObjectPayload = serde_json::from_value(json!({
            "type": "object",
            "subtype": "trustedtype",
            "objectId": "1.2",
        }))
        .unwrap();
        assert_eq!(payload.subtype, Some(ValueSubtype::Other));
        assert_eq!(payload.object_id, Some(RemoteObjectId::from("1.2")));
    }

    #[test]
    fn null_value_is_absent() {
        let payload: RemoteObjectPayload =
            serde_json::from_value(json!({ "type": "object", "subtype": "null", "value": null }))
                .unwrap();
        assert_eq!(payload.value, None);
        assert_eq!(payload.subtype, Some(ValueSubtype::Null));
    }

    #[test]
    fn empty_ignores_unknown_fields() {
        let empty: Result<Empty, _> = serde_json::from_value(json!({ "extra": 1 }));
        assert!(empty.is_ok());
    }
}
