//! Values living in the debugged runtime.
//!
//! A [`RemoteValue`] is one of a small closed set of variants:
//!
//! - [`RemoteHandle`]: an object reference with an id, released explicitly
//! - [`PrimitiveMirror`]: a primitive materialized locally, no id
//! - [`ScopeObject`]: a handle backing a call frame scope, with a property cache
//! - [`LocalJsonObject`]: a JSON value wrapped without any protocol traffic
//!
//! Operations that talk to the backend never fail with an error: protocol
//! failures come back as `None`, empty lists or an error message string.

mod kinds;
mod properties;

use std::{
    cell::{Cell, OnceCell, RefCell},
    fmt,
    rc::Rc,
    sync::LazyLock,
};

use inspector_protocol::{
    CallArgument, CallFrameId, ObjectPreview, RemoteObjectId, RemoteObjectPayload, ValueSubtype,
    ValueType,
    runtime::{CallFunctionOn, Evaluate, ReleaseObject},
    send,
};
use num_bigint::BigInt;
use regex::Regex;
use serde_json::Value;

use crate::runtime::RuntimeSession;

pub use kinds::{RemoteArray, RemoteArrayBuffer, RemoteFunction};
pub use properties::load_from_object_per_proto;

static DESCRIPTION_LENGTH_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([0-9]+)\)").expect("valid regex"));
static DESCRIPTION_LENGTH_SQUARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([0-9]+)\]").expect("valid regex"));

const SET_PROPERTY_FUNCTION: &str = "function(a, b) { this[a] = b; }";
const DELETE_PROPERTY_FUNCTION: &str = "function(a) { delete this[a]; return !(a in this); }";
const LOCAL_PREVIEW_CHARS: usize = 100;

/// A primitive value held locally.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
    /// A boolean.
    Boolean(bool),
    /// A number, including `NaN`, the infinities and `-0`.
    Number(f64),
    /// A string.
    String(String),
    /// A bigint.
    BigInt(BigInt),
    /// A value returned by value that is not a primitive.
    Json(Value),
}

impl PrimitiveValue {
    /// Materializes the value of a payload without an object id.
    ///
    /// `NaN`, `Infinity`, `-Infinity` and `-0` keep their exact bit pattern;
    /// bigints drop their trailing `n`.
    #[must_use]
    pub fn from_payload(payload: &RemoteObjectPayload) -> Self {
        if let Some(unserializable) = &payload.unserializable_value {
            return match unserializable.as_str() {
                "NaN" => Self::Number(f64::NAN),
                "Infinity" => Self::Number(f64::INFINITY),
                "-Infinity" => Self::Number(f64::NEG_INFINITY),
                "-0" => Self::Number(-0.0),
                digits if payload.value_type == ValueType::Bigint => digits
                    .strip_suffix('n')
                    .and_then(|digits| digits.parse().ok())
                    .map_or_else(|| Self::String(digits.to_owned()), Self::BigInt),
                other => Self::String(other.to_owned()),
            };
        }
        match &payload.value {
            None if payload.subtype == Some(ValueSubtype::Null) => Self::Null,
            None => Self::Undefined,
            Some(value) => Self::from_json(value.clone()),
        }
    }

    /// Wraps a JSON value.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::String(s),
            other => Self::Json(other),
        }
    }

    /// Protocol type of the value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Undefined => ValueType::Undefined,
            Self::Null | Self::Json(_) => ValueType::Object,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Number(_) => ValueType::Number,
            Self::String(_) => ValueType::String,
            Self::BigInt(_) => ValueType::Bigint,
        }
    }

    /// The value as JSON, `None` for `undefined` and for numbers JSON cannot hold.
    #[must_use]
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Undefined | Self::BigInt(_) => None,
            Self::Null => Some(Value::Null),
            Self::Boolean(b) => Some(Value::Bool(*b)),
            Self::Number(n) if unserializable_number(*n).is_some() => None,
            Self::Number(n) => serde_json::Number::from_f64(*n).map(Value::Number),
            Self::String(s) => Some(Value::String(s.clone())),
            Self::Json(value) => Some(value.clone()),
        }
    }

    /// Textual form of the value, as `String(value)` would produce it.
    #[must_use]
    pub fn to_js_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_owned(),
            Self::Null => "null".to_owned(),
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::BigInt(b) => b.to_string(),
            Self::Json(value) => json_to_js_string(value),
        }
    }
}

fn format_number(n: f64) -> String {
    ryu_js::Buffer::new().format(n).to_owned()
}

fn json_to_js_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_default(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(json_to_js_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_owned(),
    }
}

fn unserializable_number(n: f64) -> Option<&'static str> {
    if n.is_nan() {
        Some("NaN")
    } else if n == f64::INFINITY {
        Some("Infinity")
    } else if n == f64::NEG_INFINITY {
        Some("-Infinity")
    } else if n == 0.0 && n.is_sign_negative() {
        Some("-0")
    } else {
        None
    }
}

/// The unserializable spelling of a value: `-0`, `NaN`, `Infinity`,
/// `-Infinity`, or a bigint with an `n` suffix.
#[must_use]
pub fn unserializable_description(value: &PrimitiveValue) -> Option<String> {
    match value {
        PrimitiveValue::Number(n) => unserializable_number(*n).map(str::to_owned),
        PrimitiveValue::BigInt(b) => Some(format!("{b}n")),
        _ => None,
    }
}

/// Call argument for a raw protocol payload.
#[must_use]
pub fn payload_call_argument(payload: &RemoteObjectPayload) -> CallArgument {
    if let Some(unserializable) = &payload.unserializable_value {
        return CallArgument {
            unserializable_value: Some(unserializable.clone()),
            ..CallArgument::default()
        };
    }
    if let Some(object_id) = &payload.object_id {
        return CallArgument {
            object_id: Some(object_id.clone()),
            ..CallArgument::default()
        };
    }
    if payload.value_type == ValueType::Undefined {
        return CallArgument::default();
    }
    CallArgument {
        value: Some(payload.value.clone().unwrap_or(Value::Null)),
        ..CallArgument::default()
    }
}

/// Call argument for a local primitive.
#[must_use]
pub fn primitive_call_argument(value: &PrimitiveValue) -> CallArgument {
    if let Some(unserializable) = unserializable_description(value) {
        return CallArgument {
            unserializable_value: Some(unserializable),
            ..CallArgument::default()
        };
    }
    CallArgument {
        value: value.to_json(),
        ..CallArgument::default()
    }
}

/// Length of an array or typed array, read from its description.
///
/// Both `Array(3)` and the older `Array[3]` forms are recognized.
#[must_use]
pub fn array_length(subtype: Option<ValueSubtype>, description: Option<&str>) -> usize {
    if !matches!(
        subtype,
        Some(ValueSubtype::Array | ValueSubtype::Typedarray)
    ) {
        return 0;
    }
    let Some(description) = description else {
        return 0;
    };
    DESCRIPTION_LENGTH_PAREN
        .captures(description)
        .or_else(|| DESCRIPTION_LENGTH_SQUARE.captures(description))
        .and_then(|captures| captures[1].parse().ok())
        .unwrap_or(0)
}

/// Byte length of an `ArrayBuffer`, read from its description.
#[must_use]
pub fn array_buffer_byte_length(subtype: Option<ValueSubtype>, description: Option<&str>) -> usize {
    if subtype != Some(ValueSubtype::Arraybuffer) {
        return 0;
    }
    description
        .and_then(|description| DESCRIPTION_LENGTH_PAREN.captures(description))
        .and_then(|captures| captures[1].parse().ok())
        .unwrap_or(0)
}

/// Array class name without its length, e.g. `Uint8Array` for `Uint8Array(4)`.
#[must_use]
pub fn array_name_from_description(description: &str) -> String {
    let without_paren = DESCRIPTION_LENGTH_PAREN.replace(description, "");
    DESCRIPTION_LENGTH_SQUARE
        .replace(&without_paren, "")
        .into_owned()
}

/// A property of a remote or local object.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct RemoteProperty {
    /// Property name.
    pub name: String,
    /// Value; absent for accessors.
    pub value: Option<Rc<RemoteValue>>,
    /// Enumerable.
    pub enumerable: bool,
    /// Writable.
    pub writable: bool,
    /// Defined on the object itself rather than its prototype chain.
    pub is_own: bool,
    /// Reading the property threw.
    pub was_thrown: bool,
    /// Symbol key, if the property is keyed by one.
    pub symbol: Option<Rc<RemoteValue>>,
    /// Getter of an accessor property.
    pub getter: Option<Rc<RemoteValue>>,
    /// Setter of an accessor property.
    pub setter: Option<Rc<RemoteValue>>,
    /// A `#private` member.
    pub is_private: bool,
}

impl RemoteProperty {
    /// Creates an enumerable, writable, non-own property.
    #[must_use]
    pub fn new(name: impl Into<String>, value: Option<Rc<RemoteValue>>) -> Self {
        Self {
            name: name.into(),
            value,
            enumerable: true,
            writable: true,
            is_own: false,
            was_thrown: false,
            symbol: None,
            getter: None,
            setter: None,
            is_private: false,
        }
    }

    /// Returns `true` if the property has a getter or a setter.
    #[must_use]
    pub fn is_accessor_property(&self) -> bool {
        self.getter.is_some() || self.setter.is_some()
    }
}

/// Result of a property listing. `None` lists mean the listing failed.
#[derive(Debug, Clone, Default)]
pub struct GetPropertiesResult {
    /// Named, private and symbol properties.
    pub properties: Option<Vec<RemoteProperty>>,
    /// Engine-internal slots such as `[[TargetFunction]]`.
    pub internal_properties: Option<Vec<RemoteProperty>>,
}

/// Result of calling a function on a value.
#[derive(Debug, Clone, Default)]
pub struct CallFunctionResult {
    /// Return value, `None` when the call could not be made.
    pub object: Option<Rc<RemoteValue>>,
    /// The call threw; `object` holds the exception.
    pub was_thrown: bool,
}

/// Addresses a scope of a paused call frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRef {
    /// Position of the scope in the frame's scope chain.
    pub number: usize,
    /// Frame owning the scope; `None` for scopes outside a paused frame.
    pub call_frame_id: Option<CallFrameId>,
}

/// A reference to an object in the debugged runtime.
pub struct RemoteHandle {
    runtime: Rc<RuntimeSession>,
    object_id: RemoteObjectId,
    value_type: ValueType,
    subtype: Option<ValueSubtype>,
    class_name: Option<String>,
    description: Option<String>,
    preview: Option<ObjectPreview>,
    custom_preview: Option<Value>,
    released: Cell<bool>,
}

impl fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("object_id", &self.object_id)
            .field("value_type", &self.value_type)
            .field("subtype", &self.subtype)
            .field("description", &self.description)
            .field("released", &self.released.get())
            .finish_non_exhaustive()
    }
}

impl RemoteHandle {
    pub(crate) fn new(
        runtime: Rc<RuntimeSession>,
        object_id: RemoteObjectId,
        payload: RemoteObjectPayload,
    ) -> Self {
        Self {
            runtime,
            object_id,
            value_type: payload.value_type,
            subtype: payload.subtype,
            class_name: payload.class_name,
            description: payload.description,
            preview: payload.preview,
            custom_preview: payload.custom_preview,
            released: Cell::new(false),
        }
    }

    /// The runtime the object lives in.
    #[must_use]
    pub fn runtime(&self) -> &Rc<RuntimeSession> {
        &self.runtime
    }

    /// Object id.
    #[must_use]
    pub fn object_id(&self) -> &RemoteObjectId {
        &self.object_id
    }

    async fn release(&self) {
        if self.released.replace(true) {
            return;
        }
        let release = send(
            &**self.runtime.transport(),
            &ReleaseObject {
                object_id: self.object_id.clone(),
            },
        );
        if let Err(err) = release.await {
            log::debug!("failed to release {}: {err}", self.object_id);
        }
    }

    async fn call_function(&self, declaration: &str, arguments: Vec<CallArgument>) -> CallFunctionResult {
        let response = send(
            &**self.runtime.transport(),
            &CallFunctionOn {
                function_declaration: declaration.to_owned(),
                object_id: self.object_id.clone(),
                arguments,
                silent: true,
                return_by_value: false,
            },
        )
        .await;
        match response {
            Ok(response) => CallFunctionResult {
                object: Some(self.runtime.create_remote_object(response.result)),
                was_thrown: response.exception_details.is_some(),
            },
            Err(_) => CallFunctionResult::default(),
        }
    }

    async fn call_function_json(
        &self,
        declaration: &str,
        arguments: Vec<CallArgument>,
    ) -> Option<Value> {
        let response = send(
            &**self.runtime.transport(),
            &CallFunctionOn {
                function_declaration: declaration.to_owned(),
                object_id: self.object_id.clone(),
                arguments,
                silent: true,
                return_by_value: true,
            },
        )
        .await
        .ok()?;
        if response.exception_details.is_some() || response.result.value_type == ValueType::Undefined {
            return None;
        }
        Some(response.result.value.unwrap_or(Value::Null))
    }

    /// Assigns `value` to `this[name]` on the remote object.
    async fn assign(&self, name: &str, value: &RemoteObjectPayload) -> Option<String> {
        let response = send(
            &**self.runtime.transport(),
            &CallFunctionOn {
                function_declaration: SET_PROPERTY_FUNCTION.to_owned(),
                object_id: self.object_id.clone(),
                arguments: vec![string_argument(name), payload_call_argument(value)],
                silent: true,
                return_by_value: false,
            },
        )
        .await;
        match response {
            Err(err) => Some(err.to_string()),
            Ok(response) if response.exception_details.is_some() => {
                Some(response.result.description.unwrap_or_default())
            }
            Ok(_) => None,
        }
    }

    async fn delete_property(&self, name: &str) -> Option<String> {
        let response = send(
            &**self.runtime.transport(),
            &CallFunctionOn {
                function_declaration: DELETE_PROPERTY_FUNCTION.to_owned(),
                object_id: self.object_id.clone(),
                arguments: vec![string_argument(name)],
                silent: true,
                return_by_value: false,
            },
        )
        .await;
        match response {
            Err(err) => Some(err.to_string()),
            Ok(response) if response.exception_details.is_some() => {
                Some(response.result.description.unwrap_or_default())
            }
            Ok(response) if response.result.value != Some(Value::Bool(true)) => {
                Some("Failed to delete property.".to_owned())
            }
            Ok(_) => None,
        }
    }
}

fn string_argument(value: &str) -> CallArgument {
    CallArgument {
        value: Some(Value::String(value.to_owned())),
        ..CallArgument::default()
    }
}

/// A primitive value with its protocol metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveMirror {
    value: PrimitiveValue,
    value_type: ValueType,
    subtype: Option<ValueSubtype>,
    unserializable_value: Option<String>,
    description: String,
    class_name: Option<String>,
    custom_preview: Option<Value>,
}

impl PrimitiveMirror {
    pub(crate) fn from_payload(payload: RemoteObjectPayload) -> Self {
        let value = PrimitiveValue::from_payload(&payload);
        let description = payload
            .description
            .filter(|description| !description.is_empty())
            .or_else(|| payload.unserializable_value.clone())
            .or_else(|| (!matches!(value, PrimitiveValue::Json(_))).then(|| value.to_js_string()))
            .unwrap_or_default();
        Self {
            value,
            value_type: payload.value_type,
            subtype: payload.subtype,
            unserializable_value: payload.unserializable_value,
            description,
            class_name: payload.class_name,
            custom_preview: payload.custom_preview,
        }
    }

    pub(crate) fn from_value(value: PrimitiveValue) -> Self {
        let unserializable_value = unserializable_description(&value);
        let description = unserializable_value
            .clone()
            .unwrap_or_else(|| value.to_js_string());
        let subtype = (value == PrimitiveValue::Null).then_some(ValueSubtype::Null);
        Self {
            value_type: value.value_type(),
            value,
            subtype,
            unserializable_value,
            description,
            class_name: None,
            custom_preview: None,
        }
    }

    /// The materialized value.
    #[must_use]
    pub fn value(&self) -> &PrimitiveValue {
        &self.value
    }

    /// The unserializable spelling, if the value has one.
    #[must_use]
    pub fn unserializable_value(&self) -> Option<&str> {
        self.unserializable_value.as_deref()
    }
}

/// The object backing a call frame scope.
///
/// The first successful property listing is cached. Variable writes go through
/// `Debugger.setVariableValue` and patch the cache instead of refetching it.
#[derive(Debug)]
pub struct ScopeObject {
    handle: RemoteHandle,
    scope_ref: ScopeRef,
    saved: RefCell<Option<Vec<RemoteProperty>>>,
}

impl ScopeObject {
    pub(crate) fn new(handle: RemoteHandle, scope_ref: ScopeRef) -> Self {
        Self {
            handle,
            scope_ref,
            saved: RefCell::new(None),
        }
    }

    /// Scope this object belongs to.
    #[must_use]
    pub fn scope_ref(&self) -> &ScopeRef {
        &self.scope_ref
    }

    /// The underlying handle.
    #[must_use]
    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }

    async fn assign(&self, name: &str, value: &RemoteObjectPayload) -> Option<String> {
        let runtime = &self.handle.runtime;
        let Some(call_frame_id) = &self.scope_ref.call_frame_id else {
            return Some("Scope is not bound to a call frame.".to_owned());
        };
        let Some(debugger) = runtime.debugger() else {
            return Some("Debugger is not available.".to_owned());
        };
        if let Some(error) = debugger
            .set_variable_value(
                self.scope_ref.number,
                name,
                payload_call_argument(value),
                call_frame_id,
            )
            .await
        {
            return Some(error);
        }
        if let Some(saved) = self.saved.borrow_mut().as_mut() {
            for property in saved.iter_mut().filter(|property| property.name == name) {
                property.value = Some(runtime.create_remote_object(value.clone()));
            }
        }
        None
    }
}

/// A JSON value exposed through the remote value interface.
#[derive(Debug)]
pub struct LocalJsonObject {
    value: Value,
    description: OnceCell<String>,
    children: OnceCell<Vec<RemoteProperty>>,
}

impl LocalJsonObject {
    /// Wraps `value`.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            description: OnceCell::new(),
            children: OnceCell::new(),
        }
    }

    /// The wrapped value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    fn value_type(&self) -> ValueType {
        match self.value {
            Value::Null | Value::Array(_) | Value::Object(_) => ValueType::Object,
            Value::Bool(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
        }
    }

    fn subtype(&self) -> Option<ValueSubtype> {
        match self.value {
            Value::Null => Some(ValueSubtype::Null),
            Value::Array(_) => Some(ValueSubtype::Array),
            _ => None,
        }
    }

    fn has_children(&self) -> bool {
        match &self.value {
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            _ => false,
        }
    }

    /// Child properties, in key order.
    pub fn children(&self) -> &[RemoteProperty] {
        self.children.get_or_init(|| {
            let child = |name: String, value: &Value| {
                let value = RemoteValue::LocalJson(Self::new(value.clone()));
                RemoteProperty::new(name, Some(Rc::new(value)))
            };
            match &self.value {
                Value::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(index, value)| child(index.to_string(), value))
                    .collect(),
                Value::Object(map) => map
                    .iter()
                    .map(|(name, value)| child(name.clone(), value))
                    .collect(),
                _ => Vec::new(),
            }
        })
    }

    /// Short textual preview, at most about 100 characters of items.
    pub fn description(&self) -> &str {
        self.description.get_or_init(|| match &self.value {
            Value::Null => "null".to_owned(),
            Value::Array(_) => self.concatenate('[', ']', |property| {
                format_local_value(property.value.as_deref())
            }),
            Value::Object(_) => self.concatenate('{', '}', |property| {
                let mut name = property.name.clone();
                if name.is_empty()
                    || name.starts_with(char::is_whitespace)
                    || name.ends_with(char::is_whitespace)
                    || name.contains('\n')
                {
                    name = format!("\"{}\"", name.replace('\n', "\u{21B5}"));
                }
                format!("{name}: {}", format_local_value(property.value.as_deref()))
            }),
            other => json_to_js_string(other),
        })
    }

    fn concatenate(
        &self,
        prefix: char,
        suffix: char,
        format_property: impl Fn(&RemoteProperty) -> String,
    ) -> String {
        let mut buffer = String::from(prefix);
        for (i, property) in self.children().iter().enumerate() {
            let item = format_property(property);
            if buffer.chars().count() + item.chars().count() > LOCAL_PREVIEW_CHARS {
                buffer.push_str(",\u{2026}");
                break;
            }
            if i > 0 {
                buffer.push_str(", ");
            }
            buffer.push_str(&item);
        }
        buffer.push(suffix);
        buffer
    }

    fn own_properties(&self, non_indexed_only: bool) -> Vec<RemoteProperty> {
        self.children()
            .iter()
            .filter(|property| !non_indexed_only || !is_array_index(&property.name))
            .cloned()
            .collect()
    }
}

fn format_local_value(value: Option<&RemoteValue>) -> String {
    let Some(value) = value else {
        return "undefined".to_owned();
    };
    let description = value.description().unwrap_or_default();
    if value.value_type() == ValueType::String {
        format!("\"{}\"", description.replace('\n', "\u{21B5}"))
    } else {
        description
    }
}

fn is_array_index(name: &str) -> bool {
    name.parse::<u32>()
        .is_ok_and(|index| index.to_string() == name)
}

/// A value of the debugged runtime.
#[derive(Debug)]
pub enum RemoteValue {
    /// An object reference.
    Handle(RemoteHandle),
    /// A primitive materialized locally.
    Primitive(PrimitiveMirror),
    /// The object backing a scope.
    Scope(ScopeObject),
    /// A local JSON value.
    LocalJson(LocalJsonObject),
}

impl RemoteValue {
    /// Wraps a local JSON value.
    #[must_use]
    pub fn from_local_json(value: Value) -> Self {
        Self::LocalJson(LocalJsonObject::new(value))
    }

    fn handle(&self) -> Option<&RemoteHandle> {
        match self {
            Self::Handle(handle) => Some(handle),
            Self::Scope(scope) => Some(&scope.handle),
            Self::Primitive(_) | Self::LocalJson(_) => None,
        }
    }

    /// The runtime owning the object, for handles.
    #[must_use]
    pub fn runtime(&self) -> Option<&Rc<RuntimeSession>> {
        self.handle().map(RemoteHandle::runtime)
    }

    /// Protocol type.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Handle(handle) => handle.value_type,
            Self::Scope(scope) => scope.handle.value_type,
            Self::Primitive(mirror) => mirror.value_type,
            Self::LocalJson(local) => local.value_type(),
        }
    }

    /// Object subtype.
    #[must_use]
    pub fn subtype(&self) -> Option<ValueSubtype> {
        match self {
            Self::Handle(handle) => handle.subtype,
            Self::Scope(scope) => scope.handle.subtype,
            Self::Primitive(mirror) => mirror.subtype,
            Self::LocalJson(local) => local.subtype(),
        }
    }

    /// Object id, for handles.
    #[must_use]
    pub fn object_id(&self) -> Option<&RemoteObjectId> {
        self.handle().map(RemoteHandle::object_id)
    }

    /// Class name reported by the backend.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::Handle(handle) => handle.class_name.as_deref(),
            Self::Scope(scope) => scope.handle.class_name.as_deref(),
            Self::Primitive(mirror) => mirror.class_name.as_deref(),
            Self::LocalJson(_) => None,
        }
    }

    /// Textual description.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        match self {
            Self::Handle(handle) => handle.description.clone(),
            Self::Scope(scope) => scope.handle.description.clone(),
            Self::Primitive(mirror) => Some(mirror.description.clone()),
            Self::LocalJson(local) => Some(local.description().to_owned()),
        }
    }

    /// Preview generated by the backend.
    #[must_use]
    pub fn preview(&self) -> Option<&ObjectPreview> {
        self.handle().and_then(|handle| handle.preview.as_ref())
    }

    /// Custom formatter output.
    #[must_use]
    pub fn custom_preview(&self) -> Option<&Value> {
        match self {
            Self::Handle(handle) => handle.custom_preview.as_ref(),
            Self::Primitive(mirror) => mirror.custom_preview.as_ref(),
            Self::Scope(_) | Self::LocalJson(_) => None,
        }
    }

    /// Returns `true` if the value can be expanded into properties.
    #[must_use]
    pub fn has_children(&self) -> bool {
        match self {
            Self::Handle(handle) => handle.value_type != ValueType::Symbol,
            Self::Scope(scope) => scope.handle.value_type != ValueType::Symbol,
            Self::Primitive(_) => false,
            Self::LocalJson(local) => local.has_children(),
        }
    }

    /// The local value of a primitive mirror. Handles have none.
    #[must_use]
    pub fn value(&self) -> Option<&PrimitiveValue> {
        match self {
            Self::Primitive(mirror) => Some(&mirror.value),
            _ => None,
        }
    }

    /// The unserializable spelling of a primitive.
    #[must_use]
    pub fn unserializable_value(&self) -> Option<String> {
        match self {
            Self::Primitive(mirror) => mirror.unserializable_value.clone(),
            _ => None,
        }
    }

    /// Returns `true` for `null` and `undefined`.
    #[must_use]
    pub fn is_null_or_undefined(&self) -> bool {
        match self.value_type() {
            ValueType::Object => self.subtype() == Some(ValueSubtype::Null),
            ValueType::Undefined => true,
            _ => false,
        }
    }

    /// Length of an array or typed array.
    #[must_use]
    pub fn array_length(&self) -> usize {
        match self {
            Self::LocalJson(local) => local.value.as_array().map_or(0, Vec::len),
            _ => array_length(self.subtype(), self.description().as_deref()),
        }
    }

    /// Byte length of an `ArrayBuffer`.
    #[must_use]
    pub fn array_buffer_byte_length(&self) -> usize {
        array_buffer_byte_length(self.subtype(), self.description().as_deref())
    }

    /// Argument passing this value to a remote function.
    #[must_use]
    pub fn to_call_argument(&self) -> CallArgument {
        match self {
            Self::Handle(_) | Self::Scope(_) => CallArgument {
                object_id: self.object_id().cloned(),
                ..CallArgument::default()
            },
            Self::Primitive(mirror) => match &mirror.unserializable_value {
                Some(unserializable) => CallArgument {
                    unserializable_value: Some(unserializable.clone()),
                    ..CallArgument::default()
                },
                None => primitive_call_argument(&mirror.value),
            },
            Self::LocalJson(local) => CallArgument {
                value: Some(local.value.clone()),
                ..CallArgument::default()
            },
        }
    }

    /// Releases the handle. Only the first call reaches the backend.
    pub async fn release(&self) {
        if let Some(handle) = self.handle() {
            handle.release().await;
        }
    }

    /// Calls `declaration` with `this` bound to the value.
    ///
    /// Local values cannot run remote functions and return an empty result.
    pub async fn call_function(
        &self,
        declaration: &str,
        arguments: Vec<CallArgument>,
    ) -> CallFunctionResult {
        match self.handle() {
            Some(handle) => handle.call_function(declaration, arguments).await,
            None => CallFunctionResult::default(),
        }
    }

    /// Like [`call_function`](Self::call_function), returning the result by value.
    pub async fn call_function_json(
        &self,
        declaration: &str,
        arguments: Vec<CallArgument>,
    ) -> Option<Value> {
        self.handle()?
            .call_function_json(declaration, arguments)
            .await
    }

    /// Evaluates `expression` and assigns the result to property `name`.
    ///
    /// Returns an error message on failure. Scope objects write the variable
    /// through the debugger and patch their cached properties.
    pub async fn set_property_value(&self, name: &str, expression: &str) -> Option<String> {
        let Some(handle) = self.handle() else {
            return Some("Can't set a property of non-object.".to_owned());
        };
        let evaluated = send(
            &**handle.runtime.transport(),
            &Evaluate {
                expression: expression.to_owned(),
                silent: true,
                ..Evaluate::default()
            },
        )
        .await;
        let response = match evaluated {
            Err(err) => return Some(err.to_string()),
            Ok(response) if response.exception_details.is_some() => {
                let result = response.result;
                return if result.value_type == ValueType::String {
                    result
                        .value
                        .as_ref()
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                } else {
                    result.description
                };
            }
            Ok(response) => response,
        };

        let outcome = match self {
            Self::Scope(scope) => scope.assign(name, &response.result).await,
            _ => handle.assign(name, &response.result).await,
        };
        if let Some(object_id) = response.result.object_id {
            let release = send(&**handle.runtime.transport(), &ReleaseObject { object_id });
            if let Err(err) = release.await {
                log::debug!("failed to release evaluation result: {err}");
            }
        }
        outcome
    }

    /// Deletes property `name`. Returns an error message on failure.
    pub async fn delete_property(&self, name: &str) -> Option<String> {
        match self.handle() {
            Some(handle) => handle.delete_property(name).await,
            None => Some("Can't delete a property of non-object.".to_owned()),
        }
    }

    /// Own properties of the value.
    pub async fn get_own_properties(
        &self,
        generate_preview: bool,
        non_indexed_only: bool,
    ) -> GetPropertiesResult {
        self.get_properties(true, false, non_indexed_only, generate_preview)
            .await
    }

    /// Properties of the value and its prototype chain.
    pub async fn get_all_properties(
        &self,
        accessor_only: bool,
        generate_preview: bool,
        non_indexed_only: bool,
    ) -> GetPropertiesResult {
        self.get_properties(false, accessor_only, non_indexed_only, generate_preview)
            .await
    }

    async fn get_properties(
        &self,
        own: bool,
        accessor_only: bool,
        non_indexed_only: bool,
        generate_preview: bool,
    ) -> GetPropertiesResult {
        match self {
            Self::Handle(handle) => {
                properties::fetch(handle, own, accessor_only, non_indexed_only, generate_preview)
                    .await
            }
            Self::Scope(scope) => properties::fetch_scope(scope, own, accessor_only).await,
            Self::Primitive(_) => GetPropertiesResult::default(),
            Self::LocalJson(_) if accessor_only => GetPropertiesResult {
                properties: Some(Vec::new()),
                internal_properties: None,
            },
            Self::LocalJson(local) => GetPropertiesResult {
                properties: Some(local.own_properties(non_indexed_only)),
                internal_properties: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    fn payload(value: Value) -> RemoteObjectPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test_case("NaN")]
    #[test_case("Infinity")]
    #[test_case("-Infinity")]
    #[test_case("-0")]
    fn unserializable_numbers_keep_their_bits(raw: &str) {
        let mirror = PrimitiveMirror::from_payload(payload(json!({
            "type": "number",
            "unserializableValue": raw,
        })));
        let PrimitiveValue::Number(n) = mirror.value() else {
            panic!("expected a number");
        };
        let expected: f64 = match raw {
            "NaN" => f64::NAN,
            "Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            _ => -0.0,
        };
        assert_eq!(n.to_bits(), expected.to_bits());
        assert_eq!(mirror.description, raw);
        assert_eq!(unserializable_description(mirror.value()).as_deref(), Some(raw));
    }

    #[test]
    fn bigints_drop_their_suffix() {
        let mirror = PrimitiveMirror::from_payload(payload(json!({
            "type": "bigint",
            "unserializableValue": "12345678901234567890n",
        })));
        let expected: BigInt = "12345678901234567890".parse().unwrap();
        assert_eq!(mirror.value(), &PrimitiveValue::BigInt(expected));
    }

    #[test]
    fn primitive_descriptions_fall_back_to_js_strings() {
        let mirror = PrimitiveMirror::from_payload(payload(json!({ "type": "number", "value": 1.5 })));
        assert_eq!(mirror.description, "1.5");
        let mirror = PrimitiveMirror::from_payload(payload(json!({ "type": "undefined" })));
        assert_eq!(mirror.description, "undefined");
        let mirror = PrimitiveMirror::from_payload(payload(json!({
            "type": "object",
            "subtype": "null",
            "value": null,
        })));
        assert_eq!(mirror.value(), &PrimitiveValue::Null);
        assert_eq!(mirror.description, "null");
    }

    #[test_case(Some(ValueSubtype::Array), Some("Array(3)"), 3)]
    #[test_case(Some(ValueSubtype::Typedarray), Some("Uint8Array[16]"), 16)]
    #[test_case(Some(ValueSubtype::Array), Some("Array"), 0)]
    #[test_case(None, Some("Array(3)"), 0)]
    #[test_case(Some(ValueSubtype::Array), None, 0)]
    fn array_lengths(subtype: Option<ValueSubtype>, description: Option<&str>, expected: usize) {
        assert_eq!(array_length(subtype, description), expected);
    }

    #[test]
    fn buffer_length_only_reads_parentheses() {
        let subtype = Some(ValueSubtype::Arraybuffer);
        assert_eq!(array_buffer_byte_length(subtype, Some("ArrayBuffer(8)")), 8);
        assert_eq!(array_buffer_byte_length(subtype, Some("ArrayBuffer[8]")), 0);
    }

    #[test]
    fn array_names_strip_lengths() {
        assert_eq!(array_name_from_description("Int32Array(4)"), "Int32Array");
        assert_eq!(array_name_from_description("Array[2]"), "Array");
    }

    #[test]
    fn call_arguments() {
        let arg = primitive_call_argument(&PrimitiveValue::Number(f64::NAN));
        assert_eq!(arg.unserializable_value.as_deref(), Some("NaN"));
        assert_eq!(primitive_call_argument(&PrimitiveValue::Undefined), CallArgument::default());
        let arg = payload_call_argument(&payload(json!({ "type": "object", "subtype": "null" })));
        assert_eq!(arg.value, Some(Value::Null));
        let arg = payload_call_argument(&payload(json!({ "type": "object", "objectId": "7" })));
        assert_eq!(arg.object_id, Some(RemoteObjectId::from("7")));
    }

    #[test]
    fn local_json_description_is_truncated() {
        let long: Vec<u32> = (0..100).collect();
        let local = LocalJsonObject::new(json!(long));
        let description = local.description();
        assert!(description.starts_with("[0, 1, 2"));
        assert!(description.ends_with(",\u{2026}]"));
    }

    #[test]
    fn local_json_quotes_odd_names_and_strings() {
        let local = LocalJsonObject::new(json!({ " padded": "a\nb", "plain": 1 }));
        assert_eq!(local.description(), "{\" padded\": \"a\u{21B5}b\", plain: 1}");
    }

    #[test]
    fn local_json_non_indexed_properties() {
        let value = RemoteValue::from_local_json(json!({ "0": 1, "x": 2, "01": 3 }));
        let result = futures_lite::future::block_on(value.get_own_properties(false, true));
        let names: Vec<String> = result
            .properties
            .unwrap()
            .into_iter()
            .map(|property| property.name)
            .collect();
        assert_eq!(names, ["01", "x"]);
        assert!(value.has_children());
        assert!(value.value().is_none());
    }

    #[test]
    fn non_objects_reject_mutation() {
        let value = RemoteValue::Primitive(PrimitiveMirror::from_value(PrimitiveValue::Boolean(true)));
        let error = futures_lite::future::block_on(value.set_property_value("a", "1"));
        assert_eq!(error.as_deref(), Some("Can't set a property of non-object."));
        let error = futures_lite::future::block_on(value.delete_property("a"));
        assert_eq!(error.as_deref(), Some("Can't delete a property of non-object."));
    }
}
