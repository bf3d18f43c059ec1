//! Typed views over remote values.

use std::rc::Rc;

use inspector_protocol::{CallArgument, ValueSubtype, ValueType};
use serde_json::json;

use super::RemoteValue;
use crate::{
    debugger::FunctionDetails,
    error::{SessionError, SessionResult},
};

const ARRAY_AT_FUNCTION: &str = "function(index) { return this[index]; }";
const BUFFER_BYTES_FUNCTION: &str =
    "function(offset, length) { return [...new Uint8Array(this, offset, length)]; }";

/// An array or typed array.
#[derive(Debug, Clone)]
pub struct RemoteArray {
    object: Rc<RemoteValue>,
}

impl RemoteArray {
    /// Views `object` as an array.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAnArray`] if the object is not an array or typed array.
    pub fn object_as_array(object: Rc<RemoteValue>) -> SessionResult<Self> {
        let is_array = object.value_type() == ValueType::Object
            && matches!(
                object.subtype(),
                Some(ValueSubtype::Array | ValueSubtype::Typedarray)
            );
        if !is_array {
            return Err(SessionError::NotAnArray);
        }
        Ok(Self { object })
    }

    /// Length read from the description.
    #[must_use]
    pub fn length(&self) -> usize {
        self.object.array_length()
    }

    /// Fetches the element at `index`.
    ///
    /// # Errors
    ///
    /// [`SessionError::IndexOutOfRange`] past the length, and
    /// [`SessionError::CallFailed`] if the lookup threw or returned nothing.
    pub async fn at(&self, index: usize) -> SessionResult<Rc<RemoteValue>> {
        let length = self.length();
        if index >= length {
            return Err(SessionError::IndexOutOfRange { index, length });
        }
        let argument = CallArgument {
            value: Some(json!(index)),
            ..CallArgument::default()
        };
        let result = self
            .object
            .call_function(ARRAY_AT_FUNCTION, vec![argument])
            .await;
        match result.object {
            Some(object) if !result.was_thrown => Ok(object),
            _ => Err(SessionError::CallFailed),
        }
    }

    /// The underlying object.
    #[must_use]
    pub fn object(&self) -> &Rc<RemoteValue> {
        &self.object
    }
}

/// An `ArrayBuffer`.
#[derive(Debug, Clone)]
pub struct RemoteArrayBuffer {
    object: Rc<RemoteValue>,
}

impl RemoteArrayBuffer {
    /// Views `object` as an array buffer.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAnArrayBuffer`] for any other kind of value.
    pub fn new(object: Rc<RemoteValue>) -> SessionResult<Self> {
        if object.value_type() != ValueType::Object
            || object.subtype() != Some(ValueSubtype::Arraybuffer)
        {
            return Err(SessionError::NotAnArrayBuffer);
        }
        Ok(Self { object })
    }

    /// Byte length read from the description.
    #[must_use]
    pub fn byte_length(&self) -> usize {
        self.object.array_buffer_byte_length()
    }

    /// Reads bytes `start..end`; `end` defaults to the byte length.
    ///
    /// # Errors
    ///
    /// [`SessionError::ByteRangeOutOfBounds`] for a range outside the buffer,
    /// [`SessionError::CallFailed`] if the bytes could not be read.
    pub async fn bytes(&self, start: usize, end: Option<usize>) -> SessionResult<Vec<u8>> {
        let length = self.byte_length();
        let end = end.unwrap_or(length);
        if start >= length || end < start || end > length {
            return Err(SessionError::ByteRangeOutOfBounds { start, end, length });
        }
        let arguments = vec![
            CallArgument {
                value: Some(json!(start)),
                ..CallArgument::default()
            },
            CallArgument {
                value: Some(json!(end - start)),
                ..CallArgument::default()
            },
        ];
        let value = self
            .object
            .call_function_json(BUFFER_BYTES_FUNCTION, arguments)
            .await
            .ok_or(SessionError::CallFailed)?;
        serde_json::from_value(value).map_err(|_| SessionError::CallFailed)
    }

    /// The underlying object.
    #[must_use]
    pub fn object(&self) -> &Rc<RemoteValue> {
        &self.object
    }
}

/// A function object.
#[derive(Debug, Clone)]
pub struct RemoteFunction {
    object: Rc<RemoteValue>,
}

impl RemoteFunction {
    /// Views `object` as a function.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAFunction`] for any other kind of value.
    pub fn object_as_function(object: Rc<RemoteValue>) -> SessionResult<Self> {
        if object.value_type() != ValueType::Function {
            return Err(SessionError::NotAFunction);
        }
        Ok(Self { object })
    }

    /// The target of a bound function, or the function itself.
    pub async fn target_function(&self) -> Rc<RemoteValue> {
        let own = self.object.get_own_properties(false, false).await;
        own.internal_properties
            .unwrap_or_default()
            .into_iter()
            .find(|property| property.name == "[[TargetFunction]]")
            .and_then(|property| property.value)
            .unwrap_or_else(|| Rc::clone(&self.object))
    }

    /// Location and name of the target function.
    ///
    /// A bound target fetched along the way is released afterwards.
    pub async fn target_function_details(&self) -> Option<FunctionDetails> {
        let target = self.target_function().await;
        let debugger = target.runtime().and_then(|runtime| runtime.debugger());
        let details = match debugger {
            Some(debugger) => debugger.function_details(&target).await,
            None => None,
        };
        if !Rc::ptr_eq(&target, &self.object) {
            target.release().await;
        }
        details
    }

    /// The underlying object.
    #[must_use]
    pub fn object(&self) -> &Rc<RemoteValue> {
        &self.object
    }
}
