//! Property listings.

use std::time::{SystemTime, UNIX_EPOCH};

use futures_lite::future;
use indexmap::IndexMap;
use inspector_protocol::{RemoteObjectPayload, ValueType, runtime::GetProperties, send};

use super::{GetPropertiesResult, RemoteHandle, RemoteProperty, RemoteValue, ScopeObject};

const STABLE_OBJECT_ID: &str = "[[StableObjectId]]";

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64() * 1000.0)
}

pub(super) async fn fetch(
    handle: &RemoteHandle,
    own_properties: bool,
    accessor_properties_only: bool,
    non_indexed_properties_only: bool,
    generate_preview: bool,
) -> GetPropertiesResult {
    let runtime = &handle.runtime;
    let response = send(
        &**runtime.transport(),
        &GetProperties {
            object_id: handle.object_id.clone(),
            own_properties,
            accessor_properties_only,
            non_indexed_properties_only,
            generate_preview,
        },
    )
    .await;
    let response = match response {
        Ok(response) => response,
        Err(err) => {
            log::debug!("getProperties failed for {}: {err}", handle.object_id);
            return GetPropertiesResult::default();
        }
    };
    if let Some(details) = response.exception_details {
        runtime.exception_thrown(now_ms(), details);
        return GetPropertiesResult::default();
    }

    let create = |payload: RemoteObjectPayload| runtime.create_remote_object(payload);
    let accessor = |payload: Option<RemoteObjectPayload>| {
        payload
            .filter(|payload| payload.value_type != ValueType::Undefined)
            .map(create)
    };

    let mut properties = Vec::with_capacity(response.result.len());
    for descriptor in response.result {
        let has_value = descriptor.value.is_some();
        let mut property = RemoteProperty {
            name: descriptor.name,
            value: descriptor.value.map(create),
            enumerable: descriptor.enumerable,
            writable: descriptor.writable.unwrap_or(false),
            is_own: descriptor.is_own.unwrap_or(false),
            was_thrown: descriptor.was_thrown.unwrap_or(false),
            symbol: descriptor.symbol.map(create),
            getter: None,
            setter: None,
            is_private: false,
        };
        if !has_value {
            property.getter = accessor(descriptor.get);
            property.setter = accessor(descriptor.set);
        }
        properties.push(property);
    }

    for descriptor in response.private_properties.unwrap_or_default() {
        let has_value = descriptor.value.is_some();
        let mut property = RemoteProperty::new(descriptor.name, descriptor.value.map(create));
        property.is_own = true;
        property.is_private = true;
        if !has_value {
            property.getter = accessor(descriptor.get);
            property.setter = accessor(descriptor.set);
        }
        properties.push(property);
    }

    let internal_properties = response
        .internal_properties
        .unwrap_or_default()
        .into_iter()
        .filter(|descriptor| descriptor.name != STABLE_OBJECT_ID)
        .filter_map(|descriptor| {
            let value = create(descriptor.value?);
            let mut property = RemoteProperty::new(descriptor.name, Some(value));
            property.writable = false;
            Some(property)
        })
        .collect();

    GetPropertiesResult {
        properties: Some(properties),
        internal_properties: Some(internal_properties),
    }
}

pub(super) async fn fetch_scope(
    scope: &ScopeObject,
    own_properties: bool,
    accessor_properties_only: bool,
) -> GetPropertiesResult {
    if accessor_properties_only {
        return GetPropertiesResult {
            properties: Some(Vec::new()),
            internal_properties: Some(Vec::new()),
        };
    }
    let cached = scope.saved.borrow().clone();
    if let Some(properties) = cached {
        return GetPropertiesResult {
            properties: Some(properties),
            internal_properties: None,
        };
    }

    let mut result = fetch(&scope.handle, own_properties, false, false, true).await;
    if let Some(properties) = result.properties.as_mut() {
        if scope.scope_ref.call_frame_id.is_none() {
            for property in properties.iter_mut() {
                property.writable = false;
            }
        }
        *scope.saved.borrow_mut() = Some(properties.clone());
    }
    result
}

/// Lists own properties merged with the accessors found on the prototype chain.
///
/// Properties are keyed by name in discovery order; an own data property
/// replaces an inherited accessor of the same name. Symbol and private
/// properties follow the named ones. Inherited `__proto__` accessors are dropped.
pub async fn load_from_object_per_proto(
    object: &RemoteValue,
    generate_preview: bool,
    non_indexed_only: bool,
) -> GetPropertiesResult {
    let (accessors, own) = future::zip(
        object.get_all_properties(true, generate_preview, non_indexed_only),
        object.get_own_properties(generate_preview, non_indexed_only),
    )
    .await;
    let (Some(accessor_properties), Some(own_properties)) = (accessors.properties, own.properties)
    else {
        return GetPropertiesResult::default();
    };

    let mut by_name: IndexMap<String, RemoteProperty> = IndexMap::new();
    let mut symbols = Vec::new();
    for property in accessor_properties {
        if property.symbol.is_some() {
            symbols.push(property);
        } else if property.is_own || property.name != "__proto__" {
            by_name.insert(property.name.clone(), property);
        }
    }
    for property in own_properties {
        if property.is_accessor_property() {
            continue;
        }
        if property.is_private || property.symbol.is_some() {
            symbols.push(property);
        } else {
            by_name.insert(property.name.clone(), property);
        }
    }

    let mut properties: Vec<RemoteProperty> = by_name.into_values().collect();
    properties.extend(symbols);
    GetPropertiesResult {
        properties: Some(properties),
        internal_properties: own.internal_properties,
    }
}

