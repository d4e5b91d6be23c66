// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pause data and its resolution.
//!
//! Values coming back from a pause refer to objects by id; the object
//! descriptions travel separately in [`PauseData`] batches, possibly several
//! per pause. Resolution is two passes:
//!
//! 1. [`PauseIndex::collect`] gathers every frame, scope and object from all
//!    batches into lookup tables (a description with a preview wins over one
//!    without).
//! 2. [`PauseIndex::resolve`] walks a [`ProtocolValue`] and builds a fresh
//!    [`ResolvedValue`] tree. Inputs are never mutated; cycles and very deep
//!    graphs stop at [`ResolvedValue::Unresolved`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::methods::Location;
use crate::{FrameId, ObjectId};

/// Depth beyond which object references are left unresolved.
pub const MAX_RESOLVE_DEPTH: usize = 8;

/// A value as it appears on the wire.
///
/// Exactly one of the fields is normally set; an empty object means
/// `undefined`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolValue {
    /// JSON-representable primitive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Reference to an object in pause data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectId>,
    /// `NaN`, `Infinity`, `-0` and friends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unserializable_number: Option<String>,
    /// BigInt literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bigint: Option<String>,
    /// Binding in its temporal dead zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uninitialized: Option<bool>,
    /// Value optimized away.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<bool>,
}

impl ProtocolValue {
    /// True for the wire encoding of `undefined`.
    pub fn is_undefined(&self) -> bool {
        self == &Self::default()
    }

    /// True when the value is a falsy primitive (`false`, `0`, `""`, `null`).
    pub fn is_falsy_primitive(&self) -> bool {
        match &self.value {
            Some(Value::Bool(b)) => !b,
            Some(Value::Number(n)) => n.as_f64() == Some(0.0),
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Null) => true,
            _ => false,
        }
    }
}

/// Named value (object property or scope binding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    /// Property or binding name.
    pub name: String,
    /// The value.
    #[serde(flatten)]
    pub value: ProtocolValue,
}

/// Object preview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPreview {
    /// Own properties included in the preview.
    #[serde(default)]
    pub properties: Vec<NamedValue>,
    /// Function name, for functions.
    #[serde(default)]
    pub function_name: Option<String>,
    /// Function location, for functions.
    #[serde(default)]
    pub function_location: Option<Vec<Location>>,
    /// Whether properties were truncated.
    #[serde(default)]
    pub overflow: bool,
}

/// Object description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescription {
    /// Object id.
    pub object_id: ObjectId,
    /// Class name, e.g. `Function` or `Array`.
    pub class_name: String,
    /// Optional preview.
    #[serde(default)]
    pub preview: Option<ObjectPreview>,
}

/// Stack frame description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDescription {
    /// Frame id.
    pub frame_id: FrameId,
    /// Function name, if any.
    #[serde(default)]
    pub function_name: Option<String>,
    /// Location(s), generated first.
    #[serde(default)]
    pub location: Vec<Location>,
}

/// Scope description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeDescription {
    /// Scope id.
    pub scope_id: String,
    /// Scope kind.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Bindings for declarative scopes.
    #[serde(default)]
    pub bindings: Vec<NamedValue>,
}

/// One batch of pause data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PauseData {
    /// Frames.
    #[serde(default)]
    pub frames: Vec<FrameDescription>,
    /// Scopes.
    #[serde(default)]
    pub scopes: Vec<ScopeDescription>,
    /// Objects.
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
}

/// Fully resolved value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// `undefined`.
    Undefined,
    /// JSON primitive.
    Primitive(Value),
    /// Unserializable number literal.
    Unserializable(String),
    /// BigInt literal.
    BigInt(String),
    /// Binding in its temporal dead zone.
    Uninitialized,
    /// Value optimized away.
    Unavailable,
    /// Resolved object.
    Object(ResolvedObject),
    /// Reference that could not be followed (missing, cyclic or too deep).
    Unresolved(ObjectId),
}

/// Resolved object.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedObject {
    /// Object id.
    pub object_id: ObjectId,
    /// Class name.
    pub class_name: String,
    /// Function name, for functions.
    pub function_name: Option<String>,
    /// Function location, for functions.
    pub function_location: Vec<Location>,
    /// Previewed properties, resolved.
    pub properties: Vec<(String, ResolvedValue)>,
}

impl ResolvedObject {
    /// True for function objects.
    pub fn is_function(&self) -> bool {
        self.class_name == "Function"
    }
}

/// Lookup tables built from one or more [`PauseData`] batches.
#[derive(Debug, Clone, Default)]
pub struct PauseIndex {
    objects: HashMap<ObjectId, ObjectDescription>,
    frames: HashMap<FrameId, FrameDescription>,
    scopes: HashMap<String, ScopeDescription>,
}

impl PauseIndex {
    /// First pass: collect every description from `batches`.
    pub fn collect<'a>(batches: impl IntoIterator<Item = &'a PauseData>) -> Self {
        let mut index = Self::default();
        for batch in batches {
            index.add(batch);
        }
        index
    }

    /// Merge another batch into the tables.
    pub fn add(&mut self, batch: &PauseData) {
        for object in &batch.objects {
            match self.objects.get(&object.object_id) {
                Some(existing) if existing.preview.is_some() && object.preview.is_none() => {}
                _ => {
                    self.objects
                        .insert(object.object_id.clone(), object.clone());
                }
            }
        }
        for frame in &batch.frames {
            self.frames.insert(frame.frame_id.clone(), frame.clone());
        }
        for scope in &batch.scopes {
            self.scopes.insert(scope.scope_id.clone(), scope.clone());
        }
    }

    /// Object description by id.
    pub fn object(&self, id: &str) -> Option<&ObjectDescription> {
        self.objects.get(id)
    }

    /// Frame description by id.
    pub fn frame(&self, id: &str) -> Option<&FrameDescription> {
        self.frames.get(id)
    }

    /// Scope description by id.
    pub fn scope(&self, id: &str) -> Option<&ScopeDescription> {
        self.scopes.get(id)
    }

    /// Second pass: resolve a wire value into a fresh tree.
    pub fn resolve(&self, value: &ProtocolValue) -> ResolvedValue {
        let mut ancestry = Vec::new();
        self.resolve_inner(value, &mut ancestry)
    }

    fn resolve_inner(&self, value: &ProtocolValue, ancestry: &mut Vec<ObjectId>) -> ResolvedValue {
        if let Some(id) = &value.object {
            return self.resolve_object(id, ancestry);
        }
        if let Some(v) = &value.value {
            return ResolvedValue::Primitive(v.clone());
        }
        if let Some(n) = &value.unserializable_number {
            return ResolvedValue::Unserializable(n.clone());
        }
        if let Some(b) = &value.bigint {
            return ResolvedValue::BigInt(b.clone());
        }
        if value.uninitialized == Some(true) {
            return ResolvedValue::Uninitialized;
        }
        if value.unavailable == Some(true) {
            return ResolvedValue::Unavailable;
        }
        ResolvedValue::Undefined
    }

    fn resolve_object(&self, id: &ObjectId, ancestry: &mut Vec<ObjectId>) -> ResolvedValue {
        if ancestry.len() >= MAX_RESOLVE_DEPTH || ancestry.contains(id) {
            return ResolvedValue::Unresolved(id.clone());
        }
        let Some(desc) = self.objects.get(id) else {
            return ResolvedValue::Unresolved(id.clone());
        };

        ancestry.push(id.clone());
        let preview = desc.preview.as_ref();
        let properties = preview
            .map(|p| {
                p.properties
                    .iter()
                    .map(|prop| (prop.name.clone(), self.resolve_inner(&prop.value, ancestry)))
                    .collect()
            })
            .unwrap_or_default();
        ancestry.pop();

        ResolvedValue::Object(ResolvedObject {
            object_id: desc.object_id.clone(),
            class_name: desc.class_name.clone(),
            function_name: preview.and_then(|p| p.function_name.clone()),
            function_location: preview
                .and_then(|p| p.function_location.clone())
                .unwrap_or_default(),
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> PauseData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn resolves_nested_objects_across_batches() {
        let first = data(json!({
            "objects": [{
                "objectId": "o1", "className": "Object",
                "preview": { "properties": [
                    { "name": "onClick", "object": "o2" },
                    { "name": "count", "value": 3 }
                ]}
            }]
        }));
        let second = data(json!({
            "objects": [{
                "objectId": "o2", "className": "Function",
                "preview": {
                    "functionName": "handle",
                    "functionLocation": [{ "scriptId": "9", "line": 4, "column": 2 }]
                }
            }]
        }));
        let index = PauseIndex::collect([&first, &second]);
        let root = ProtocolValue {
            object: Some("o1".into()),
            ..Default::default()
        };

        let ResolvedValue::Object(obj) = index.resolve(&root) else {
            panic!("expected object");
        };
        assert_eq!(obj.properties.len(), 2);
        let ResolvedValue::Object(handler) = &obj.properties[0].1 else {
            panic!("expected function");
        };
        assert!(handler.is_function());
        assert_eq!(handler.function_location[0].line, 4);
        assert_eq!(obj.properties[1].1, ResolvedValue::Primitive(json!(3)));
    }

    #[test]
    fn preview_is_not_downgraded_by_later_batch() {
        let rich = data(json!({ "objects": [{
            "objectId": "o1", "className": "Array",
            "preview": { "properties": [{ "name": "0", "value": 1 }] }
        }]}));
        let bare = data(json!({ "objects": [{ "objectId": "o1", "className": "Array" }] }));
        let index = PauseIndex::collect([&rich, &bare]);
        assert!(index.object("o1").unwrap().preview.is_some());
    }

    #[test]
    fn cycles_stop_at_unresolved() {
        let cyclic = data(json!({ "objects": [{
            "objectId": "self", "className": "Object",
            "preview": { "properties": [{ "name": "me", "object": "self" }] }
        }]}));
        let index = PauseIndex::collect([&cyclic]);
        let ResolvedValue::Object(obj) = index.resolve(&ProtocolValue {
            object: Some("self".into()),
            ..Default::default()
        }) else {
            panic!("expected object");
        };
        assert_eq!(obj.properties[0].1, ResolvedValue::Unresolved("self".into()));
    }

    #[test]
    fn empty_value_is_undefined_and_missing_object_is_unresolved() {
        let index = PauseIndex::default();
        assert_eq!(index.resolve(&ProtocolValue::default()), ResolvedValue::Undefined);
        assert!(ProtocolValue::default().is_undefined());
        assert_eq!(
            index.resolve(&ProtocolValue {
                object: Some("gone".into()),
                ..Default::default()
            }),
            ResolvedValue::Unresolved("gone".into())
        );
    }

    #[test]
    fn falsy_primitives() {
        for v in [json!(false), json!(0), json!(""), Value::Null] {
            let pv = ProtocolValue {
                value: Some(v),
                ..Default::default()
            };
            assert!(pv.is_falsy_primitive());
        }
        let truthy = ProtocolValue {
            value: Some(json!("x")),
            ..Default::default()
        };
        assert!(!truthy.is_falsy_primitive());
    }
}
