//! Path navigator
//!
//! The navigator is a cursor-like object scoped to one Document. It walks
//! dotted/indexed paths through nested arrays, maps, and sub-schemas,
//! validates values against the schema definition governing the selected
//! position, and queues atomic operations onto the document's pending
//! buffer (which also applies them to the live field map and mirrors them
//! into the cache).
//!
//! Navigation (`prop`, `id`, `get_by_id`) is by value for chaining;
//! mutation (`set`, `inc`, `push`, `pull`, `remove`) borrows mutably and
//! surfaces validation failures to the caller.

use crate::document::{AtomicOp, Document};
use crate::filter::parse_path;
use veneer_core::path::PathSegment;
use veneer_core::value::get_at_path;
use veneer_core::{DocPath, Error, FieldMap, Result, Value};
use veneer_schema::{Definition, FieldKind, SchemaCursor};

/// Default identifier subfield of array/map elements
const ELEMENT_ID: &str = "_id";

/// A navigator scoped to one document
#[derive(Debug)]
pub struct DocumentQuery<'a> {
    doc: &'a mut Document,
    path: DocPath,
}

impl<'a> DocumentQuery<'a> {
    pub(crate) fn new(doc: &'a mut Document) -> Self {
        DocumentQuery {
            doc,
            path: DocPath::root(),
        }
    }

    /// The currently selected path
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// Descend into a nested field; `".."` ascends one level
    pub fn prop(mut self, path: &str) -> Self {
        if path == ".." {
            self.path.pop();
            return self;
        }
        for segment in parse_path(path).segments() {
            self.path.push(segment.clone());
        }
        self
    }

    /// Select an array element (or map entry) by its identifier,
    /// descending `path` first
    pub fn id(self, path: &str, identifier: impl Into<Value>) -> Self {
        self.prop(path).get_by_id(identifier)
    }

    /// Select an array element (or map entry) by its identifier
    ///
    /// On a non-array/non-map current value the identifier falls back to a
    /// plain property name.
    pub fn get_by_id(mut self, identifier: impl Into<Value>) -> Self {
        let identifier = identifier.into();
        let segment = match self.current() {
            Some(Value::Array(items)) => {
                let id_field = self.element_id_field(&self.path);
                let index = items
                    .iter()
                    .position(|el| {
                        el.as_object().and_then(|m| m.get(&id_field)) == Some(&identifier)
                    })
                    // one past the end: selects nothing, reads yield None
                    .unwrap_or(items.len());
                PathSegment::Index(index)
            }
            _ => {
                let key = match identifier {
                    Value::String(s) => s,
                    other => other.to_json_text(),
                };
                PathSegment::Key(key)
            }
        };
        self.path.push(segment);
        self
    }

    /// The value at the current selection
    pub fn current(&self) -> Option<&Value> {
        if self.path.is_empty() {
            None
        } else {
            get_at_path(self.doc.fields(), &self.path)
        }
    }

    /// Read the value at a relative path
    ///
    /// A segment prefixed with `:` consumes one substitution value and is
    /// replaced by the index of the array element whose identifier matches
    /// it; when no element matches, the read yields None.
    pub fn get(&self, path: &str, substitutions: &[Value]) -> Option<Value> {
        if path.is_empty() {
            return self.current().cloned();
        }
        let fields = self.doc.fields();
        let mut resolved = self.path.clone();
        let mut subs = substitutions.iter();
        for raw in path.split('.') {
            if let Some(_marker) = raw.strip_prefix(':') {
                let wanted = subs.next()?;
                let items = match lookup(fields, &resolved)? {
                    Value::Array(items) => items,
                    _ => return None,
                };
                let id_field = self.element_id_field(&resolved);
                let index = items
                    .iter()
                    .position(|el| el.as_object().and_then(|m| m.get(&id_field)) == Some(wanted))?;
                resolved.push(PathSegment::Index(index));
            } else if let Ok(index) = raw.parse::<usize>() {
                resolved.push(PathSegment::Index(index));
            } else {
                resolved.push(PathSegment::Key(raw.to_string()));
            }
        }
        lookup(fields, &resolved).cloned()
    }

    /// Set the value at the current selection
    pub fn set(&mut self, value: impl Into<Value>) -> Result<()> {
        let target = self.path.clone();
        self.set_path(target, value.into())
    }

    /// Set the value at a relative path
    pub fn set_at(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let target = self.join(path);
        self.set_path(target, value.into())
    }

    /// Increment the current selection by a numeric amount
    pub fn inc(&mut self, amount: impl Into<Value>) -> Result<()> {
        let target = self.path.clone();
        self.inc_path(target, amount.into())
    }

    /// Increment the value at a relative path
    pub fn inc_at(&mut self, path: &str, amount: impl Into<Value>) -> Result<()> {
        let target = self.join(path);
        self.inc_path(target, amount.into())
    }

    /// Push a value onto the array (or keyed map) at the current selection
    pub fn push(&mut self, value: impl Into<Value>) -> Result<()> {
        let target = self.path.clone();
        self.push_path(target, value.into())
    }

    /// Push a value at a relative path
    pub fn push_at(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let target = self.join(path);
        self.push_path(target, value.into())
    }

    /// Remove a matching element from the array (or map) at the current
    /// selection: by value for scalar element types, by identifier for
    /// object element types
    pub fn pull(&mut self, target: impl Into<Value>) -> Result<()> {
        let at = self.path.clone();
        self.pull_path(at, target.into())
    }

    /// Pull at a relative path
    pub fn pull_at(&mut self, path: &str, target: impl Into<Value>) -> Result<()> {
        let at = self.join(path);
        self.pull_path(at, target.into())
    }

    /// Remove the currently selected array element or object key
    pub fn remove(&mut self) -> Result<()> {
        let Some(last) = self.path.last_segment().cloned() else {
            return Err(Error::InvalidOperation(
                "nothing selected to remove".to_string(),
            ));
        };
        let parent = self.path.parent().unwrap_or_default();
        match last {
            PathSegment::Key(_) => {
                let target = self.path.clone();
                self.doc.queue(target, AtomicOp::Unset);
                Ok(())
            }
            PathSegment::Index(index) => {
                let id_field = self.element_id_field(&parent);
                let element_id = self
                    .current()
                    .and_then(|el| el.as_object())
                    .and_then(|m| m.get(&id_field))
                    .cloned();
                match element_id {
                    Some(id) => {
                        self.doc.queue(parent, AtomicOp::Pull(vec![id]));
                        Ok(())
                    }
                    // no identifier to pull by: rewrite the whole array
                    None => {
                        let mut items = match lookup(self.doc.fields(), &parent) {
                            Some(Value::Array(items)) => items.clone(),
                            _ => return Ok(()),
                        };
                        if index < items.len() {
                            items.remove(index);
                        }
                        self.doc.queue(parent, AtomicOp::Set(Value::Array(items)));
                        Ok(())
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    fn join(&self, rel: &str) -> DocPath {
        let mut target = self.path.clone();
        for segment in parse_path(rel).segments() {
            target.push(segment.clone());
        }
        target
    }

    fn cursor_at(&self, path: &DocPath) -> SchemaCursor<'_> {
        let mut cursor = SchemaCursor::root(self.doc.model().schema());
        for segment in path.segments() {
            cursor = cursor.step(segment);
        }
        cursor
    }

    fn definition_at(&self, path: &DocPath) -> Option<&Definition> {
        self.cursor_at(path).definition()
    }

    // identifier subfield for elements of the array/map at `path`
    fn element_id_field(&self, path: &DocPath) -> String {
        self.definition_at(path)
            .and_then(|def| def.element())
            .and_then(|el| el.nested_schema())
            .and_then(|schema| schema.id_field())
            .unwrap_or(ELEMENT_ID)
            .to_string()
    }

    fn set_path(&mut self, target: DocPath, value: Value) -> Result<()> {
        let value = match self.definition_at(&target) {
            Some(def) => def.cast(value, &target.to_string())?,
            None => value,
        };
        self.doc.queue(target, AtomicOp::Set(value));
        Ok(())
    }

    fn inc_path(&mut self, target: DocPath, amount: Value) -> Result<()> {
        if !amount.is_number() {
            return Err(Error::validation(
                target.to_string(),
                "number",
                format!("cannot increment by {}", amount.type_name()),
            ));
        }
        if let Some(def) = self.definition_at(&target) {
            def.validate(&amount, &target.to_string(), true)?;
        }
        self.doc.queue(target, AtomicOp::Inc(amount));
        Ok(())
    }

    fn push_path(&mut self, target: DocPath, value: Value) -> Result<()> {
        // clone the resolved kind so the schema borrow ends before queueing
        let kind = self.definition_at(&target).map(|def| def.kind().clone());
        match kind {
            Some(FieldKind::Map(element)) => {
                let id_field = element
                    .nested_schema()
                    .and_then(|s| s.id_field())
                    .unwrap_or(ELEMENT_ID)
                    .to_string();
                let Some(object) = value.as_object() else {
                    return Err(Error::validation(
                        target.to_string(),
                        "map",
                        format!("cannot push {} into a map", value.type_name()),
                    ));
                };
                let Some(Value::String(key)) = object.get(&id_field).cloned() else {
                    return Err(Error::validation(
                        target.to_string(),
                        "map",
                        format!("pushed value must carry a string '{id_field}'"),
                    ));
                };
                let exists = matches!(
                    lookup(self.doc.fields(), &target),
                    Some(Value::Object(map)) if map.contains_key(&key)
                );
                if exists {
                    return Err(Error::validation(
                        target.to_string(),
                        "map",
                        format!("duplicate identifier '{key}'"),
                    ));
                }
                let element = build_element(&element, value, &target)?;
                self.doc.queue(target.key(key), AtomicOp::Set(element));
                Ok(())
            }
            Some(FieldKind::Array(element)) => {
                let built = build_element(&element, value, &target)?;
                if let Some(schema) = element.nested_schema() {
                    let id_field = schema.id_field().unwrap_or(ELEMENT_ID);
                    if let Some(new_id) = built.as_object().and_then(|m| m.get(id_field)) {
                        let duplicate = matches!(
                            lookup(self.doc.fields(), &target),
                            Some(Value::Array(items)) if items.iter().any(|el| {
                                el.as_object().and_then(|m| m.get(id_field)) == Some(new_id)
                            })
                        );
                        if duplicate {
                            return Err(Error::validation(
                                target.to_string(),
                                "array",
                                format!("duplicate identifier {new_id}"),
                            ));
                        }
                    }
                }
                self.doc.queue(target, AtomicOp::Push(vec![built]));
                Ok(())
            }
            // untracked: push into whatever array is (or will be) there
            None => match lookup(self.doc.fields(), &target) {
                Some(Value::Array(_)) | None => {
                    self.doc.queue(target, AtomicOp::Push(vec![value]));
                    Ok(())
                }
                // not array-shaped: deliberate no-op
                Some(_) => Ok(()),
            },
            // schema says this is not a pushable container: deliberate no-op
            Some(_) => Ok(()),
        }
    }

    fn pull_path(&mut self, target: DocPath, wanted: Value) -> Result<()> {
        let kind = self.definition_at(&target).map(|def| def.kind().clone());
        match kind {
            Some(FieldKind::Array(element)) => match element.kind() {
                FieldKind::Scalar(_) => {
                    self.doc.queue(target, AtomicOp::PullAll(vec![wanted]));
                    Ok(())
                }
                _ => {
                    let id_field = element
                        .nested_schema()
                        .and_then(|s| s.id_field())
                        .unwrap_or(ELEMENT_ID);
                    let id = match &wanted {
                        Value::Object(map) => map.get(id_field).cloned().unwrap_or(wanted.clone()),
                        other => other.clone(),
                    };
                    self.doc.queue(target, AtomicOp::Pull(vec![id]));
                    Ok(())
                }
            },
            Some(FieldKind::Map(element)) => {
                let id_field = element
                    .nested_schema()
                    .and_then(|s| s.id_field())
                    .unwrap_or(ELEMENT_ID);
                let key = match &wanted {
                    Value::Object(map) => match map.get(id_field) {
                        Some(Value::String(s)) => s.clone(),
                        _ => return Ok(()),
                    },
                    Value::String(s) => s.clone(),
                    _ => return Ok(()),
                };
                let exists = matches!(
                    lookup(self.doc.fields(), &target),
                    Some(Value::Object(map)) if map.contains_key(&key)
                );
                if exists {
                    // maps delete the key directly
                    self.doc.queue(target.key(key), AtomicOp::Unset);
                }
                Ok(())
            }
            None => match lookup(self.doc.fields(), &target) {
                Some(Value::Array(_)) => {
                    let op = match &wanted {
                        Value::Object(map) => match map.get(ELEMENT_ID) {
                            Some(id) => AtomicOp::Pull(vec![id.clone()]),
                            None => AtomicOp::PullAll(vec![wanted.clone()]),
                        },
                        _ => AtomicOp::PullAll(vec![wanted.clone()]),
                    };
                    self.doc.queue(target, op);
                    Ok(())
                }
                // not array-shaped: deliberate no-op
                _ => Ok(()),
            },
            Some(_) => Ok(()),
        }
    }
}

fn lookup<'f>(fields: &'f FieldMap, path: &DocPath) -> Option<&'f Value> {
    if path.is_empty() {
        None
    } else {
        get_at_path(fields, path)
    }
}

// Elements of nested-schema type run through the element schema's builder;
// everything else is cast against the element definition.
fn build_element(element: &Definition, value: Value, target: &DocPath) -> Result<Value> {
    match element.nested_schema() {
        Some(schema) => {
            let Value::Object(raw) = value else {
                return Err(Error::validation(
                    target.to_string(),
                    "schema",
                    format!("cannot build element from {}", value.type_name()),
                ));
            };
            Ok(Value::Object(schema.build(raw)?))
        }
        None => element.cast(value, &target.to_string()),
    }
}
