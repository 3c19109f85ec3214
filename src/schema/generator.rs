use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};
use tracing::debug;

use super::core::{ObjectDescriptor, PrimitiveType, TypeDescriptor};

/// Prefix for `$ref` targets.
pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Primitive(PrimitiveType),
    Object,
    Array,
    Map,
    /// Back-reference to a named type already being expanded.
    Reference(String),
}

/// Tree-shaped schema; each node's kind determines which fields are populated.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub title: Option<String>,
    pub properties: BTreeMap<String, SchemaNode>,
    /// Required property names in declaration order.
    pub required: Vec<String>,
    pub items: Option<Box<SchemaNode>>,
    pub additional_properties: Option<Box<SchemaNode>>,
    pub enum_values: Vec<String>,
    pub nullable: bool,
}

impl SchemaNode {
    fn with_kind(kind: SchemaKind) -> Self {
        Self {
            kind,
            title: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
            items: None,
            additional_properties: None,
            enum_values: Vec::new(),
            nullable: false,
        }
    }

    pub fn primitive(kind: PrimitiveType) -> Self {
        Self::with_kind(SchemaKind::Primitive(kind))
    }

    pub fn reference(name: &str) -> Self {
        Self::with_kind(SchemaKind::Reference(name.to_string()))
    }

    /// Render as a JSON-schema fragment.
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        match &self.kind {
            SchemaKind::Reference(name) => {
                out.insert("$ref".into(), json!(format!("{COMPONENTS_PREFIX}{name}")));
            }
            SchemaKind::Primitive(primitive) => {
                if let Some(ty) = primitive.as_str() {
                    out.insert("type".into(), json!(ty));
                }
                if !self.enum_values.is_empty() {
                    out.insert("enum".into(), json!(self.enum_values));
                }
            }
            SchemaKind::Object => {
                out.insert("type".into(), json!("object"));
                let properties: Map<String, Value> = self
                    .properties
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_json_schema()))
                    .collect();
                out.insert("properties".into(), Value::Object(properties));
                if !self.required.is_empty() {
                    out.insert("required".into(), json!(self.required));
                }
            }
            SchemaKind::Array => {
                out.insert("type".into(), json!("array"));
                if let Some(items) = &self.items {
                    out.insert("items".into(), items.to_json_schema());
                }
            }
            SchemaKind::Map => {
                out.insert("type".into(), json!("object"));
                if let Some(values) = &self.additional_properties {
                    out.insert("additionalProperties".into(), values.to_json_schema());
                }
            }
        }
        if let Some(title) = &self.title {
            out.insert("title".into(), json!(title));
        }
        if self.nullable {
            if let Some(Value::String(ty)) = out.remove("type") {
                out.insert("type".into(), json!([ty, "null"]));
            }
            if let Some(Value::Array(values)) = out.get_mut("enum") {
                values.push(Value::Null);
            }
        }
        Value::Object(out)
    }
}

/// Turns [`TypeDescriptor`]s into [`SchemaNode`]s.
///
/// Every `generate` call starts with an empty visit stack. Types reached
/// through a cycle become `$ref` nodes, and the full expansion of each such
/// type is kept in [`SchemaGenerator::definitions`] so a document can publish
/// it under `components/schemas`.
///
/// Types are told apart by their full path, so `Page<Page<User>>` is two
/// types and same-named structs from different modules never alias. Each
/// referenced type gets a component name built from its short path
/// (`Page_User`), with a numeric suffix when two types would share one.
#[derive(Debug, Default)]
pub struct SchemaGenerator {
    definitions: BTreeMap<String, SchemaNode>,
    component_names: HashMap<&'static str, String>,
}

/// `a::Page<b::User>` becomes `Page_User`.
fn short_component_name(type_path: &str) -> String {
    let name = type_path
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
        .filter_map(|token| token.rsplit("::").next())
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if name.is_empty() {
        "Object".to_string()
    } else {
        name
    }
}

impl SchemaGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, descriptor: &TypeDescriptor) -> SchemaNode {
        let mut visiting = Vec::new();
        let mut referenced = Vec::new();
        self.walk(descriptor, &mut visiting, &mut referenced)
    }

    /// Expanded schemas of types that were emitted as `$ref` somewhere.
    pub fn definitions(&self) -> &BTreeMap<String, SchemaNode> {
        &self.definitions
    }

    pub fn into_definitions(self) -> BTreeMap<String, SchemaNode> {
        self.definitions
    }

    /// Stable component name for `object`, unique within this generator.
    fn component_name(&mut self, object: &ObjectDescriptor) -> String {
        if let Some(name) = self.component_names.get(object.type_path) {
            return name.clone();
        }
        let base = short_component_name(object.type_path);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.component_names.values().any(|taken| *taken == candidate) {
            candidate = format!("{base}{suffix}");
            suffix += 1;
        }
        self.component_names
            .insert(object.type_path, candidate.clone());
        candidate
    }

    fn walk(
        &mut self,
        descriptor: &TypeDescriptor,
        visiting: &mut Vec<&'static str>,
        referenced: &mut Vec<&'static str>,
    ) -> SchemaNode {
        match descriptor {
            TypeDescriptor::Primitive(primitive) => SchemaNode::primitive(*primitive),
            TypeDescriptor::Pointer(inner) => self.walk(inner, visiting, referenced),
            TypeDescriptor::Optional(inner) => {
                let mut node = self.walk(inner, visiting, referenced);
                if !matches!(node.kind, SchemaKind::Reference(_)) {
                    node.nullable = true;
                }
                node
            }
            TypeDescriptor::Array(inner) => {
                let mut node = SchemaNode::with_kind(SchemaKind::Array);
                node.items = Some(Box::new(self.walk(inner, visiting, referenced)));
                node
            }
            TypeDescriptor::Map(values) => {
                let mut node = SchemaNode::with_kind(SchemaKind::Map);
                node.additional_properties =
                    Some(Box::new(self.walk(values, visiting, referenced)));
                node
            }
            TypeDescriptor::Enumeration { name, variants } => {
                let mut node = SchemaNode::primitive(PrimitiveType::String);
                node.title = Some((*name).to_string());
                node.enum_values = variants.clone();
                node
            }
            TypeDescriptor::Object(object) => self.walk_object(object, visiting, referenced),
        }
    }

    fn walk_object(
        &mut self,
        object: &ObjectDescriptor,
        visiting: &mut Vec<&'static str>,
        referenced: &mut Vec<&'static str>,
    ) -> SchemaNode {
        if visiting.contains(&object.type_path) {
            debug!(type_path = object.type_path, "Cycle detected, emitting $ref");
            if !referenced.contains(&object.type_path) {
                referenced.push(object.type_path);
            }
            let component = self.component_name(object);
            return SchemaNode::reference(&component);
        }

        visiting.push(object.type_path);
        let mut node = SchemaNode::with_kind(SchemaKind::Object);
        node.title = Some(object.name.to_string());
        for field in &object.fields {
            let child = self.walk(&field.type_descriptor(), visiting, referenced);
            node.properties
                .insert(field.serialized_name.to_string(), child);
            if !field.optional {
                node.required.push(field.serialized_name.to_string());
            }
        }
        visiting.pop();

        if referenced.contains(&object.type_path) {
            let component = self.component_name(object);
            self.definitions.insert(component, node.clone());
        }
        node
    }
}
