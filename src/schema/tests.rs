use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;

use super::*;
use crate::Describe;

#[derive(Describe)]
#[allow(dead_code)]
struct Person {
    name: String,
    age: i32,
}

#[derive(Describe, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct Profile {
    display_name: String,
    #[serde(rename = "mail")]
    email_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bio: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(skip)]
    password_hash: String,
    scores: HashMap<String, f64>,
}

#[derive(Describe)]
#[allow(dead_code)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
    parent: Option<Box<TreeNode>>,
}

#[derive(Describe, Serialize)]
#[serde(rename_all = "lowercase")]
#[allow(dead_code)]
enum Role {
    Admin,
    Member,
}

#[derive(Describe)]
#[allow(dead_code)]
struct Membership {
    role: Role,
    owner: Person,
}

#[derive(Describe)]
#[allow(dead_code)]
struct UserId(u64);

#[derive(Describe)]
#[allow(dead_code)]
struct Page<T> {
    items: Vec<T>,
    total: u64,
}

#[derive(Describe)]
#[allow(dead_code)]
struct Settings {
    role: Option<Role>,
    owner: Option<Person>,
}

mod left {
    use crate::Describe;

    #[derive(Describe)]
    #[allow(dead_code)]
    pub struct Node {
        pub child: Option<Box<Node>>,
        pub peer: Option<Box<super::right::Node>>,
    }
}

mod right {
    use crate::Describe;

    #[derive(Describe)]
    #[allow(dead_code)]
    pub struct Node {
        pub label: String,
        pub next: Option<Box<Node>>,
    }
}

fn schema_of(descriptor: &TypeDescriptor) -> serde_json::Value {
    SchemaGenerator::new().generate(descriptor).to_json_schema()
}

#[test]
fn test_flat_struct_all_required() {
    let schema = schema_of(&Person::describe());
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["properties"]["name"], json!({ "type": "string" }));
    assert_eq!(schema["properties"]["age"], json!({ "type": "integer" }));
    assert_eq!(schema["required"], json!(["name", "age"]));
}

#[test]
fn test_serde_attributes_shape_fields() {
    let schema = schema_of(&Profile::describe());
    let props = schema["properties"].as_object().unwrap();
    assert!(props.contains_key("displayName"));
    assert!(props.contains_key("mail"));
    assert!(!props.contains_key("passwordHash"));
    assert!(!props.contains_key("password_hash"));
    assert_eq!(props["tags"]["type"], "array");
    assert_eq!(props["tags"]["items"]["type"], "string");
    assert_eq!(props["scores"]["type"], "object");
    assert_eq!(props["scores"]["additionalProperties"]["type"], "number");
    assert_eq!(props["bio"]["type"], json!(["string", "null"]));
    assert!(props["bio"].get("nullable").is_none());
    assert_eq!(schema["required"], json!(["displayName", "mail", "scores"]));
}

#[test]
fn test_recursive_type_emits_reference() {
    let mut generator = SchemaGenerator::new();
    let node = generator.generate(&TreeNode::describe());
    let schema = node.to_json_schema();

    assert_eq!(
        schema["properties"]["children"]["items"],
        json!({ "$ref": "#/components/schemas/TreeNode" })
    );
    assert_eq!(
        schema["properties"]["parent"],
        json!({ "$ref": "#/components/schemas/TreeNode" })
    );
    assert_eq!(schema["required"], json!(["label", "children"]));
    assert!(generator.definitions().contains_key("TreeNode"));
}

#[test]
fn test_nested_objects_are_inlined() {
    let schema = schema_of(&Membership::describe());
    assert_eq!(schema["properties"]["owner"]["type"], "object");
    assert_eq!(schema["properties"]["owner"]["required"], json!(["name", "age"]));
    assert_eq!(schema["properties"]["role"]["enum"], json!(["admin", "member"]));
}

#[test]
fn test_sibling_fields_of_same_type_are_not_cycles() {
    #[derive(Describe)]
    #[allow(dead_code)]
    struct Pair {
        left: Person,
        right: Person,
    }
    let mut generator = SchemaGenerator::new();
    let schema = generator.generate(&Pair::describe()).to_json_schema();
    assert_eq!(schema["properties"]["left"]["type"], "object");
    assert_eq!(schema["properties"]["right"]["type"], "object");
    assert!(generator.definitions().is_empty());
}

#[test]
fn test_newtype_and_pointer_describe_inner() {
    assert_eq!(schema_of(&UserId::describe()), json!({ "type": "integer" }));
    assert_eq!(
        schema_of(&<Box<String> as Describe>::describe()),
        json!({ "type": "string" })
    );
    assert_eq!(schema_of(&<serde_json::Value as Describe>::describe()), json!({}));
}

#[test]
fn test_generation_is_fresh_per_call() {
    let mut generator = SchemaGenerator::new();
    let first = generator.generate(&TreeNode::describe());
    let second = generator.generate(&TreeNode::describe());
    assert_eq!(first, second);
}

#[test]
fn test_nested_generic_instances_are_distinct_types() {
    let mut generator = SchemaGenerator::new();
    let schema = generator
        .generate(&<Page<Page<Person>>>::describe())
        .to_json_schema();

    let inner = &schema["properties"]["items"]["items"];
    assert_eq!(inner["type"], "object");
    assert_eq!(inner["properties"]["items"]["items"]["required"], json!(["name", "age"]));
    assert!(generator.definitions().is_empty());
}

#[test]
fn test_same_named_types_from_different_modules() {
    let mut generator = SchemaGenerator::new();
    let schema = generator.generate(&left::Node::describe()).to_json_schema();

    assert_eq!(
        schema["properties"]["child"],
        json!({ "$ref": "#/components/schemas/Node" })
    );
    let peer = &schema["properties"]["peer"];
    assert_eq!(peer["type"], json!(["object", "null"]));
    assert_eq!(peer["properties"]["label"], json!({ "type": "string" }));
    assert_eq!(
        peer["properties"]["next"],
        json!({ "$ref": "#/components/schemas/Node2" })
    );

    let definitions = generator.definitions();
    assert_eq!(definitions.len(), 2);
    assert!(definitions["Node"].properties.contains_key("child"));
    assert!(definitions["Node2"].properties.contains_key("label"));
}

#[test]
fn test_nullable_renders_type_union() {
    let schema = schema_of(&Settings::describe());
    assert_eq!(schema["properties"]["owner"]["type"], json!(["object", "null"]));
    assert_eq!(schema["properties"]["role"]["type"], json!(["string", "null"]));
    assert_eq!(
        schema["properties"]["role"]["enum"],
        json!(["admin", "member", null])
    );
    assert!(schema.get("required").is_none());
}
