use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Leaf value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
    /// Any JSON value.
    Any,
}

impl PrimitiveType {
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            PrimitiveType::String => Some("string"),
            PrimitiveType::Integer => Some("integer"),
            PrimitiveType::Number => Some("number"),
            PrimitiveType::Boolean => Some("boolean"),
            PrimitiveType::Any => None,
        }
    }
}

/// One named field of an object type.
#[derive(Clone)]
pub struct FieldDescriptor {
    /// Field identifier as declared in Rust.
    pub declared_name: &'static str,
    /// Name on the wire (after serde renames).
    pub serialized_name: &'static str,
    pub optional: bool,
    ty: fn() -> TypeDescriptor,
}

impl FieldDescriptor {
    pub fn new(
        declared_name: &'static str,
        serialized_name: &'static str,
        ty: fn() -> TypeDescriptor,
    ) -> Self {
        Self {
            declared_name,
            serialized_name,
            optional: false,
            ty,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Resolve the field's type. Deferred so recursive types terminate.
    pub fn type_descriptor(&self) -> TypeDescriptor {
        (self.ty)()
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("declared_name", &self.declared_name)
            .field("serialized_name", &self.serialized_name)
            .field("optional", &self.optional)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ObjectDescriptor {
    pub name: &'static str,
    /// Fully qualified path with generic arguments; identifies the type.
    pub type_path: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

/// Structural description of a Rust type as it appears on the wire.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Primitive(PrimitiveType),
    Object(ObjectDescriptor),
    Array(Box<TypeDescriptor>),
    /// String-keyed map with values of the inner type.
    Map(Box<TypeDescriptor>),
    /// Transparent indirection (`Box`, `Arc`, `Rc`); describes the pointee.
    Pointer(Box<TypeDescriptor>),
    /// `Option<T>`: the inner type, nullable.
    Optional(Box<TypeDescriptor>),
    /// Unit-only enum serialized as one of a fixed set of strings.
    Enumeration {
        name: &'static str,
        variants: Vec<String>,
    },
}

impl TypeDescriptor {
    /// Object whose name is also its identity.
    pub fn object(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self::object_at(name, name, fields)
    }

    /// Object identified by `type_path`, usually `std::any::type_name::<T>()`.
    pub fn object_at(
        type_path: &'static str,
        name: &'static str,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        TypeDescriptor::Object(ObjectDescriptor {
            name,
            type_path,
            fields,
        })
    }

    pub fn enumeration(name: &'static str, variants: Vec<String>) -> Self {
        TypeDescriptor::Enumeration { name, variants }
    }

    pub fn array(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(inner))
    }

    pub fn map(value: TypeDescriptor) -> Self {
        TypeDescriptor::Map(Box::new(value))
    }

    /// Name of the nominal type, if this describes one.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            TypeDescriptor::Object(obj) => Some(obj.name),
            TypeDescriptor::Enumeration { name, .. } => Some(name),
            TypeDescriptor::Pointer(inner) | TypeDescriptor::Optional(inner) => inner.name(),
            _ => None,
        }
    }
}

/// Types that can describe their own wire shape.
pub trait Describe {
    fn describe() -> TypeDescriptor;
}

macro_rules! describe_primitive {
    ($kind:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::Primitive(PrimitiveType::$kind)
                }
            }
        )+
    };
}

describe_primitive!(String => String, str, char, crate::ids::RequestId);
describe_primitive!(Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
describe_primitive!(Number => f32, f64);
describe_primitive!(Boolean => bool);
describe_primitive!(Any => serde_json::Value, ());

impl<T: Describe + ?Sized> Describe for &T {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Pointer(Box::new(T::describe()))
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Pointer(Box::new(T::describe()))
    }
}

impl<T: Describe + ?Sized> Describe for Arc<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Pointer(Box::new(T::describe()))
    }
}

impl<T: Describe + ?Sized> Describe for std::rc::Rc<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Pointer(Box::new(T::describe()))
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Optional(Box::new(T::describe()))
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::array(T::describe())
    }
}

impl<T: Describe> Describe for [T] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::array(T::describe())
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::array(T::describe())
    }
}

impl<T: Describe, S> Describe for std::collections::HashSet<T, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::array(T::describe())
    }
}

impl<K, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::map(V::describe())
    }
}

impl<K, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::map(V::describe())
    }
}

impl Describe for serde_json::Map<String, serde_json::Value> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::map(TypeDescriptor::Primitive(PrimitiveType::Any))
    }
}
