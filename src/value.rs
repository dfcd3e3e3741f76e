//! The dynamically typed value model serialized by this crate.
//!
//! [`Variant`] is a closed sum type: one arm per wire kind. Geometric payload
//! types are plain `f32` structs laid out field-for-field in wire order, so
//! the codec can read and write them without any intermediate representation.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::object::{Object, ObjectId};

/// A 2D vector, two `f32` components.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }
}

/// A 2D axis-aligned rectangle given by position and size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect2 {
    pub position: Vector2,
    pub size: Vector2,
}

impl Rect2 {
    pub fn new(position: Vector2, size: Vector2) -> Self {
        Rect2 { position, size }
    }
}

/// A 3D vector, three `f32` components.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }
}

/// A 2D affine transform: two basis columns plus an origin, stored as three
/// [`Vector2`] elements. Wire order is element-major (`elements[0].x`,
/// `elements[0].y`, `elements[1].x`, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform2D {
    pub elements: [Vector2; 3],
}

/// A plane in Hessian normal form.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Plane {
    pub normal: Vector3,
    pub d: f32,
}

/// A rotation quaternion.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Quat { x, y, z, w }
    }
}

/// A 3D axis-aligned box given by position and size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub position: Vector3,
    pub size: Vector3,
}

/// A 3×3 matrix stored as three row vectors. Wire order is row-major.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Basis {
    pub elements: [Vector3; 3],
}

/// A 3D transform: a [`Basis`] plus an origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub basis: Basis,
    pub origin: Vector3,
}

/// An RGBA color, four `f32` channels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }
}

/// A structured node path: ordered name segments, ordered subname segments,
/// and an absolute flag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePath {
    pub names: Vec<String>,
    pub subnames: Vec<String>,
    pub absolute: bool,
}

impl NodePath {
    pub fn new(names: Vec<String>, subnames: Vec<String>, absolute: bool) -> Self {
        NodePath {
            names,
            subnames,
            absolute,
        }
    }
}

/// An opaque resource id. The wire format carries no payload for this kind,
/// so decoding always yields the default (empty) id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rid(pub u64);

/// A dictionary key. The wire format only admits string-like keys; plain
/// strings and interned string names are distinct key identities.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DictKey {
    String(String),
    StringName(String),
}

impl DictKey {
    /// The key's textual content, regardless of which string kind it is.
    pub fn as_str(&self) -> &str {
        match self {
            DictKey::String(s) | DictKey::StringName(s) => s,
        }
    }
}

/// An ordered key→value mapping. Insertion order is preserved on decode.
pub type Dictionary = IndexMap<DictKey, Variant>;

/// An object slot inside a [`Variant`].
///
/// `Instance` is a live handle; `Unresolved` is the inert placeholder
/// produced when a reference-id payload cannot be resolved back to an object
/// (the wire format does not support resolution, only id preservation).
#[derive(Clone)]
pub enum ObjectRef {
    Null,
    Instance(Arc<dyn Object>),
    Unresolved(ObjectId),
}

impl ObjectRef {
    pub fn is_null(&self) -> bool {
        matches!(self, ObjectRef::Null)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ObjectRef::Null, ObjectRef::Null) => true,
            (ObjectRef::Instance(a), ObjectRef::Instance(b)) => Arc::ptr_eq(a, b),
            (ObjectRef::Unresolved(a), ObjectRef::Unresolved(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Null => f.write_str("ObjectRef::Null"),
            ObjectRef::Instance(obj) => write!(f, "ObjectRef::Instance({})", obj.class_name()),
            ObjectRef::Unresolved(id) => write!(f, "ObjectRef::Unresolved({:?})", id),
        }
    }
}

/// The dynamically typed value serialized by [`encode_variant`] and produced
/// by [`decode_variant`].
///
/// The enum is closed: every wire kind has exactly one arm, and the codec
/// dispatch over it is exhaustive.
///
/// [`encode_variant`]: crate::encode_variant
/// [`decode_variant`]: crate::decode_variant
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Variant {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Vector2(Vector2),
    Rect2(Rect2),
    Vector3(Vector3),
    Transform2d(Transform2D),
    Plane(Plane),
    Quat(Quat),
    Aabb(Aabb),
    Basis(Basis),
    Transform(Transform),
    Color(Color),
    /// An interned string identifier, distinct from `String` on the wire.
    StringName(String),
    NodePath(NodePath),
    Rid(Rid),
    Object(ObjectRef),
    Dictionary(Dictionary),
    Array(Vec<Variant>),
    ByteArray(Vec<u8>),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    StringArray(Vec<String>),
    Vector2Array(Vec<Vector2>),
    Vector3Array(Vec<Vector3>),
    ColorArray(Vec<Color>),
}

impl Variant {
    /// True for `Nil` and for a null object reference; both encode as a
    /// bare `Nil` record.
    pub fn is_nil(&self) -> bool {
        matches!(self, Variant::Nil) || matches!(self, Variant::Object(ObjectRef::Null))
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Variant::Int(v)
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Int(v as i64)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Float(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(v.to_owned())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::String(v)
    }
}
