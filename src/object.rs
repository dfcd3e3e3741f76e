//! The object-collaborator seam.
//!
//! The codec never owns object semantics: constructing an instance from a
//! class name and reflecting its properties are the host's business. Hosts
//! plug in through [`ClassRegistry`] and [`Object`]; the codec only calls
//! these when encoding or decoding objects by value.

use std::sync::Arc;

use crate::value::Variant;

/// Property usage flag: the property participates in serialization.
/// Object encoding by value skips every property without this flag.
pub const PROPERTY_USAGE_STORAGE: u32 = 1 << 0;

/// One entry of an object's reflected property list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    pub usage: u32,
}

impl PropertyInfo {
    pub fn stored(name: impl Into<String>) -> Self {
        PropertyInfo {
            name: name.into(),
            usage: PROPERTY_USAGE_STORAGE,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.usage & PROPERTY_USAGE_STORAGE != 0
    }
}

/// The numeric identity of a live object. `ObjectId(0)` is the null id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub const NULL: ObjectId = ObjectId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

/// A reflectable object that can be serialized by value or by id.
///
/// `set` takes `&self`: implementations that accept property writes after
/// construction use interior mutability, and any synchronization needed for
/// concurrent decodes is the implementor's responsibility — the codec adds
/// no locking of its own.
pub trait Object: Send + Sync {
    /// The registered class name, written to the wire in by-value mode.
    fn class_name(&self) -> &str;

    /// The object's numeric identity, written to the wire in by-id mode.
    fn instance_id(&self) -> ObjectId;

    /// The reflected property list. Only entries flagged with
    /// [`PROPERTY_USAGE_STORAGE`] are serialized.
    fn property_list(&self) -> Vec<PropertyInfo>;

    /// Read a property. `None` encodes as `Nil`.
    fn get(&self, name: &str) -> Option<Variant>;

    /// Write a property decoded from the wire. Unknown names may be ignored.
    fn set(&self, name: &str, value: Variant);
}

/// Constructs instances from class names while decoding objects by value.
pub trait ClassRegistry: Sync {
    /// Construct a fresh instance of `class_name`, or `None` if the class is
    /// not registered. A `None` here fails the decode as unavailable.
    fn instantiate(&self, class_name: &str) -> Option<Arc<dyn Object>>;
}

/// A registry with no classes. Decoding an object by value through it always
/// fails as unavailable.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRegistry;

impl ClassRegistry for NullRegistry {
    fn instantiate(&self, _class_name: &str) -> Option<Arc<dyn Object>> {
        None
    }
}
