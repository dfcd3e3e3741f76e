//! # variant-marshal
//!
//! A binary serialization codec for dynamically typed variant values.
//!
//! The crate converts a [`Variant`] — a closed sum type over scalars,
//! strings, geometric types, object references, ordered dictionaries,
//! heterogeneous arrays, and homogeneous pool arrays — to and from a flat,
//! self-describing, little-endian wire format:
//!
//! - Each record is a `u32` type tag plus a kind-specific payload, padded so
//!   every record occupies a multiple of 4 bytes. Records compose by
//!   concatenation, and decoding reports the exact bytes consumed so callers
//!   can walk a cursor through a stream of values.
//! - Int and float widths are chosen per value: a 64-bit payload is written
//!   only when the value does not fit (or does not survive) the 32-bit form.
//! - Objects serialize either by value (class name plus reflected stored
//!   properties, via a caller-supplied [`ClassRegistry`]) or as a bare
//!   numeric reference id.
//! - Decoding is hardened against untrusted input: every read is
//!   bounds-checked, length fields are capped or overflow-guarded, and
//!   container nesting is limited by [`MAX_RECURSION_DEPTH`].
//!
//! Encoding is two explicit passes sharing one set of size rules: measure
//! with [`encoded_variant_len`], allocate, then write with
//! [`encode_variant`] — or let [`encode_variant_to_bytes`] do both.
//!
//! ```rust
//! use variant_marshal::{decode_variant, encode_variant_to_bytes, Variant};
//!
//! let value = Variant::Array(vec![Variant::Int(7), Variant::from("hello")]);
//! let bytes = encode_variant_to_bytes(&value, false).unwrap();
//! let (decoded, consumed) = decode_variant(&bytes, false).unwrap();
//! assert_eq!(decoded, value);
//! assert_eq!(consumed, bytes.len());
//! ```

pub mod marshal;
pub mod object;
pub mod value;

use bytes::{Bytes, BytesMut};

pub use crate::marshal::{ENCODE_FLAG_64, ENCODE_FLAG_OBJECT_AS_ID, ENCODE_MASK};
pub use crate::marshal::{MAX_RECURSION_DEPTH, MAX_STRING_LEN};
pub use crate::object::{
    ClassRegistry, NullRegistry, Object, ObjectId, PropertyInfo, PROPERTY_USAGE_STORAGE,
};
pub use crate::value::{
    Aabb, Basis, Color, DictKey, Dictionary, NodePath, ObjectRef, Plane, Quat, Rect2, Rid,
    Transform, Transform2D, Variant, Vector2, Vector3,
};

/// Errors that can occur while encoding or decoding a [`Variant`].
///
/// Failures propagate immediately and unchanged from any recursion level;
/// there is no partial-result salvage, because the format has no
/// resynchronization markers — a single corrupt field invalidates the record.
#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    /// The buffer contents are malformed: a bad tag, a wrong key kind, an
    /// unsupported legacy structure, or a length field that fails a sanity
    /// check.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// A declared length runs past the end of the buffer. Unlike
    /// [`InvalidData`](Self::InvalidData), this can mean the caller simply
    /// needs more bytes.
    #[error("unexpected end of buffer")]
    UnexpectedEof,
    /// An object-by-value payload was encountered but object decoding was
    /// not permitted by the caller.
    #[error("object decoding is not allowed")]
    Unauthorized,
    /// The class named by an object-by-value payload could not be
    /// constructed by the registry.
    #[error("class `{0}` is not available in the registry")]
    ClassUnavailable(String),
    /// Nesting exceeded [`MAX_RECURSION_DEPTH`]. Guards cyclic or
    /// maliciously deep structures; deliberately an error, not a crash.
    #[error("maximum recursion depth exceeded")]
    RecursionLimit,
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, MarshalError>;

/// Decodes one value from the front of `buf`, returning it together with the
/// number of bytes consumed.
///
/// Object-by-value payloads are rejected: with `allow_objects` false they
/// fail [`MarshalError::Unauthorized`], with it true they fail
/// [`MarshalError::ClassUnavailable`] because no registry is supplied. Use
/// [`decode_variant_with_registry`] to actually construct objects.
/// Reference-id object payloads decode either way.
///
/// The consumed length is exact and recursively composable: decoding a
/// stream of concatenated records is a loop of `decode_variant` calls, each
/// advancing by the returned count.
pub fn decode_variant(buf: &[u8], allow_objects: bool) -> Result<(Variant, usize)> {
    decode_variant_with_registry(buf, allow_objects, &NullRegistry)
}

/// [`decode_variant`] with a class registry for object-by-value payloads.
///
/// For each by-value object the registry constructs a fresh instance of the
/// named class and decoded properties are applied onto it through
/// [`Object::set`]. Construction failure aborts the whole decode.
pub fn decode_variant_with_registry(
    buf: &[u8],
    allow_objects: bool,
    registry: &dyn ClassRegistry,
) -> Result<(Variant, usize)> {
    let mut reader = buf;
    let ctx = marshal::DecodeCtx {
        allow_objects,
        registry,
    };
    let value = marshal::decode_value(&mut reader, 0, &ctx)?;
    Ok((value, buf.len() - reader.len()))
}

/// Computes the exact number of bytes [`encode_variant`] will write for
/// `value`, without writing anything.
///
/// With `full_objects` true, live object references serialize by value
/// (class name and stored properties, recursively); with it false, as a
/// bare reference id.
pub fn encoded_variant_len(value: &Variant, full_objects: bool) -> Result<usize> {
    marshal::measure_value(value, full_objects, 0)
}

/// Appends the encoding of `value` to `writer` and returns the number of
/// bytes written.
///
/// The written length always equals [`encoded_variant_len`] for the same
/// value and mode, and is always a multiple of 4.
pub fn encode_variant(value: &Variant, writer: &mut BytesMut, full_objects: bool) -> Result<usize> {
    marshal::write_value(value, writer, full_objects, 0)
}

/// Encodes `value` into a freshly allocated buffer sized by a measuring
/// pass, packaging the measure-then-write idiom.
pub fn encode_variant_to_bytes(value: &Variant, full_objects: bool) -> Result<Bytes> {
    let len = encoded_variant_len(value, full_objects)?;
    let mut writer = BytesMut::with_capacity(len);
    let written = marshal::write_value(value, &mut writer, full_objects, 0)?;
    debug_assert_eq!(written, len);
    Ok(writer.freeze())
}
