//! The binary wire codec for [`Variant`] values.
//!
//! Every record is `u32 type_tag` followed by a kind-specific payload, all
//! little-endian. The low byte of the tag selects the kind; bit 16 selects
//! the 64-bit width for ints/floats, or the reference-id mode for objects.
//! Variable-length payloads (strings, byte pools) are zero-padded so every
//! record's total length is a multiple of 4, which keeps concatenated
//! records 4-byte aligned without any out-of-band bookkeeping.
//!
//! Decoding is safe on untrusted input: every multi-byte read is preceded by
//! a length check, every length-governed allocation is capped or guarded
//! against arithmetic overflow, and nesting is bounded by
//! [`MAX_RECURSION_DEPTH`].

use bytes::{Buf, BufMut, BytesMut};

use crate::object::{ClassRegistry, ObjectId};
use crate::value::{
    Aabb, Basis, Color, DictKey, Dictionary, NodePath, ObjectRef, Plane, Quat, Rect2, Rid,
    Transform, Transform2D, Variant, Vector2, Vector3,
};
use crate::{MarshalError, Result};

/// Mask selecting the kind byte of a type tag.
pub const ENCODE_MASK: u32 = 0xFF;
/// Tag flag: the int/float payload is 8 bytes instead of 4.
pub const ENCODE_FLAG_64: u32 = 1 << 16;
/// Tag flag: the object payload is a bare reference id, not class + properties.
pub const ENCODE_FLAG_OBJECT_AS_ID: u32 = 1 << 16;

/// Hard ceiling on a single decoded string or byte run. Anything larger is
/// rejected as corrupt even if the buffer could hold it.
pub const MAX_STRING_LEN: u32 = 1 << 24;

/// Maximum nesting of dictionaries, arrays, and by-value objects. Exceeding
/// it fails the whole operation rather than exhausting the stack. The codec
/// recurses once per level, so this must keep worst-case frame usage inside
/// a default 2 MiB thread stack even in unoptimized builds.
pub const MAX_RECURSION_DEPTH: usize = 128;

pub const KIND_NIL: u32 = 0;
pub const KIND_BOOL: u32 = 1;
pub const KIND_INT: u32 = 2;
pub const KIND_FLOAT: u32 = 3;
pub const KIND_STRING: u32 = 4;
pub const KIND_VECTOR2: u32 = 5;
pub const KIND_RECT2: u32 = 6;
pub const KIND_VECTOR3: u32 = 7;
pub const KIND_TRANSFORM2D: u32 = 8;
pub const KIND_PLANE: u32 = 9;
pub const KIND_QUAT: u32 = 10;
pub const KIND_AABB: u32 = 11;
pub const KIND_BASIS: u32 = 12;
pub const KIND_TRANSFORM: u32 = 13;
pub const KIND_COLOR: u32 = 14;
pub const KIND_STRING_NAME: u32 = 15;
pub const KIND_NODE_PATH: u32 = 16;
pub const KIND_RID: u32 = 17;
pub const KIND_OBJECT: u32 = 18;
pub const KIND_DICTIONARY: u32 = 19;
pub const KIND_ARRAY: u32 = 20;
pub const KIND_BYTE_ARRAY: u32 = 21;
pub const KIND_INT_ARRAY: u32 = 22;
pub const KIND_FLOAT_ARRAY: u32 = 23;
pub const KIND_STRING_ARRAY: u32 = 24;
pub const KIND_VECTOR2_ARRAY: u32 = 25;
pub const KIND_VECTOR3_ARRAY: u32 = 26;
pub const KIND_COLOR_ARRAY: u32 = 27;
/// One past the highest valid kind tag.
pub const KIND_MAX: u32 = 28;

pub(crate) struct DecodeCtx<'a> {
    pub allow_objects: bool,
    pub registry: &'a dyn ClassRegistry,
}

fn invalid(msg: impl Into<String>) -> MarshalError {
    MarshalError::InvalidData(msg.into())
}

/// Fixed-size payload guard. Shortfall here means the buffer is shorter than
/// the tag promised, which is corrupt data rather than a plain short read.
fn need(reader: &&[u8], bytes: usize, what: &str) -> Result<()> {
    if reader.remaining() < bytes {
        return Err(invalid(format!("truncated {what} payload")));
    }
    Ok(())
}

/// Zero bytes required after `len` payload bytes to reach 4-byte alignment.
fn pad4(len: usize) -> usize {
    (4 - len % 4) % 4
}

// --- String codec ---
// Wire shape: `u32 byte_length`, the raw bytes, then zero padding up to the
// next multiple of 4. Total consumption is always `4 + len + pad`.

fn decode_string(reader: &mut &[u8]) -> Result<String> {
    if reader.remaining() < 4 {
        return Err(invalid("truncated string length header"));
    }
    let strlen = reader.get_u32_le();
    let pad = pad4(strlen as usize) as u64;

    // A crafted length near INT32_MAX must not wrap once padding is added.
    let total = strlen as u64 + pad;
    if total > i32::MAX as u64 {
        return Err(MarshalError::UnexpectedEof);
    }
    if strlen > MAX_STRING_LEN {
        return Err(invalid(format!(
            "string length {strlen} exceeds the {MAX_STRING_LEN} byte ceiling"
        )));
    }
    if total as usize > reader.remaining() {
        return Err(MarshalError::UnexpectedEof);
    }

    let mut bytes = vec![0u8; strlen as usize];
    reader.copy_to_slice(&mut bytes);
    reader.advance(pad as usize);

    String::from_utf8(bytes).map_err(|e| invalid(format!("string is not valid UTF-8: {e}")))
}

fn string_encoded_len(s: &str) -> usize {
    4 + s.len() + pad4(s.len())
}

fn write_string(s: &str, writer: &mut BytesMut) {
    writer.put_u32_le(s.len() as u32);
    writer.put_slice(s.as_bytes());
    writer.put_bytes(0, pad4(s.len()));
}

/// Validated byte length of a pool-array payload. Rejects counts with the
/// sign bit set, counts whose byte length would overflow a 32-bit size, and
/// counts that promise more data than the buffer holds.
fn pool_payload_len(count: u32, elem_size: usize, remaining: usize) -> Result<usize> {
    if (count as i32) < 0 {
        return Err(invalid("pool array count has the sign bit set"));
    }
    let bytes = count as u64 * elem_size as u64;
    if bytes > i32::MAX as u64 {
        return Err(invalid("pool array byte length overflows"));
    }
    if bytes as usize > remaining {
        return Err(invalid("pool array payload exceeds remaining buffer"));
    }
    Ok(bytes as usize)
}

fn read_vector2(reader: &mut &[u8]) -> Vector2 {
    Vector2::new(reader.get_f32_le(), reader.get_f32_le())
}

fn read_vector3(reader: &mut &[u8]) -> Vector3 {
    Vector3::new(
        reader.get_f32_le(),
        reader.get_f32_le(),
        reader.get_f32_le(),
    )
}

fn read_color(reader: &mut &[u8]) -> Color {
    Color::new(
        reader.get_f32_le(),
        reader.get_f32_le(),
        reader.get_f32_le(),
        reader.get_f32_le(),
    )
}

fn read_basis(reader: &mut &[u8]) -> Basis {
    Basis {
        elements: [
            read_vector3(reader),
            read_vector3(reader),
            read_vector3(reader),
        ],
    }
}

// --- Decoder ---

/// Decodes one value record from the front of `reader`, advancing it by
/// exactly the bytes consumed. Recurses for containers and by-value objects.
pub(crate) fn decode_value(
    reader: &mut &[u8],
    depth: usize,
    ctx: &DecodeCtx<'_>,
) -> Result<Variant> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(MarshalError::RecursionLimit);
    }
    if reader.remaining() < 4 {
        return Err(invalid("truncated type tag"));
    }
    let header = reader.get_u32_le();
    let kind = header & ENCODE_MASK;
    if kind >= KIND_MAX {
        return Err(invalid(format!("unknown type tag {kind}")));
    }

    match kind {
        KIND_NIL => Ok(Variant::Nil),
        KIND_BOOL => {
            need(reader, 4, "bool")?;
            Ok(Variant::Bool(reader.get_u32_le() != 0))
        }
        KIND_INT => {
            if header & ENCODE_FLAG_64 != 0 {
                need(reader, 8, "int64")?;
                Ok(Variant::Int(reader.get_i64_le()))
            } else {
                need(reader, 4, "int32")?;
                // sign-extend the 32-bit form
                Ok(Variant::Int(reader.get_i32_le() as i64))
            }
        }
        KIND_FLOAT => {
            if header & ENCODE_FLAG_64 != 0 {
                need(reader, 8, "float64")?;
                Ok(Variant::Float(reader.get_f64_le()))
            } else {
                need(reader, 4, "float32")?;
                Ok(Variant::Float(reader.get_f32_le() as f64))
            }
        }
        KIND_STRING => Ok(Variant::String(decode_string(reader)?)),
        KIND_VECTOR2 => {
            need(reader, 4 * 2, "vector2")?;
            Ok(Variant::Vector2(read_vector2(reader)))
        }
        KIND_RECT2 => {
            need(reader, 4 * 4, "rect2")?;
            Ok(Variant::Rect2(Rect2::new(
                read_vector2(reader),
                read_vector2(reader),
            )))
        }
        KIND_VECTOR3 => {
            need(reader, 4 * 3, "vector3")?;
            Ok(Variant::Vector3(read_vector3(reader)))
        }
        KIND_TRANSFORM2D => {
            need(reader, 4 * 6, "transform2d")?;
            Ok(Variant::Transform2d(Transform2D {
                elements: [
                    read_vector2(reader),
                    read_vector2(reader),
                    read_vector2(reader),
                ],
            }))
        }
        KIND_PLANE => {
            need(reader, 4 * 4, "plane")?;
            Ok(Variant::Plane(Plane {
                normal: read_vector3(reader),
                d: reader.get_f32_le(),
            }))
        }
        KIND_QUAT => {
            need(reader, 4 * 4, "quat")?;
            Ok(Variant::Quat(Quat::new(
                reader.get_f32_le(),
                reader.get_f32_le(),
                reader.get_f32_le(),
                reader.get_f32_le(),
            )))
        }
        KIND_AABB => {
            need(reader, 4 * 6, "aabb")?;
            Ok(Variant::Aabb(Aabb {
                position: read_vector3(reader),
                size: read_vector3(reader),
            }))
        }
        KIND_BASIS => {
            need(reader, 4 * 9, "basis")?;
            Ok(Variant::Basis(read_basis(reader)))
        }
        KIND_TRANSFORM => {
            need(reader, 4 * 12, "transform")?;
            Ok(Variant::Transform(Transform {
                basis: read_basis(reader),
                origin: read_vector3(reader),
            }))
        }
        KIND_COLOR => {
            need(reader, 4 * 4, "color")?;
            Ok(Variant::Color(read_color(reader)))
        }
        KIND_STRING_NAME => Ok(Variant::StringName(decode_string(reader)?)),
        KIND_NODE_PATH => {
            if reader.remaining() < 4 {
                return Err(invalid("truncated node path header"));
            }
            let first = reader.get_u32_le();
            if first & 0x8000_0000 == 0 {
                // Legacy bare-string paths are rejected outright rather than
                // misread as a segment count.
                return Err(invalid("legacy node path format is not supported"));
            }
            if reader.remaining() < 8 {
                return Err(invalid("truncated node path header"));
            }
            let name_count = (first & 0x7FFF_FFFF) as u64;
            let mut subname_count = reader.get_u32_le() as u64;
            let flags = reader.get_u32_le();
            if flags & 2 != 0 {
                // Obsolete producers stored the property as one extra subname.
                subname_count += 1;
            }

            let mut names = Vec::new();
            let mut subnames = Vec::new();
            for i in 0..name_count + subname_count {
                let segment = decode_string(reader)?;
                if i < name_count {
                    names.push(segment);
                } else {
                    subnames.push(segment);
                }
            }
            Ok(Variant::NodePath(NodePath::new(
                names,
                subnames,
                flags & 1 != 0,
            )))
        }
        KIND_RID => Ok(Variant::Rid(Rid::default())),
        KIND_OBJECT => {
            if header & ENCODE_FLAG_OBJECT_AS_ID != 0 {
                need(reader, 8, "object id")?;
                let id = ObjectId(reader.get_u64_le());
                if id.is_null() {
                    Ok(Variant::Object(ObjectRef::Null))
                } else {
                    // The id cannot be resolved back to an object from the
                    // wire alone, so it is preserved as inert data.
                    Ok(Variant::Object(ObjectRef::Unresolved(id)))
                }
            } else {
                if !ctx.allow_objects {
                    return Err(MarshalError::Unauthorized);
                }
                let class_name = decode_string(reader)?;
                if class_name.is_empty() {
                    return Ok(Variant::Object(ObjectRef::Null));
                }
                let obj = ctx
                    .registry
                    .instantiate(&class_name)
                    .ok_or(MarshalError::ClassUnavailable(class_name))?;

                need(reader, 4, "object property count")?;
                let count = reader.get_u32_le() as i32;
                for _ in 0..count.max(0) {
                    let name = decode_string(reader)?;
                    let value = decode_value(reader, depth + 1, ctx)?;
                    obj.set(&name, value);
                }
                Ok(Variant::Object(ObjectRef::Instance(obj)))
            }
        }
        KIND_DICTIONARY => {
            need(reader, 4, "dictionary count")?;
            // The top bit was a shared-storage flag in historical producers.
            let count = reader.get_u32_le() & 0x7FFF_FFFF;

            let mut dict = Dictionary::default();
            for _ in 0..count {
                let key = match decode_value(reader, depth + 1, ctx)? {
                    Variant::String(s) => DictKey::String(s),
                    Variant::StringName(s) => DictKey::StringName(s),
                    _ => return Err(invalid("dictionary key is not a string kind")),
                };
                let value = decode_value(reader, depth + 1, ctx)?;
                dict.insert(key, value);
            }
            Ok(Variant::Dictionary(dict))
        }
        KIND_ARRAY => {
            need(reader, 4, "array count")?;
            let count = reader.get_u32_le() & 0x7FFF_FFFF;

            let mut values = Vec::new();
            for _ in 0..count {
                values.push(decode_value(reader, depth + 1, ctx)?);
            }
            Ok(Variant::Array(values))
        }
        KIND_BYTE_ARRAY => {
            need(reader, 4, "byte array count")?;
            let count = reader.get_u32_le();
            let len = pool_payload_len(count, 1, reader.remaining())?;

            let mut data = vec![0u8; len];
            reader.copy_to_slice(&mut data);

            let pad = pad4(len);
            if pad > reader.remaining() {
                return Err(MarshalError::UnexpectedEof);
            }
            reader.advance(pad);
            Ok(Variant::ByteArray(data))
        }
        KIND_INT_ARRAY => {
            need(reader, 4, "int array count")?;
            let count = reader.get_u32_le();
            pool_payload_len(count, 4, reader.remaining())?;

            let mut data = Vec::new();
            for _ in 0..count {
                data.push(reader.get_i32_le());
            }
            Ok(Variant::IntArray(data))
        }
        KIND_FLOAT_ARRAY => {
            need(reader, 4, "float array count")?;
            let count = reader.get_u32_le();
            pool_payload_len(count, 4, reader.remaining())?;

            let mut data = Vec::new();
            for _ in 0..count {
                data.push(reader.get_f32_le());
            }
            Ok(Variant::FloatArray(data))
        }
        KIND_STRING_ARRAY => {
            need(reader, 4, "string array count")?;
            let count = reader.get_u32_le() as i32;

            let mut strings = Vec::new();
            for _ in 0..count.max(0) {
                strings.push(decode_string(reader)?);
            }
            Ok(Variant::StringArray(strings))
        }
        KIND_VECTOR2_ARRAY => {
            need(reader, 4, "vector2 array count")?;
            let count = reader.get_u32_le();
            pool_payload_len(count, 4 * 2, reader.remaining())?;

            let mut data = Vec::new();
            for _ in 0..count {
                data.push(read_vector2(reader));
            }
            Ok(Variant::Vector2Array(data))
        }
        KIND_VECTOR3_ARRAY => {
            need(reader, 4, "vector3 array count")?;
            let count = reader.get_u32_le();
            pool_payload_len(count, 4 * 3, reader.remaining())?;

            let mut data = Vec::new();
            for _ in 0..count {
                data.push(read_vector3(reader));
            }
            Ok(Variant::Vector3Array(data))
        }
        KIND_COLOR_ARRAY => {
            need(reader, 4, "color array count")?;
            let count = reader.get_u32_le();
            pool_payload_len(count, 4 * 4, reader.remaining())?;

            let mut data = Vec::new();
            for _ in 0..count {
                data.push(read_color(reader));
            }
            Ok(Variant::ColorArray(data))
        }
        other => Err(invalid(format!("unknown type tag {other}"))),
    }
}

// --- Encoder ---
// Split into a measuring pass and a writing pass with identical per-kind
// arithmetic. Callers measure first, allocate exactly, then write; the two
// passes must agree byte for byte.

fn kind_tag(value: &Variant) -> u32 {
    match value {
        Variant::Nil => KIND_NIL,
        Variant::Bool(_) => KIND_BOOL,
        Variant::Int(_) => KIND_INT,
        Variant::Float(_) => KIND_FLOAT,
        Variant::String(_) => KIND_STRING,
        Variant::Vector2(_) => KIND_VECTOR2,
        Variant::Rect2(_) => KIND_RECT2,
        Variant::Vector3(_) => KIND_VECTOR3,
        Variant::Transform2d(_) => KIND_TRANSFORM2D,
        Variant::Plane(_) => KIND_PLANE,
        Variant::Quat(_) => KIND_QUAT,
        Variant::Aabb(_) => KIND_AABB,
        Variant::Basis(_) => KIND_BASIS,
        Variant::Transform(_) => KIND_TRANSFORM,
        Variant::Color(_) => KIND_COLOR,
        Variant::StringName(_) => KIND_STRING_NAME,
        Variant::NodePath(_) => KIND_NODE_PATH,
        Variant::Rid(_) => KIND_RID,
        Variant::Object(_) => KIND_OBJECT,
        Variant::Dictionary(_) => KIND_DICTIONARY,
        Variant::Array(_) => KIND_ARRAY,
        Variant::ByteArray(_) => KIND_BYTE_ARRAY,
        Variant::IntArray(_) => KIND_INT_ARRAY,
        Variant::FloatArray(_) => KIND_FLOAT_ARRAY,
        Variant::StringArray(_) => KIND_STRING_ARRAY,
        Variant::Vector2Array(_) => KIND_VECTOR2_ARRAY,
        Variant::Vector3Array(_) => KIND_VECTOR3_ARRAY,
        Variant::ColorArray(_) => KIND_COLOR_ARRAY,
    }
}

/// Width and mode flags are data-dependent: the same kind can produce
/// different wire sizes for different values.
fn header_flags(value: &Variant, full_objects: bool) -> u32 {
    match value {
        Variant::Int(v) => {
            if *v > i32::MAX as i64 || *v < i32::MIN as i64 {
                ENCODE_FLAG_64
            } else {
                0
            }
        }
        Variant::Float(d) => {
            // A double that does not survive the round trip through f32 is
            // written in full. NaN compares unequal to itself, so NaN always
            // takes the 64-bit path and keeps its payload bits.
            if (*d as f32) as f64 != *d {
                ENCODE_FLAG_64
            } else {
                0
            }
        }
        Variant::Object(ObjectRef::Null) => 0,
        Variant::Object(_) if !full_objects => ENCODE_FLAG_OBJECT_AS_ID,
        // An unresolved id is inert data and cannot be written by value.
        Variant::Object(ObjectRef::Unresolved(_)) => ENCODE_FLAG_OBJECT_AS_ID,
        _ => 0,
    }
}

/// Computes the exact encoded length of `value` without writing anything.
pub(crate) fn measure_value(value: &Variant, full_objects: bool, depth: usize) -> Result<usize> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(MarshalError::RecursionLimit);
    }
    // Nil and a null object both shrink to a bare Nil tag regardless of mode.
    if value.is_nil() {
        return Ok(4);
    }
    let flags = header_flags(value, full_objects);
    let mut len = 4;

    match value {
        Variant::Nil | Variant::Rid(_) => {}
        Variant::Bool(_) => len += 4,
        Variant::Int(_) | Variant::Float(_) => {
            len += if flags & ENCODE_FLAG_64 != 0 { 8 } else { 4 };
        }
        Variant::String(s) | Variant::StringName(s) => len += string_encoded_len(s),
        Variant::Vector2(_) => len += 4 * 2,
        Variant::Rect2(_) => len += 4 * 4,
        Variant::Vector3(_) => len += 4 * 3,
        Variant::Transform2d(_) => len += 4 * 6,
        Variant::Plane(_) => len += 4 * 4,
        Variant::Quat(_) => len += 4 * 4,
        Variant::Aabb(_) => len += 4 * 6,
        Variant::Basis(_) => len += 4 * 9,
        Variant::Transform(_) => len += 4 * 12,
        Variant::Color(_) => len += 4 * 4,
        Variant::NodePath(np) => {
            len += 12;
            for segment in np.names.iter().chain(np.subnames.iter()) {
                len += string_encoded_len(segment);
            }
        }
        Variant::Object(ObjectRef::Null) => unreachable!(),
        Variant::Object(object) => {
            if flags & ENCODE_FLAG_OBJECT_AS_ID != 0 {
                len += 8;
            } else {
                let ObjectRef::Instance(obj) = object else {
                    unreachable!()
                };
                len += string_encoded_len(obj.class_name());
                len += 4;
                for prop in obj.property_list() {
                    if !prop.is_stored() {
                        continue;
                    }
                    len += string_encoded_len(&prop.name);
                    let property = obj.get(&prop.name).unwrap_or_default();
                    let child = measure_value(&property, full_objects, depth + 1)?;
                    debug_assert_eq!(child % 4, 0);
                    len += child;
                }
            }
        }
        Variant::Dictionary(dict) => {
            len += 4;
            for (key, val) in dict {
                len += 4 + string_encoded_len(key.as_str());
                let child = measure_value(val, full_objects, depth + 1)?;
                debug_assert_eq!(child % 4, 0);
                len += child;
            }
        }
        Variant::Array(values) => {
            len += 4;
            for val in values {
                let child = measure_value(val, full_objects, depth + 1)?;
                debug_assert_eq!(child % 4, 0);
                len += child;
            }
        }
        Variant::ByteArray(data) => len += 4 + data.len() + pad4(data.len()),
        Variant::IntArray(data) => len += 4 + data.len() * 4,
        Variant::FloatArray(data) => len += 4 + data.len() * 4,
        Variant::StringArray(strings) => {
            len += 4;
            for s in strings {
                len += string_encoded_len(s);
            }
        }
        Variant::Vector2Array(data) => len += 4 + data.len() * 4 * 2,
        Variant::Vector3Array(data) => len += 4 + data.len() * 4 * 3,
        Variant::ColorArray(data) => len += 4 + data.len() * 4 * 4,
    }

    Ok(len)
}

fn put_vector2(writer: &mut BytesMut, v: Vector2) {
    writer.put_f32_le(v.x);
    writer.put_f32_le(v.y);
}

fn put_vector3(writer: &mut BytesMut, v: Vector3) {
    writer.put_f32_le(v.x);
    writer.put_f32_le(v.y);
    writer.put_f32_le(v.z);
}

fn put_color(writer: &mut BytesMut, c: Color) {
    writer.put_f32_le(c.r);
    writer.put_f32_le(c.g);
    writer.put_f32_le(c.b);
    writer.put_f32_le(c.a);
}

fn put_basis(writer: &mut BytesMut, b: &Basis) {
    for row in &b.elements {
        put_vector3(writer, *row);
    }
}

/// Appends the encoding of `value` to `writer` and returns the number of
/// bytes written, which always equals [`measure_value`] for the same input.
pub(crate) fn write_value(
    value: &Variant,
    writer: &mut BytesMut,
    full_objects: bool,
    depth: usize,
) -> Result<usize> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(MarshalError::RecursionLimit);
    }
    let start = writer.len();

    if value.is_nil() {
        writer.put_u32_le(KIND_NIL);
        return Ok(4);
    }

    let flags = header_flags(value, full_objects);
    writer.put_u32_le(kind_tag(value) | flags);

    match value {
        Variant::Nil | Variant::Rid(_) => {}
        Variant::Bool(v) => writer.put_u32_le(*v as u32),
        Variant::Int(v) => {
            if flags & ENCODE_FLAG_64 != 0 {
                writer.put_i64_le(*v);
            } else {
                writer.put_i32_le(*v as i32);
            }
        }
        Variant::Float(d) => {
            if flags & ENCODE_FLAG_64 != 0 {
                writer.put_f64_le(*d);
            } else {
                writer.put_f32_le(*d as f32);
            }
        }
        Variant::String(s) | Variant::StringName(s) => write_string(s, writer),
        Variant::Vector2(v) => put_vector2(writer, *v),
        Variant::Rect2(r) => {
            put_vector2(writer, r.position);
            put_vector2(writer, r.size);
        }
        Variant::Vector3(v) => put_vector3(writer, *v),
        Variant::Transform2d(t) => {
            for element in &t.elements {
                put_vector2(writer, *element);
            }
        }
        Variant::Plane(p) => {
            put_vector3(writer, p.normal);
            writer.put_f32_le(p.d);
        }
        Variant::Quat(q) => {
            writer.put_f32_le(q.x);
            writer.put_f32_le(q.y);
            writer.put_f32_le(q.z);
            writer.put_f32_le(q.w);
        }
        Variant::Aabb(b) => {
            put_vector3(writer, b.position);
            put_vector3(writer, b.size);
        }
        Variant::Basis(b) => put_basis(writer, b),
        Variant::Transform(t) => {
            put_basis(writer, &t.basis);
            put_vector3(writer, t.origin);
        }
        Variant::Color(c) => put_color(writer, *c),
        Variant::NodePath(np) => {
            writer.put_u32_le(np.names.len() as u32 | 0x8000_0000);
            writer.put_u32_le(np.subnames.len() as u32);
            writer.put_u32_le(np.absolute as u32);
            for segment in np.names.iter().chain(np.subnames.iter()) {
                write_string(segment, writer);
            }
        }
        Variant::Object(ObjectRef::Null) => unreachable!(),
        Variant::Object(object) => {
            if flags & ENCODE_FLAG_OBJECT_AS_ID != 0 {
                let id = match object {
                    ObjectRef::Instance(obj) => obj.instance_id(),
                    ObjectRef::Unresolved(id) => *id,
                    ObjectRef::Null => unreachable!(),
                };
                writer.put_u64_le(id.0);
            } else {
                let ObjectRef::Instance(obj) = object else {
                    unreachable!()
                };
                write_string(obj.class_name(), writer);

                let props = obj.property_list();
                let stored = props.iter().filter(|p| p.is_stored()).count();
                writer.put_u32_le(stored as u32);

                for prop in &props {
                    if !prop.is_stored() {
                        continue;
                    }
                    write_string(&prop.name, writer);
                    let property = obj.get(&prop.name).unwrap_or_default();
                    let child = write_value(&property, writer, full_objects, depth + 1)?;
                    debug_assert_eq!(child % 4, 0);
                }
            }
        }
        Variant::Dictionary(dict) => {
            writer.put_u32_le(dict.len() as u32);
            for (key, val) in dict {
                let key_tag = match key {
                    DictKey::String(_) => KIND_STRING,
                    DictKey::StringName(_) => KIND_STRING_NAME,
                };
                writer.put_u32_le(key_tag);
                write_string(key.as_str(), writer);
                let child = write_value(val, writer, full_objects, depth + 1)?;
                debug_assert_eq!(child % 4, 0);
            }
        }
        Variant::Array(values) => {
            writer.put_u32_le(values.len() as u32);
            for val in values {
                let child = write_value(val, writer, full_objects, depth + 1)?;
                debug_assert_eq!(child % 4, 0);
            }
        }
        Variant::ByteArray(data) => {
            writer.put_u32_le(data.len() as u32);
            writer.put_slice(data);
            writer.put_bytes(0, pad4(data.len()));
        }
        Variant::IntArray(data) => {
            writer.put_u32_le(data.len() as u32);
            for v in data {
                writer.put_i32_le(*v);
            }
        }
        Variant::FloatArray(data) => {
            writer.put_u32_le(data.len() as u32);
            for v in data {
                writer.put_f32_le(*v);
            }
        }
        Variant::StringArray(strings) => {
            writer.put_u32_le(strings.len() as u32);
            for s in strings {
                write_string(s, writer);
            }
        }
        Variant::Vector2Array(data) => {
            writer.put_u32_le(data.len() as u32);
            for v in data {
                put_vector2(writer, *v);
            }
        }
        Variant::Vector3Array(data) => {
            writer.put_u32_le(data.len() as u32);
            for v in data {
                put_vector3(writer, *v);
            }
        }
        Variant::ColorArray(data) => {
            writer.put_u32_le(data.len() as u32);
            for c in data {
                put_color(writer, *c);
            }
        }
    }

    Ok(writer.len() - start)
}
