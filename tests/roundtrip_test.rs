use bytes::BytesMut;
use variant_marshal::marshal::{
    KIND_FLOAT, KIND_INT, KIND_NODE_PATH, KIND_RID, KIND_STRING_NAME,
};
use variant_marshal::{
    decode_variant, encode_variant, encode_variant_to_bytes, encoded_variant_len, Aabb, Basis,
    Color, DictKey, Dictionary, NodePath, Plane, Quat, Rect2, Rid, Transform, Transform2D,
    Variant, Vector2, Vector3, ENCODE_FLAG_64, ENCODE_MASK,
};

fn roundtrip(value: &Variant) -> Variant {
    let bytes = encode_variant_to_bytes(value, false).unwrap();
    assert_eq!(bytes.len() % 4, 0, "record length must be 4-byte aligned");
    let (decoded, consumed) = decode_variant(&bytes, false).unwrap();
    assert_eq!(consumed, bytes.len(), "decode must consume the whole record");
    decoded
}

fn header(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytes[..4].try_into().unwrap())
}

#[test]
fn test_scalar_roundtrip() {
    for value in [
        Variant::Nil,
        Variant::Bool(true),
        Variant::Bool(false),
        Variant::Int(0),
        Variant::Int(-1),
        Variant::Int(i32::MAX as i64),
        Variant::Int(i32::MIN as i64),
        Variant::Int(i64::MAX),
        Variant::Int(i64::MIN),
        Variant::Float(0.0),
        Variant::Float(1.5),
        Variant::Float(-2.25),
        Variant::Float(0.1),
        Variant::Float(f64::INFINITY),
        Variant::Float(f64::NEG_INFINITY),
    ] {
        assert_eq!(roundtrip(&value), value);
    }
}

#[test]
fn test_int_width_selection() {
    // INT32_MAX still fits the 4-byte form.
    let bytes = encode_variant_to_bytes(&Variant::Int(2_147_483_647), false).unwrap();
    assert_eq!(header(&bytes) & ENCODE_FLAG_64, 0);
    assert_eq!(bytes.len(), 8);

    // One past it must take the 8-byte form.
    let bytes = encode_variant_to_bytes(&Variant::Int(2_147_483_648), false).unwrap();
    assert_eq!(header(&bytes) & ENCODE_MASK, KIND_INT);
    assert_ne!(header(&bytes) & ENCODE_FLAG_64, 0);
    assert_eq!(bytes.len(), 12);

    let bytes = encode_variant_to_bytes(&Variant::Int(i32::MIN as i64 - 1), false).unwrap();
    assert_ne!(header(&bytes) & ENCODE_FLAG_64, 0);
}

#[test]
fn test_float_width_selection() {
    // 1.5 is exact in f32.
    let bytes = encode_variant_to_bytes(&Variant::Float(1.5), false).unwrap();
    assert_eq!(header(&bytes) & ENCODE_FLAG_64, 0);
    assert_eq!(bytes.len(), 8);

    // 0.1 as a double is not representable in f32, so it is written in full.
    let bytes = encode_variant_to_bytes(&Variant::Float(0.1), false).unwrap();
    assert_eq!(header(&bytes) & ENCODE_MASK, KIND_FLOAT);
    assert_ne!(header(&bytes) & ENCODE_FLAG_64, 0);
    assert_eq!(bytes.len(), 12);
}

#[test]
fn test_float_nan_bits_preserved() {
    let nan = f64::from_bits(0x7FF8_0000_DEAD_BEEF);
    let bytes = encode_variant_to_bytes(&Variant::Float(nan), false).unwrap();
    // NaN never survives the f32 round-trip equality test.
    assert_ne!(header(&bytes) & ENCODE_FLAG_64, 0);

    let (decoded, _) = decode_variant(&bytes, false).unwrap();
    match decoded {
        Variant::Float(d) => assert_eq!(d.to_bits(), nan.to_bits()),
        other => panic!("expected Float, got {other:?}"),
    }
}

#[test]
fn test_string_roundtrip_and_alignment() {
    for len in 0..=5usize {
        let s = "abcde"[..len].to_string();
        let value = Variant::String(s.clone());
        assert_eq!(roundtrip(&value), value);

        let expected = 4 + 4 + len + (4 - len % 4) % 4;
        assert_eq!(encoded_variant_len(&value, false).unwrap(), expected);
    }

    let value = Variant::String("non-ascii: héllo→".to_string());
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn test_string_name_keeps_its_kind() {
    let value = Variant::StringName("physics_process".to_string());
    let bytes = encode_variant_to_bytes(&value, false).unwrap();
    assert_eq!(header(&bytes) & ENCODE_MASK, KIND_STRING_NAME);
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn test_geometry_roundtrip() {
    let basis = Basis {
        elements: [
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(4.0, 5.0, 6.0),
            Vector3::new(7.0, 8.0, 9.0),
        ],
    };
    for value in [
        Variant::Vector2(Vector2::new(1.5, -2.5)),
        Variant::Rect2(Rect2::new(Vector2::new(0.0, 1.0), Vector2::new(32.0, 64.0))),
        Variant::Vector3(Vector3::new(1.0, -2.0, 3.5)),
        Variant::Transform2d(Transform2D {
            elements: [
                Vector2::new(1.0, 0.0),
                Vector2::new(0.0, 1.0),
                Vector2::new(10.0, -4.0),
            ],
        }),
        Variant::Plane(Plane {
            normal: Vector3::new(0.0, 1.0, 0.0),
            d: 7.25,
        }),
        Variant::Quat(Quat::new(0.0, 0.0, 0.7071, 0.7071)),
        Variant::Aabb(Aabb {
            position: Vector3::new(-1.0, -1.0, -1.0),
            size: Vector3::new(2.0, 2.0, 2.0),
        }),
        Variant::Basis(basis),
        Variant::Transform(Transform {
            basis,
            origin: Vector3::new(5.0, 6.0, 7.0),
        }),
        Variant::Color(Color::new(0.25, 0.5, 0.75, 1.0)),
    ] {
        assert_eq!(roundtrip(&value), value);
    }
}

#[test]
fn test_node_path_roundtrip() {
    let path = NodePath::new(
        vec!["a".to_string(), "b".to_string()],
        vec!["c".to_string()],
        true,
    );
    let value = Variant::NodePath(path.clone());
    let bytes = encode_variant_to_bytes(&value, false).unwrap();

    assert_eq!(header(&bytes) & ENCODE_MASK, KIND_NODE_PATH);
    // name count with the new-format marker bit, subname count, flags
    assert_eq!(header(&bytes[4..]), 2 | 0x8000_0000);
    assert_eq!(header(&bytes[8..]), 1);
    assert_eq!(header(&bytes[12..]), 1);

    match roundtrip(&value) {
        Variant::NodePath(decoded) => {
            assert_eq!(decoded.names, path.names);
            assert_eq!(decoded.subnames, path.subnames);
            assert!(decoded.absolute);
        }
        other => panic!("expected NodePath, got {other:?}"),
    }
}

#[test]
fn test_relative_empty_node_path() {
    let value = Variant::NodePath(NodePath::default());
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn test_rid_has_no_payload() {
    let value = Variant::Rid(Rid(99));
    let bytes = encode_variant_to_bytes(&value, false).unwrap();
    assert_eq!(bytes.len(), 4);
    assert_eq!(header(&bytes) & ENCODE_MASK, KIND_RID);
    // the wire carries no id, so the decoded rid is always empty
    assert_eq!(roundtrip(&value), Variant::Rid(Rid::default()));
}

#[test]
fn test_dictionary_roundtrip_preserves_order() {
    let mut dict = Dictionary::default();
    dict.insert(DictKey::String("zeta".into()), Variant::Int(1));
    dict.insert(DictKey::StringName("alpha".into()), Variant::Bool(true));
    dict.insert(DictKey::String("mid".into()), Variant::from("value"));

    let value = Variant::Dictionary(dict.clone());
    match roundtrip(&value) {
        Variant::Dictionary(decoded) => {
            let keys: Vec<_> = decoded.keys().cloned().collect();
            assert_eq!(
                keys,
                vec![
                    DictKey::String("zeta".into()),
                    DictKey::StringName("alpha".into()),
                    DictKey::String("mid".into()),
                ]
            );
            assert_eq!(decoded, dict);
        }
        other => panic!("expected Dictionary, got {other:?}"),
    }
}

#[test]
fn test_nested_containers_roundtrip() {
    let mut inner = Dictionary::default();
    inner.insert(
        DictKey::String("list".into()),
        Variant::Array(vec![Variant::Int(1), Variant::Nil, Variant::from("x")]),
    );
    let value = Variant::Array(vec![
        Variant::Dictionary(inner),
        Variant::Float(2.5),
        Variant::Array(vec![]),
    ]);
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn test_pool_array_roundtrip() {
    for value in [
        Variant::ByteArray(vec![]),
        Variant::ByteArray(vec![1]),
        Variant::ByteArray(vec![1, 2, 3]),
        Variant::ByteArray(vec![1, 2, 3, 4]),
        Variant::ByteArray((0..=255).collect()),
        Variant::IntArray(vec![]),
        Variant::IntArray(vec![i32::MIN, -1, 0, 1, i32::MAX]),
        Variant::FloatArray(vec![0.0, -1.5, 3.25]),
        Variant::StringArray(vec![]),
        Variant::StringArray(vec!["".into(), "a".into(), "abcd".into(), "abcde".into()]),
        Variant::Vector2Array(vec![Vector2::new(1.0, 2.0), Vector2::new(-3.0, 4.0)]),
        Variant::Vector3Array(vec![Vector3::new(1.0, 2.0, 3.0)]),
        Variant::ColorArray(vec![Color::new(1.0, 0.0, 0.0, 1.0)]),
    ] {
        assert_eq!(roundtrip(&value), value);
    }
}

#[test]
fn test_byte_array_alignment() {
    for len in 0..=5usize {
        let value = Variant::ByteArray(vec![0xAB; len]);
        let bytes = encode_variant_to_bytes(&value, false).unwrap();
        assert_eq!(bytes.len(), 4 + 4 + len + (4 - len % 4) % 4);
        assert_eq!(roundtrip(&value), value);
    }
}

#[test]
fn test_measure_matches_written_length() {
    let mut dict = Dictionary::default();
    dict.insert(DictKey::String("k".into()), Variant::Int(1 << 40));
    let samples = [
        Variant::Nil,
        Variant::Bool(true),
        Variant::Int(12),
        Variant::Int(1 << 40),
        Variant::Float(0.1),
        Variant::from("measure me"),
        Variant::StringName("sn".into()),
        Variant::Vector3(Vector3::new(1.0, 2.0, 3.0)),
        Variant::NodePath(NodePath::new(vec!["root".into()], vec!["prop".into()], false)),
        Variant::Dictionary(dict),
        Variant::Array(vec![Variant::Int(1), Variant::from("two")]),
        Variant::ByteArray(vec![1, 2, 3]),
        Variant::StringArray(vec!["a".into(), "bcdef".into()]),
        Variant::Vector2Array(vec![Vector2::new(0.0, 0.0)]),
    ];
    for value in &samples {
        let measured = encoded_variant_len(value, false).unwrap();
        let mut writer = BytesMut::new();
        let written = encode_variant(value, &mut writer, false).unwrap();
        assert_eq!(measured, written, "measure/write disagree for {value:?}");
        assert_eq!(writer.len(), written);
    }
}

#[test]
fn test_concatenated_records_decode_sequentially() {
    let values = [
        Variant::Int(42),
        Variant::from("stream"),
        Variant::Array(vec![Variant::Bool(false)]),
    ];
    let mut writer = BytesMut::new();
    for value in &values {
        encode_variant(value, &mut writer, false).unwrap();
    }

    let buf = writer.freeze();
    let mut cursor = &buf[..];
    for expected in &values {
        let (decoded, consumed) = decode_variant(cursor, false).unwrap();
        assert_eq!(&decoded, expected);
        cursor = &cursor[consumed..];
    }
    assert!(cursor.is_empty());
}
