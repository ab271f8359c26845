//! Cross-cutting property tests spanning freeze, thaw, compression,
//! encryption, and the allow-list policy together (SPEC_FULL.md §8).

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use nippy_rs::{
    AllowList, Compressor, Encryptor, Error, FreezeConfig, Header, Integer, Name, Opaque, Password,
    Record, ThawConfig, Value,
};

fn sample_values() -> Vec<Value> {
    let mut map = BTreeMap::new();
    map.insert(Value::Str("k".into()), Value::Int(Integer::from(7i64)));

    let mut fields = BTreeMap::new();
    fields.insert("x".to_string(), Value::Int(Integer::from(1i64)));
    fields.insert("y".to_string(), Value::Str("hello, world".into()));

    vec![
        Value::Null,
        Value::Bool(true),
        Value::Char('λ'),
        Value::Int(Integer::from(-12345i64)),
        Value::F64(3.25),
        Value::Str("non-ascii: héllo wörld 日本語".into()),
        Value::Bytes(vec![0, 1, 2, 255]),
        Value::Vector((0..10).map(|i| Value::Int(Integer::from(i as i64))).collect()),
        Value::List(VecDeque::from(vec![Value::Null, Value::Bool(false)])),
        Value::Set(BTreeSet::from([Value::Int(Integer::from(1i64)), Value::Int(Integer::from(2i64))])),
        Value::Map(map),
        Value::Record(Record { name: Name::local("Point"), fields }),
    ]
}

#[test]
fn round_trip_across_every_compressor_and_encryptor() {
    let compressors = [
        Compressor::None,
        Compressor::Lz4,
        Compressor::Zstd { level: 3 },
        Compressor::Lzma { preset: 6 },
        Compressor::Snappy,
    ];
    let encryptors = [None, Some(Encryptor::Gcm), Some(Encryptor::Cbc)];
    // Cached mode iterates the KDF far fewer times than salted; cover both
    // so the matrix doesn't only ever exercise the cheap path.
    let password_modes: [fn(Vec<u8>) -> Password; 2] = [Password::cached, Password::salted];

    for value in sample_values() {
        for compressor in compressors {
            for encryptor in encryptors {
                for password_mode in password_modes {
                    let password = encryptor.map(|_| password_mode(b"integration-test-password".to_vec()));
                    let freeze_config = FreezeConfig {
                        compressor,
                        encryptor: encryptor.unwrap_or_default(),
                        password: password.clone(),
                        ..Default::default()
                    };
                    let bytes = nippy_rs::freeze(&value, &freeze_config).unwrap();

                    let thaw_config = ThawConfig {
                        compressor,
                        encryptor: encryptor.unwrap_or_default(),
                        password,
                        ..Default::default()
                    };
                    let thawed = nippy_rs::thaw(&bytes, &thaw_config).unwrap();
                    assert_eq!(thawed, value, "compressor={compressor:?} encryptor={encryptor:?}");

                    // Password mode only affects anything when encryption is
                    // actually on; skip the redundant iteration otherwise.
                    if encryptor.is_none() {
                        break;
                    }
                }
            }
        }
    }
}

#[test]
fn freezing_is_deterministic_without_encryption() {
    let value = sample_values().pop().unwrap();
    let config = FreezeConfig { compressor: Compressor::None, ..Default::default() };
    let a = nippy_rs::freeze(&value, &config).unwrap();
    let b = nippy_rs::freeze(&value, &config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn metadata_survives_round_trip_when_enabled_on_both_sides() {
    let value = Value::Meta {
        metadata: Box::new(Value::Str("provenance".into())),
        value: Box::new(Value::Int(Integer::from(42i64))),
    };
    let config = FreezeConfig::default();
    let bytes = nippy_rs::freeze(&value, &config).unwrap();
    let thawed = nippy_rs::thaw(&bytes, &ThawConfig::default()).unwrap();
    match thawed {
        Value::Meta { metadata, value } => {
            assert_eq!(*metadata, Value::Str("provenance".into()));
            assert_eq!(*value, Value::Int(Integer::from(42i64)));
        }
        other => panic!("expected metadata wrapper, got {other:?}"),
    }
}

#[test]
fn metadata_is_dropped_when_disabled_on_thaw() {
    let value = Value::Meta {
        metadata: Box::new(Value::Str("provenance".into())),
        value: Box::new(Value::Int(Integer::from(42i64))),
    };
    let bytes = nippy_rs::freeze(&value, &FreezeConfig::default()).unwrap();
    let config = ThawConfig { include_metadata: false, ..Default::default() };
    let thawed = nippy_rs::thaw(&bytes, &config).unwrap();
    assert_eq!(thawed, Value::Int(Integer::from(42i64)));
}

#[test]
fn freeze_side_deny_rejects_opaque_value() {
    let opaque = Opaque { class: "danger.Bomb".to_string(), bytes: vec![1, 2, 3] };
    let deny = AllowList::deny_all();
    let config = FreezeConfig { allow_list: Some(&deny), ..Default::default() };
    let err = nippy_rs::freeze(&Value::Opaque(opaque), &config).unwrap_err();
    assert!(matches!(err, Error::UnfreezableType(_)));
}

#[test]
fn thaw_side_deny_quarantines_then_read_quarantined_unsafe_recovers_it() {
    let opaque = Opaque { class: "danger.Bomb".to_string(), bytes: vec![9, 9, 9] };
    let bytes = nippy_rs::freeze(&Value::Opaque(opaque.clone()), &FreezeConfig::default()).unwrap();

    let deny = AllowList::deny_all();
    let config = ThawConfig { allow_list: Some(&deny), ..Default::default() };
    let thawed = nippy_rs::thaw(&bytes, &config).unwrap();
    assert!(matches!(&thawed, Value::Quarantined(o) if o.class == opaque.class));

    let recovered = nippy_rs::read_quarantined_unsafe(&thawed).unwrap();
    assert_eq!(recovered, Value::Opaque(opaque));
}

#[test]
fn wrong_password_fails_the_whole_decode() {
    let value = Value::Str("top secret".into());
    let config = FreezeConfig { password: Some(Password::salted(b"right".to_vec())), ..Default::default() };
    let bytes = nippy_rs::freeze(&value, &config).unwrap();

    let thaw_config = ThawConfig { password: Some(Password::salted(b"wrong".to_vec())), ..Default::default() };
    let err = nippy_rs::thaw(&bytes, &thaw_config).unwrap_err();
    assert!(matches!(err, Error::WrongPassword) || matches!(err, Error::CompressorMismatch(_))
        || matches!(err, Error::CorruptStream { .. }));
}

#[test]
fn headerless_round_trip_with_explicit_assumption() {
    let value = Value::Vector(vec![Value::Int(Integer::from(1i64)), Value::Int(Integer::from(2i64))]);
    let config = FreezeConfig { include_header: false, compressor: Compressor::None, ..Default::default() };
    let bytes = nippy_rs::freeze(&value, &config).unwrap();

    let thaw_config = ThawConfig {
        compressor: Compressor::None,
        headerless_assumption: Some(Header { compressed: false, encrypted: false }),
        ..Default::default()
    };
    let thawed = nippy_rs::thaw(&bytes, &thaw_config).unwrap();
    assert_eq!(thawed, value);
}

#[test]
fn headerless_input_without_assumption_is_rejected() {
    let value = Value::Null;
    let config = FreezeConfig { include_header: false, ..Default::default() };
    let bytes = nippy_rs::freeze(&value, &config).unwrap();
    let err = nippy_rs::thaw(&bytes, &ThawConfig::default()).unwrap_err();
    assert!(matches!(err, Error::CorruptStream { .. }));
}

#[test]
fn compression_shrinks_a_repetitive_payload() {
    let value = Value::Str("a".repeat(10_000));
    let plain = FreezeConfig { compressor: Compressor::None, ..Default::default() };
    let compressed = FreezeConfig { compressor: Compressor::Zstd { level: 3 }, ..Default::default() };

    let plain_bytes = nippy_rs::freeze(&value, &plain).unwrap();
    let compressed_bytes = nippy_rs::freeze(&value, &compressed).unwrap();
    assert!(compressed_bytes.len() < plain_bytes.len());
}

#[test]
fn hostile_bytes_never_panic_thawing() {
    for seed in 0u32..20_000 {
        let mut buf = vec![0u8; 48];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = ((seed.wrapping_mul(2654435761).wrapping_add(i as u32)) >> 8) as u8;
        }
        let config = ThawConfig { headerless_assumption: Some(Header { compressed: false, encrypted: false }), ..Default::default() };
        let _ = nippy_rs::thaw(&buf, &config);
    }
}

#[test]
fn concurrent_round_trips_under_each_encryption_mode_all_succeed() {
    std::thread::scope(|scope| {
        for mode in [None, Some(Encryptor::Gcm), Some(Encryptor::Cbc)] {
            for _ in 0..50 {
                scope.spawn(move || {
                    let value = Value::Str("concurrent payload".into());
                    let password = mode.map(|_| Password::cached(b"shared-across-threads".to_vec()));
                    let config = FreezeConfig {
                        encryptor: mode.unwrap_or_default(),
                        password: password.clone(),
                        ..Default::default()
                    };
                    let bytes = nippy_rs::freeze(&value, &config).unwrap();
                    let thaw_config =
                        ThawConfig { encryptor: mode.unwrap_or_default(), password, ..Default::default() };
                    let thawed = nippy_rs::thaw(&bytes, &thaw_config).unwrap();
                    assert_eq!(thawed, value);
                });
            }
        }
    });
}

#[test]
fn freeze_byte_exact_null() {
    let config = FreezeConfig { include_header: false, compressor: Compressor::None, ..Default::default() };
    let bytes = nippy_rs::freeze(&Value::Null, &config).unwrap();
    assert_eq!(bytes, vec![3u8]);
}
