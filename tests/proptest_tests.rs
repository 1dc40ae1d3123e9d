//! Property-based tests using proptest.
//!
//! These tests verify invariants of containers and entry names using
//! randomly generated inputs.

mod common;

use common::create_container;
use docseal::{Archive, ArchiveWriter, CodecParams, EntryName, Error, Password};
use proptest::prelude::*;

/// Strategy for names accepted by `EntryName::new`.
fn valid_name_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zA-Z0-9][a-zA-Z0-9_.-]{0,9}", 1..4)
        .prop_map(|parts| parts.join("/"))
}

fn password_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "\\PC{1,24}".prop_map(Some)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Any payload under any password comes back byte-for-byte.
    #[test]
    fn payload_roundtrips(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        password in password_strategy(),
    ) {
        let bytes = create_container(&[("notes.ctd", &data)], password.as_deref()).unwrap();
        let mut archive = Archive::from_bytes(bytes).unwrap();
        archive.set_password(password.map(Password::new));
        prop_assert_eq!(archive.extract_entry("notes.ctd").unwrap(), data);
    }

    /// Several entries keep their names, order and content.
    #[test]
    fn multiple_entries_roundtrip(
        entries in proptest::collection::btree_map(
            valid_name_strategy(),
            proptest::collection::vec(any::<u8>(), 0..512),
            1..6,
        ),
    ) {
        let pairs: Vec<(&str, &[u8])> = entries.iter().map(|(n, d)| (n.as_str(), d.as_slice())).collect();
        let archive = Archive::from_bytes(create_container(&pairs, None).unwrap()).unwrap();
        prop_assert_eq!(archive.len(), pairs.len());
        for ((entry, data), (name, expected)) in archive.read_all().unwrap().into_iter().zip(&pairs) {
            prop_assert_eq!(entry.name.as_str(), *name);
            prop_assert_eq!(&data[..], *expected);
        }
    }

    /// A password other than the one used to seal is always rejected.
    #[test]
    fn wrong_password_never_decrypts(
        right in "\\PC{1,16}",
        wrong in "\\PC{1,16}",
        data in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        prop_assume!(right != wrong);
        let bytes = create_container(&[("a", &data)], Some(&right)).unwrap();
        let archive = Archive::from_bytes(bytes).unwrap().with_password(wrong);
        prop_assert!(matches!(archive.extract_entry("a"), Err(Error::WrongPassword)));
    }

    /// A single damaged byte anywhere is never silently accepted.
    #[test]
    fn damaged_byte_detected(
        data in proptest::collection::vec(any::<u8>(), 1..1024),
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
        encrypted in any::<bool>(),
    ) {
        let password = encrypted.then_some("pw");
        let mut bytes = create_container(&[("a", &data)], password).unwrap();
        let i = position.index(bytes.len());
        bytes[i] ^= mask;

        let outcome = Archive::from_bytes(bytes).and_then(|mut archive| {
            archive.set_password(password.map(Password::new));
            archive.extract_entry("a")
        });
        match outcome {
            Err(Error::CorruptArchive { .. }) | Err(Error::WrongPassword) => {}
            Err(other) => prop_assert!(false, "byte {} gave {}", i, other),
            Ok(_) => prop_assert!(false, "damage at byte {} went unnoticed", i),
        }
    }

    /// Valid names parse and keep their text.
    #[test]
    fn valid_names_parse(name in valid_name_strategy()) {
        let parsed = EntryName::new(&name);
        prop_assert!(parsed.is_ok(), "valid name '{}' rejected: {:?}", name, parsed);
        let parsed = parsed.unwrap();
        prop_assert_eq!(parsed.as_str(), name.as_str());
    }

    /// Names that try to climb out of the extraction directory are rejected.
    #[test]
    fn traversal_names_rejected(
        prefix in proptest::collection::vec("[a-z]{1,5}", 0..3),
        suffix in "[a-z]{1,5}",
    ) {
        let mut parts = prefix;
        parts.push("..".to_string());
        parts.push(suffix);
        let name = parts.join("/");
        prop_assert!(EntryName::new(&name).is_err());
        let rooted = format!("/{}", name);
        prop_assert!(EntryName::new(&rooted).is_err());
    }

    /// The key derivation cost recorded in the header is the one used.
    #[test]
    fn kdf_power_recorded(power in 0u8..=6) {
        let mut writer = ArchiveWriter::new()
            .params(CodecParams::DOCUMENT.with_kdf_cycles_power(power))
            .password("pw");
        writer.add_bytes("a", b"x".to_vec()).unwrap();
        let bytes = writer.encode().unwrap();
        let (header, _) = docseal::format::Header::parse(&bytes).unwrap();
        prop_assert_eq!(header.encryption.unwrap().kdf_cycles_power, power);
    }
}
