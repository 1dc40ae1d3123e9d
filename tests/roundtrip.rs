//! Round-trip tests: what goes into a container comes back out unchanged.

mod common;

use common::{create_container, fast_params, sample_document};
use docseal::codec::MethodId;
use docseal::write::{EntryMeta, create_with};
use docseal::{Archive, ArchiveWriter, EntryName, ExtractOptions, Password, Timestamp};

#[test]
fn test_single_document_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.ctz");
    let doc = sample_document();

    create_with(fast_params(), &doc, "notes.ctd", None, &path).unwrap();
    assert_eq!(docseal::extract(&path, None).unwrap(), doc);
}

#[test]
fn test_encrypted_document_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.ctz");
    let doc = sample_document();
    let password = Password::new("correct horse battery staple");

    let result = create_with(fast_params(), &doc, "notes.ctd", Some(&password), &path).unwrap();
    assert!(result.encrypted);
    assert!(result.packed_size < doc.len() as u64);

    assert_eq!(docseal::extract(&path, Some(&password)).unwrap(), doc);
}

#[test]
fn test_content_xml_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.ctz");
    let password = Password::new("7zr");

    create_with(fast_params(), b"NodeContent", "content.xml", Some(&password), &path).unwrap();

    let archive = Archive::open(&path).unwrap().with_password("7zr");
    let names: Vec<&str> = archive.entries().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["content.xml"]);
    assert_eq!(archive.extract_entry("content.xml").unwrap(), b"NodeContent");
}

#[test]
fn test_empty_payload_roundtrip() {
    for password in [None, Some("pw")] {
        let bytes = create_container(&[("empty.ctd", b"")], password).unwrap();
        let mut archive = Archive::from_bytes(bytes).unwrap();
        archive.set_password(password.map(Password::new));
        assert!(archive.extract_entry("empty.ctd").unwrap().is_empty());
        assert_eq!(archive.info().unpacked_size, 0);
    }
}

#[test]
fn test_multiple_entries_in_order() {
    let entries: &[(&str, &[u8])] = &[
        ("notes.ctd", b"<cherrytree/>"),
        ("images/a.png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 3]),
        ("images/b.png", &[]),
        ("README", b"plain text"),
    ];
    let archive = Archive::from_bytes(create_container(entries, Some("pw")).unwrap())
        .unwrap()
        .with_password("pw");

    assert_eq!(archive.len(), entries.len());
    for ((name, data), entry) in entries.iter().zip(archive.entries()) {
        assert_eq!(entry.name, *name);
        assert_eq!(entry.size, data.len() as u64);
        assert_eq!(entry.crc32, crc32fast::hash(data));
    }
    for (entry, data) in archive.read_all().unwrap() {
        let (_, expected) = entries.iter().find(|(n, _)| entry.name == *n).unwrap();
        assert_eq!(&data, expected);
    }
}

#[test]
fn test_metadata_preserved() {
    let when = Timestamp::from_filetime(133_500_000_000_000_000);
    let mut writer = ArchiveWriter::new().params(fast_params());
    writer
        .add_entry(
            EntryName::new("notes.ctd").unwrap(),
            b"x".to_vec(),
            EntryMeta::new().modified(when).attributes(0x21),
        )
        .unwrap();
    let archive = Archive::from_bytes(writer.encode().unwrap()).unwrap();
    let entry = archive.find_entry("notes.ctd").unwrap();
    assert_eq!(entry.modified, when);
    assert!(entry.is_read_only());
}

#[test]
fn test_extract_all_restores_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let when = Timestamp::from_filetime(133_500_000_000_000_000);
    let mut writer = ArchiveWriter::new().params(fast_params());
    writer
        .add_entry(
            EntryName::new("sub/notes.ctd").unwrap(),
            sample_document(),
            EntryMeta::new().modified(when),
        )
        .unwrap();
    let archive = Archive::from_bytes(writer.encode().unwrap()).unwrap();

    let out = dir.path().join("out");
    let result = archive.extract_all(&out, &ExtractOptions::default()).unwrap();
    assert_eq!(result.entries_extracted, 1);

    let file = out.join("sub").join("notes.ctd");
    assert_eq!(std::fs::read(&file).unwrap(), sample_document());
    let mtime = std::fs::metadata(&file).unwrap().modified().unwrap();
    assert_eq!(mtime, when.as_system_time());
}

#[test]
fn test_add_path_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("notes.ctd");
    std::fs::write(&source, sample_document()).unwrap();

    let mut writer = ArchiveWriter::new().params(fast_params());
    writer.add_path(&source, "notes.ctd").unwrap();
    let archive = Archive::from_bytes(writer.encode().unwrap()).unwrap();
    assert_eq!(archive.extract_entry("notes.ctd").unwrap(), sample_document());
}

#[test]
fn test_stored_and_compressed_agree() {
    let doc = sample_document();
    for method in [MethodId::Copy, MethodId::Lzma2] {
        let mut writer = ArchiveWriter::new()
            .params(fast_params().with_method(method))
            .password("pw");
        writer.add_bytes("notes.ctd", doc.clone()).unwrap();
        let archive = Archive::from_bytes(writer.encode().unwrap())
            .unwrap()
            .with_password("pw");
        assert_eq!(archive.info().method, method);
        assert_eq!(archive.extract_entry("notes.ctd").unwrap(), doc);
    }
}

#[test]
fn test_large_incompressible_payload() {
    // xorshift noise does not compress
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let data: Vec<u8> = (0..300_000)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect();
    let bytes = create_container(&[("blob.bin", &data)], Some("pw")).unwrap();
    let archive = Archive::from_bytes(bytes).unwrap().with_password("pw");
    assert_eq!(archive.extract_entry("blob.bin").unwrap(), data);
}
