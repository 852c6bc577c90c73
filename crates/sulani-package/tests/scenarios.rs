//! End-to-end package scenarios.

use sulani_common::{types, ErrorKind, Model, ResourceKey, Tracked};
use sulani_package::{
    Compression, Container, Error, RawResource, ReadOptions, Resource, StringTableResource,
    UnsupportedResource,
};
use sulani_simdata::{
    Cell, DataType, ObjectCell, SimDataInstance, SimDataResource, SimDataSchema,
    SimDataSchemaColumn,
};

const SCHEMA_HASH: u32 = 0x1F2E_3D4C;

fn simdata(count: u32, tags: Vec<Cell>) -> SimDataResource {
    let schema = SimDataSchema::new(
        "Trait",
        SCHEMA_HASH,
        vec![
            SimDataSchemaColumn::new("count", DataType::UInt32, 0),
            SimDataSchemaColumn::new("name", DataType::String, 0),
            SimDataSchemaColumn::new("tags", DataType::Vector, 0),
            SimDataSchemaColumn::new("extra", DataType::Variant, 0),
        ],
    );
    let object = ObjectCell::with_values(
        SCHEMA_HASH,
        [
            ("count", Cell::uint32(count)),
            ("name", Cell::string("trait_Active")),
            ("tags", Cell::vector(tags)),
            ("extra", Cell::variant(0xDEAD_BEEF, None)),
        ],
    );
    SimDataResource::from_parts(
        0x101,
        0,
        vec![schema],
        vec![SimDataInstance::new("trait_Active", object)],
    )
}

fn string_table(key: u64, text: &str) -> StringTableResource {
    let mut table = StringTableResource::create();
    table.add(key, text).unwrap();
    table
}

fn sample_package() -> Container {
    let mut package = Container::create();
    package.add(
        ResourceKey::new(types::SIMDATA, 0, 1),
        simdata(3, vec![Cell::uint32(1), Cell::uint32(2)]),
    );
    package.add(
        ResourceKey::new(types::STRING_TABLE, 0x8000_0000, 2),
        string_table(0xABCD, "Active"),
    );
    package.add(
        ResourceKey::new(types::TUNING, 0, 3),
        sulani_package::XmlResource::create(r#"<I c="Trait" n="trait_Active" s="3"/>"#),
    );
    package
}

#[test]
fn test_unmodified_package_writes_identical_bytes() {
    let bytes = sample_package().buffer().unwrap();
    let package = Container::from_bytes(&bytes, &ReadOptions::default()).unwrap();

    assert_eq!(&*package.buffer().unwrap(), &*bytes);
    // Re-laying out from cached entry records gives the same bytes too.
    assert_eq!(package.serialize().unwrap(), bytes.to_vec());
}

#[test]
fn test_in_memory_package_reads_back_equivalent() {
    let original = sample_package();
    let bytes = original.buffer().unwrap();
    let decoded = Container::from_bytes(&bytes, &ReadOptions::default()).unwrap();

    assert_eq!(decoded.len(), original.len());
    for (a, b) in decoded.iter().zip(original.iter()) {
        assert_eq!(a.key(), b.key());
        assert_eq!(a.resource(), b.resource());
        assert_eq!(a.compression(), Compression::Zlib);
    }

    let root = decoded.get(2).unwrap().resource().as_xml().unwrap();
    let attributes = root.root_attributes().unwrap().unwrap();
    assert_eq!(attributes.instance_id, Some(3));
}

#[test]
fn test_simdata_roundtrip_through_package() {
    let bytes = sample_package().buffer().unwrap();
    let package = Container::from_bytes(&bytes, &ReadOptions::default()).unwrap();
    let resource = package.get(0).unwrap().resource().as_simdata().unwrap();

    assert_eq!(resource, &simdata(3, vec![Cell::uint32(1), Cell::uint32(2)]));
    let instance = resource.instance("trait_Active").unwrap();
    assert_eq!(instance.get("tags").unwrap().as_vector().unwrap().len(), 2);
    assert!(instance.get("extra").unwrap().as_variant().unwrap().child().is_none());
}

#[test]
fn test_edit_invalidates_only_that_entry() {
    let bytes = sample_package().buffer().unwrap();
    let mut package = Container::from_bytes(&bytes, &ReadOptions::default()).unwrap();
    assert!(package.iter().all(|entry| entry.is_cached()));

    let entry = package.get_mut(0).unwrap();
    let resource = entry.resource_mut().unwrap().as_simdata_mut().unwrap();
    resource
        .instance_mut(0)
        .unwrap()
        .get_mut("count")
        .unwrap()
        .as_number_mut()
        .unwrap()
        .set_value(4.0);

    assert!(!package.node().is_cached());
    assert!(!package.get(0).unwrap().is_cached());
    assert!(package.get(1).unwrap().is_cached());
    assert!(package.get(2).unwrap().is_cached());

    let edited = package.buffer().unwrap();
    assert_ne!(&*edited, &*bytes);
    let decoded = Container::from_bytes(&edited, &ReadOptions::default()).unwrap();
    let count = decoded.get(0).unwrap().resource().as_simdata().unwrap().instances()[0]
        .get("count")
        .unwrap()
        .as_number();
    assert_eq!(count, Some(4.0));
}

#[test]
fn test_held_cell_invalidation_reaches_package() {
    let bytes = sample_package().buffer().unwrap();
    let package = Container::from_bytes(&bytes, &ReadOptions::default()).unwrap();

    let cell = package.get(0).unwrap().resource().as_simdata().unwrap().instances()[0]
        .get("name")
        .unwrap();
    cell.invalidate();

    assert!(!package.node().is_cached());
    assert!(!package.get(0).unwrap().is_cached());
    assert!(package.get(1).unwrap().is_cached());
}

#[test]
fn test_uint32_boundary() {
    let mut resource = simdata(u32::MAX, Vec::new());
    assert!(resource.validate().is_ok());
    assert!(resource.buffer().is_ok());

    resource
        .instance_mut(0)
        .unwrap()
        .get_mut("count")
        .unwrap()
        .as_number_mut()
        .unwrap()
        .set_value(4_294_967_296.0);
    assert_eq!(resource.validate().unwrap_err().kind(), ErrorKind::Validation);
    assert_eq!(resource.buffer().unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn test_string_key_rejected_on_add() {
    let mut table = StringTableResource::create();
    assert!(table.add(0xFFFF_FFFF, "ok").is_ok());
    let error = table.add(0x1_0000_0000, "too wide").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_empty_package() {
    let bytes = Container::create().buffer().unwrap();
    let package = Container::from_bytes(&bytes, &ReadOptions::default()).unwrap();
    assert_eq!(package.len(), 0);
}

#[test]
fn test_duplicate_keys() {
    let key = ResourceKey::new(types::STRING_TABLE, 0, 7);
    let mut package = Container::create();
    package.add(key, string_table(1, "first"));
    package.add(key, string_table(1, "second"));
    assert_eq!(package.find_all_by_key(&key).len(), 2);

    let first = package.get_by_key(&key).unwrap();
    assert_eq!(first.resource().as_string_table().unwrap().get(1), Some("first"));

    // Duplicates survive a round trip.
    let bytes = package.buffer().unwrap();
    let mut package = Container::from_bytes(&bytes, &ReadOptions::default()).unwrap();
    assert_eq!(package.len(), 2);

    let removed = package.remove_by_key(&key).unwrap();
    assert_eq!(removed.resource().as_string_table().unwrap().get(1), Some("first"));
    let second = package.get_by_key(&key).unwrap();
    assert_eq!(second.resource().as_string_table().unwrap().get(1), Some("second"));
}

/// SimData bytes whose first table points its rows far past the end.
fn corrupt_simdata() -> Vec<u8> {
    let mut bytes = simdata(1, Vec::new()).buffer().unwrap().to_vec();
    let field = i32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let table = (8 + field) as usize;
    let row_offset = table + 20;
    bytes[row_offset..row_offset + 4].copy_from_slice(&0x4000_0000i32.to_le_bytes());
    bytes
}

#[test]
fn test_corrupt_content_fails_even_with_lenient_header() {
    let key = ResourceKey::new(types::SIMDATA, 0, 1);
    let mut package = Container::create();
    package.add(key, RawResource::new(corrupt_simdata(), "test"));
    let mut bytes = package.buffer().unwrap().to_vec();
    // Bad minor version.
    bytes[8..12].copy_from_slice(&9u32.to_le_bytes());

    let strict = Container::from_bytes(&bytes, &ReadOptions::default()).unwrap_err();
    assert_eq!(strict.kind(), ErrorKind::Header);

    let lenient = ReadOptions::new().with_ignore_header_errors(true);
    let error = Container::from_bytes(&bytes, &lenient).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Content);
    assert!(matches!(error, Error::Resource { key: k, .. } if k == key));

    // Raw loading skips decoding altogether.
    let raw = lenient.with_load_all_as_raw(true);
    assert_eq!(Container::from_bytes(&bytes, &raw).unwrap().len(), 1);
}

#[test]
fn test_empty_vector_roundtrip() {
    let resource = simdata(1, Vec::new());
    let bytes = resource.buffer().unwrap();
    let decoded = SimDataResource::from_bytes(&bytes).unwrap();
    let tags = decoded.instances()[0].get("tags").unwrap().as_vector().unwrap();
    assert!(tags.is_empty());
    assert_eq!(decoded, resource);
}

#[test]
fn test_unsupported_compression_is_preserved() {
    let key = ResourceKey::new(0x00B2_D882, 0, 5);
    let mut package = Container::create();
    package.add(
        key,
        Resource::Unsupported(UnsupportedResource::new(
            &b"\x10\xFB\x00\x00\x05hello"[..],
            Compression::Other(0xFFFF),
            5,
            "test",
        )),
    );
    package.add(ResourceKey::new(1, 0, 1), RawResource::new(&b"plain"[..], "test"));
    let bytes = package.buffer().unwrap();

    let decoded = Container::from_bytes(&bytes, &ReadOptions::default()).unwrap();
    let entry = decoded.get(0).unwrap();
    let Resource::Unsupported(unsupported) = entry.resource() else {
        panic!("expected an unsupported resource");
    };
    assert_eq!(unsupported.compression(), Compression::Other(0xFFFF));
    assert_eq!(unsupported.record(), b"\x10\xFB\x00\x00\x05hello");
    assert!(entry.resource().buffer().is_err());

    // Editing a sibling still writes the unsupported record unchanged.
    let mut decoded = decoded;
    decoded.add(ResourceKey::new(1, 0, 2), RawResource::new(&b"more"[..], "test"));
    let rewritten = decoded.buffer().unwrap();
    let reread = Container::from_bytes(&rewritten, &ReadOptions::default()).unwrap();
    let Resource::Unsupported(again) = reread.get(0).unwrap().resource() else {
        panic!("expected an unsupported resource");
    };
    assert_eq!(again.record(), b"\x10\xFB\x00\x00\x05hello");
    assert_eq!(again.decompressed_size(), 5);
}

#[test]
fn test_write_and_open_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.package");

    let package = sample_package();
    package.write_to_file(&path).unwrap();

    let opened = Container::open(&path, &ReadOptions::default()).unwrap();
    assert_eq!(opened, package);
    assert_eq!(std::fs::read(&path).unwrap(), opened.buffer().unwrap().to_vec());
}

#[test]
fn test_validate_package() {
    let mut package = sample_package();
    assert!(package.validate().is_ok());

    package
        .get_mut(1)
        .unwrap()
        .resource_mut()
        .unwrap()
        .as_string_table_mut()
        .unwrap()
        .add(0xABCD, "duplicate")
        .unwrap();
    let error = package.validate().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[test]
fn test_underreported_decompressed_size_is_rejected() {
    let key = ResourceKey::new(1, 0, 1);
    let mut package = Container::create();
    package.add(key, RawResource::new(vec![0u8; 64 * 1024], "test"));
    let mut bytes = package.buffer().unwrap().to_vec();

    // First index record: flags word, then type, group, instance high and
    // low, position and size before the decompressed size.
    let index = u64::from_le_bytes(bytes[64..72].try_into().unwrap()) as usize;
    let field = index + 4 + 24;
    bytes[field..field + 4].copy_from_slice(&16u32.to_le_bytes());

    let error = Container::from_bytes(&bytes, &ReadOptions::default()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Content);
    assert!(matches!(error, Error::Decompression { key: k, .. } if k == key));
}
