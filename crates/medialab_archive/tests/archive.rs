//! Archive round-trip and layout properties.

use medialab_archive::{build, crc32, read_archive, ArchiveBuilder, Entry, END_RECORD_SIZE};
use proptest::prelude::*;

fn entry_strategy() -> impl Strategy<Value = Entry> {
    (
        "[a-zA-Z0-9_.-]{1,40}",
        prop::collection::vec(any::<u8>(), 0..2048),
    )
        .prop_map(|(name, data)| Entry::new(name, data))
}

proptest! {
    #[test]
    fn round_trip_preserves_names_and_payloads(
        entries in prop::collection::vec(entry_strategy(), 1..12)
    ) {
        let zip = build(&entries).unwrap();
        let read = read_archive(&zip).unwrap();

        prop_assert_eq!(read.len(), entries.len());
        for (got, want) in read.iter().zip(&entries) {
            prop_assert_eq!(&got.name, &want.name);
            prop_assert_eq!(&got.data, &want.data);
            prop_assert_eq!(got.crc32, crc32(&want.data));
        }
    }

    #[test]
    fn size_is_headers_plus_payloads(
        entries in prop::collection::vec(entry_strategy(), 0..12)
    ) {
        let zip = build(&entries).unwrap();
        let expected: usize = entries
            .iter()
            .map(|e| 30 + 46 + 2 * e.name.len() + e.data.len())
            .sum::<usize>()
            + END_RECORD_SIZE;
        prop_assert_eq!(zip.len(), expected);
    }
}

#[test]
fn empty_archive_bytes() {
    let zip = build(&[]).unwrap();
    assert_eq!(
        zip,
        [
            0x50, 0x4B, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0
        ]
    );
    assert!(read_archive(&zip).unwrap().is_empty());
}

#[test]
fn reference_crc() {
    assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
}

#[test]
fn duplicate_names_are_kept_in_order() {
    let mut builder = ArchiveBuilder::new();
    builder
        .add("take.mp4", b"first")
        .unwrap()
        .add("take.mp4", b"second")
        .unwrap();
    let read = read_archive(&builder.finish().unwrap()).unwrap();
    assert_eq!(read.len(), 2);
    assert_eq!(read[0].data, b"first");
    assert_eq!(read[1].data, b"second");
}

#[test]
fn utf8_names_survive() {
    let zip = build(&[Entry::new("plan-de-rodaje-ñ.pdf", b"x".to_vec())]).unwrap();
    assert_eq!(read_archive(&zip).unwrap()[0].name, "plan-de-rodaje-ñ.pdf");
}
