use crate::*;
use anyhow::Result;
use tempfile::tempdir;

use super::produce;

#[test]
fn get_finds_every_key() -> Result<()> {
    let table = Table::from_bytes(build(&produce(), 25, 0)?)?;
    assert_eq!(table.len(), 5);
    for e in produce() {
        assert_eq!(table.get(&e.key)?, Some(e));
    }
    assert_eq!(table.get(b"fig")?, None);
    assert_eq!(table.get(b"")?, None);
    Ok(())
}

#[test]
fn entries_are_in_key_order() -> Result<()> {
    let table = Table::from_bytes(build(&produce(), 1, 0)?)?;
    assert_eq!(table.entries()?, produce());
    assert_eq!(table.index().len(), 5);
    Ok(())
}

#[test]
fn tombstones_come_back_as_entries() -> Result<()> {
    let list = vec![Entry::new("a", "1"), Entry::tombstone("b")];
    let table = Table::from_bytes(build(&list, 64, 0)?)?;
    let got = table.get(b"b")?.expect("tombstone present");
    assert!(got.tombstone);
    assert!(got.value.is_empty());
    Ok(())
}

#[test]
fn meta_and_footer_are_exposed() -> Result<()> {
    let bytes = build(&produce(), 25, 7)?;
    let footer = Footer::read_from_table(&bytes)?;
    let table = Table::from_bytes(bytes)?;
    assert_eq!(table.meta().level, 7);
    assert_eq!(table.footer(), &footer);
    Ok(())
}

#[test]
fn empty_table_loads() -> Result<()> {
    let table = Table::from_bytes(build(&[], 64, 0)?)?;
    assert!(table.is_empty());
    assert!(table.entries()?.is_empty());
    assert_eq!(table.get(b"a")?, None);
    Ok(())
}

#[test]
fn too_small_is_rejected() {
    assert!(Table::from_bytes(vec![0; FOOTER_BYTES - 1]).is_err());
}

#[test]
fn out_of_range_handles_are_rejected() -> Result<()> {
    let mut bytes = build(&produce(), 25, 0)?;
    let footer = Footer::read_from_table(&bytes)?;
    let bad = Footer {
        meta: footer.meta,
        index: BlockHandle::new(footer.index.offset, footer.index.length + 1),
    };
    let at = bytes.len() - FOOTER_BYTES;
    bytes.truncate(at);
    bad.encode_into(&mut bytes)?;
    assert!(Table::from_bytes(bytes).is_err());
    Ok(())
}

#[test]
fn corrupt_data_block_is_rejected() -> Result<()> {
    let mut bytes = build(&produce(), 1024, 0)?;
    // The first key length now claims more bytes than the block holds.
    bytes[0] = 0xff;
    assert!(Table::from_bytes(bytes).is_err());
    Ok(())
}

#[test]
fn write_then_open() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("000001.sst");
    let bytes = build(&produce(), 25, 0)?;

    write_table(&path, &bytes)?;
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let table = Table::open(&path)?;
    assert_eq!(table.as_bytes(), bytes.as_slice());
    assert_eq!(table.get(b"date")?, Some(Entry::new("date", "fruit")));
    Ok(())
}

#[test]
fn write_table_replaces_existing_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("t.sst");
    write_table(&path, &build(&produce(), 25, 0)?)?;
    write_table(&path, &build(&[Entry::new("only", "one")], 25, 0)?)?;

    let table = Table::open(&path)?;
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(b"apple")?, None);
    Ok(())
}

#[test]
fn open_missing_file_fails() {
    let dir = tempdir().unwrap();
    let err = Table::open(dir.path().join("nope.sst")).unwrap_err();
    assert!(format!("{:#}", err).contains("nope.sst"));
}
