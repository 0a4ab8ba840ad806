use tempfile::tempdir;
use zipcore::{AddEntrySpec, Archive, ArchiveMode, CompressionLevel, EntryType, Progress};

#[test]
fn directory_entry_round_trips_with_trailing_slash_and_attributes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.zip");
    let mut archive = Archive::open(&path, ArchiveMode::Create).unwrap();

    let spec = AddEntrySpec::new("assets", EntryType::Directory).with_permissions(0o755);
    archive.add_entry(&spec, &mut &[][..], &Progress::new(0)).unwrap();
    drop(archive);

    let mut archive = Archive::open(&path, ArchiveMode::Read).unwrap();
    let entry = archive.lookup("assets/").unwrap().unwrap();
    assert_eq!(entry.entry_type(), EntryType::Directory);
    assert_eq!(entry.permissions(), 0o755);
}

#[cfg(unix)]
#[test]
fn symlink_round_trips_through_extract_to_path() {
    use std::os::unix::fs::symlink;

    let dir = tempdir().unwrap();
    let zip_path = dir.path().join("a.zip");
    let mut archive = Archive::open(&zip_path, ArchiveMode::Create).unwrap();
    let spec = AddEntrySpec::new("link.txt", EntryType::Symlink)
        .with_level(CompressionLevel::Store)
        .with_uncompressed_size(10);
    archive
        .add_entry(&spec, &mut &b"target.txt"[..], &Progress::new(0))
        .unwrap();
    drop(archive);

    let mut archive = Archive::open(&zip_path, ArchiveMode::Read).unwrap();
    let entry = archive.lookup("link.txt").unwrap().unwrap();
    assert_eq!(entry.entry_type(), EntryType::Symlink);

    let out_dir = tempdir().unwrap();
    let progress = Progress::new(0);
    let crc = archive
        .extract_to_path(&entry, out_dir.path(), &progress)
        .unwrap();
    assert_eq!(crc, entry.crc32());
    assert_eq!(progress.total_unit_count(), 10);

    let link_path = out_dir.path().join("link.txt");
    let resolved = std::fs::read_link(&link_path).unwrap();
    assert_eq!(resolved.to_str().unwrap(), "target.txt");

    // exercise both symlink() call sites compile cleanly on unix
    let _ = symlink;
}

#[test]
fn remove_then_add_new_entry_keeps_archive_consistent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.zip");
    let mut archive = Archive::open(&path, ArchiveMode::Create).unwrap();
    for (name, payload) in [("one.txt", "one"), ("two.txt", "two")] {
        let spec = AddEntrySpec::new(name, EntryType::File)
            .with_level(CompressionLevel::Store)
            .with_uncompressed_size(payload.len() as u64);
        archive
            .add_entry(&spec, &mut payload.as_bytes(), &Progress::new(0))
            .unwrap();
    }

    assert!(archive.remove_entry("one.txt", &Progress::new(0)).unwrap());
    assert_eq!(archive.entry_count(), 1);

    let spec = AddEntrySpec::new("three.txt", EntryType::File)
        .with_level(CompressionLevel::Deflate)
        .with_uncompressed_size(5);
    archive
        .add_entry(&spec, &mut &b"three"[..], &Progress::new(0))
        .unwrap();

    let names: Vec<String> = archive
        .entries()
        .unwrap()
        .into_iter()
        .map(|e| e.path().to_string())
        .collect();
    assert!(!names.contains(&"one.txt".to_string()));
    assert!(names.contains(&"two.txt".to_string()));
    assert!(names.contains(&"three.txt".to_string()));
}

#[test]
fn opening_create_archive_mode_on_existing_path_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.zip");
    Archive::open(&path, ArchiveMode::Create).unwrap();
    let err = Archive::open(&path, ArchiveMode::Create).unwrap_err();
    assert_eq!(*err.kind(), zipcore::ErrorKind::FileNotAccessible);
}
