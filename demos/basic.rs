//! Basic usage example for zipcore

use zipcore::{AddEntrySpec, Archive, ArchiveMode, CompressionLevel, EntryType, Progress};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== zipcore Basic Example ===\n");

    println!("Creating test.zip...");
    let mut archive = Archive::open("test.zip", ArchiveMode::Create)?;

    let hello = AddEntrySpec::new("hello.txt", EntryType::File)
        .with_level(CompressionLevel::Deflate)
        .with_uncompressed_size(15);
    archive.add_entry(&hello, &mut &b"Hello, zipcore!"[..], &Progress::default())?;

    let nested = AddEntrySpec::new("folder/nested.txt", EntryType::File)
        .with_level(CompressionLevel::Deflate)
        .with_uncompressed_size(22);
    archive.add_entry(&nested, &mut &b"This is a nested file."[..], &Progress::default())?;

    let data = AddEntrySpec::new("data.txt", EntryType::File)
        .with_level(CompressionLevel::Store)
        .with_uncompressed_size(21);
    archive.add_entry(&data, &mut &b"Line 1\nLine 2\nLine 3\n"[..], &Progress::default())?;

    drop(archive);
    println!("created test.zip\n");

    println!("Reading test.zip...");
    let mut archive = Archive::open("test.zip", ArchiveMode::Read)?;

    println!("Entries in ZIP:");
    for entry in archive.entries()? {
        println!("  - {} ({} bytes)", entry.path(), entry.uncompressed_size());
    }
    println!();

    println!("Reading hello.txt:");
    if let Some(entry) = archive.lookup("hello.txt")? {
        let mut out = Vec::new();
        archive.extract(&entry, &mut out, &Progress::default())?;
        println!("  Content: {}", String::from_utf8_lossy(&out));
    }

    Ok(())
}
