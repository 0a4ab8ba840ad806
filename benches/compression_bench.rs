use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::NamedTempFile;
use zipcore::{AddEntrySpec, Archive, ArchiveMode, CompressionLevel, EntryType, Progress};

fn generate_compressible_data(size: usize) -> Vec<u8> {
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        data.extend_from_slice(pattern);
    }
    data.truncate(size);
    data
}

fn generate_random_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state = 0x12345678u32;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}

fn write_one_entry(level: CompressionLevel, data: &[u8]) {
    let temp = NamedTempFile::new().unwrap();
    std::fs::remove_file(temp.path()).unwrap();
    let mut archive = Archive::open(temp.path(), ArchiveMode::Create).unwrap();
    let spec = AddEntrySpec::new("test.bin", EntryType::File)
        .with_level(level)
        .with_uncompressed_size(data.len() as u64);
    archive
        .add_entry(&spec, &mut black_box(data), &Progress::new(0))
        .unwrap();
}

fn bench_compression_methods(c: &mut Criterion) {
    let sizes = [1024, 10 * 1024, 100 * 1024, 1024 * 1024, 10 * 1024 * 1024];

    for size in sizes {
        let mut group = c.benchmark_group(format!("write_compressible_{}", format_size(size)));
        group.throughput(Throughput::Bytes(size as u64));
        let data = generate_compressible_data(size);

        group.bench_with_input(BenchmarkId::new("deflate", size), &data, |b, data| {
            b.iter(|| write_one_entry(CompressionLevel::Deflate, data));
        });
        group.bench_with_input(BenchmarkId::new("store", size), &data, |b, data| {
            b.iter(|| write_one_entry(CompressionLevel::Store, data));
        });

        group.finish();
    }
}

fn bench_random_data_compression(c: &mut Criterion) {
    for size in [100 * 1024, 1024 * 1024] {
        let mut group = c.benchmark_group(format!("write_random_{}", format_size(size)));
        group.throughput(Throughput::Bytes(size as u64));
        let data = generate_random_data(size);

        group.bench_with_input(BenchmarkId::new("deflate", size), &data, |b, data| {
            b.iter(|| write_one_entry(CompressionLevel::Deflate, data));
        });
        group.finish();
    }
}

fn bench_multiple_entries(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_multiple_entries");

    let entry_count = 100;
    let entry_size = 10 * 1024;
    group.throughput(Throughput::Bytes((entry_count * entry_size) as u64));
    let data = generate_compressible_data(entry_size);

    group.bench_function("deflate_100_entries", |b| {
        b.iter(|| {
            let temp = NamedTempFile::new().unwrap();
            std::fs::remove_file(temp.path()).unwrap();
            let mut archive = Archive::open(temp.path(), ArchiveMode::Create).unwrap();
            for i in 0..entry_count {
                let spec = AddEntrySpec::new(format!("file_{i}.txt"), EntryType::File)
                    .with_level(CompressionLevel::Deflate)
                    .with_uncompressed_size(data.len() as u64);
                archive
                    .add_entry(&spec, &mut black_box(&data[..]), &Progress::new(0))
                    .unwrap();
            }
        });
    });

    group.finish();
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{}MB", bytes / (1024 * 1024))
    }
}

criterion_group!(
    benches,
    bench_compression_methods,
    bench_random_data_compression,
    bench_multiple_entries
);
criterion_main!(benches);
