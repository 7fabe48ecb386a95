//! Benchmarks for partial waveform writes, full reads and metadata flushes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use asdf::{AsdfConfig, Container, FileAccessProps, SingleProcess, WaveformDescriptor};

use std::path::Path;

const N: u64 = 1_000_000;

/// Container with one station and one `N`-sample trace filled with a ramp.
fn write_trace_file(path: &Path) {
    let c = Container::create(path, &SingleProcess).unwrap();
    let samples: Vec<f32> = (0..N).map(|i| i as f32).collect();
    c.create_waveforms_group()
        .unwrap()
        .create_station_group("XX.STA", "<FDSNStationXML/>")
        .unwrap()
        .define_waveform("XX.STA..BHZ", &WaveformDescriptor::new(N, 0))
        .unwrap()
        .write_full_waveform(&samples)
        .unwrap();
    c.close().unwrap();
}

// ===========================================================================
// Bench 1: partial writes of varying block size
// ===========================================================================

fn bench_partial_write(c: &mut Criterion) {
    let dir = std::env::temp_dir();
    let path = dir.join("bench_asdf_partial_write.h5");
    write_trace_file(&path);
    let container = Container::open_read_write(&path, &SingleProcess).unwrap();
    let trace = container.dataset("/Waveforms/XX.STA/XX.STA..BHZ").unwrap();

    let mut group = c.benchmark_group("partial_write");
    for block in [1_000u64, 10_000, 100_000] {
        let samples = vec![1.5f32; block as usize];
        group.bench_with_input(BenchmarkId::from_parameter(block), &block, |b, &block| {
            let mut offset = 0u64;
            b.iter(|| {
                trace.write_partial_waveform(&samples, offset, block).unwrap();
                offset = (offset + block) % (N - block);
            })
        });
    }
    group.finish();
    drop(trace);
    container.close().unwrap();
    let _ = std::fs::remove_file(&path);
}

// ===========================================================================
// Bench 2: full reads, mapped vs buffered open
// ===========================================================================

fn bench_full_read(c: &mut Criterion) {
    let dir = std::env::temp_dir();
    let path = dir.join("bench_asdf_full_read.h5");
    write_trace_file(&path);
    let trace_path = "/Waveforms/XX.STA/XX.STA..BHZ";

    let mut group = c.benchmark_group("full_read_1M_f32");
    for (label, mapped) in [("mmap", true), ("buffered", false)] {
        let config = AsdfConfig::new().access(FileAccessProps::new().memory_map(mapped));
        let container = Container::open_read_only_with(&path, &SingleProcess, config).unwrap();
        let mut out = vec![0f32; N as usize];
        group.bench_function(label, |b| {
            b.iter(|| {
                container.read_full_waveform(trace_path, &mut out).unwrap();
                black_box(out[N as usize - 1])
            })
        });
    }
    group.finish();
    let _ = std::fs::remove_file(&path);
}

// ===========================================================================
// Bench 3: declaring and flushing many stations
// ===========================================================================

fn bench_declare_stations(c: &mut Criterion) {
    let dir = std::env::temp_dir();
    let path = dir.join("bench_asdf_declare.h5");

    c.bench_function("declare_100_stations_3_channels", |b| {
        b.iter(|| {
            let container = Container::create(&path, &SingleProcess).unwrap();
            let waveforms = container.create_waveforms_group().unwrap();
            let desc = WaveformDescriptor::new(3600, 1_262_304_000);
            for i in 0..100 {
                let station = waveforms
                    .create_station_group(&format!("XX.S{i:03}"), "<FDSNStationXML/>")
                    .unwrap();
                station.define_waveforms(&["BHE", "BHN", "BHZ"], &desc).unwrap();
            }
            drop(waveforms);
            container.close().unwrap();
        })
    });
    let _ = std::fs::remove_file(&path);
}

criterion_group!(benches, bench_partial_write, bench_full_read, bench_declare_stations);
criterion_main!(benches);
