//! Collective lifecycle with threads standing in for participants.

use std::path::{Path, PathBuf};
use std::thread;

use asdf::{Container, ProcessGroup, Result, ThreadGroup, WaveformDescriptor};
use tempfile::tempdir;

const RANKS: usize = 4;
const NSAMPLES: u64 = 1000;
const PATHS: [&str; 3] = [
    "/Waveforms/IU.ANMO/IU.ANMO.00.BHE",
    "/Waveforms/IU.ANMO/IU.ANMO.00.BHN",
    "/Waveforms/IU.ANMO/IU.ANMO.00.BHZ",
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn expected_sample(trace: usize, i: u64) -> f32 {
    (trace as f32) * 10_000.0 + i as f32
}

/// Run `body` once per rank on its own thread and collect the results.
fn run_group<T, F>(path: &Path, body: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(PathBuf, ThreadGroup) -> T + Send + Sync + Clone + 'static,
{
    let handles: Vec<_> = ThreadGroup::split(RANKS)
        .into_iter()
        .map(|member| {
            let body = body.clone();
            let path = path.to_path_buf();
            thread::spawn(move || body(path, member))
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn collective_write(path: PathBuf, member: ThreadGroup) -> Result<()> {
    let mut c = Container::create(&path, &member)?;
    if member.rank() == 0 {
        let station = c
            .create_waveforms_group()?
            .create_station_group("IU.ANMO", "<FDSNStationXML/>")?;
        let names: Vec<&str> = PATHS.iter().map(|p| &p[p.rfind('/').unwrap_or(0) + 1..]).collect();
        station.define_waveforms(&names, &WaveformDescriptor::new(NSAMPLES, 1_262_304_000))?;
        drop(station);
        c.flush()?;
    }
    member.barrier();
    if member.rank() != 0 {
        c.refresh()?;
    }

    let share = NSAMPLES / RANKS as u64;
    let offset = share * member.rank() as u64;
    let length = if member.rank() + 1 == RANKS { NSAMPLES - offset } else { share };
    for (t, path) in PATHS.iter().enumerate() {
        let block: Vec<f32> = (offset..offset + length).map(|i| expected_sample(t, i)).collect();
        c.dataset(path)?.write_partial_waveform(&block, offset, length)?;
    }
    member.barrier();
    c.close()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn ranks_write_disjoint_blocks() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("collective.h5");

    for result in run_group(&path, collective_write) {
        result.unwrap();
    }

    let c = Container::open_read_only(&path, &asdf::SingleProcess).unwrap();
    assert!(c.station_exists("IU.ANMO").unwrap());
    for (t, path) in PATHS.iter().enumerate() {
        assert_eq!(c.num_elements_at_path(path).unwrap(), NSAMPLES);
        assert_eq!(c.read_string_attribute_at(path, "starttime").unwrap(), "1262304000");
        let mut out = vec![0f32; NSAMPLES as usize];
        c.read_full_waveform(path, &mut out).unwrap();
        for (i, v) in out.iter().enumerate() {
            assert_eq!(*v, expected_sample(t, i as u64), "{path}[{i}]");
        }
    }
}

#[test]
fn ranks_read_their_own_blocks() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared_read.h5");
    for result in run_group(&path, collective_write) {
        result.unwrap();
    }

    let sums = run_group(&path, |path, member| -> asdf::Result<f64> {
        let c = Container::open_read_only(&path, &member)?;
        assert_eq!(c.rank(), member.rank());
        assert_eq!(c.size(), RANKS);
        let share = NSAMPLES / RANKS as u64;
        let mut block = vec![0f32; share as usize];
        c.read_partial_waveform(PATHS[2], share * member.rank() as u64, share, &mut block)?;
        Ok(block.iter().map(|v| f64::from(*v)).sum())
    });
    let total: f64 = sums.into_iter().map(|s| s.unwrap()).sum();
    let expected: f64 = (0..NSAMPLES).map(|i| f64::from(expected_sample(2, i))).sum();
    assert_eq!(total, expected);
}

#[test]
fn create_failure_reaches_every_rank() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing_dir").join("nope.h5");
    for result in run_group(&path, |path, member| Container::create(&path, &member).map(drop)) {
        assert!(result.unwrap_err().is_storage_failure());
    }
}

#[test]
fn refresh_refuses_unflushed_declarations() {
    let dir = tempdir().unwrap();
    let mut c = Container::create(dir.path().join("dirty.h5"), &asdf::SingleProcess).unwrap();
    c.create_waveforms_group().unwrap();
    assert!(matches!(c.refresh(), Err(asdf::Error::UnflushedDeclarations)));
    c.flush().unwrap();
    c.refresh().unwrap();
    assert!(c.group("/Waveforms").is_ok());
}
