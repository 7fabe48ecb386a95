//! Shared ASDF seismic waveform containers.
//!
//! An ASDF container is an HDF5 file laid out as:
//!
//! - `/QuakeML`: the event description as bytes,
//! - `/Waveforms/<station>/StationXML`: station metadata as bytes,
//! - `/Waveforms/<station>/<trace>`: 32-bit float samples with a
//!   `starttime` attribute,
//! - optional `AuxiliaryData` and `Provenance` groups.
//!
//! Several participants (see [`ProcessGroup`]) can open one container
//! together. Structure is declared by one participant and flushed; every
//! participant may then write its own disjoint sample ranges.
//!
//! ```no_run
//! use asdf::{AttributeTarget, Container, SingleProcess, WaveformDescriptor};
//!
//! # fn main() -> asdf::Result<()> {
//! let container = Container::create("events.h5", &SingleProcess)?;
//! container.root().write_string_attribute("file_format", "ASDF")?;
//! container.root().write_quakeml("<quakeml/>")?;
//!
//! let waveforms = container.create_waveforms_group()?;
//! let station = waveforms.create_station_group("IU.ANMO", "<FDSNStationXML/>")?;
//! let trace = station.define_waveform("BHZ", &WaveformDescriptor::new(4, 1_577_836_800))?;
//! trace.write_partial_waveform(&[0.5, -0.5], 2, 2)?;
//! drop((trace, station, waveforms));
//!
//! container.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Logging goes through [`tracing`]; install a subscriber to see it.

mod attribute;
mod config;
mod container;
mod error;
mod path;
mod process_group;
mod query;
mod render;
mod schema;
mod storage;
mod tree;
mod waveform;

pub use attribute::AttributeTarget;
pub use config::{AsdfConfig, WaveformAttrs, DEFAULT_SAMPLING_RATE_WIDTH, DEFAULT_START_TIME_WIDTH};
pub use container::{Container, Dataset, Group};
pub use error::{Error, Result};
pub use path::{extend_path, MAX_NAME_LEN};
pub use process_group::{ProcessGroup, SingleProcess, ThreadGroup};
pub use render::{render_sampling_rate, render_start_time};
pub use schema::{
    WaveformDescriptor, AUXILIARY_DATA, EVENT_ID_ATTR, PROVENANCE, QUAKEML, SAMPLING_RATE_ATTR,
    START_TIME_ATTR, STATION_XML, WAVEFORMS_GROUP,
};

pub use asdf_format::FileAccessProps;
