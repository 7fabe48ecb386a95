//! The ASDF object layout.
//!
//! ```text
//! /QuakeML                      i8[len + 1]   event description
//! /Waveforms/<station>/StationXML  i8[len + 1]   station metadata
//! /Waveforms/<station>/<trace>  f32[nsamples] samples, "starttime" attribute
//! <group>/AuxiliaryData         group
//! <group>/Provenance            group
//! ```
//!
//! Text blobs are stored as signed bytes including a trailing NUL.

use std::collections::HashSet;
use std::io;

use asdf_format::{AttributeMessage, Datatype};
use tracing::debug;

use crate::attribute::string_attribute;
use crate::config::WaveformAttrs;
use crate::container::{Container, Dataset, Group};
use crate::error::{Error, Result};
use crate::path::{reject_nul, validate_name};
use crate::render::{render_sampling_rate, render_start_time};
use crate::tree::{DatasetInfo, NodeId, ROOT};

pub const WAVEFORMS_GROUP: &str = "Waveforms";
pub const STATION_XML: &str = "StationXML";
pub const QUAKEML: &str = "QuakeML";
pub const AUXILIARY_DATA: &str = "AuxiliaryData";
pub const PROVENANCE: &str = "Provenance";

pub const START_TIME_ATTR: &str = "starttime";
pub const EVENT_ID_ATTR: &str = "event_id";
pub const SAMPLING_RATE_ATTR: &str = "sampling_rate";

/// Shape and metadata shared by waveform declarations.
///
/// ```
/// use asdf::WaveformDescriptor;
///
/// let desc = WaveformDescriptor::new(4_000, 1_577_836_800)
///     .sampling_rate(40.0)
///     .event_name("GCMT_C201001122153A");
/// assert_eq!(desc.nsamples, 4_000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformDescriptor<'a> {
    /// Number of samples; the dataset extent.
    pub nsamples: u64,
    pub start_time: i64,
    /// Samples per second. Recorded only with [`WaveformAttrs::Extended`].
    pub sampling_rate: f64,
    /// Event identifier. Recorded only with [`WaveformAttrs::Extended`].
    pub event_name: &'a str,
}

impl<'a> WaveformDescriptor<'a> {
    pub fn new(nsamples: u64, start_time: i64) -> Self {
        WaveformDescriptor {
            nsamples,
            start_time,
            sampling_rate: 0.0,
            event_name: "",
        }
    }

    pub fn sampling_rate(mut self, rate: f64) -> Self {
        self.sampling_rate = rate;
        self
    }

    pub fn event_name(mut self, name: &'a str) -> Self {
        self.event_name = name;
        self
    }
}

fn text_bytes(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text.as_bytes());
    bytes.push(0);
    bytes
}

impl Container {
    /// Create the top-level `Waveforms` group.
    pub fn create_waveforms_group(&self) -> Result<Group<'_>> {
        self.root().create_child_group(WAVEFORMS_GROUP)
    }

    /// Write `text` and its terminator to newly reserved space and describe
    /// the byte dataset that will hold it.
    fn store_text(&self, what: &str, text: &str) -> Result<DatasetInfo> {
        reject_nul(what, text)?;
        let bytes = text_bytes(text);
        let address = self.allocate(bytes.len() as u64)?;
        if let Some(address) = address {
            self.write_raw(address, &bytes)?;
        }
        Ok(DatasetInfo::contiguous(Datatype::i8(), bytes.len() as u64, address))
    }

    fn check_new_child(&self, parent: NodeId, name: &str) -> Result<()> {
        self.ensure_writable()?;
        validate_name(name)?;
        self.tree().check_insert(parent, name)
    }

    /// Attributes for a waveform declaration, rendered per configuration.
    fn waveform_attributes(&self, desc: &WaveformDescriptor<'_>) -> Result<Vec<AttributeMessage>> {
        let config = self.config();
        let start = render_start_time(desc.start_time, config.start_time_width)?;
        let mut attrs = vec![string_attribute(START_TIME_ATTR, &start)?];
        if config.waveform_attrs == WaveformAttrs::Extended {
            attrs.push(string_attribute(EVENT_ID_ATTR, desc.event_name)?);
            let rate = render_sampling_rate(desc.sampling_rate, config.sampling_rate_width)?;
            attrs.push(string_attribute(SAMPLING_RATE_ATTR, &rate)?);
        }
        Ok(attrs)
    }
}

impl<'c> Group<'c> {
    pub(crate) fn create_child_group(&self, name: &str) -> Result<Group<'c>> {
        let c = self.container;
        c.check_new_child(self.id, name)?;
        let id = c.declare(|tree| tree.add_group(self.id, name))?;
        debug!(path = %c.tree().path_of(id), "created group");
        Ok(Group { container: c, id })
    }

    /// Create a station group holding its `StationXML` document.
    pub fn create_station_group(&self, name: &str, station_xml: &str) -> Result<Group<'c>> {
        let c = self.container;
        c.check_new_child(self.id, name)?;
        let xml = c.store_text(STATION_XML, station_xml)?;
        let id = c.declare(|tree| {
            let station = tree.add_group(self.id, name)?;
            tree.add_dataset(station, STATION_XML, xml, Vec::new())?;
            Ok(station)
        })?;
        debug!(path = %c.tree().path_of(id), xml_bytes = station_xml.len() + 1, "created station group");
        Ok(Group { container: c, id })
    }

    /// Declare one waveform dataset of `desc.nsamples` samples.
    ///
    /// Storage is reserved immediately and reads as zeros until written.
    pub fn define_waveform(&self, name: &str, desc: &WaveformDescriptor<'_>) -> Result<Dataset<'c>> {
        let mut datasets = self.define_waveforms(&[name], desc)?;
        datasets.pop().ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Declare several waveforms that share one descriptor.
    ///
    /// All names are checked, against the group and against each other,
    /// before any dataset is created.
    pub fn define_waveforms(&self, names: &[&str], desc: &WaveformDescriptor<'_>) -> Result<Vec<Dataset<'c>>> {
        let c = self.container;
        let mut seen = HashSet::with_capacity(names.len());
        for &name in names {
            c.check_new_child(self.id, name)?;
            if !seen.insert(name) {
                return Err(Error::DuplicateName(name.to_string()));
            }
        }
        let attrs = c.waveform_attributes(desc)?;
        let bytes = desc.nsamples.checked_mul(4).ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} samples do not fit in a file", desc.nsamples),
            ))
        })?;

        let infos: Vec<DatasetInfo> = c
            .allocate_many(bytes, names.len())?
            .into_iter()
            .map(|address| DatasetInfo::contiguous(Datatype::f32_le(), desc.nsamples, address))
            .collect();
        let ids = c.declare(|tree| {
            names
                .iter()
                .zip(infos)
                .map(|(name, info)| tree.add_dataset(self.id, name, info, attrs.clone()))
                .collect::<Result<Vec<_>>>()
        })?;
        debug!(
            group = %c.tree().path_of(self.id),
            count = ids.len(),
            nsamples = desc.nsamples,
            "defined waveforms"
        );
        Ok(ids
            .into_iter()
            .map(|id| Dataset { container: c, id })
            .collect())
    }

    /// Store the QuakeML document at `/QuakeML`, whichever group this is.
    pub fn write_quakeml(&self, quakeml: &str) -> Result<()> {
        let c = self.container;
        c.check_new_child(ROOT, QUAKEML)?;
        let info = c.store_text(QUAKEML, quakeml)?;
        c.declare(|tree| tree.add_dataset(ROOT, QUAKEML, info, Vec::new()))?;
        debug!(bytes = quakeml.len() + 1, "wrote QuakeML");
        Ok(())
    }

    /// Create an empty `AuxiliaryData` group under this group.
    pub fn write_auxiliary_data(&self) -> Result<()> {
        self.create_child_group(AUXILIARY_DATA).map(drop)
    }

    /// Create an empty `Provenance` group under this group.
    pub fn write_provenance_data(&self) -> Result<()> {
        self.create_child_group(PROVENANCE).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeTarget;
    use crate::config::AsdfConfig;
    use crate::process_group::SingleProcess;
    use tempfile::tempdir;

    #[test]
    fn station_group_holds_xml() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let wf = c.create_waveforms_group().unwrap();
        let sta = wf.create_station_group("AAA", "<x/>").unwrap();
        assert_eq!(sta.path(), "/Waveforms/AAA");
        let xml = c.dataset("/Waveforms/AAA/StationXML").unwrap();
        assert_eq!(xml.num_elements(), 5);
    }

    #[test]
    fn duplicate_station_leaves_tree_unchanged() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let wf = c.create_waveforms_group().unwrap();
        wf.create_station_group("AAA", "<x/>").unwrap();
        let before = c.tree().len();
        assert!(matches!(
            wf.create_station_group("AAA", "<y/>"),
            Err(Error::DuplicateName(_))
        ));
        assert_eq!(c.tree().len(), before);
    }

    #[test]
    fn waveform_gets_start_time_only_by_default() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let sta = c
            .create_waveforms_group()
            .unwrap()
            .create_station_group("AAA", "<x/>")
            .unwrap();
        let desc = WaveformDescriptor::new(40, 1_577_836_800).sampling_rate(1.0);
        let ds = sta.define_waveform("trace", &desc).unwrap();
        assert_eq!(ds.num_elements(), 40);
        assert_eq!(ds.attribute_names(), vec![START_TIME_ATTR]);
        assert_eq!(ds.read_string_attribute(START_TIME_ATTR).unwrap(), "1577836800");
    }

    #[test]
    fn extended_attributes() {
        let dir = tempdir().unwrap();
        let config = AsdfConfig::new().waveform_attrs(WaveformAttrs::Extended);
        let c = Container::create_with(dir.path().join("a.h5"), &SingleProcess, config).unwrap();
        let desc = WaveformDescriptor::new(10, 7).sampling_rate(20.0).event_name("evt-1");
        let ds = c.root().define_waveform("trace", &desc).unwrap();
        assert_eq!(ds.read_string_attribute(EVENT_ID_ATTR).unwrap(), "evt-1");
        assert_eq!(ds.read_string_attribute(SAMPLING_RATE_ATTR).unwrap(), "20.0000000");
    }

    #[test]
    fn batch_rejects_repeated_name_before_creating() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let root = c.root();
        let desc = WaveformDescriptor::new(4, 0);
        let before = c.tree().len();
        assert!(matches!(
            root.define_waveforms(&["a", "b", "a"], &desc),
            Err(Error::DuplicateName(_))
        ));
        assert_eq!(c.tree().len(), before);
        let made = root.define_waveforms(&["a", "b"], &desc).unwrap();
        assert_eq!(made.len(), 2);
    }

    #[test]
    fn failed_batch_reserves_nothing() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let root = c.root();
        root.define_waveform("first", &WaveformDescriptor::new(4, 0)).unwrap();
        let len = std::fs::metadata(c.path()).unwrap().len();
        let before = c.tree().len();

        let huge = WaveformDescriptor::new(u64::MAX / 8, 0);
        assert!(root.define_waveforms(&["a", "b", "c"], &huge).is_err());
        assert_eq!(c.tree().len(), before);
        assert_eq!(std::fs::metadata(c.path()).unwrap().len(), len);

        let next = root.define_waveform("next", &WaveformDescriptor::new(4, 0)).unwrap();
        next.write_full_waveform(&[1.0; 4]).unwrap();
        assert_eq!(std::fs::metadata(c.path()).unwrap().len(), len + 16);
    }

    #[test]
    fn too_wide_start_time_rejected() {
        let dir = tempdir().unwrap();
        let config = AsdfConfig::new().start_time_width(4);
        let c = Container::create_with(dir.path().join("a.h5"), &SingleProcess, config).unwrap();
        let before = c.tree().len();
        assert!(matches!(
            c.root().define_waveform("t", &WaveformDescriptor::new(4, 123_456)),
            Err(Error::ValueTooWide { .. })
        ));
        assert_eq!(c.tree().len(), before);
    }

    #[test]
    fn quakeml_always_at_root() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let wf = c.create_waveforms_group().unwrap();
        wf.write_quakeml("<q/>").unwrap();
        assert_eq!(c.dataset("/QuakeML").unwrap().num_elements(), 5);
        assert!(matches!(
            c.root().write_quakeml("<q/>"),
            Err(Error::DuplicateName(_))
        ));
    }

    #[test]
    fn auxiliary_and_provenance_groups() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let root = c.root();
        root.write_auxiliary_data().unwrap();
        root.write_provenance_data().unwrap();
        assert!(c.group("/AuxiliaryData").is_ok());
        assert!(c.group("/Provenance").is_ok());
        assert!(matches!(root.write_provenance_data(), Err(Error::DuplicateName(_))));
    }

    #[test]
    fn zero_sample_waveform_has_no_storage() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let ds = c.root().define_waveform("empty", &WaveformDescriptor::new(0, 0)).unwrap();
        assert_eq!(ds.num_elements(), 0);
        let info = c.dataset_info(ds.id).unwrap();
        assert_eq!(
            info.layout,
            asdf_format::DataLayout::Contiguous {
                address: None,
                size: 0
            }
        );
    }
}
