//! Existence checks and metadata reads by path.

use asdf_format::FormatError;

use crate::container::Container;
use crate::error::{Error, Result};
use crate::path::{components, extend_path, validate_name};
use crate::schema::{QUAKEML, STATION_XML, WAVEFORMS_GROUP};
use crate::tree::NodeId;
use crate::waveform::read_bytes;

impl Container {
    /// Whether `name` exists below `path`.
    ///
    /// A missing intermediate group is reported as absent, not as an error.
    /// Malformed paths and invalid names are errors.
    pub fn exists(&self, path: &str, name: &str) -> Result<bool> {
        Ok(self.find_child(path, name)?.is_some())
    }

    /// Whether the station group `/Waveforms/<station>` exists.
    pub fn station_exists(&self, station: &str) -> Result<bool> {
        Ok(self
            .find_child(WAVEFORMS_GROUP, station)?
            .is_some_and(|id| self.tree().is_group(id)))
    }

    /// Whether the waveform dataset `/Waveforms/<station>/<waveform>` exists.
    pub fn waveform_exists(&self, station: &str, waveform: &str) -> Result<bool> {
        validate_name(station)?;
        Ok(self
            .find_child(&extend_path(WAVEFORMS_GROUP, station), waveform)?
            .is_some_and(|id| self.tree().dataset(id).is_some_and(|d| d.datatype.is_f32_le())))
    }

    fn find_child(&self, path: &str, name: &str) -> Result<Option<NodeId>> {
        components(path)?;
        validate_name(name)?;
        self.tree().resolve(&extend_path(path, name))
    }

    /// Number of elements of the dataset at `path`.
    pub fn num_elements_at_path(&self, path: &str) -> Result<u64> {
        Ok(self.dataset(path)?.num_elements())
    }

    /// String attribute `attr` of the object at `path`.
    pub fn read_string_attribute_at(&self, path: &str, attr: &str) -> Result<String> {
        let id = self.lookup(path)?;
        self.string_attribute(id, attr)
    }

    /// The QuakeML document stored at `/QuakeML`.
    pub fn read_quakeml(&self) -> Result<String> {
        self.read_text(QUAKEML)
    }

    /// The StationXML document of `station`.
    pub fn read_station_xml(&self, station: &str) -> Result<String> {
        let path = extend_path(&extend_path(WAVEFORMS_GROUP, station), STATION_XML);
        self.read_text(&path)
    }

    /// Text stored as a NUL-terminated byte dataset.
    fn read_text(&self, path: &str) -> Result<String> {
        let id: NodeId = self.dataset(path)?.id;
        let info = self
            .dataset_info(id)
            .ok_or_else(|| Error::NotADataset(path.to_string()))?;
        if !info.datatype.is_byte() {
            return Err(Error::TypeMismatch {
                path: path.to_string(),
                expected: "i8",
                actual: info.datatype.describe(),
            });
        }
        let len = usize::try_from(info.extent())
            .map_err(|_| FormatError::UnsupportedFeature("text dataset larger than memory"))?;
        let mut bytes = vec![0u8; len];
        read_bytes(self, &info, 0, &mut bytes)?;
        if let Some(end) = bytes.iter().position(|&b| b == 0) {
            bytes.truncate(end);
        }
        String::from_utf8(bytes).map_err(|_| FormatError::InvalidUtf8.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_group::SingleProcess;
    use crate::schema::WaveformDescriptor;
    use tempfile::tempdir;

    #[test]
    fn existence_queries() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        assert!(!c.station_exists("AAA").unwrap());
        let sta = c
            .create_waveforms_group()
            .unwrap()
            .create_station_group("AAA", "<x/>")
            .unwrap();
        sta.define_waveform("trace", &WaveformDescriptor::new(4, 0)).unwrap();
        assert!(c.station_exists("AAA").unwrap());
        assert!(!c.station_exists("BBB").unwrap());
        assert!(c.waveform_exists("AAA", "trace").unwrap());
        assert!(!c.waveform_exists("AAA", "other").unwrap());
        assert!(!c.waveform_exists("BBB", "trace").unwrap());
        assert!(c.exists("/", "Waveforms").unwrap());
        assert!(c.exists("Waveforms/AAA", "StationXML").unwrap());
        assert!(matches!(c.exists("Waveforms//AAA", "x"), Err(Error::MalformedPath(_))));
    }

    #[test]
    fn existence_checks_kind_and_name() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let wf = c.create_waveforms_group().unwrap();
        let sta = wf.create_station_group("AA.BB", "<x/>").unwrap();
        sta.define_waveform("AA.BB.BHZ", &WaveformDescriptor::new(4, 0)).unwrap();
        wf.create_station_group("CC", "<x/>").unwrap();
        c.root()
            .define_waveform("loose", &WaveformDescriptor::new(1, 0))
            .unwrap();

        for bad in [".", "a/b", "", "x\0y"] {
            assert!(matches!(c.station_exists(bad), Err(Error::InvalidName(_))), "{bad:?}");
            assert!(matches!(c.waveform_exists("AA.BB", bad), Err(Error::InvalidName(_))));
            assert!(matches!(c.waveform_exists(bad, "AA.BB"), Err(Error::InvalidName(_))));
        }
        assert!(matches!(c.exists("/", "."), Err(Error::InvalidName(_))));
        assert!(matches!(c.exists("/", "Waveforms/AA.BB"), Err(Error::InvalidName(_))));

        // a group is not a waveform, and StationXML is not a waveform
        assert!(!c.waveform_exists("AA.BB", "AA.BB").unwrap());
        assert!(!c.waveform_exists("AA.BB", "StationXML").unwrap());
        assert!(c.waveform_exists("AA.BB", "AA.BB.BHZ").unwrap());
        // a waveform is not a station
        assert!(!c.station_exists("AA.BB.BHZ").unwrap());
        assert!(c.station_exists("CC").unwrap());
        // stations live under Waveforms only
        assert!(!c.station_exists("loose").unwrap());
    }

    #[test]
    fn text_reads() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        c.root().write_quakeml("<quakeml>é</quakeml>").unwrap();
        c.create_waveforms_group()
            .unwrap()
            .create_station_group("AAA", "<station/>")
            .unwrap();
        assert_eq!(c.read_quakeml().unwrap(), "<quakeml>é</quakeml>");
        assert_eq!(c.read_station_xml("AAA").unwrap(), "<station/>");
        assert!(matches!(c.read_station_xml("BBB"), Err(Error::NotFound(_))));
    }

    #[test]
    fn counts_and_attributes_by_path() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        c.root()
            .define_waveform("trace", &WaveformDescriptor::new(40, 1_577_836_800))
            .unwrap();
        assert_eq!(c.num_elements_at_path("/trace").unwrap(), 40);
        assert_eq!(
            c.read_string_attribute_at("/trace", "starttime").unwrap(),
            "1577836800"
        );
        assert!(matches!(c.num_elements_at_path("/"), Err(Error::NotADataset(_))));
        assert!(matches!(c.num_elements_at_path("/nope"), Err(Error::NotFound(_))));
    }
}
