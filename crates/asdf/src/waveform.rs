//! Sample transfers between caller buffers and waveform datasets.
//!
//! Every transfer pairs an all-of-buffer memory selection with a file
//! selection, either the whole dataset or one block of `length` samples at
//! `offset`. Pairing fails before any byte moves when the block leaves the
//! dataset or the element counts differ.

use asdf_format::selection::check_transfer;
use asdf_format::{DataLayout, FormatError, Selection};
use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use crate::container::{Container, Dataset};
use crate::error::{Error, Result};
use crate::tree::DatasetInfo;

const SAMPLE_SIZE: u64 = 4;

fn transfer_error(err: FormatError) -> Error {
    match err {
        FormatError::SelectionOutOfBounds {
            start,
            count,
            extent,
        } => Error::Range {
            offset: start,
            length: count,
            extent,
        },
        FormatError::SelectionCountMismatch { memory, file } => Error::ShapeMismatch {
            expected: file,
            actual: memory,
        },
        other => Error::Format(other),
    }
}

/// First sample and sample count of a transfer of `buffer_len` samples.
fn plan(file: &Selection, buffer_len: usize, info: &DatasetInfo) -> Result<(u64, u64)> {
    let dims = info.dims();
    check_transfer(&Selection::All, &[buffer_len as u64], file, &dims).map_err(transfer_error)?;
    file.contiguous_run(&dims).map_err(transfer_error)
}

impl Dataset<'_> {
    fn waveform_info(&self) -> Result<DatasetInfo> {
        let info = self
            .container
            .dataset_info(self.id)
            .ok_or_else(|| Error::NotADataset(self.path()))?;
        if !info.datatype.is_f32_le() {
            return Err(Error::TypeMismatch {
                path: self.path(),
                expected: "f32",
                actual: info.datatype.describe(),
            });
        }
        Ok(info)
    }

    fn write_selection(&self, samples: &[f32], file: &Selection) -> Result<()> {
        self.container.ensure_writable()?;
        let info = self.waveform_info()?;
        let (start, count) = plan(file, samples.len(), &info)?;
        if count == 0 {
            return Ok(());
        }
        let address = match info.layout {
            DataLayout::Contiguous {
                address: Some(address),
                ..
            } => address,
            _ => return Err(FormatError::UnsupportedFeature("writing into compact or unallocated storage").into()),
        };
        let mut bytes = vec![0u8; samples.len() * SAMPLE_SIZE as usize];
        LittleEndian::write_f32_into(samples, &mut bytes);
        self.container.write_raw(address + start * SAMPLE_SIZE, &bytes)?;
        trace!(dataset = %self.path(), offset = start, count, "wrote samples");
        Ok(())
    }

    fn read_selection(&self, out: &mut [f32], file: &Selection) -> Result<()> {
        let info = self.waveform_info()?;
        let (start, count) = plan(file, out.len(), &info)?;
        if count == 0 {
            return Ok(());
        }
        let mut bytes = vec![0u8; out.len() * SAMPLE_SIZE as usize];
        read_bytes(self.container, &info, start * SAMPLE_SIZE, &mut bytes)?;
        LittleEndian::read_f32_into(&bytes, out);
        trace!(dataset = %self.path(), offset = start, count, "read samples");
        Ok(())
    }

    /// Write every sample of the dataset.
    pub fn write_full_waveform(&self, samples: &[f32]) -> Result<()> {
        self.write_selection(samples, &Selection::All)
    }

    /// Write `length` samples starting at sample `offset`.
    ///
    /// `samples` must hold exactly `length` values and the block must lie
    /// within the dataset. Participants may write disjoint blocks of the
    /// same dataset concurrently.
    pub fn write_partial_waveform(&self, samples: &[f32], offset: u64, length: u64) -> Result<()> {
        if samples.len() as u64 != length {
            return Err(Error::ShapeMismatch {
                expected: length,
                actual: samples.len() as u64,
            });
        }
        self.write_selection(samples, &Selection::single_block(offset, length))
    }

    /// Read every sample into `out`, which must match the dataset extent.
    pub fn read_full_waveform(&self, out: &mut [f32]) -> Result<()> {
        self.read_selection(out, &Selection::All)
    }

    /// Read `length` samples starting at `offset` into `out`.
    pub fn read_partial_waveform(&self, out: &mut [f32], offset: u64, length: u64) -> Result<()> {
        if out.len() as u64 != length {
            return Err(Error::ShapeMismatch {
                expected: length,
                actual: out.len() as u64,
            });
        }
        self.read_selection(out, &Selection::single_block(offset, length))
    }

    /// All samples as a new vector.
    pub fn read_waveform(&self) -> Result<Vec<f32>> {
        let extent = usize::try_from(self.num_elements()).map_err(|_| Error::Range {
            offset: 0,
            length: self.num_elements(),
            extent: self.num_elements(),
        })?;
        let mut out = vec![0f32; extent];
        self.read_full_waveform(&mut out)?;
        Ok(out)
    }
}

/// Copy raw bytes of a dataset starting `skip` bytes in. Unallocated
/// storage reads as zeros.
pub(crate) fn read_bytes(container: &Container, info: &DatasetInfo, skip: u64, out: &mut [u8]) -> Result<()> {
    match &info.layout {
        DataLayout::Contiguous {
            address: Some(address),
            ..
        } => container.read_raw(address + skip, out),
        DataLayout::Contiguous { address: None, .. } => {
            out.fill(0);
            Ok(())
        }
        DataLayout::Compact { data } => {
            let start = skip as usize;
            let src = data
                .get(start..start + out.len())
                .ok_or(FormatError::UnexpectedEof {
                    expected: start + out.len(),
                    available: data.len(),
                })?;
            out.copy_from_slice(src);
            Ok(())
        }
    }
}

impl Container {
    /// Read the whole waveform at `path` into `out`.
    pub fn read_full_waveform(&self, path: &str, out: &mut [f32]) -> Result<()> {
        self.dataset(path)?.read_full_waveform(out)
    }

    /// Read `length` samples at `offset` of the waveform at `path`.
    pub fn read_partial_waveform(&self, path: &str, offset: u64, length: u64, out: &mut [f32]) -> Result<()> {
        self.dataset(path)?.read_partial_waveform(out, offset, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_group::SingleProcess;
    use crate::schema::WaveformDescriptor;
    use tempfile::tempdir;

    #[test]
    fn partial_writes_fill_in_order() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let ds = c.root().define_waveform("t", &WaveformDescriptor::new(8, 0)).unwrap();
        ds.write_partial_waveform(&[5.0, 6.0, 7.0, 8.0], 4, 4).unwrap();
        ds.write_partial_waveform(&[1.0, 2.0], 0, 2).unwrap();
        assert_eq!(ds.read_waveform().unwrap(), vec![1.0, 2.0, 0.0, 0.0, 5.0, 6.0, 7.0, 8.0]);

        let mut mid = [0f32; 3];
        ds.read_partial_waveform(&mut mid, 3, 3).unwrap();
        assert_eq!(mid, [0.0, 5.0, 6.0]);
    }

    #[test]
    fn out_of_range_write_changes_nothing() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let ds = c.root().define_waveform("t", &WaveformDescriptor::new(4, 0)).unwrap();
        ds.write_full_waveform(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let err = ds.write_partial_waveform(&[9.0, 9.0], 3, 2).unwrap_err();
        assert!(err.is_range_error());
        assert!(matches!(
            err,
            Error::Range {
                offset: 3,
                length: 2,
                extent: 4
            }
        ));
        assert_eq!(ds.read_waveform().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn buffer_length_must_match() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let ds = c.root().define_waveform("t", &WaveformDescriptor::new(4, 0)).unwrap();
        assert!(matches!(
            ds.write_full_waveform(&[1.0; 3]),
            Err(Error::ShapeMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(matches!(
            ds.write_partial_waveform(&[1.0; 3], 0, 2),
            Err(Error::ShapeMismatch { .. })
        ));
        let mut out = [0f32; 5];
        assert!(matches!(ds.read_full_waveform(&mut out), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn zero_length_transfers() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let ds = c.root().define_waveform("t", &WaveformDescriptor::new(4, 0)).unwrap();
        ds.write_partial_waveform(&[], 4, 0).unwrap();
        assert!(ds.write_partial_waveform(&[], 5, 0).unwrap_err().is_range_error());

        let empty = c.root().define_waveform("e", &WaveformDescriptor::new(0, 0)).unwrap();
        empty.write_full_waveform(&[]).unwrap();
        assert!(empty.read_waveform().unwrap().is_empty());
    }

    #[test]
    fn text_dataset_is_not_a_waveform() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        c.root().write_quakeml("<q/>").unwrap();
        let mut out = [0f32; 5];
        assert!(matches!(
            c.read_full_waveform("/QuakeML", &mut out),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn offset_overflow_is_range_error() {
        let dir = tempdir().unwrap();
        let c = Container::create(dir.path().join("a.h5"), &SingleProcess).unwrap();
        let ds = c.root().define_waveform("t", &WaveformDescriptor::new(4, 0)).unwrap();
        assert!(ds.write_partial_waveform(&[1.0], u64::MAX, 1).unwrap_err().is_range_error());
    }
}
