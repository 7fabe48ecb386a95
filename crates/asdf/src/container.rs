//! Container lifecycle and object handles.
//!
//! A [`Container`] owns the open file and the object tree. Group and
//! dataset handles borrow it, so the borrow checker guarantees every handle
//! is gone before [`Container::close`] runs.
//!
//! Structural changes (new groups, datasets, attributes) are kept in memory
//! and written as one metadata block by [`Container::flush`] or
//! [`Container::close`]. Sample data goes straight to its reserved place in
//! the file, so participants writing disjoint ranges of the same dataset
//! never touch the same bytes.

use std::cell::{Cell, Ref, RefCell};
use std::path::{Path, PathBuf};

use asdf_format::{FormatError, Superblock, OFFSET_SIZE};
use tracing::{debug, info, warn};

use crate::config::AsdfConfig;
use crate::error::{Error, Result};
use crate::process_group::ProcessGroup;
use crate::storage::Storage;
use crate::tree::{DatasetInfo, NodeId, Tree, ROOT};

/// An open ASDF container shared by the participants of a process group.
pub struct Container {
    path: PathBuf,
    storage: Storage,
    tree: RefCell<Tree>,
    /// Declarations not yet written to the file.
    dirty: Cell<bool>,
    /// Absolute position that file addresses are relative to.
    base: u64,
    config: AsdfConfig,
    rank: usize,
    size: usize,
    closed: bool,
}

/// A group inside a container.
#[derive(Debug)]
pub struct Group<'c> {
    pub(crate) container: &'c Container,
    pub(crate) id: NodeId,
}

/// A dataset inside a container.
#[derive(Debug)]
pub struct Dataset<'c> {
    pub(crate) container: &'c Container,
    pub(crate) id: NodeId,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("path", &self.path)
            .field("writable", &self.storage.is_writable())
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Write the tree as a metadata block at the end of allocation, then point
/// the superblock at it.
fn write_metadata(storage: &Storage, tree: &Tree) -> Result<()> {
    let base = storage.end_of_allocation();
    let (block, root) = tree.serialize(base)?;
    let end = base + block.len() as u64;
    storage.write_at(base, &block)?;
    storage.set_end_of_allocation(end);
    let superblock = Superblock::new(end, root);
    storage.write_at(0, &superblock.serialize())?;
    debug!(
        objects = tree.len(),
        bytes = block.len(),
        root,
        "wrote metadata block"
    );
    Ok(())
}

struct Loaded {
    superblock: Superblock,
    tree: Tree,
}

fn load_metadata(storage: &Storage) -> Result<Loaded> {
    let offset = storage.signature_offset()?;
    let head = storage.read_upto(offset, Superblock::encoded_size(OFFSET_SIZE))?;
    let superblock = Superblock::parse(&head, 0)?;
    let tree = Tree::load(
        storage,
        superblock.base_address,
        superblock.root_group_address,
        superblock.offset_size,
        superblock.length_size,
    )?;
    Ok(Loaded { superblock, tree })
}

impl Container {
    /// Create a container collectively, replacing any existing file.
    ///
    /// Participant 0 creates the file with an empty root group; the others
    /// open it once it exists. Every participant reaches both barriers even
    /// when its own step fails, so an error on one side cannot strand the
    /// rest of the group.
    pub fn create<P, G>(path: P, group: &G) -> Result<Container>
    where
        P: AsRef<Path>,
        G: ProcessGroup + ?Sized,
    {
        Self::create_with(path, group, AsdfConfig::default())
    }

    pub fn create_with<P, G>(path: P, group: &G, config: AsdfConfig) -> Result<Container>
    where
        P: AsRef<Path>,
        G: ProcessGroup + ?Sized,
    {
        let path = path.as_ref();
        let initialized = if group.rank() == 0 {
            Storage::create(path).and_then(|s| {
                write_metadata(&s, &Tree::new())?;
                s.sync()
            })
        } else {
            Ok(())
        };
        group.barrier();
        let opened = initialized.and_then(|()| Self::attach(path, group, config));
        group.barrier();
        let container = opened?;
        info!(path = %path.display(), rank = container.rank, size = container.size, "created container");
        Ok(container)
    }

    /// Open an existing container for reading only.
    pub fn open_read_only<P, G>(path: P, group: &G) -> Result<Container>
    where
        P: AsRef<Path>,
        G: ProcessGroup + ?Sized,
    {
        Self::open_read_only_with(path, group, AsdfConfig::default())
    }

    pub fn open_read_only_with<P, G>(path: P, group: &G, config: AsdfConfig) -> Result<Container>
    where
        P: AsRef<Path>,
        G: ProcessGroup + ?Sized,
    {
        let path = path.as_ref();
        let opened = Storage::open_read_only(path, &config.access).and_then(|storage| {
            let loaded = load_metadata(&storage)?;
            Ok(Container {
                path: path.to_path_buf(),
                base: loaded.superblock.base_address,
                storage,
                tree: RefCell::new(loaded.tree),
                dirty: Cell::new(false),
                config,
                rank: group.rank(),
                size: group.size(),
                closed: false,
            })
        });
        group.barrier();
        let container = opened?;
        info!(path = %path.display(), rank = container.rank, "opened container read-only");
        Ok(container)
    }

    /// Open an existing container for reading and writing.
    pub fn open_read_write<P, G>(path: P, group: &G) -> Result<Container>
    where
        P: AsRef<Path>,
        G: ProcessGroup + ?Sized,
    {
        Self::open_read_write_with(path, group, AsdfConfig::default())
    }

    pub fn open_read_write_with<P, G>(path: P, group: &G, config: AsdfConfig) -> Result<Container>
    where
        P: AsRef<Path>,
        G: ProcessGroup + ?Sized,
    {
        let path = path.as_ref();
        let opened = Self::attach(path, group, config);
        group.barrier();
        let container = opened?;
        info!(path = %path.display(), rank = container.rank, "opened container read-write");
        Ok(container)
    }

    fn attach<G: ProcessGroup + ?Sized>(path: &Path, group: &G, config: AsdfConfig) -> Result<Container> {
        let storage = Storage::open_read_write(path)?;
        let loaded = load_metadata(&storage)?;
        if loaded.superblock.base_address != 0 {
            return Err(FormatError::UnsupportedFeature("writing a file with a user block").into());
        }
        storage.set_end_of_allocation(loaded.superblock.eof_address.max(storage.len()?));
        Ok(Container {
            path: path.to_path_buf(),
            base: 0,
            storage,
            tree: RefCell::new(loaded.tree),
            dirty: Cell::new(false),
            config,
            rank: group.rank(),
            size: group.size(),
            closed: false,
        })
    }

    /// Write pending declarations to the file.
    ///
    /// Only the participant that made the declarations should flush; the
    /// others pick them up with [`Container::refresh`] after a barrier.
    pub fn flush(&self) -> Result<()> {
        self.ensure_writable()?;
        if !self.dirty.get() {
            return Ok(());
        }
        write_metadata(&self.storage, &self.tree.borrow())?;
        self.dirty.set(false);
        Ok(())
    }

    /// Reload the object tree from the file, picking up declarations that
    /// other participants flushed.
    pub fn refresh(&mut self) -> Result<()> {
        if self.dirty.get() {
            return Err(Error::UnflushedDeclarations);
        }
        if !self.storage.is_writable() {
            self.storage = Storage::open_read_only(&self.path, &self.config.access)?;
        }
        let loaded = load_metadata(&self.storage)?;
        if self.storage.is_writable() {
            let end = self
                .storage
                .end_of_allocation()
                .max(loaded.superblock.eof_address)
                .max(self.storage.len()?);
            self.storage.set_end_of_allocation(end);
        }
        self.base = loaded.superblock.base_address;
        debug!(objects = loaded.tree.len(), "refreshed object tree");
        self.tree = RefCell::new(loaded.tree);
        Ok(())
    }

    /// Flush, sync and release the container.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        if self.storage.is_writable() {
            if self.dirty.get() {
                write_metadata(&self.storage, &self.tree.borrow())?;
                self.dirty.set(false);
            }
            self.storage.sync()?;
        }
        info!(path = %self.path.display(), rank = self.rank, "closed container");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// This participant's rank in the group that opened the container.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Size of the group that opened the container.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_writable(&self) -> bool {
        self.storage.is_writable()
    }

    pub fn config(&self) -> &AsdfConfig {
        &self.config
    }

    pub fn root(&self) -> Group<'_> {
        Group {
            container: self,
            id: ROOT,
        }
    }

    /// The group at `path`.
    pub fn group(&self, path: &str) -> Result<Group<'_>> {
        let id = self.lookup(path)?;
        if !self.tree().is_group(id) {
            return Err(Error::NotAGroup(path.to_string()));
        }
        Ok(Group { container: self, id })
    }

    /// The dataset at `path`.
    pub fn dataset(&self, path: &str) -> Result<Dataset<'_>> {
        let id = self.lookup(path)?;
        if self.tree().is_group(id) {
            return Err(Error::NotADataset(path.to_string()));
        }
        Ok(Dataset { container: self, id })
    }

    pub(crate) fn lookup(&self, path: &str) -> Result<NodeId> {
        self.tree()
            .resolve(path)?
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    pub(crate) fn tree(&self) -> Ref<'_, Tree> {
        self.tree.borrow()
    }

    /// Apply a structural change and remember that it needs flushing.
    pub(crate) fn declare<T>(&self, change: impl FnOnce(&mut Tree) -> Result<T>) -> Result<T> {
        let out = change(&mut self.tree.borrow_mut())?;
        self.dirty.set(true);
        Ok(out)
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.storage.is_writable() {
            Ok(())
        } else {
            Err(Error::ReadOnly)
        }
    }

    /// Reserve `bytes` of zero-filled raw data space. Empty blocks get no
    /// address.
    pub(crate) fn allocate(&self, bytes: u64) -> Result<Option<u64>> {
        if bytes == 0 {
            return Ok(None);
        }
        self.storage.allocate(bytes, &self.config.access).map(Some)
    }

    /// Reserve `count` zero-filled blocks of `bytes` each, all or none.
    pub(crate) fn allocate_many(&self, bytes: u64, count: usize) -> Result<Vec<Option<u64>>> {
        if bytes == 0 {
            self.ensure_writable()?;
            return Ok(vec![None; count]);
        }
        let addrs = self.storage.allocate_many(bytes, count, &self.config.access)?;
        Ok(addrs.into_iter().map(Some).collect())
    }

    pub(crate) fn read_raw(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        self.storage.read_at(self.base + address, buf)
    }

    pub(crate) fn write_raw(&self, address: u64, data: &[u8]) -> Result<()> {
        self.storage.write_at(self.base + address, data)
    }

    pub(crate) fn dataset_info(&self, id: NodeId) -> Option<DatasetInfo> {
        self.tree().dataset(id).cloned()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if self.closed || !self.dirty.get() || !self.storage.is_writable() {
            return;
        }
        if let Err(e) = write_metadata(&self.storage, &self.tree.borrow()) {
            warn!(error = %e, path = %self.path.display(), "failed to flush container on drop");
        }
    }
}

impl<'c> Group<'c> {
    /// Link name of the group; empty for the root.
    pub fn name(&self) -> String {
        self.container.tree().node(self.id).name.clone()
    }

    pub fn path(&self) -> String {
        self.container.tree().path_of(self.id)
    }

    pub fn container(&self) -> &'c Container {
        self.container
    }

    /// Release the handle.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}

impl<'c> Dataset<'c> {
    pub fn name(&self) -> String {
        self.container.tree().node(self.id).name.clone()
    }

    pub fn path(&self) -> String {
        self.container.tree().path_of(self.id)
    }

    pub fn container(&self) -> &'c Container {
        self.container
    }

    /// Number of elements in the dataset.
    pub fn num_elements(&self) -> u64 {
        self.container
            .tree()
            .dataset(self.id)
            .map_or(0, DatasetInfo::extent)
    }

    pub fn close(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_group::SingleProcess;
    use tempfile::tempdir;

    #[test]
    fn create_writes_valid_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.h5");
        Container::create(&path, &SingleProcess).unwrap().close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let sb = Superblock::parse(&bytes, 0).unwrap();
        assert_eq!(sb.root_group_address, 48);
        assert_eq!(sb.eof_address, bytes.len() as u64);

        let c = Container::open_read_only(&path, &SingleProcess).unwrap();
        assert!(!c.is_writable());
        assert_eq!(c.root().path(), "/");
        assert_eq!(c.tree().len(), 1);
    }

    #[test]
    fn lookups_distinguish_kinds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kinds.h5");
        let c = Container::create(&path, &SingleProcess).unwrap();
        let root = c.root();
        let id = c
            .declare(|t| t.add_group(ROOT, "Waveforms"))
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(c.group("/Waveforms").unwrap().name(), "Waveforms");
        assert!(matches!(c.dataset("/Waveforms"), Err(Error::NotADataset(_))));
        assert!(matches!(c.group("/Nope"), Err(Error::NotFound(_))));
        assert!(matches!(c.group("a//b"), Err(Error::MalformedPath(_))));
        root.close().unwrap();
        c.close().unwrap();
    }

    #[test]
    fn refresh_refuses_pending_declarations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pending.h5");
        let mut c = Container::create(&path, &SingleProcess).unwrap();
        c.declare(|t| t.add_group(ROOT, "Provenance")).unwrap();
        assert!(matches!(c.refresh(), Err(Error::UnflushedDeclarations)));
        c.flush().unwrap();
        c.refresh().unwrap();
        assert!(c.group("Provenance").is_ok());
        c.close().unwrap();
    }

    #[test]
    fn drop_flushes_declarations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dropped.h5");
        {
            let c = Container::create(&path, &SingleProcess).unwrap();
            c.declare(|t| t.add_group(ROOT, "AuxiliaryData")).unwrap();
        }
        let c = Container::open_read_only(&path, &SingleProcess).unwrap();
        assert!(c.group("/AuxiliaryData").is_ok());
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempdir().unwrap();
        let err = Container::open_read_only(dir.path().join("absent.h5"), &SingleProcess).unwrap_err();
        assert!(err.is_storage_failure());
    }

    #[test]
    fn read_only_container_refuses_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ro.h5");
        Container::create(&path, &SingleProcess).unwrap().close().unwrap();
        let c = Container::open_read_only(&path, &SingleProcess).unwrap();
        assert!(matches!(c.flush(), Err(Error::ReadOnly)));
        assert!(matches!(c.allocate(8), Err(Error::ReadOnly)));
    }
}
