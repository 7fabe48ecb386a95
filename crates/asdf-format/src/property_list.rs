//! File access properties.

/// How a container file is opened and how space in it is allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAccessProps {
    /// Raw data blocks at least this large are aligned.
    pub alignment_threshold: u64,
    /// Alignment in bytes for blocks over the threshold. 0 or 1 disables it.
    pub alignment_bytes: u64,
    /// Map read-only files into memory instead of reading them into a buffer.
    pub memory_map: bool,
}

impl Default for FileAccessProps {
    fn default() -> Self {
        Self {
            alignment_threshold: 0,
            alignment_bytes: 0,
            memory_map: true,
        }
    }
}

impl FileAccessProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Align raw data blocks of at least `threshold` bytes to `bytes`.
    pub fn alignment(mut self, threshold: u64, bytes: u64) -> Self {
        self.alignment_threshold = threshold;
        self.alignment_bytes = bytes;
        self
    }

    pub fn memory_map(mut self, enabled: bool) -> Self {
        self.memory_map = enabled;
        self
    }

    /// Address at which a block of `size` bytes is placed when the free
    /// space starts at `end_of_allocation`.
    pub fn place(&self, end_of_allocation: u64, size: u64) -> Option<u64> {
        if self.alignment_bytes <= 1 || size < self.alignment_threshold || size == 0 {
            return Some(end_of_allocation);
        }
        let rem = end_of_allocation % self.alignment_bytes;
        if rem == 0 {
            Some(end_of_allocation)
        } else {
            end_of_allocation.checked_add(self.alignment_bytes - rem)
        }
    }
}
