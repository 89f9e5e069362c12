//! Append-only id buffer with a geometric growth policy.

const KB: usize = 1024;
const MB: usize = 1024 * KB;
const WORD: usize = size_of::<u64>();

/// Initial size in bytes for a requested size: `4 * clamp(requested, 4KB, 16KB)`.
pub fn initial_size(requested: usize) -> usize {
    round_to_word(4 * requested.clamp(4 * KB, 16 * KB))
}

/// Next size in bytes: doubles below 16MB, grows by half above.
pub fn next_size(current: usize) -> usize {
    let size = if current > 16 * MB {
        current + current / 2
    } else {
        current * 2
    };
    round_to_word(size)
}

fn round_to_word(size: usize) -> usize {
    size - size % WORD
}

#[derive(Debug, Clone)]
pub struct GrowableBuffer {
    data: Vec<u64>,
    count: usize,
}

impl GrowableBuffer {
    /// Creates a buffer sized for roughly `requested` bytes.
    pub fn new(requested: usize) -> GrowableBuffer {
        GrowableBuffer {
            data: vec![0; initial_size(requested) / WORD],
            count: 0,
        }
    }

    /// Free space to write into, grown first when less than 1/16 of the capacity
    /// is left. Written ids are committed with [`GrowableBuffer::add_usage`].
    pub fn space(&mut self) -> &mut [u64] {
        let free = self.data.len() - self.count;
        if free < self.data.len() / 16 || free == 0 {
            self.grow();
        }
        &mut self.data[self.count..]
    }

    pub fn add_usage(&mut self, count: usize) {
        debug_assert!(self.count + count <= self.data.len());
        self.count += count;
    }

    pub fn results(&self) -> &[u64] {
        &self.data[..self.count]
    }

    pub fn results_mut(&mut self) -> &mut [u64] {
        &mut self.data[..self.count]
    }

    /// Drops the ids past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.count = self.count.min(len);
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Capacity in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.data.len() * WORD
    }

    fn grow(&mut self) {
        let size = next_size(self.size_in_bytes());
        log::debug!(
            "growing id buffer from {} to {size} bytes",
            self.size_in_bytes()
        );
        self.data.resize(size / WORD, 0);
    }
}
