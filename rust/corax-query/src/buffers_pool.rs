use std::{
    ops::{Deref, DerefMut},
    sync::{LazyLock, Mutex, PoisonError},
};

/// Scratch buffers of ids used by intersections and unions.
pub static ID_POOL: LazyLock<BuffersPool<u64>> = LazyLock::new(BuffersPool::new);

/// Scratch buffers of bytes used for decoded keys.
pub static BYTE_POOL: LazyLock<BuffersPool<u8>> = LazyLock::new(BuffersPool::new);

/// Largest size class kept, as a power of two. Bigger buffers are freed on return.
const MAX_CLASS: usize = 26;

/// Buffers retained per size class.
const MAX_PER_CLASS: usize = 16;

/// Pool of scratch buffers keyed by power-of-two size class.
///
/// Buffers handed out by [`BuffersPool::get_buffer`] go back to the pool when the
/// returned [`BufferPoolRef`] is dropped, including on early returns and `?`.
pub struct BuffersPool<T> {
    classes: Mutex<Vec<Vec<Vec<T>>>>,
}

impl<T: Copy + Default> BuffersPool<T> {
    pub fn new() -> Self {
        BuffersPool {
            classes: Mutex::new((0..=MAX_CLASS).map(|_| Vec::new()).collect()),
        }
    }

    /// Borrows a buffer of exactly `len` default-initialized elements.
    pub fn get_buffer(&self, len: usize) -> BufferPoolRef<'_, T> {
        let class = size_class(len);
        let pooled = if class <= MAX_CLASS {
            self.lock()[class].pop()
        } else {
            None
        };
        let mut buffer = pooled.unwrap_or_else(|| {
            log::debug!("scratch pool miss for {len} elements (class {class})");
            Vec::with_capacity(1 << class.min(usize::BITS as usize - 1))
        });
        buffer.resize(len, T::default());
        BufferPoolRef { pool: self, buffer }
    }

    /// Number of buffers currently held by the pool.
    pub fn pooled(&self) -> usize {
        self.lock().iter().map(Vec::len).sum()
    }

    fn return_buffer(&self, mut buffer: Vec<T>) {
        if buffer.capacity() == 0 {
            return;
        }
        // Filed under the largest class it can hold in full.
        let class = (usize::BITS - 1 - buffer.capacity().leading_zeros()) as usize;
        if class > MAX_CLASS {
            return;
        }
        buffer.clear();
        let mut classes = self.lock();
        if classes[class].len() < MAX_PER_CLASS {
            classes[class].push(buffer);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<Vec<T>>>> {
        self.classes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Copy + Default> Default for BuffersPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn size_class(len: usize) -> usize {
    len.max(1).next_power_of_two().trailing_zeros() as usize
}

/// A buffer borrowed from a [`BuffersPool`].
pub struct BufferPoolRef<'a, T: Copy + Default> {
    pool: &'a BuffersPool<T>,
    buffer: Vec<T>,
}

impl<T: Copy + Default> Deref for BufferPoolRef<'_, T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl<T: Copy + Default> DerefMut for BufferPoolRef<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl<T: Copy + Default> Drop for BufferPoolRef<'_, T> {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        self.pool.return_buffer(buffer);
    }
}
