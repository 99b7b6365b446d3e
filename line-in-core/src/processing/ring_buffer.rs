/// Fixed-capacity circular buffer.
///
/// Not synchronized; wrap in `Arc<parking_lot::Mutex<RingBuffer<T>>>` for
/// cross-thread access.
///
/// Overflow behavior: drops oldest elements.
#[derive(Debug)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![T::default(); capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Write elements into the ring buffer.
    ///
    /// Returns how many previously buffered (or incoming) elements were
    /// dropped to make room.
    pub fn write(&mut self, items: &[T]) -> usize {
        if items.is_empty() {
            return 0;
        }

        let mut dropped = 0;

        // If more data than capacity, only keep the tail
        let items = if items.len() > self.capacity {
            dropped += items.len() - self.capacity;
            &items[items.len() - self.capacity..]
        } else {
            items
        };

        let overflow = (self.available + items.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
            dropped += overflow;
        }

        for &item in items {
            self.buffer[self.write_index] = item;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += items.len();
        dropped
    }

    /// Move up to `out.len()` elements into `out`, returning how many were copied.
    pub fn read_into(&mut self, out: &mut [T]) -> usize {
        let to_read = out.len().min(self.available);
        for (i, slot) in out.iter_mut().take(to_read).enumerate() {
            *slot = self.buffer[(self.read_index + i) % self.capacity];
        }
        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        to_read
    }

    /// Read and remove up to `count` elements.
    pub fn read(&mut self, count: usize) -> Vec<T> {
        let mut result = vec![T::default(); count.min(self.available)];
        self.read_into(&mut result);
        result
    }

    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
