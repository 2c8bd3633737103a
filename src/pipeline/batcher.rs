// batcher.rs - fixed-size contiguous batches

pub struct Batcher {
    pub batch_size: usize,
}

impl Batcher {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Contiguous runs of at most `batch_size`; only the last may be shorter.
    pub fn split<'a, T>(&self, items: &'a [T]) -> Vec<&'a [T]> {
        items.chunks(self.batch_size).collect()
    }

    pub fn batch_count(&self, len: usize) -> usize {
        len.div_ceil(self.batch_size)
    }
}
