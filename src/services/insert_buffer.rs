/// Accumulates pending insert rows until a batch is ready to flush.
///
/// Batching bounds memory and transaction size; it carries no ordering or
/// correctness meaning of its own.
#[derive(Debug)]
pub struct InsertBuffer<T> {
    rows: Vec<T>,
    batch_size: usize,
}

impl<T> InsertBuffer<T> {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            rows: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    pub fn push(&mut self, row: T) {
        self.rows.push(row);
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, rows: I) {
        self.rows.extend(rows);
    }

    /// True once the buffer holds at least one full batch
    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Hand over the buffered rows and leave the buffer empty
    pub fn take(&mut self) -> Vec<T> {
        std::mem::replace(&mut self.rows, Vec::with_capacity(self.batch_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_at_batch_size() {
        let mut buffer = InsertBuffer::new(3);
        buffer.push(1);
        buffer.push(2);
        assert!(!buffer.is_full());

        buffer.push(3);
        assert!(buffer.is_full());

        assert_eq!(buffer.take(), vec![1, 2, 3]);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
    }

    #[test]
    fn test_extend_can_overshoot() {
        let mut buffer = InsertBuffer::new(4);
        buffer.extend(0..10);

        assert!(buffer.is_full());
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.take().len(), 10);
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let mut buffer = InsertBuffer::new(0);
        assert!(!buffer.is_full());
        buffer.push("row");
        assert!(buffer.is_full());
    }
}
