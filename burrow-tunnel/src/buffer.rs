/// Growable byte buffer shared by the send queue and the receive scratch.
///
/// Writes go through `reserve` + `advance`; reads come off the head via
/// `consume`. Head compaction happens only when the buffer drains, so
/// slices handed out during one codec step stay in place.
#[derive(Debug, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
    head: usize,
    filled: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contiguous writable space of `extra` bytes at the tail.
    pub fn reserve(&mut self, extra: usize) -> &mut [u8] {
        if self.data.len() < self.filled + extra {
            self.data.resize(self.filled + extra, 0);
        }
        &mut self.data[self.filled..self.filled + extra]
    }

    /// Commit `count` bytes previously written into reserved space.
    pub fn advance(&mut self, count: usize) {
        debug_assert!(self.filled + count <= self.data.len());
        self.filled += count;
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len()).copy_from_slice(bytes);
        self.advance(bytes.len());
    }

    pub fn data(&self) -> &[u8] {
        &self.data[self.head..self.filled]
    }

    /// Readable view extended `extra` bytes past the committed tail; used
    /// to scan peeked bytes that have not been consumed from the socket.
    pub fn preview(&self, extra: usize) -> &[u8] {
        debug_assert!(self.filled + extra <= self.data.len());
        &self.data[self.head..self.filled + extra]
    }

    pub fn len(&self) -> usize {
        self.filled - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.filled
    }

    /// Drop `count` bytes from the head.
    pub fn consume(&mut self, count: usize) {
        debug_assert!(count <= self.len());
        self.head += count;
        if self.head == self.filled {
            self.head = 0;
            self.filled = 0;
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.filled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::ByteBuffer;

    #[test]
    fn appends_and_reads_back() {
        let mut buffer = ByteBuffer::new();
        buffer.append(b"abc");
        buffer.append(b"def");
        assert_eq!(buffer.data(), b"abcdef");
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn consumes_from_the_head() {
        let mut buffer = ByteBuffer::new();
        buffer.append(b"abcdef");
        buffer.consume(2);
        assert_eq!(buffer.data(), b"cdef");

        buffer.consume(4);
        assert!(buffer.is_empty());

        // compacted after draining; new writes start at the front
        buffer.append(b"xy");
        assert_eq!(buffer.data(), b"xy");
    }

    #[test]
    fn reserve_then_advance_commits_written_bytes() {
        let mut buffer = ByteBuffer::new();
        let space = buffer.reserve(4);
        space[..3].copy_from_slice(b"abc");
        buffer.advance(3);
        assert_eq!(buffer.data(), b"abc");

        // uncommitted reserved space is visible through preview only
        let space = buffer.reserve(2);
        space.copy_from_slice(b"de");
        assert_eq!(buffer.data(), b"abc");
        assert_eq!(buffer.preview(2), b"abcde");
    }
}
