//! Retained input for the incremental binary parser

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// Ordered chunks received but not yet consumed.
///
/// `active`/`offset` mark the read cursor for the message being parsed;
/// consumed chunks stay in place until [`ChunkQueue::compact`] so a message
/// boundary is the only point where the front of the queue moves.
#[derive(Debug, Default)]
pub(crate) struct ChunkQueue {
    chunks: VecDeque<Bytes>,
    active: usize,
    offset: usize,
    remaining: usize,
}

impl ChunkQueue {
    /// Append a non-empty chunk.
    pub(crate) fn push(&mut self, chunk: Bytes) {
        debug_assert!(!chunk.is_empty(), "empty chunks are filtered by the caller");
        self.remaining += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Unconsumed bytes past the cursor.
    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }

    /// Take the next `size` bytes, or `None` if not enough are retained.
    ///
    /// A span inside one chunk is a zero-copy slice of it; a span that
    /// crosses chunks is copied into a fresh buffer.
    pub(crate) fn take(&mut self, size: usize) -> Option<Bytes> {
        if self.remaining < size {
            return None;
        }
        if size == 0 {
            return Some(Bytes::new());
        }
        self.remaining -= size;

        let head = &self.chunks[self.active];
        if head.len() - self.offset >= size {
            let span = head.slice(self.offset..self.offset + size);
            self.advance(size);
            return Some(span);
        }

        let mut span = BytesMut::with_capacity(size);
        let mut needed = size;
        while needed > 0 {
            let chunk = &self.chunks[self.active];
            let step = (chunk.len() - self.offset).min(needed);
            span.extend_from_slice(&chunk[self.offset..self.offset + step]);
            needed -= step;
            self.advance(step);
        }
        Some(span.freeze())
    }

    fn advance(&mut self, step: usize) {
        self.offset += step;
        if self.offset == self.chunks[self.active].len() {
            self.active += 1;
            self.offset = 0;
        }
    }

    /// Drop everything before the cursor.
    pub(crate) fn compact(&mut self) {
        self.chunks.drain(..self.active);
        self.active = 0;
        if self.offset != 0 {
            if let Some(front) = self.chunks.front_mut() {
                *front = front.slice(self.offset..);
            }
            self.offset = 0;
        }
    }

    /// Number of chunks still held, consumed or not.
    pub(crate) fn len(&self) -> usize {
        self.chunks.len()
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(chunks: &[&'static [u8]]) -> ChunkQueue {
        let mut queue = ChunkQueue::default();
        for chunk in chunks {
            queue.push(Bytes::from_static(chunk));
        }
        queue
    }

    #[test]
    fn test_take_within_chunk_is_a_view() {
        let source = Bytes::from_static(b"abcdef");
        let mut queue = ChunkQueue::default();
        queue.push(source.clone());

        let span = queue.take(4).unwrap();
        assert_eq!(span.as_ref(), b"abcd");
        assert_eq!(span.as_ptr(), source.as_ptr());
        assert_eq!(queue.remaining(), 2);
    }

    #[test]
    fn test_take_across_chunks() {
        let mut queue = queue(&[b"ab", b"c", b"defg"]);
        assert_eq!(queue.take(1).unwrap().as_ref(), b"a");
        assert_eq!(queue.take(4).unwrap().as_ref(), b"bcde");
        assert_eq!(queue.take(2).unwrap().as_ref(), b"fg");
        assert_eq!(queue.remaining(), 0);
        assert!(queue.take(1).is_none());
    }

    #[test]
    fn test_take_insufficient_leaves_cursor() {
        let mut queue = queue(&[b"ab", b"c"]);
        assert!(queue.take(4).is_none());
        assert_eq!(queue.remaining(), 3);
        assert_eq!(queue.take(3).unwrap().as_ref(), b"abc");
    }

    #[test]
    fn test_compact() {
        let mut queue = queue(&[b"ab", b"cde"]);
        queue.take(3).unwrap();
        queue.compact();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take(2).unwrap().as_ref(), b"de");
        queue.compact();
        assert_eq!(queue.len(), 0);
    }
}
