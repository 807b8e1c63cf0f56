use crate::{BenchError, Op, Session};

/// Owns every matrix of a benchmark run and releases them together when dropped.
pub struct MatrixPool<'s, S: Session> {
    session: &'s S,
    buffers: Vec<S::Buffer>,
    bytes: usize,
}

impl<'s, S: Session> MatrixPool<'s, S> {
    /// Wraps the session's native allocator, keeping at most `size_hint` bytes reserved.
    pub fn new(session: &'s S, size_hint: u64) -> Result<Self, BenchError> {
        session
            .configure_allocator(size_hint)
            .map_err(BenchError::at(Op::CreateAllocator))?;
        Ok(Self {
            session,
            buffers: Vec::new(),
            bytes: 0,
        })
    }

    /// Allocates a buffer of `bytes` and returns its index.
    pub fn alloc(&mut self, bytes: usize) -> Result<usize, BenchError> {
        let buffer = self
            .session
            .alloc(bytes)
            .map_err(BenchError::at(Op::Allocate))?;
        self.buffers.push(buffer);
        self.bytes += bytes;
        Ok(self.buffers.len() - 1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Total bytes handed out.
    #[inline]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Splits the first three buffers into the GEMM operands `(a, b, c)`.
    pub fn operands(
        &mut self,
    ) -> Result<(&mut S::Buffer, &mut S::Buffer, &mut S::Buffer), BenchError> {
        match self.buffers.as_mut_slice() {
            [a, b, c, ..] => Ok((a, b, c)),
            rest => Err(BenchError::MissingOperands(rest.len())),
        }
    }
}

impl<S: Session> Drop for MatrixPool<'_, S> {
    fn drop(&mut self) {
        if !self.is_empty() {
            log::debug!("releasing {} matrices ({} bytes)", self.len(), self.bytes)
        }
    }
}
