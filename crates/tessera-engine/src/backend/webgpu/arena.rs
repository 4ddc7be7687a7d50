//! Per-frame bump allocator over one GPU buffer.
//!
//! `queue.write_buffer` is staged until the next submit, so every pass that needs distinct
//! data within a frame gets its own aligned slice instead of overwriting a shared buffer.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Placement {
    At(u64),
    Grow(u64),
}

/// Where `len` bytes go given the current cursor, or the capacity to grow to.
fn place(cursor: u64, len: u64, alignment: u64, capacity: u64) -> Placement {
    let offset = cursor.next_multiple_of(alignment);
    if offset + len <= capacity {
        Placement::At(offset)
    } else {
        Placement::Grow((capacity * 2).max(len.next_multiple_of(alignment)))
    }
}

pub(super) struct FrameArena {
    label: &'static str,
    usage: wgpu::BufferUsages,
    alignment: u64,
    buffer: wgpu::Buffer,
    capacity: u64,
    cursor: u64,
}

impl FrameArena {
    pub(super) fn new(
        device: &wgpu::Device,
        label: &'static str,
        usage: wgpu::BufferUsages,
        capacity: u64,
        alignment: u64,
    ) -> Self {
        let alignment = alignment.max(wgpu::COPY_BUFFER_ALIGNMENT);
        let capacity = capacity.next_multiple_of(alignment);
        Self {
            label,
            usage,
            alignment,
            buffer: Self::allocate(device, label, usage, capacity),
            capacity,
            cursor: 0,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &'static str,
        usage: wgpu::BufferUsages,
        size: u64,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Starts a new frame; earlier slices stay valid until the frame's submit.
    pub(super) fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Writes `bytes` into a fresh slice and returns its byte offset.
    ///
    /// Growing swaps in a larger buffer; commands already encoded keep the old one alive.
    pub(super) fn push(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) -> u64 {
        let len = (bytes.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let offset = match place(self.cursor, len, self.alignment, self.capacity) {
            Placement::At(offset) => offset,
            Placement::Grow(capacity) => {
                log::debug!("{}: growing {} -> {capacity} bytes", self.label, self.capacity);
                self.buffer = Self::allocate(device, self.label, self.usage, capacity);
                self.capacity = capacity;
                0
            }
        };

        if bytes.len() as u64 == len {
            queue.write_buffer(&self.buffer, offset, bytes);
        } else {
            let mut padded = bytes.to_vec();
            padded.resize(len as usize, 0);
            queue.write_buffer(&self.buffer, offset, &padded);
        }
        self.cursor = offset + len;
        offset
    }

    #[inline]
    pub(super) fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_are_aligned() {
        assert_eq!(place(0, 48, 256, 1024), Placement::At(0));
        assert_eq!(place(48, 48, 256, 1024), Placement::At(256));
        assert_eq!(place(256, 16, 4, 1024), Placement::At(256));
    }

    #[test]
    fn overflow_doubles_capacity() {
        assert_eq!(place(768, 48, 256, 1024), Placement::At(768));
        assert_eq!(place(800, 48, 256, 1024), Placement::Grow(2048));
    }

    #[test]
    fn oversized_write_grows_to_fit() {
        assert_eq!(place(0, 5000, 256, 1024), Placement::Grow(5120));
    }
}
