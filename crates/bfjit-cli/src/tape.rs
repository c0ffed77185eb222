//! Tape construction, grounded on `original_source`'s `Memory::Tape`:
//! one contiguous buffer spanning `sizeLeft + sizeRight` bytes, with the
//! entry point's starting pointer sitting at the `sizeLeft` boundary.
//! Simplified to a single heap allocation; the source's calloc/mmap
//! size-tiering is a memory-management optimization out of scope here.

use std::os::raw::c_void;

use crate::config::TapeBounds;

pub struct Tape {
    buffer: Vec<u8>,
    left: usize,
}

impl Tape {
    pub fn new(bounds: TapeBounds) -> Self {
        let left = bounds.left as usize;
        let right = bounds.right as usize;
        Tape {
            buffer: vec![0u8; left + right],
            left,
        }
    }

    /// The pointer a compiled entry point should receive: `left` bytes into
    /// the buffer, matching `Tape::start` in the source.
    pub fn start_ptr(&mut self) -> *mut c_void {
        unsafe { self.buffer.as_mut_ptr().add(self.left) as *mut c_void }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_ptr_sits_at_the_left_boundary() {
        let mut tape = Tape::new(TapeBounds { left: 16, right: 16 });
        let base = tape.buffer.as_ptr();
        let start = tape.start_ptr();
        assert_eq!(start as usize - base as usize, 16);
    }
}
