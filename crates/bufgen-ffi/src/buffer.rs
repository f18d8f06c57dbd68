use std::ptr;

use crate::error;
use crate::types::{BufgenBuffer, BufgenResult};

/// Replace the contents of `out` with a library-owned copy of `payload`.
pub(crate) fn write_buffer_out(out: *mut BufgenBuffer, payload: &[u8]) -> BufgenResult {
    if out.is_null() {
        return error::set_invalid_argument("out cannot be null");
    }

    let buffer = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *out }
    };
    release(buffer);

    let boxed: Box<[u8]> = payload.to_vec().into_boxed_slice();
    let len = boxed.len();
    buffer.data = if len == 0 {
        ptr::null_mut()
    } else {
        Box::into_raw(boxed) as *mut u8
    };
    buffer.len = len;
    BufgenResult::Ok
}

fn release(buffer: &mut BufgenBuffer) {
    if !buffer.data.is_null() {
        let slice_ptr = ptr::slice_from_raw_parts_mut(buffer.data, buffer.len);
        // SAFETY: Non-null `data` was allocated as `Box<[u8]>` by `write_buffer_out`.
        unsafe {
            drop(Box::from_raw(slice_ptr));
        }
    }
    *buffer = BufgenBuffer::default();
}

/// Free memory held by a [`BufgenBuffer`] filled by this library.
///
/// # Safety
/// `buffer` must be null or a valid pointer to a `BufgenBuffer`. If
/// `buffer->data` is non-null, it must have originated from this library.
#[no_mangle]
pub unsafe extern "C" fn bufgen_buffer_free(buffer: *mut BufgenBuffer) {
    crate::ffi_boundary((), || {
        if buffer.is_null() {
            return;
        }
        let buffer = {
            // SAFETY: Pointer validity is guaranteed by the caller.
            unsafe { &mut *buffer }
        };
        release(buffer);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_free_resets_buffer() {
        let mut buffer = BufgenBuffer::default();
        assert_eq!(write_buffer_out(&mut buffer, &[1, 2, 3]), BufgenResult::Ok);
        assert_eq!(buffer.len, 3);

        // SAFETY: data/len were produced by write_buffer_out above.
        let copy = unsafe { std::slice::from_raw_parts(buffer.data, buffer.len) };
        assert_eq!(copy, &[1, 2, 3]);

        // Overwriting releases the previous payload.
        assert_eq!(write_buffer_out(&mut buffer, &[]), BufgenResult::Ok);
        assert!(buffer.data.is_null());

        // SAFETY: buffer is a valid, library-filled BufgenBuffer.
        unsafe { bufgen_buffer_free(&mut buffer) };
        assert_eq!(buffer.len, 0);
    }

    #[test]
    fn null_out_is_invalid() {
        assert_eq!(
            write_buffer_out(ptr::null_mut(), &[1]),
            BufgenResult::InvalidArgument
        );
    }
}
