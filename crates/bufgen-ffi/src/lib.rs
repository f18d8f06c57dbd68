//! bufgen-ffi: C-ABI exports for the bufgen RPC dispatcher and stream hub.
//!
//! Rust code registers generated handlers and stream types, then hands the
//! dispatcher or hub to native code as an opaque handle. Native code drives
//! calls and pushes stream frames through the functions below; every failure
//! returns a [`BufgenResult`] code with details in [`bufgen_last_error`].

mod args;
mod buffer;
mod dispatcher;
mod error;
mod stream;
mod types;

use std::panic::AssertUnwindSafe;

pub use buffer::bufgen_buffer_free;
pub use dispatcher::{bufgen_dispatcher_call, bufgen_dispatcher_free, dispatcher_into_handle};
pub use stream::{
    bufgen_stream_hub_free, bufgen_stream_hub_new, bufgen_stream_push, stream_hub_into_handle,
};
pub use types::{
    BufgenBuffer, BufgenDispatcherHandle, BufgenResult, BufgenStreamHubHandle,
    BUFGEN_ERR_ALREADY_REGISTERED, BUFGEN_ERR_DISCONNECTED, BUFGEN_ERR_INTERNAL,
    BUFGEN_ERR_INVALID_ARGUMENT, BUFGEN_ERR_STREAM_TYPE_MISMATCH, BUFGEN_ERR_UNKNOWN_METHOD,
    BUFGEN_ERR_UNKNOWN_OPCODE, BUFGEN_ERR_WIRE, BUFGEN_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn bufgen_init() -> BufgenResult {
    ffi_boundary(BufgenResult::Internal, || {
        error::clear_error_state();
        BufgenResult::Ok
    })
}

#[no_mangle]
pub extern "C" fn bufgen_cleanup() {
    ffi_boundary((), || {
        error::clear_error_state();
    });
}

/// Message of the last failed call on this thread; empty when none.
#[no_mangle]
pub extern "C" fn bufgen_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

#[cfg(test)]
mod tests {
    use std::ffi::{CStr, CString};

    use super::*;

    fn last_error() -> String {
        let ptr = bufgen_last_error();
        assert!(!ptr.is_null());
        // SAFETY: bufgen_last_error returns a pointer to a thread-local CString.
        unsafe { CStr::from_ptr(ptr) }
            .to_str()
            .expect("last error should be UTF-8")
            .to_string()
    }

    #[test]
    fn init_and_cleanup_are_ok() {
        assert_eq!(bufgen_init(), BufgenResult::Ok);
        bufgen_cleanup();
        assert!(last_error().is_empty());
    }

    #[test]
    fn failures_set_last_error() {
        let handle = bufgen_stream_hub_new();
        let mut out = BufgenBuffer::default();

        // SAFETY: a null handle is rejected before any dereference.
        let result = unsafe {
            bufgen_dispatcher_call(
                std::ptr::null_mut(),
                std::ptr::null(),
                0,
                std::ptr::null(),
                0,
                &mut out,
            )
        };
        assert_eq!(result, BUFGEN_ERR_INVALID_ARGUMENT);
        assert_eq!(last_error(), "dispatcher handle cannot be null");

        let scope = CString::new("core").expect("scope should be valid");
        // SAFETY: all pointers are valid; the frame is empty.
        let result = unsafe {
            bufgen_stream_push(handle, scope.as_ptr(), 0, std::ptr::null(), 0, std::ptr::null_mut())
        };
        assert_eq!(result, BUFGEN_ERR_WIRE);
        assert!(last_error().contains("wire error"));

        bufgen_cleanup();
        assert!(last_error().is_empty());
        // SAFETY: handle was produced by bufgen_stream_hub_new.
        unsafe { bufgen_stream_hub_free(handle) };
    }
}
