use std::os::raw::c_char;
use std::sync::Arc;

use bufgen_rpc::StreamHub;

use crate::args;
use crate::error;
use crate::types::{BufgenResult, BufgenStreamHubHandle, StreamHubHandle};

/// Share a stream hub with native producers.
///
/// Rust keeps its own clone of `hub` to register stream types and subscribe;
/// native code pushes frames through the handle. Release the handle with
/// [`bufgen_stream_hub_free`].
pub fn stream_hub_into_handle(hub: Arc<StreamHub>) -> BufgenStreamHubHandle {
    Box::into_raw(Box::new(StreamHubHandle { hub })) as BufgenStreamHubHandle
}

/// Create an empty stream hub.
#[no_mangle]
pub extern "C" fn bufgen_stream_hub_new() -> BufgenStreamHubHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();
        stream_hub_into_handle(Arc::new(StreamHub::new()))
    })
}

/// Push one status-prefixed stream frame to `(scope, method)`.
///
/// `out_has_data`, when non-null, receives whether the frame carried a value.
///
/// # Safety
/// `hub` must be a handle from this library. `scope` must be a valid
/// NUL-terminated UTF-8 string. If `len > 0`, `frame` must be readable for
/// `len` bytes. `out_has_data` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn bufgen_stream_push(
    hub: BufgenStreamHubHandle,
    scope: *const c_char,
    method: u32,
    frame: *const u8,
    len: usize,
    out_has_data: *mut bool,
) -> BufgenResult {
    crate::ffi_boundary(BufgenResult::Internal, || {
        error::clear_error_state();

        if hub.is_null() {
            return error::set_invalid_argument("stream hub handle cannot be null");
        }
        // SAFETY: null and UTF-8 are checked by the helpers.
        let addr = match unsafe { args::method_address(scope, method) } {
            Ok(addr) => addr,
            Err(code) => return code,
        };
        // SAFETY: see above.
        let frame = match unsafe { args::payload(frame, len, "frame") } {
            Ok(frame) => frame,
            Err(code) => return code,
        };
        let handle = {
            // SAFETY: Caller guarantees this handle came from this library.
            unsafe { &*(hub as *mut StreamHubHandle) }
        };

        match handle.hub.push_frame(&addr, frame) {
            Ok(has_data) => {
                if !out_has_data.is_null() {
                    // SAFETY: Caller guarantees a non-null `out_has_data` is writable.
                    unsafe { *out_has_data = has_data };
                }
                BufgenResult::Ok
            }
            Err(err) => error::map_rpc_error(&err),
        }
    })
}

/// Free a stream hub handle. Streams stay alive while Rust holds the hub.
///
/// # Safety
/// `hub` must be null or a handle from this library.
#[no_mangle]
pub unsafe extern "C" fn bufgen_stream_hub_free(hub: BufgenStreamHubHandle) {
    crate::ffi_boundary((), || {
        if hub.is_null() {
            return;
        }
        // SAFETY: Caller guarantees this handle came from this library.
        unsafe {
            drop(Box::from_raw(hub as *mut StreamHubHandle));
        }
    });
}
