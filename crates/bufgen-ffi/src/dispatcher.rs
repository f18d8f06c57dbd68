use std::os::raw::c_char;

use bufgen_rpc::RpcDispatcher;

use crate::args;
use crate::buffer;
use crate::error;
use crate::types::{BufgenBuffer, BufgenDispatcherHandle, BufgenResult, DispatcherHandle};

/// Hand a fully registered dispatcher to native code.
///
/// The returned handle must be released with [`bufgen_dispatcher_free`].
pub fn dispatcher_into_handle(dispatcher: RpcDispatcher) -> BufgenDispatcherHandle {
    Box::into_raw(Box::new(DispatcherHandle { dispatcher })) as BufgenDispatcherHandle
}

/// Dispatch one encoded request to the handler at `(scope, method)`.
///
/// On success `out` holds the encoded response; release it with
/// `bufgen_buffer_free`.
///
/// # Safety
/// `dispatcher` must be a handle from [`dispatcher_into_handle`]. `scope` must
/// be a valid NUL-terminated UTF-8 string. If `len > 0`, `data` must be
/// readable for `len` bytes. `out` must point to a `BufgenBuffer`.
#[no_mangle]
pub unsafe extern "C" fn bufgen_dispatcher_call(
    dispatcher: BufgenDispatcherHandle,
    scope: *const c_char,
    method: u32,
    data: *const u8,
    len: usize,
    out: *mut BufgenBuffer,
) -> BufgenResult {
    crate::ffi_boundary(BufgenResult::Internal, || {
        error::clear_error_state();

        if dispatcher.is_null() {
            return error::set_invalid_argument("dispatcher handle cannot be null");
        }
        // SAFETY: null and UTF-8 are checked by the helpers.
        let addr = match unsafe { args::method_address(scope, method) } {
            Ok(addr) => addr,
            Err(code) => return code,
        };
        // SAFETY: see above.
        let request = match unsafe { args::payload(data, len, "data") } {
            Ok(request) => request,
            Err(code) => return code,
        };
        let handle = {
            // SAFETY: Caller guarantees this handle came from dispatcher_into_handle.
            unsafe { &*(dispatcher as *mut DispatcherHandle) }
        };

        match handle.dispatcher.dispatch(&addr, request) {
            Ok(response) => buffer::write_buffer_out(out, &response),
            Err(err) => error::map_rpc_error(&err),
        }
    })
}

/// Free a dispatcher handle.
///
/// # Safety
/// `dispatcher` must be null or a handle from [`dispatcher_into_handle`].
#[no_mangle]
pub unsafe extern "C" fn bufgen_dispatcher_free(dispatcher: BufgenDispatcherHandle) {
    crate::ffi_boundary((), || {
        if dispatcher.is_null() {
            return;
        }
        // SAFETY: Caller guarantees this handle came from dispatcher_into_handle.
        unsafe {
            drop(Box::from_raw(dispatcher as *mut DispatcherHandle));
        }
    });
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use bufgen_rpc::{groups, MethodAddress};
    use bufgen_wire::{BuffersModel, BytesReader, BytesWriter};

    use super::*;

    fn echo_dispatcher() -> BufgenDispatcherHandle {
        let mut dispatcher = RpcDispatcher::new();
        dispatcher
            .register(
                groups::RPC_SYNC,
                MethodAddress::new("core", 0),
                |reader, writer| {
                    let value = i32::read_from_buffers(reader)?;
                    (value * 2).write_to_buffers(writer);
                    Ok(())
                },
            )
            .expect("register should succeed");
        dispatcher_into_handle(dispatcher)
    }

    #[test]
    fn call_round_trips_through_handle() {
        let handle = echo_dispatcher();
        let scope = CString::new("core").expect("scope should be valid");
        let mut request = BytesWriter::new();
        21i32.write_to_buffers(&mut request);
        let mut out = BufgenBuffer::default();

        // SAFETY: all pointers are valid for the duration of the call.
        let result = unsafe {
            bufgen_dispatcher_call(
                handle,
                scope.as_ptr(),
                0,
                request.as_slice().as_ptr(),
                request.len(),
                &mut out,
            )
        };
        assert_eq!(result, BufgenResult::Ok);

        // SAFETY: out was filled by bufgen_dispatcher_call.
        let response = unsafe { std::slice::from_raw_parts(out.data, out.len) };
        let mut reader = BytesReader::new(response);
        assert_eq!(reader.read_i32().expect("response should decode"), 42);

        // SAFETY: out and handle were produced by this library.
        unsafe {
            crate::bufgen_buffer_free(&mut out);
            bufgen_dispatcher_free(handle);
        }
    }

    #[test]
    fn unknown_method_maps_to_result_code() {
        let handle = echo_dispatcher();
        let scope = CString::new("core").expect("scope should be valid");
        let mut out = BufgenBuffer::default();

        // SAFETY: all pointers are valid for the duration of the call.
        let result = unsafe {
            bufgen_dispatcher_call(handle, scope.as_ptr(), 9, std::ptr::null(), 0, &mut out)
        };
        assert_eq!(result, BufgenResult::UnknownMethod);
        assert!(out.data.is_null());

        // SAFETY: handle was produced by dispatcher_into_handle.
        unsafe { bufgen_dispatcher_free(handle) };
    }

    #[test]
    fn null_handle_is_invalid() {
        let scope = CString::new("core").expect("scope should be valid");
        let mut out = BufgenBuffer::default();

        // SAFETY: a null handle is rejected before any dereference.
        let result = unsafe {
            bufgen_dispatcher_call(
                std::ptr::null_mut(),
                scope.as_ptr(),
                0,
                std::ptr::null(),
                0,
                &mut out,
            )
        };
        assert_eq!(result, BufgenResult::InvalidArgument);
    }
}
