use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use bufgen_rpc::RpcError;

use crate::types::BufgenResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> BufgenResult {
    set_error_message(message);
    BufgenResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_rpc_error(err: &RpcError) -> BufgenResult {
    set_error_message(err.to_string());
    match err {
        RpcError::UnknownMethod(_) => BufgenResult::UnknownMethod,
        RpcError::UnknownOpcode(_) => BufgenResult::UnknownOpcode,
        RpcError::Wire(_) => BufgenResult::WireError,
        RpcError::StreamTypeMismatch { .. } => BufgenResult::StreamTypeMismatch,
        RpcError::Disconnected(_) => BufgenResult::Disconnected,
        RpcError::AlreadyRegistered(_) => BufgenResult::AlreadyRegistered,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
