use std::ffi::CStr;
use std::os::raw::c_char;

use bufgen_rpc::MethodAddress;

use crate::error;
use crate::types::BufgenResult;

/// Build a method address from a C scope string and a method id.
///
/// # Safety
/// `scope` must be null or point to a NUL-terminated C string.
pub(crate) unsafe fn method_address(
    scope: *const c_char,
    method: u32,
) -> Result<MethodAddress, BufgenResult> {
    if scope.is_null() {
        return Err(error::set_invalid_argument("scope cannot be null"));
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    let scope = unsafe { CStr::from_ptr(scope) };
    let scope = scope
        .to_str()
        .map_err(|_| error::set_invalid_argument("scope must be valid UTF-8"))?;
    if scope.is_empty() {
        return Err(error::set_invalid_argument("scope cannot be empty"));
    }
    Ok(MethodAddress::new(scope, method))
}

/// Borrow an encoded payload. An empty payload may be passed as null.
///
/// # Safety
/// When `len > 0`, `data` must be readable for `len` bytes for the whole call.
pub(crate) unsafe fn payload<'a>(
    data: *const u8,
    len: usize,
    name: &str,
) -> Result<&'a [u8], BufgenResult> {
    match (data.is_null(), len) {
        (_, 0) => Ok(&[]),
        (true, _) => Err(error::set_invalid_argument(format!(
            "{name} is null but {len} bytes were declared"
        ))),
        // SAFETY: non-null with a caller-guaranteed readable length.
        (false, _) => Ok(unsafe { std::slice::from_raw_parts(data, len) }),
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    #[test]
    fn empty_scope_is_rejected() {
        let scope = CString::new("").expect("scope should be valid");
        // SAFETY: scope is a valid C string.
        let result = unsafe { method_address(scope.as_ptr(), 0) };
        assert_eq!(result.err(), Some(BufgenResult::InvalidArgument));
    }

    #[test]
    fn null_payload_needs_zero_length() {
        // SAFETY: a null pointer with len 0 is never dereferenced.
        let empty = unsafe { payload(std::ptr::null(), 0, "data") };
        assert_eq!(empty.expect("empty payload should be accepted"), &[] as &[u8]);

        // SAFETY: a null pointer with len > 0 is rejected before use.
        let err = unsafe { payload(std::ptr::null(), 4, "data") };
        assert_eq!(err.err(), Some(BufgenResult::InvalidArgument));
    }
}
