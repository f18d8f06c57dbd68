use std::ffi::c_void;
use std::sync::Arc;

use bufgen_rpc::{RpcDispatcher, StreamHub};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufgenResult {
    Ok = 0,
    InvalidArgument = 1,
    UnknownMethod = 2,
    WireError = 3,
    StreamTypeMismatch = 4,
    Disconnected = 5,
    AlreadyRegistered = 6,
    UnknownOpcode = 7,
    Internal = 99,
}

#[allow(dead_code)]
pub const BUFGEN_OK: BufgenResult = BufgenResult::Ok;
#[allow(dead_code)]
pub const BUFGEN_ERR_INVALID_ARGUMENT: BufgenResult = BufgenResult::InvalidArgument;
#[allow(dead_code)]
pub const BUFGEN_ERR_UNKNOWN_METHOD: BufgenResult = BufgenResult::UnknownMethod;
#[allow(dead_code)]
pub const BUFGEN_ERR_WIRE: BufgenResult = BufgenResult::WireError;
#[allow(dead_code)]
pub const BUFGEN_ERR_STREAM_TYPE_MISMATCH: BufgenResult = BufgenResult::StreamTypeMismatch;
#[allow(dead_code)]
pub const BUFGEN_ERR_DISCONNECTED: BufgenResult = BufgenResult::Disconnected;
#[allow(dead_code)]
pub const BUFGEN_ERR_ALREADY_REGISTERED: BufgenResult = BufgenResult::AlreadyRegistered;
#[allow(dead_code)]
pub const BUFGEN_ERR_UNKNOWN_OPCODE: BufgenResult = BufgenResult::UnknownOpcode;
#[allow(dead_code)]
pub const BUFGEN_ERR_INTERNAL: BufgenResult = BufgenResult::Internal;

/// Library-owned byte buffer. Release with `bufgen_buffer_free`.
#[repr(C)]
#[derive(Debug)]
pub struct BufgenBuffer {
    pub data: *mut u8,
    pub len: usize,
}

impl Default for BufgenBuffer {
    fn default() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
        }
    }
}

pub type BufgenDispatcherHandle = *mut c_void;
pub type BufgenStreamHubHandle = *mut c_void;

pub(crate) struct DispatcherHandle {
    pub(crate) dispatcher: RpcDispatcher,
}

pub(crate) struct StreamHubHandle {
    pub(crate) hub: Arc<StreamHub>,
}
