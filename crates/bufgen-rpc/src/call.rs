use std::sync::Arc;

use bufgen_wire::{decode_model, BuffersModel, BytesWriter};
use bytes::Bytes;
use tracing::trace;

use crate::address::MethodAddress;
use crate::dispatch::RpcDispatcher;
use crate::error::Result;

/// Delivers an encoded request to a method and returns the encoded response.
///
/// Calls block until the response is available. There is no timeout.
pub trait RpcTransport {
    fn call(&self, addr: &MethodAddress, request: Bytes) -> Result<Bytes>;
}

impl RpcTransport for RpcDispatcher {
    fn call(&self, addr: &MethodAddress, request: Bytes) -> Result<Bytes> {
        self.dispatch(addr, &request)
    }
}

impl<T: RpcTransport + ?Sized> RpcTransport for &T {
    fn call(&self, addr: &MethodAddress, request: Bytes) -> Result<Bytes> {
        (**self).call(addr, request)
    }
}

impl<T: RpcTransport + ?Sized> RpcTransport for Arc<T> {
    fn call(&self, addr: &MethodAddress, request: Bytes) -> Result<Bytes> {
        (**self).call(addr, request)
    }
}

/// Builder for one synchronous call: arguments are encoded in the order added.
///
/// ```
/// # use bufgen_rpc::{groups::RPC_SYNC, MethodAddress, RpcDispatcher, SyncCall};
/// let mut dispatcher = RpcDispatcher::new();
/// let addr = MethodAddress::new("greeter", 0);
/// dispatcher
///     .register_typed(RPC_SYNC, addr.clone(), |name: String| format!("hello {name}"))
///     .unwrap();
///
/// let greeting: String = SyncCall::new(&dispatcher, addr)
///     .arg(&"bufgen".to_string())
///     .invoke()
///     .unwrap();
/// assert_eq!(greeting, "hello bufgen");
/// ```
pub struct SyncCall<'t, T: RpcTransport + ?Sized> {
    transport: &'t T,
    addr: MethodAddress,
    request: BytesWriter,
}

impl<'t, T: RpcTransport + ?Sized> SyncCall<'t, T> {
    pub fn new(transport: &'t T, addr: MethodAddress) -> Self {
        Self {
            transport,
            addr,
            request: BytesWriter::new(),
        }
    }

    /// Encode the next argument.
    pub fn arg<A: BuffersModel>(mut self, value: &A) -> Self {
        value.write_to_buffers(&mut self.request);
        self
    }

    /// Dispatch and decode exactly one result value.
    pub fn invoke<R: BuffersModel>(self) -> Result<R> {
        let addr = self.addr.clone();
        let response = self.send()?;
        trace!(%addr, response_len = response.len(), "decoding rpc result");
        Ok(decode_model(&response)?)
    }

    /// Dispatch a method without a result; the response is not read.
    pub fn invoke_unit(self) -> Result<()> {
        self.send().map(|_| ())
    }

    fn send(self) -> Result<Bytes> {
        trace!(addr = %self.addr, request_len = self.request.len(), "sending rpc call");
        self.transport.call(&self.addr, self.request.freeze())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::RpcError;
    use crate::groups::RPC_SYNC;

    #[test]
    fn arguments_are_encoded_in_order() {
        let mut dispatcher = RpcDispatcher::new();
        let addr = MethodAddress::new("calc", 0);
        dispatcher
            .register_typed(RPC_SYNC, addr.clone(), |(a, b): (i64, i64)| a - b)
            .unwrap();

        let result: i64 = SyncCall::new(&dispatcher, addr)
            .arg(&10i64)
            .arg(&3i64)
            .invoke()
            .unwrap();
        assert_eq!(result, 7);
    }

    #[test]
    fn unit_method_returns_after_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut dispatcher = RpcDispatcher::new();
        let addr = MethodAddress::new("calc", 1);
        dispatcher
            .register(RPC_SYNC, addr.clone(), move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        let shared = Arc::new(dispatcher);
        SyncCall::new(&shared, addr).invoke_unit().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn short_response_is_a_wire_error() {
        let mut dispatcher = RpcDispatcher::new();
        let addr = MethodAddress::new("calc", 2);
        dispatcher
            .register_typed(RPC_SYNC, addr.clone(), |(): ()| 1u8)
            .unwrap();

        let result = SyncCall::new(&dispatcher, addr).invoke::<u64>();
        assert!(matches!(result, Err(RpcError::Wire(_))));
    }
}
