use std::collections::BTreeMap;
use std::fmt;

use bufgen_wire::{BuffersModel, BytesReader, BytesWriter};
use bytes::Bytes;
use tracing::{debug, trace};

use crate::address::MethodAddress;
use crate::error::{Result, RpcError};
use crate::groups::{group_name, GroupAddress};

type Handler = Box<dyn Fn(&mut BytesReader<'_>, &mut BytesWriter) -> Result<()> + Send + Sync>;

struct Registration {
    group: GroupAddress,
    handler: Handler,
}

/// Server-side method table.
///
/// Populated once through `&mut self`, then shared immutably (e.g. behind an
/// `Arc`) by every caller.
#[derive(Default)]
pub struct RpcDispatcher {
    methods: BTreeMap<MethodAddress, Registration>,
}

impl fmt::Debug for RpcDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcDispatcher")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RpcDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw handler that reads the request and writes the response.
    pub fn register<F>(&mut self, group: GroupAddress, addr: MethodAddress, handler: F) -> Result<()>
    where
        F: Fn(&mut BytesReader<'_>, &mut BytesWriter) -> Result<()> + Send + Sync + 'static,
    {
        if self.methods.contains_key(&addr) {
            return Err(RpcError::AlreadyRegistered(format!("method {addr}")));
        }
        debug!(%addr, group = group_name(group), "registered rpc method");
        self.methods.insert(
            addr,
            Registration {
                group,
                handler: Box::new(handler),
            },
        );
        Ok(())
    }

    /// Register a handler over a decoded argument value and an encoded result.
    ///
    /// Use `()` for methods without arguments or without a result.
    pub fn register_typed<A, R, F>(
        &mut self,
        group: GroupAddress,
        addr: MethodAddress,
        handler: F,
    ) -> Result<()>
    where
        A: BuffersModel,
        R: BuffersModel,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.register(group, addr, move |reader, writer| {
            let args = A::read_from_buffers(reader)?;
            handler(args).write_to_buffers(writer);
            Ok(())
        })
    }

    /// Run the handler at `addr` over `request` and return its response bytes.
    pub fn dispatch(&self, addr: &MethodAddress, request: &[u8]) -> Result<Bytes> {
        let registration = self
            .methods
            .get(addr)
            .ok_or_else(|| RpcError::UnknownMethod(addr.clone()))?;
        trace!(%addr, request_len = request.len(), "dispatching rpc call");

        let mut reader = BytesReader::new(request);
        let mut writer = BytesWriter::new();
        (registration.handler)(&mut reader, &mut writer)?;
        Ok(writer.freeze())
    }

    pub fn contains(&self, addr: &MethodAddress) -> bool {
        self.methods.contains_key(addr)
    }

    pub fn group_of(&self, addr: &MethodAddress) -> Option<GroupAddress> {
        self.methods.get(addr).map(|registration| registration.group)
    }

    /// Registered addresses in `group`, in address order.
    pub fn methods_in_group(&self, group: GroupAddress) -> impl Iterator<Item = &MethodAddress> {
        self.methods
            .iter()
            .filter(move |(_, registration)| registration.group == group)
            .map(|(addr, _)| addr)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{RPC, RPC_SYNC};
    use bufgen_wire::decode_model;

    #[test]
    fn typed_handler_round_trip() {
        let mut dispatcher = RpcDispatcher::new();
        let addr = MethodAddress::new("math", 0);
        dispatcher
            .register_typed(RPC_SYNC, addr.clone(), |(a, b): (i32, i32)| a + b)
            .expect("registration should succeed");

        let mut request = BytesWriter::new();
        request.write_i32(40);
        request.write_i32(2);

        let response = dispatcher
            .dispatch(&addr, request.as_slice())
            .expect("dispatch should succeed");
        assert_eq!(decode_model::<i32>(&response).unwrap(), 42);
    }

    #[test]
    fn unknown_method_is_reported() {
        let dispatcher = RpcDispatcher::new();
        let addr = MethodAddress::new("math", 7);
        assert_eq!(
            dispatcher.dispatch(&addr, &[]).unwrap_err(),
            RpcError::UnknownMethod(addr)
        );
    }

    #[test]
    fn truncated_request_fails_without_response() {
        let mut dispatcher = RpcDispatcher::new();
        let addr = MethodAddress::new("math", 0);
        dispatcher
            .register_typed(RPC_SYNC, addr.clone(), |n: u64| n)
            .unwrap();

        assert!(matches!(
            dispatcher.dispatch(&addr, &[1, 2, 3]),
            Err(RpcError::Wire(_))
        ));
    }

    #[test]
    fn groups_are_tracked_per_method() {
        let mut dispatcher = RpcDispatcher::new();
        dispatcher
            .register_typed(RPC_SYNC, MethodAddress::new("s", 0), |(): ()| ())
            .unwrap();
        dispatcher
            .register_typed(RPC, MethodAddress::new("s", 1), |(): ()| ())
            .unwrap();

        assert!(dispatcher
            .register_typed(RPC, MethodAddress::new("s", 1), |(): ()| ())
            .is_err());
        assert_eq!(dispatcher.group_of(&MethodAddress::new("s", 1)), Some(RPC));
        let sync: Vec<_> = dispatcher.methods_in_group(RPC_SYNC).collect();
        assert_eq!(sync, vec![&MethodAddress::new("s", 0)]);
    }
}
