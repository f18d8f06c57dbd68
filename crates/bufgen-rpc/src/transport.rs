//! Blocking request/response over std channels.
//!
//! [`channel_transport`] returns a caller half implementing [`RpcTransport`]
//! and a responder half that serves requests against an [`RpcDispatcher`] on
//! whatever thread the owner chooses.

use std::sync::mpsc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::address::MethodAddress;
use crate::call::RpcTransport;
use crate::dispatch::RpcDispatcher;
use crate::error::{Result, RpcError};

struct Request {
    addr: MethodAddress,
    payload: Bytes,
    reply: mpsc::Sender<Result<Bytes>>,
}

/// Caller half of a channel transport. Cloneable; each clone blocks per call.
#[derive(Clone)]
pub struct ChannelTransport {
    requests: mpsc::Sender<Request>,
}

/// Responder half of a channel transport.
pub struct Responder {
    requests: mpsc::Receiver<Request>,
}

/// Create a connected transport/responder pair.
pub fn channel_transport() -> (ChannelTransport, Responder) {
    let (tx, rx) = mpsc::channel();
    (
        ChannelTransport { requests: tx },
        Responder { requests: rx },
    )
}

impl RpcTransport for ChannelTransport {
    fn call(&self, addr: &MethodAddress, request: Bytes) -> Result<Bytes> {
        let (reply, response) = mpsc::channel();
        self.requests
            .send(Request {
                addr: addr.clone(),
                payload: request,
                reply,
            })
            .map_err(|_| RpcError::Disconnected("responder dropped".to_string()))?;
        response
            .recv()
            .map_err(|_| RpcError::Disconnected(format!("no response for {addr}")))?
    }
}

impl Responder {
    /// Serve one request. Returns `false` once every transport is dropped.
    pub fn serve_one(&self, dispatcher: &RpcDispatcher) -> bool {
        match self.requests.recv() {
            Ok(request) => {
                self.answer(dispatcher, request);
                true
            }
            Err(_) => false,
        }
    }

    /// Serve requests until every transport is dropped; returns the count served.
    pub fn serve(&self, dispatcher: &RpcDispatcher) -> usize {
        let mut served = 0;
        while self.serve_one(dispatcher) {
            served += 1;
        }
        debug!(served, "channel transport closed");
        served
    }

    /// Serve whatever is queued without blocking; returns the count served.
    pub fn drain(&self, dispatcher: &RpcDispatcher) -> usize {
        let mut served = 0;
        while let Ok(request) = self.requests.try_recv() {
            self.answer(dispatcher, request);
            served += 1;
        }
        served
    }

    fn answer(&self, dispatcher: &RpcDispatcher, request: Request) {
        trace!(addr = %request.addr, "answering channel request");
        let response = dispatcher.dispatch(&request.addr, &request.payload);
        // A caller that gave up is not an error for the responder.
        let _ = request.reply.send(response);
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::call::SyncCall;
    use crate::groups::RPC_SYNC;

    fn dispatcher() -> RpcDispatcher {
        let mut dispatcher = RpcDispatcher::new();
        dispatcher
            .register_typed(RPC_SYNC, MethodAddress::new("echo", 0), |text: String| {
                text.to_uppercase()
            })
            .unwrap();
        dispatcher
    }

    #[test]
    fn call_blocks_until_responder_answers() {
        let (transport, responder) = channel_transport();
        let server = thread::spawn(move || responder.serve(&dispatcher()));

        let reply: String = SyncCall::new(&transport, MethodAddress::new("echo", 0))
            .arg(&"ping".to_string())
            .invoke()
            .expect("call should succeed");
        assert_eq!(reply, "PING");

        drop(transport);
        assert_eq!(server.join().expect("server thread should finish"), 1);
    }

    #[test]
    fn handler_errors_travel_back_to_caller() {
        let (transport, responder) = channel_transport();
        let server = thread::spawn(move || responder.serve(&dispatcher()));

        let err = SyncCall::new(&transport, MethodAddress::new("echo", 9))
            .invoke::<String>()
            .unwrap_err();
        assert_eq!(err, RpcError::UnknownMethod(MethodAddress::new("echo", 9)));

        drop(transport);
        server.join().expect("server thread should finish");
    }

    #[test]
    fn dropped_responder_disconnects_caller() {
        let (transport, responder) = channel_transport();
        drop(responder);

        let err = SyncCall::new(&transport, MethodAddress::new("echo", 0))
            .invoke_unit()
            .unwrap_err();
        assert!(matches!(err, RpcError::Disconnected(_)));
    }

    #[test]
    fn drain_serves_queued_requests_only() {
        let (_transport, responder) = channel_transport();
        assert_eq!(responder.drain(&dispatcher()), 0);
    }
}
