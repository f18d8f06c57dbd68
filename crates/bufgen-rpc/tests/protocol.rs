use std::sync::Arc;
use std::thread;

use bufgen_rpc::groups::{RPC_READ, RPC_SYNC};
use bufgen_rpc::{
    channel_transport, MethodAddress, RpcDispatcher, SignalResult, StreamHub, SyncCall,
    STATUS_NEW_DATA,
};
use bufgen_wire::BytesWriter;

const SCOPE: &str = "723ca727-6a66-43a7-bfcc-b8ad94eac9be";

#[test]
fn zero_argument_sync_method_returns_string() {
    let mut dispatcher = RpcDispatcher::new();
    let hello = MethodAddress::new(SCOPE, 0);
    dispatcher
        .register_typed(RPC_SYNC, hello.clone(), |(): ()| "Hello World!".to_string())
        .expect("registration should succeed");

    let (transport, responder) = channel_transport();
    let server = thread::spawn(move || responder.serve(&dispatcher));

    let reply: String = SyncCall::new(&transport, hello)
        .invoke()
        .expect("call should succeed");
    assert_eq!(reply, "Hello World!");

    drop(transport);
    assert_eq!(server.join().expect("server thread should finish"), 1);
}

#[test]
fn stream_late_subscriber_sees_latest_push() {
    let hub = Arc::new(StreamHub::new());
    let counter = MethodAddress::new(SCOPE, 1);
    hub.register::<i32>(counter.clone())
        .expect("registration should succeed");

    for value in [1, 2] {
        let mut frame = BytesWriter::new();
        SignalResult::Data(value).write_frame(&mut frame);
        assert_eq!(frame.as_slice()[0], STATUS_NEW_DATA);
        hub.push_frame(&counter, frame.as_slice())
            .expect("push should succeed");
    }

    let late = hub
        .subscribe::<i32>(&counter)
        .expect("subscribe should succeed");
    assert_eq!(late.try_recv(), Some(2));
}

#[test]
fn read_method_producer_feeds_hub_through_dispatcher() {
    let hub = Arc::new(StreamHub::new());
    let theme = MethodAddress::new(SCOPE, 2);
    hub.register::<String>(theme.clone()).unwrap();
    let sub = hub.subscribe::<String>(&theme).unwrap();

    // The producer answers with a status-prefixed frame; the consumer pushes it.
    let mut dispatcher = RpcDispatcher::new();
    let mut round = 0u32;
    let rounds = std::sync::Mutex::new(0u32);
    dispatcher
        .register(RPC_READ, theme.clone(), move |_, writer| {
            let mut n = rounds.lock().unwrap();
            *n += 1;
            let result = if *n % 2 == 1 {
                SignalResult::Data(format!("theme-{n}"))
            } else {
                SignalResult::NoData
            };
            result.write_frame(writer);
            Ok(())
        })
        .unwrap();

    for _ in 0..3 {
        round += 1;
        let frame = dispatcher.dispatch(&theme, &[]).unwrap();
        let had_data = hub.push_frame(&theme, &frame).unwrap();
        assert_eq!(had_data, round % 2 == 1);
    }

    let got: Vec<String> = sub.pending().collect();
    assert_eq!(got, vec!["theme-1", "theme-3"]);
}
