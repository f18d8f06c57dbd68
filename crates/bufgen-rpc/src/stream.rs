//! Push-driven streams with a last-value cache.
//!
//! A [`StreamHub`] holds one typed slot per `(scope, method)` address. Pushing
//! an encoded payload decodes it with the registered type, caches it as the
//! current value and fans it out, in push order, to every live subscriber.
//! Subscribers attaching late observe the cached value first.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::{mpsc, Mutex, MutexGuard, PoisonError};

use bufgen_wire::{BuffersModel, BytesReader, BytesWriter, WireError};
use tracing::{debug, trace, warn};

use crate::address::MethodAddress;
use crate::error::{Result, RpcError};

/// Frame status byte: a payload follows.
pub const STATUS_NEW_DATA: u8 = 0xFF;

/// Frame status byte: the producer had nothing new.
pub const STATUS_NO_DATA: u8 = 0x00;

/// Values that can flow through a stream.
pub trait StreamValue: BuffersModel + Clone + Send + 'static {}

impl<T: BuffersModel + Clone + Send + 'static> StreamValue for T {}

/// Producer result: a value to publish, or nothing this round.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalResult<T> {
    Data(T),
    NoData,
}

impl<T> SignalResult<T> {
    pub fn has_new_data(&self) -> bool {
        matches!(self, SignalResult::Data(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            SignalResult::Data(value) => Some(value),
            SignalResult::NoData => None,
        }
    }
}

impl<T: BuffersModel> SignalResult<T> {
    /// Append the status byte and, for `Data`, the payload.
    pub fn write_frame(&self, writer: &mut BytesWriter) {
        match self {
            SignalResult::Data(value) => {
                writer.write_u8(STATUS_NEW_DATA);
                value.write_to_buffers(writer);
            }
            SignalResult::NoData => writer.write_u8(STATUS_NO_DATA),
        }
    }
}

impl<T> From<Option<T>> for SignalResult<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(SignalResult::NoData, SignalResult::Data)
    }
}

enum Sink<T> {
    Blocking(mpsc::Sender<T>),
    #[cfg(feature = "async")]
    Async(tokio::sync::mpsc::UnboundedSender<T>),
}

impl<T> Sink<T> {
    /// False once the receiving side is gone.
    fn send(&self, value: T) -> bool {
        match self {
            Sink::Blocking(tx) => tx.send(value).is_ok(),
            #[cfg(feature = "async")]
            Sink::Async(tx) => tx.send(value).is_ok(),
        }
    }
}

struct TypedSlot<T> {
    current: Option<T>,
    sinks: Vec<Sink<T>>,
}

impl<T: Clone> TypedSlot<T> {
    fn publish(&mut self, addr: &MethodAddress, value: T) {
        let before = self.sinks.len();
        self.sinks.retain(|sink| sink.send(value.clone()));
        let dropped = before - self.sinks.len();
        if dropped > 0 {
            warn!(%addr, dropped, "removed disconnected stream subscribers");
        }
        self.current = Some(value);
    }

    fn attach(&mut self, sink: Sink<T>) {
        if let Some(current) = &self.current {
            if !sink.send(current.clone()) {
                return;
            }
        }
        self.sinks.push(sink);
    }
}

trait Slot: Send {
    fn push(&mut self, addr: &MethodAddress, reader: &mut BytesReader<'_>) -> Result<()>;
    fn value_type(&self) -> &'static str;
    fn subscriber_count(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: StreamValue> Slot for TypedSlot<T> {
    fn push(&mut self, addr: &MethodAddress, reader: &mut BytesReader<'_>) -> Result<()> {
        let value = T::read_from_buffers(reader)?;
        self.publish(addr, value);
        Ok(())
    }

    fn value_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn subscriber_count(&self) -> usize {
        self.sinks.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

type Slots = HashMap<MethodAddress, Box<dyn Slot>>;

/// Explicit container for every stream of a runtime.
///
/// `Send + Sync`; share it behind an `Arc` between producers and consumers.
#[derive(Default)]
pub struct StreamHub {
    slots: Mutex<Slots>,
}

impl fmt::Debug for StreamHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHub")
            .field("streams", &self.lock().len())
            .finish()
    }
}

impl StreamHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a stream carrying values of type `T`.
    pub fn register<T: StreamValue>(&self, addr: MethodAddress) -> Result<()> {
        let mut slots = self.lock();
        if slots.contains_key(&addr) {
            return Err(RpcError::AlreadyRegistered(format!("stream {addr}")));
        }
        debug!(%addr, value_type = type_name::<T>(), "registered stream");
        slots.insert(
            addr,
            Box::new(TypedSlot::<T> {
                current: None,
                sinks: Vec::new(),
            }),
        );
        Ok(())
    }

    pub fn is_registered(&self, addr: &MethodAddress) -> bool {
        self.lock().contains_key(addr)
    }

    /// Decode `payload` with the registered type and publish it.
    ///
    /// A payload that fails to decode is not cached and not delivered.
    pub fn push(&self, addr: &MethodAddress, payload: &[u8]) -> Result<()> {
        let mut slots = self.lock();
        let slot = slots
            .get_mut(addr)
            .ok_or_else(|| RpcError::UnknownMethod(addr.clone()))?;
        trace!(%addr, payload_len = payload.len(), "stream push");
        slot.push(addr, &mut BytesReader::new(payload))
    }

    /// Push a status-prefixed frame. Returns whether it carried data.
    pub fn push_frame(&self, addr: &MethodAddress, frame: &[u8]) -> Result<bool> {
        let mut reader = BytesReader::new(frame);
        match reader.read_u8()? {
            STATUS_NEW_DATA => {
                self.push(addr, reader.rest())?;
                Ok(true)
            }
            STATUS_NO_DATA => {
                trace!(%addr, "stream frame without data");
                Ok(false)
            }
            status => Err(WireError::InvalidFrameStatus(status).into()),
        }
    }

    /// Publish an already-decoded value from an in-process producer.
    pub fn publish<T: StreamValue>(&self, addr: &MethodAddress, value: T) -> Result<()> {
        let mut slots = self.lock();
        typed_slot::<T>(&mut slots, addr)?.publish(addr, value);
        Ok(())
    }

    /// Publish a producer result; `NoData` leaves the stream untouched.
    pub fn publish_signal<T: StreamValue>(
        &self,
        addr: &MethodAddress,
        result: SignalResult<T>,
    ) -> Result<bool> {
        match result {
            SignalResult::Data(value) => self.publish(addr, value).map(|()| true),
            SignalResult::NoData => Ok(false),
        }
    }

    /// Attach a subscriber. It first observes the cached value, if any.
    pub fn subscribe<T: StreamValue>(&self, addr: &MethodAddress) -> Result<Subscription<T>> {
        let (tx, rx) = mpsc::channel();
        let mut slots = self.lock();
        typed_slot::<T>(&mut slots, addr)?.attach(Sink::Blocking(tx));
        Ok(Subscription {
            addr: addr.clone(),
            rx,
        })
    }

    /// Attach an async subscriber backed by an unbounded tokio channel.
    #[cfg(feature = "async")]
    pub fn subscribe_async<T: StreamValue>(
        &self,
        addr: &MethodAddress,
    ) -> Result<tokio::sync::mpsc::UnboundedReceiver<T>> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut slots = self.lock();
        typed_slot::<T>(&mut slots, addr)?.attach(Sink::Async(tx));
        Ok(rx)
    }

    /// Last published value, if any.
    pub fn current<T: StreamValue>(&self, addr: &MethodAddress) -> Result<Option<T>> {
        let mut slots = self.lock();
        Ok(typed_slot::<T>(&mut slots, addr)?.current.clone())
    }

    pub fn subscriber_count(&self, addr: &MethodAddress) -> usize {
        self.lock()
            .get(addr)
            .map_or(0, |slot| slot.subscriber_count())
    }

    /// Remove a stream. Its subscribers observe disconnection.
    pub fn teardown(&self, addr: &MethodAddress) -> bool {
        let removed = self.lock().remove(addr).is_some();
        if removed {
            debug!(%addr, "tore down stream");
        }
        removed
    }

    /// Remove every stream.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn typed_slot<'a, T: StreamValue>(
    slots: &'a mut Slots,
    addr: &MethodAddress,
) -> Result<&'a mut TypedSlot<T>> {
    let slot = slots
        .get_mut(addr)
        .ok_or_else(|| RpcError::UnknownMethod(addr.clone()))?;
    let registered = slot.value_type();
    slot.as_any_mut()
        .downcast_mut::<TypedSlot<T>>()
        .ok_or_else(|| RpcError::StreamTypeMismatch {
            addr: addr.clone(),
            registered,
            requested: type_name::<T>(),
        })
}

/// Receiving end of one stream subscription.
pub struct Subscription<T> {
    addr: MethodAddress,
    rx: mpsc::Receiver<T>,
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("addr", &self.addr)
            .finish()
    }
}

impl<T> Subscription<T> {
    pub fn addr(&self) -> &MethodAddress {
        &self.addr
    }

    /// Block for the next value. Fails once the stream is torn down and drained.
    pub fn recv(&self) -> Result<T> {
        self.rx
            .recv()
            .map_err(|_| RpcError::Disconnected(format!("stream {} torn down", self.addr)))
    }

    /// Next queued value, without blocking.
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drain every queued value and return the newest.
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }

    /// Iterator over queued values, without blocking.
    pub fn pending(&self) -> mpsc::TryIter<'_, T> {
        self.rx.try_iter()
    }
}
