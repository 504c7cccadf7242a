//! # Bounded packet channels
//!
//! Pipeline stages are wired by bounded FIFO channels carrying [`Packet`]
//! values. A full channel blocks the producer, which is the pipeline's
//! backpressure point; an empty channel blocks the consumer. The
//! end-of-stream sentinel is a first-class variant rather than an in-band
//! null, and [`PacketSender::finish`] consumes the sender so the sentinel is
//! always the last packet a channel carries.

use anyhow::{anyhow, Result};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

/// Element type carried by pipeline channels.
pub enum Packet<T> {
    /// A data message.
    Data(T),
    /// No more messages will follow on this channel.
    EndOfStream,
}

/// Sending half of a packet channel.
pub struct PacketSender<T>(SyncSender<Packet<T>>);

/// Receiving half of a packet channel.
pub struct PacketReceiver<T>(Receiver<Packet<T>>);

/// Create a bounded FIFO packet channel.
///
/// # Arguments
///
/// * `capacity` - number of packets the channel buffers before senders block.
pub fn bounded<T>(capacity: usize) -> (PacketSender<T>, PacketReceiver<T>) {
    let (tx, rx) = sync_channel(capacity);
    (PacketSender(tx), PacketReceiver(rx))
}

impl<T> PacketSender<T> {
    /// Send one data packet, blocking while the channel is full.
    ///
    /// Fails when the receiving half is gone; senders treat that as a stop
    /// signal rather than an error worth reporting.
    pub fn send(&self, msg: T) -> Result<()> {
        self.0
            .send(Packet::Data(msg))
            .map_err(|_| anyhow!("channel receiver disconnected"))
    }

    /// Emit the end-of-stream sentinel.
    ///
    /// Consumes the sender, so the sentinel can be emitted at most once and
    /// no data packet can follow it. A disconnected receiver is ignored: it
    /// has already stopped on its own.
    pub fn finish(self) {
        let _ = self.0.send(Packet::EndOfStream);
    }
}

impl<T> PacketReceiver<T> {
    /// Receive the next packet, blocking while the channel is empty.
    ///
    /// Fails when the sending half hung up without a sentinel.
    pub fn recv(&self) -> Result<Packet<T>> {
        self.0
            .recv()
            .map_err(|_| anyhow!("channel sender disconnected"))
    }
}
