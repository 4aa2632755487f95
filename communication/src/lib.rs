//! A small message-passing fabric for tightly coupled SPMD computations.
//!
//! This crate is part of the cubesort distributed string sorter, and provides the
//! communication substrate the sorting engine runs on. It is separated out mostly to keep a
//! clear boundary in the project: the engine only ever talks to the [`Communicator`] trait,
//! so it can be driven by anything that moves byte buffers between ranks.
//!
//! The provided implementation, [`Process`], connects worker threads within one OS process.
//! Workers are spawned with [`initialize`], which hands each worker its own communicator.
//! Point-to-point messages are uninterpreted byte blobs addressed by `(rank, tag)`; each
//! `(sender, receiver, tag)` lane is FIFO. Collectives (barriers, group splits) are built on
//! top of the point-to-point layer.
//!
//! # Examples
//! ```
//! use cubesort_communication::{initialize, Communicator, Configuration};
//!
//! // configure for two workers, just one process.
//! let config = Configuration::Process(2);
//!
//! // initializes communication, spawns workers
//! let guards = initialize(config, |mut comm| {
//!     let partner = 1 - comm.rank();
//!     let greeting = format!("hello, {}", partner);
//!
//!     // swap greetings with the partner; tag 7 is ours alone.
//!     let reply = comm.sendrecv(greeting.as_bytes(), partner, 7);
//!     comm.barrier();
//!
//!     String::from_utf8(reply).unwrap()
//! });
//!
//! // computation runs until guards are joined or dropped.
//! for reply in guards.unwrap().join() {
//!     assert!(reply.unwrap().starts_with("hello"));
//! }
//! ```

#![forbid(missing_docs)]

pub mod initialize;
pub mod process;

pub use initialize::{initialize, initialize_from, Configuration, InitError, WorkerGuards};
pub use process::{Process, ProcessBuilder};

/// A message tag, distinguishing independent streams between the same pair of ranks.
///
/// The largest tag value is reserved for the fabric's own collectives; user streams should
/// stay well below it. Callers that run several exchanges between the same pair must keep
/// their tags distinct or strictly serialize the exchanges.
pub type Tag = u32;

/// The tag reserved for barrier traffic.
pub const BARRIER_TAG: Tag = Tag::MAX;

/// The largest number of bytes a single message may carry.
///
/// Mirrors the element-count limit of interconnect APIs whose counts are signed 32-bit
/// integers. Larger transfers must be chunked by the caller; the fabric refuses them.
pub const MAX_MESSAGE_BYTES: usize = i32::MAX as usize;

/// A handle to a group of cooperating ranks, with point-to-point and collective operations.
///
/// A communicator identifies both the group and the caller's position in it: `rank` is in
/// `0 .. size`. Sub-groups are carved out with [`split_at`](Communicator::split_at) and
/// [`subgroup`](Communicator::subgroup); the returned communicators are owned values that
/// share the underlying endpoint, so a worker can hold the parent and child group at once.
///
/// All ranks of a group must observe the same sequence of collectives; a mismatched barrier
/// or a reused tag deadlocks the group, and there is deliberately no recovery from that.
pub trait Communicator: Sized {
    /// The caller's rank out of `(0..self.size())`.
    fn rank(&self) -> usize;

    /// The number of ranks in the group.
    fn size(&self) -> usize;

    /// Sends `bytes` to `target` on `tag`. Does not block on the receiver.
    fn send(&mut self, bytes: &[u8], target: usize, tag: Tag);

    /// Blocks until a message from `source` on `tag` is available and returns its length
    /// in bytes, without consuming the message.
    fn probe(&mut self, source: usize, tag: Tag) -> usize;

    /// Receives the next message from `source` on `tag`, blocking until one arrives.
    fn recv(&mut self, source: usize, tag: Tag) -> Vec<u8>;

    /// Sends `bytes` to `partner` and receives the partner's message on the same tag.
    ///
    /// Both ranks of the pair must call this (or a matching send/recv sequence); the send
    /// completes without waiting for the partner, so the symmetric call cannot deadlock.
    fn sendrecv(&mut self, bytes: &[u8], partner: usize, tag: Tag) -> Vec<u8> {
        self.send(bytes, partner, tag);
        self.recv(partner, tag)
    }

    /// Blocks until every rank of the group has entered the barrier.
    fn barrier(&mut self);

    /// Splits the group at `mid`: ranks `0 .. mid` form one sub-group, ranks `mid ..` the
    /// other. Returns the sub-group containing the caller, with ranks renumbered from 0.
    fn split_at(&mut self, mid: usize) -> Self;

    /// Returns the sub-group of ranks `first ..= last`, renumbered from 0.
    ///
    /// The caller must be a member of the range.
    fn subgroup(&mut self, first: usize, last: usize) -> Self;
}
