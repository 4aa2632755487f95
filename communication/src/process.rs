//! Byte-lane communication between threads of one process.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::{Communicator, Tag, BARRIER_TAG, MAX_MESSAGE_BYTES};

/// A lane is identified by global sender index, global receiver index, and tag.
type LaneKey = (usize, usize, Tag);

/// A freshly allocated lane whose halves have not yet been claimed by their owners.
struct LaneEntry {
    send: Option<Sender<Vec<u8>>>,
    recv: Option<Receiver<Vec<u8>>>,
}

impl LaneEntry {
    fn new() -> Self {
        let (send, recv) = channel();
        LaneEntry { send: Some(send), recv: Some(recv) }
    }
}

/// Lanes for all worker pairs, allocated lazily by whichever side touches a lane first.
type LaneMap = Arc<Mutex<HashMap<LaneKey, LaneEntry>>>;

/// A `Send`-able precursor of a worker's [`Process`] endpoint.
///
/// The built endpoint caches channel halves behind an `Rc` so that sub-communicators on the
/// same thread share them, which makes the endpoint itself not `Send`. Builders exist to
/// carry the shared lane map across the thread boundary first, in the manner of an
/// allocate-builder: move the builder, then `build` on the owning thread.
pub struct ProcessBuilder {
    index: usize,
    peers: usize,
    lanes: LaneMap,
}

impl ProcessBuilder {
    /// Allocates a vector of connected builders, one per worker.
    pub fn new_vector(peers: usize) -> Vec<ProcessBuilder> {
        let lanes: LaneMap = Arc::new(Mutex::new(HashMap::new()));
        (0..peers)
            .map(|index| ProcessBuilder { index, peers, lanes: lanes.clone() })
            .collect()
    }

    /// Completes the builder into a communicator for the whole worker group.
    pub fn build(self) -> Process {
        let members: Rc<[usize]> = (0..self.peers).collect();
        Process {
            endpoint: Rc::new(RefCell::new(Endpoint {
                index: self.index,
                lanes: self.lanes,
                sends: HashMap::new(),
                recvs: HashMap::new(),
                stash: HashMap::new(),
            })),
            members,
            rank: self.index,
        }
    }
}

/// The per-thread side of the fabric: claimed channel halves and probed-but-unread messages.
struct Endpoint {
    index: usize,
    lanes: LaneMap,
    sends: HashMap<(usize, Tag), Sender<Vec<u8>>>,
    recvs: HashMap<(usize, Tag), Receiver<Vec<u8>>>,
    stash: HashMap<(usize, Tag), VecDeque<Vec<u8>>>,
}

impl Endpoint {
    fn send(&mut self, bytes: &[u8], target: usize, tag: Tag) {
        assert!(
            bytes.len() <= MAX_MESSAGE_BYTES,
            "message of {} bytes exceeds the {} byte transfer limit",
            bytes.len(),
            MAX_MESSAGE_BYTES,
        );
        trace!(from = self.index, to = target, tag, len = bytes.len(), "send");
        let index = self.index;
        self.sends
            .entry((target, tag))
            .or_insert_with(|| {
                let mut lanes = self.lanes.lock().expect("lane map poisoned");
                let entry = lanes.entry((index, target, tag)).or_insert_with(LaneEntry::new);
                let send = entry.send.take().expect("send half already claimed");
                if entry.recv.is_none() {
                    lanes.remove(&(index, target, tag));
                }
                send
            })
            .send(bytes.to_vec())
            .expect("receiving worker hung up");
    }

    /// Blocks until a message from `source` on `tag` is stashed, then reports its length.
    fn probe(&mut self, source: usize, tag: Tag) -> usize {
        if self.stash.get(&(source, tag)).map_or(true, |queue| queue.is_empty()) {
            let message = self.fetch(source, tag);
            self.stash.entry((source, tag)).or_default().push_back(message);
        }
        self.stash[&(source, tag)].front().expect("stash refilled above").len()
    }

    fn recv(&mut self, source: usize, tag: Tag) -> Vec<u8> {
        if let Some(message) = self.stash.get_mut(&(source, tag)).and_then(|queue| queue.pop_front()) {
            return message;
        }
        self.fetch(source, tag)
    }

    /// Receives directly from the lane, claiming the receive half on first use.
    fn fetch(&mut self, source: usize, tag: Tag) -> Vec<u8> {
        let index = self.index;
        let message = self
            .recvs
            .entry((source, tag))
            .or_insert_with(|| {
                let mut lanes = self.lanes.lock().expect("lane map poisoned");
                let entry = lanes.entry((source, index, tag)).or_insert_with(LaneEntry::new);
                let recv = entry.recv.take().expect("recv half already claimed");
                if entry.send.is_none() {
                    lanes.remove(&(source, index, tag));
                }
                recv
            })
            .recv()
            .expect("sending worker hung up");
        trace!(to = self.index, from = source, tag, len = message.len(), "recv");
        message
    }
}

/// A communicator connecting the threads of one process.
///
/// Created by [`ProcessBuilder::build`], usually through
/// [`initialize`](crate::initialize()). Sub-communicators produced by
/// [`split_at`](Communicator::split_at) and [`subgroup`](Communicator::subgroup) share the
/// thread's endpoint and simply reindex into the member list, so lanes claimed under a
/// parent group keep working under its children.
pub struct Process {
    endpoint: Rc<RefCell<Endpoint>>,
    members: Rc<[usize]>,
    rank: usize,
}

impl Process {
    /// The global worker index behind a group rank.
    fn global(&self, rank: usize) -> usize {
        self.members[rank]
    }

    fn derive(&self, members: Rc<[usize]>) -> Process {
        let me = self.members[self.rank];
        let rank = members
            .iter()
            .position(|&m| m == me)
            .expect("caller is not a member of the derived group");
        Process { endpoint: self.endpoint.clone(), members, rank }
    }
}

impl Communicator for Process {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.members.len()
    }

    fn send(&mut self, bytes: &[u8], target: usize, tag: Tag) {
        let target = self.global(target);
        self.endpoint.borrow_mut().send(bytes, target, tag);
    }

    fn probe(&mut self, source: usize, tag: Tag) -> usize {
        let source = self.global(source);
        self.endpoint.borrow_mut().probe(source, tag)
    }

    fn recv(&mut self, source: usize, tag: Tag) -> Vec<u8> {
        let source = self.global(source);
        self.endpoint.borrow_mut().recv(source, tag)
    }

    /// Dissemination barrier: after `ceil(log2(size))` rounds of shifted token passing,
    /// every rank has transitively heard from every other.
    fn barrier(&mut self) {
        let size = self.size();
        let mut offset = 1;
        while offset < size {
            let to = (self.rank + offset) % size;
            let from = (self.rank + size - offset) % size;
            self.send(&[], to, BARRIER_TAG);
            let _ = self.recv(from, BARRIER_TAG);
            offset <<= 1;
        }
    }

    fn split_at(&mut self, mid: usize) -> Process {
        assert!(0 < mid && mid < self.size(), "split point {} out of bounds", mid);
        let members: Rc<[usize]> = if self.rank < mid {
            self.members[..mid].into()
        } else {
            self.members[mid..].into()
        };
        self.derive(members)
    }

    fn subgroup(&mut self, first: usize, last: usize) -> Process {
        assert!(first <= last && last < self.size(), "range {}..={} out of bounds", first, last);
        self.derive(self.members[first..=last].into())
    }
}
