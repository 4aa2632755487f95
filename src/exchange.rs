//! The wire-format twin of a string buffer, and its pairwise exchange patterns.
//!
//! A payload is what travels between ranks: the concatenated terminated strings as one
//! uninterpreted blob, and, when origins are tracked, a companion stream of packed
//! little-endian origins on the next tag up. The two streams complete independently, but
//! every operation here returns only once both have.

use cubesort_communication::{Communicator, Tag};

use crate::buffer::{StringBuffer, View};
use crate::compare::Origin;

/// Strings in transit: a byte blob plus the companion origin sequence.
///
/// The origin vector is empty in untracked mode and exactly one element per string
/// otherwise; [`into_buffer`](Payload::into_buffer) re-derives the view table on arrival.
#[derive(Debug)]
pub struct Payload<O: Origin> {
    /// Concatenated zero-terminated strings.
    pub bytes: Vec<u8>,
    /// One origin per string, in blob order; empty when origins are untracked.
    pub origins: Vec<O>,
}

impl<O: Origin> Default for Payload<O> {
    fn default() -> Self {
        Payload::new()
    }
}

impl<O: Origin> Payload<O> {
    /// An empty payload.
    pub fn new() -> Self {
        Payload { bytes: Vec::new(), origins: Vec::new() }
    }

    /// Appends one string; `content` must not contain zero bytes.
    pub fn push_str(&mut self, content: &[u8], origin: O) {
        assert!(!content.contains(&0), "string content may not contain zero bytes");
        self.bytes.extend_from_slice(content);
        self.bytes.push(0);
        if O::TRACKED {
            self.origins.push(origin);
        }
    }

    /// Copies the given views of a buffer, in order.
    pub fn from_views(buffer: &StringBuffer<O>, views: &[View<O>]) -> Self {
        let chars: usize = views.iter().map(|view| view.len() + 1).sum();
        let mut payload = Payload {
            bytes: Vec::with_capacity(chars),
            origins: Vec::with_capacity(if O::TRACKED { views.len() } else { 0 }),
        };
        for view in views {
            let entry = buffer.entry(view);
            payload.bytes.extend_from_slice(entry.chars);
            if O::TRACKED {
                payload.origins.push(entry.origin);
            }
        }
        payload
    }

    /// Copies a whole buffer.
    pub fn from_buffer(buffer: &StringBuffer<O>) -> Self {
        Payload::from_views(buffer, buffer.strings())
    }

    /// `true` iff no strings are carried.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Appends another payload's strings after this one's.
    pub fn append(&mut self, mut other: Payload<O>) {
        self.bytes.append(&mut other.bytes);
        self.origins.append(&mut other.origins);
    }

    /// Ensures capacity for `factor` times the current contents, so that the exchanges of
    /// the next few recursion levels append without reallocating.
    pub fn reserve_scaled(&mut self, factor: usize) {
        let chars = self.bytes.len() * factor;
        if chars > self.bytes.capacity() {
            let len = self.bytes.len();
            self.bytes.reserve(chars - len);
        }
        let strings = self.origins.len() * factor;
        if strings > self.origins.capacity() {
            let len = self.origins.len();
            self.origins.reserve(strings - len);
        }
    }

    /// Parses the blob into an owned string buffer, consuming the payload.
    pub fn into_buffer(self) -> StringBuffer<O> {
        if O::TRACKED {
            StringBuffer::with_origins(self.bytes, self.origins)
        } else {
            StringBuffer::from_blob(self.bytes)
        }
    }

    /// Swaps payloads with `partner`: sends this one, returns the partner's.
    ///
    /// Both ranks must call this with matching tags. The origin stream travels on
    /// `tag + 1`.
    pub fn exchange<G: Communicator>(&self, comm: &mut G, partner: usize, tag: Tag) -> Payload<O> {
        let bytes = comm.sendrecv(&self.bytes, partner, tag);
        let origins = if O::TRACKED {
            O::unpack(&comm.sendrecv(&O::pack(&self.origins), partner, tag + 1))
        } else {
            Vec::new()
        };
        Payload { bytes, origins }
    }

    /// Sends this payload to `target`.
    pub fn send<G: Communicator>(&self, comm: &mut G, target: usize, tag: Tag) {
        comm.send(&self.bytes, target, tag);
        if O::TRACKED {
            comm.send(&O::pack(&self.origins), target, tag + 1);
        }
    }

    /// Receives a payload from `source`.
    pub fn recv<G: Communicator>(comm: &mut G, source: usize, tag: Tag) -> Payload<O> {
        let count = comm.probe(source, tag);
        let bytes = comm.recv(source, tag);
        debug_assert!(bytes.len() == count);
        let origins =
            if O::TRACKED { O::unpack(&comm.recv(source, tag + 1)) } else { Vec::new() };
        Payload { bytes, origins }
    }

    /// Receives from `source` and appends, growing capacity ahead of the strings still to
    /// come at later levels.
    pub fn recv_append<G: Communicator>(&mut self, comm: &mut G, source: usize, tag: Tag) {
        let count = comm.probe(source, tag);
        let want = 2 * (self.bytes.len() + count);
        if want > self.bytes.capacity() {
            let len = self.bytes.len();
            self.bytes.reserve(want - len);
        }
        self.bytes.extend_from_slice(&comm.recv(source, tag));
        if O::TRACKED {
            let origins = O::unpack(&comm.recv(source, tag + 1));
            let want = 2 * (self.origins.len() + origins.len());
            if want > self.origins.capacity() {
                let len = self.origins.len();
                self.origins.reserve(want - len);
            }
            self.origins.extend_from_slice(&origins);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cubesort_communication::{initialize, Configuration};

    #[test]
    fn roundtrips_through_a_buffer() {
        let mut payload = Payload::<u64>::new();
        payload.push_str(b"oak", 4);
        payload.push_str(b"", 9);
        payload.push_str(b"elm", 2);
        let buffer = payload.into_buffer();
        assert_eq!(buffer.size(), 3);
        let pairs: Vec<(Vec<u8>, u64)> =
            buffer.entries().map(|entry| (entry.content().to_vec(), entry.origin)).collect();
        assert_eq!(pairs, [(b"oak".to_vec(), 4), (Vec::new(), 9), (b"elm".to_vec(), 2)]);
    }

    #[test]
    fn views_select_a_subset() {
        let mut payload = Payload::<()>::new();
        for word in [&b"ash"[..], &b"birch"[..], &b"cedar"[..]] {
            payload.push_str(word, ());
        }
        let buffer = payload.into_buffer();
        let middle = Payload::from_views(&buffer, &buffer.strings()[1..2]);
        assert_eq!(middle.bytes, b"birch\0");
    }

    #[test]
    fn exchange_carries_both_streams() {
        let guards = initialize(Configuration::Process(2), |mut comm| {
            let mut mine = Payload::<u64>::new();
            mine.push_str(format!("from-{}", comm.rank()).as_bytes(), comm.rank() as u64);
            let partner = 1 - comm.rank();
            let theirs = mine.exchange(&mut comm, partner, 40);
            (theirs.bytes, theirs.origins)
        })
        .unwrap();
        let results: Vec<_> = guards.join().into_iter().map(Result::unwrap).collect();
        assert_eq!(results[0], (b"from-1\0".to_vec(), vec![1]));
        assert_eq!(results[1], (b"from-0\0".to_vec(), vec![0]));
    }

    #[test]
    fn append_receives_in_order() {
        let guards = initialize(Configuration::Process(2), |mut comm| {
            if comm.rank() == 1 {
                let mut exiled = Payload::<u64>::new();
                exiled.push_str(b"late", 7);
                exiled.send(&mut comm, 0, 50);
                Vec::new()
            } else {
                let mut mine = Payload::<u64>::new();
                mine.push_str(b"early", 3);
                mine.recv_append(&mut comm, 1, 50);
                mine.into_buffer().entries().map(|entry| entry.origin).collect()
            }
        })
        .unwrap();
        let results: Vec<_> = guards.join().into_iter().map(Result::unwrap).collect();
        assert_eq!(results[0], vec![3, 7]);
    }
}
