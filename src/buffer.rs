//! Contiguous storage for zero-terminated strings and the view table derived from it.

use crate::compare::Origin;

/// A reference into a [`StringBuffer`]: byte offset, content length, and origin payload.
///
/// The content length excludes the terminator; the byte at `start + len` is always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct View<O> {
    pub(crate) start: usize,
    pub(crate) len: usize,
    pub(crate) origin: O,
}

impl<O: Copy> View<O> {
    /// The content length in bytes, excluding the terminator.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` iff the string is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The origin payload.
    pub fn origin(&self) -> O {
        self.origin
    }
}

/// A view resolved against its storage: the terminated bytes plus the origin payload.
///
/// Entries are what comparators and merges operate on; they stay valid while the buffer
/// they were resolved from is alive, and being plain slices they can reference two
/// different buffers in one merge.
#[derive(Clone, Copy, Debug)]
pub struct Entry<'a, O> {
    /// The string's bytes including the trailing terminator.
    pub chars: &'a [u8],
    /// The origin payload.
    pub origin: O,
}

/// The terminated empty string, used as the placeholder entry.
const EMPTY_CHARS: &[u8] = &[0];

impl<'a, O: Origin> Entry<'a, O> {
    /// The string's content, without the terminator.
    #[inline]
    pub fn content(&self) -> &'a [u8] {
        &self.chars[..self.chars.len() - 1]
    }

    /// The content length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len() - 1
    }

    /// `true` iff the string is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a, O: Origin> Default for Entry<'a, O> {
    fn default() -> Self {
        Entry { chars: EMPTY_CHARS, origin: O::default() }
    }
}

/// An owned sequence of zero-terminated strings with a derived, separately orderable view
/// table.
///
/// Invariants: every stored string ends in a single zero byte and contains no interior
/// zeros; the view table references each stored string exactly once. The views may be
/// permuted (that is what sorting does) while the bytes stay put; [`update`] replaces both
/// wholesale and invalidates any previously resolved entries.
///
/// [`update`]: StringBuffer::update
pub struct StringBuffer<O: Origin> {
    bytes: Vec<u8>,
    views: Vec<View<O>>,
}

impl<O: Origin> Default for StringBuffer<O> {
    fn default() -> Self {
        StringBuffer::new()
    }
}

impl<O: Origin> StringBuffer<O> {
    /// An empty buffer.
    pub fn new() -> Self {
        StringBuffer { bytes: Vec::new(), views: Vec::new() }
    }

    /// Builds a buffer from a received byte blob, parsing the terminator positions.
    ///
    /// Origins are defaulted; use [`with_origins`](StringBuffer::with_origins) when they
    /// travel alongside the bytes.
    pub fn from_blob(bytes: Vec<u8>) -> Self {
        let views = parse(&bytes, None);
        StringBuffer { bytes, views }
    }

    /// Builds a buffer from a byte blob and its companion origin sequence.
    ///
    /// When origins are tracked there must be exactly one per stored string.
    pub fn with_origins(bytes: Vec<u8>, origins: Vec<O>) -> Self {
        let views = parse(&bytes, Some(&origins));
        StringBuffer { bytes, views }
    }

    /// The number of stored strings.
    pub fn size(&self) -> usize {
        self.views.len()
    }

    /// The number of stored bytes, terminators included.
    pub fn char_size(&self) -> usize {
        self.bytes.len()
    }

    /// `true` iff no strings are stored.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Replaces the contents wholesale and rebuilds the view table.
    pub fn update(&mut self, bytes: Vec<u8>, origins: Vec<O>) {
        self.views = parse(&bytes, Some(&origins));
        self.bytes = bytes;
    }

    /// The raw byte storage.
    pub fn raw_strings(&self) -> &[u8] {
        &self.bytes
    }

    /// The view table, in its current order.
    pub fn strings(&self) -> &[View<O>] {
        &self.views
    }

    /// The view table for in-place reordering, alongside the storage it points into.
    pub fn parts_mut(&mut self) -> (&mut [View<O>], &[u8]) {
        (&mut self.views, &self.bytes)
    }

    /// Resolves a view of this buffer into an entry.
    #[inline]
    pub fn entry(&self, view: &View<O>) -> Entry<'_, O> {
        Entry { chars: &self.bytes[view.start..view.start + view.len + 1], origin: view.origin }
    }

    /// Resolves every view, in view-table order.
    pub fn entries(&self) -> impl Iterator<Item = Entry<'_, O>> + '_ {
        self.views.iter().map(move |view| self.entry(view))
    }

    /// Builds a buffer holding copies of the given entries, in order.
    pub fn from_entries(entries: &[Entry<'_, O>]) -> Self {
        let chars: usize = entries.iter().map(|entry| entry.chars.len()).sum();
        let mut bytes = Vec::with_capacity(chars);
        let mut views = Vec::with_capacity(entries.len());
        for entry in entries {
            views.push(View { start: bytes.len(), len: entry.len(), origin: entry.origin });
            bytes.extend_from_slice(entry.chars);
        }
        StringBuffer { bytes, views }
    }

    /// Grows the underlying allocations to hold at least `chars` bytes and `strings` views.
    pub fn reserve(&mut self, chars: usize, strings: usize) {
        if chars > self.bytes.capacity() {
            let len = self.bytes.len();
            self.bytes.reserve(chars - len);
        }
        if strings > self.views.capacity() {
            let len = self.views.len();
            self.views.reserve(strings - len);
        }
    }

    /// Checks the storage invariants; intended for `debug_assert!` use after rebuilds.
    pub fn is_consistent(&self) -> bool {
        let mut expected = vec![false; self.bytes.len()];
        for view in &self.views {
            let end = view.start + view.len;
            if end >= self.bytes.len() || self.bytes[end] != 0 {
                return false;
            }
            if self.bytes[view.start..end].iter().any(|&byte| byte == 0) {
                return false;
            }
            for flag in &mut expected[view.start..=end] {
                if *flag {
                    return false;
                }
                *flag = true;
            }
        }
        expected.into_iter().all(|flag| flag)
    }
}

/// Parses terminator positions out of `bytes`, attaching origins when tracked and given.
fn parse<O: Origin>(bytes: &[u8], origins: Option<&[O]>) -> Vec<View<O>> {
    assert!(
        bytes.last().map_or(true, |&byte| byte == 0),
        "string storage does not end on a terminator",
    );
    let count = bytes.iter().filter(|&&byte| byte == 0).count();
    let origins = origins.filter(|_| O::TRACKED);
    if let Some(origins) = origins {
        assert!(origins.len() == count, "{} origins for {} strings", origins.len(), count);
    }
    let mut views = Vec::with_capacity(count);
    let mut start = 0;
    for (position, &byte) in bytes.iter().enumerate() {
        if byte == 0 {
            let origin = origins.map_or_else(O::default, |origins| origins[views.len()]);
            views.push(View { start, len: position - start, origin });
            start = position + 1;
        }
    }
    views
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_blob_into_views() {
        let buffer = StringBuffer::<()>::from_blob(b"fig\0\0walnut\0".to_vec());
        assert_eq!(buffer.size(), 3);
        assert_eq!(buffer.char_size(), 12);
        let contents: Vec<&[u8]> = buffer.entries().map(|entry| entry.content()).collect();
        assert_eq!(contents, [&b"fig"[..], &b""[..], &b"walnut"[..]]);
        assert!(buffer.is_consistent());
    }

    #[test]
    fn origins_attach_in_order() {
        let buffer = StringBuffer::<u64>::with_origins(b"a\0b\0".to_vec(), vec![7, 3]);
        let origins: Vec<u64> = buffer.entries().map(|entry| entry.origin).collect();
        assert_eq!(origins, [7, 3]);
    }

    #[test]
    fn update_replaces_everything() {
        let mut buffer = StringBuffer::<()>::from_blob(b"old\0".to_vec());
        buffer.update(b"new\0er\0".to_vec(), Vec::new());
        assert_eq!(buffer.size(), 2);
        assert!(buffer.is_consistent());
    }

    #[test]
    #[should_panic(expected = "terminator")]
    fn rejects_unterminated_storage() {
        StringBuffer::<()>::from_blob(b"torn".to_vec());
    }

    #[test]
    fn rebuilds_from_entries() {
        let buffer = StringBuffer::<u64>::with_origins(b"pear\0kiwi\0".to_vec(), vec![1, 2]);
        let entries: Vec<_> = buffer.entries().collect();
        let rebuilt = StringBuffer::from_entries(&entries);
        assert_eq!(rebuilt.raw_strings(), buffer.raw_strings());
        assert!(rebuilt.is_consistent());
    }
}
