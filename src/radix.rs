//! Most-significant-byte radix sorting of string views.
//!
//! The sorter partitions views by the byte at the current depth and recurses on each
//! partition in a depth-first manner, keeping the outstanding work on an explicit stack.
//! The terminator byte classifies a string that ends at the current depth, and such a
//! partition is complete: all of its members are equal. Small partitions fall into an
//! insertion sort over the not-yet-inspected suffixes. Both the distribution step and the
//! fallback are stable, so equal strings keep their incoming order end to end.

use crate::buffer::View;
use crate::compare::Origin;

/// Below this partition size a comparison sort beats another radix scan.
const INSERTION_CUTOFF: usize = 32;

/// The byte classifying `view` at `depth`: its content byte there, or the terminator.
#[inline]
fn byte_at<O: Copy>(view: &View<O>, bytes: &[u8], depth: usize) -> usize {
    bytes[view.start + depth] as usize
}

/// The terminated suffix of `view` from `depth` on.
#[inline]
fn suffix<'a, O: Copy>(view: &View<O>, bytes: &'a [u8], depth: usize) -> &'a [u8] {
    &bytes[view.start + depth..=view.start + view.len]
}

/// The content of `view`, without the terminator.
#[inline]
fn content<'a, O: Copy>(view: &View<O>, bytes: &'a [u8]) -> &'a [u8] {
    &bytes[view.start..view.start + view.len]
}

/// Sorts the view table lexicographically by string content, in place and stably.
pub fn sort_views<O: Origin>(views: &mut [View<O>], bytes: &[u8]) {
    if views.len() <= 1 {
        return;
    }
    let mut scratch: Vec<View<O>> = Vec::with_capacity(views.len());
    let mut work = vec![(0usize, 0usize, views.len())];

    while let Some((depth, lo, hi)) = work.pop() {
        if hi - lo <= INSERTION_CUTOFF {
            insertion_sort(&mut views[lo..hi], bytes, depth);
            continue;
        }

        let mut counts = [0usize; 256];
        for view in &views[lo..hi] {
            counts[byte_at(view, bytes, depth)] += 1;
        }
        let mut starts = [0usize; 256];
        let mut total = 0;
        for (start, count) in starts.iter_mut().zip(counts.iter()) {
            *start = total;
            total += count;
        }

        scratch.clear();
        scratch.extend_from_slice(&views[lo..hi]);
        let mut cursors = starts;
        for view in &scratch {
            let class = byte_at(view, bytes, depth);
            views[lo + cursors[class]] = *view;
            cursors[class] += 1;
        }

        // Partition 0 holds strings that end here; they are mutually equal and done.
        for class in 1..256 {
            if counts[class] > 1 {
                let begin = lo + starts[class];
                work.push((depth + 1, begin, begin + counts[class]));
            }
        }
    }
}

/// Stable insertion sort of a small partition, comparing suffixes from `depth` on.
fn insertion_sort<O: Origin>(views: &mut [View<O>], bytes: &[u8], depth: usize) {
    for i in 1..views.len() {
        let mut j = i;
        while j > 0 && suffix(&views[j], bytes, depth) < suffix(&views[j - 1], bytes, depth) {
            views.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// The longest-common-prefix array of a sorted view table: `lcp[i]` is the number of
/// leading content bytes view `i` shares with view `i - 1`, and `lcp[0]` is zero.
///
/// Adjacent runs with `lcp[i] == len[i - 1] == len[i]` are exactly the equal-string runs
/// the duplicate tie-breaking pass reorders.
pub fn lcp_array<O: Origin>(views: &[View<O>], bytes: &[u8]) -> Vec<usize> {
    let mut lcp = vec![0usize; views.len()];
    for i in 1..views.len() {
        let previous = content(&views[i - 1], bytes);
        let current = content(&views[i], bytes);
        lcp[i] = previous.iter().zip(current.iter()).take_while(|(a, b)| a == b).count();
    }
    lcp
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::StringBuffer;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_buffer(seed: u64, count: usize) -> StringBuffer<()> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut blob = Vec::new();
        for _ in 0..count {
            let length = rng.gen_range(0..12);
            for _ in 0..length {
                blob.push(rng.gen_range(1..=255u8));
            }
            blob.push(0);
        }
        StringBuffer::from_blob(blob)
    }

    #[test]
    fn agrees_with_comparison_sort() {
        let mut buffer = random_buffer(42, 500);
        let mut expected: Vec<Vec<u8>> =
            buffer.entries().map(|entry| entry.content().to_vec()).collect();
        expected.sort();

        let (views, bytes) = buffer.parts_mut();
        sort_views(views, bytes);
        let sorted: Vec<Vec<u8>> = buffer.entries().map(|entry| entry.content().to_vec()).collect();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn equal_strings_keep_their_incoming_order() {
        let mut blob = Vec::new();
        let mut count = 0u64;
        for _ in 0..40 {
            for word in [&b"mango"[..], &b"fig"[..], &b"mango"[..], &b"m"[..]] {
                blob.extend_from_slice(word);
                blob.push(0);
                count += 1;
            }
        }
        let mut buffer = StringBuffer::<u64>::with_origins(blob, (0..count).collect());
        let (views, bytes) = buffer.parts_mut();
        sort_views(views, bytes);

        let mut last_seen: Option<(&[u8], u64)> = None;
        for entry in buffer.entries() {
            if let Some((content, origin)) = last_seen {
                if content == entry.content() {
                    assert!(origin < entry.origin, "stability violated for {:?}", content);
                }
            }
            last_seen = Some((entry.content(), entry.origin));
        }
    }

    #[test]
    fn lcp_matches_shared_prefixes() {
        let mut buffer = StringBuffer::<()>::from_blob(b"car\0car\0carp\0cat\0dog\0".to_vec());
        let (views, bytes) = buffer.parts_mut();
        sort_views(views, bytes);
        let lcp = lcp_array(views, bytes);
        assert_eq!(lcp, [0, 3, 3, 2, 0]);
    }
}
