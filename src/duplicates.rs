//! Tie-breaking of equal-string runs by origin.
//!
//! A byte-wise local sort leaves runs of equal strings in arbitrary relative order; when
//! origins are tracked, reordering every such run by ascending origin locks in the total
//! order the stable sort promises. Runs are detected from the LCP array: views `i - 1` and
//! `i` hold equal strings exactly when `lcp[i]` equals both content lengths.

use crate::buffer::View;
use crate::compare::Origin;

/// Finds the maximal runs of equal strings in a sorted, LCP-augmented view table.
///
/// Returned ranges are half-open view-index intervals of length at least two.
pub fn duplicate_ranges<O: Origin>(views: &[View<O>], lcp: &[usize]) -> Vec<(usize, usize)> {
    debug_assert!(views.len() == lcp.len());
    let mut ranges = Vec::new();
    let mut begin = 0;
    for i in 1..views.len() {
        let equal = lcp[i] == views[i].len && views[i - 1].len == views[i].len;
        if !equal {
            if i - begin > 1 {
                ranges.push((begin, i));
            }
            begin = i;
        }
    }
    if views.len() - begin > 1 {
        ranges.push((begin, views.len()));
    }
    ranges
}

/// Reorders each given run by ascending origin.
pub fn break_ties<O: Origin>(views: &mut [View<O>], ranges: &[(usize, usize)]) {
    for &(begin, end) in ranges {
        views[begin..end].sort_unstable_by_key(|view| view.origin);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::StringBuffer;
    use crate::radix;

    #[test]
    fn finds_only_true_runs() {
        // Sorted contents: aa aa ab ab ab b, with runs [0, 2) and [2, 5).
        let buffer =
            StringBuffer::<u64>::with_origins(b"aa\0aa\0ab\0ab\0ab\0b\0".to_vec(), vec![0; 6]);
        let lcp = radix::lcp_array(buffer.strings(), buffer.raw_strings());
        assert_eq!(duplicate_ranges(buffer.strings(), &lcp), [(0, 2), (2, 5)]);
    }

    #[test]
    fn shared_prefix_is_not_a_run() {
        let buffer = StringBuffer::<u64>::with_origins(b"ab\0abc\0abcd\0".to_vec(), vec![0; 3]);
        let lcp = radix::lcp_array(buffer.strings(), buffer.raw_strings());
        assert!(duplicate_ranges(buffer.strings(), &lcp).is_empty());
    }

    #[test]
    fn runs_reorder_by_origin() {
        let mut buffer =
            StringBuffer::<u64>::with_origins(b"k\0k\0k\0z\0".to_vec(), vec![7, 3, 5, 1]);
        let lcp = radix::lcp_array(buffer.strings(), buffer.raw_strings());
        let ranges = duplicate_ranges(buffer.strings(), &lcp);
        let (views, _) = buffer.parts_mut();
        break_ties(views, &ranges);
        let origins: Vec<u64> = buffer.entries().map(|entry| entry.origin).collect();
        assert_eq!(origins, [3, 5, 7, 1]);
    }
}
