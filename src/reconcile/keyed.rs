//! Keyed list planning.
//!
//! Given the keys of the live children (document order) and the keys of the
//! new descriptions (desired order), decide which live children stay put,
//! which are dropped and which must be created or moved.
//!
//! ```text
//! old:  A B C D          projection of new order onto old indices:
//! new:  A C B D            [0, 2, 1, 3]
//! LIS:  [0, 1, 3]          -> A, B, D stay; C is moved
//! ```

use std::collections::HashMap;
use std::hash::Hash;

/// Reorder plan for one keyed child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedPlan {
    /// Old indices reconciled in place, increasing.
    pub stable: Vec<usize>,
    /// Old index -> new index, `None` when the key is gone.
    pub old_to_new: Vec<Option<usize>>,
    /// New index -> old index, `None` when the key is new.
    pub new_to_old: Vec<Option<usize>>,
}

impl KeyedPlan {
    pub fn new_index_of(&self, old: usize) -> Option<usize> {
        self.old_to_new.get(old).copied().flatten()
    }

    pub fn is_stable(&self, old: usize) -> bool {
        self.stable.binary_search(&old).is_ok()
    }

    /// Old indices whose key survives but which leave the LIS.
    pub fn moved(&self) -> Vec<usize> {
        (0..self.old_to_new.len())
            .filter(|&old| self.old_to_new[old].is_some() && !self.is_stable(old))
            .collect()
    }

    /// Old indices whose key is gone.
    pub fn removed(&self) -> Vec<usize> {
        (0..self.old_to_new.len())
            .filter(|&old| self.old_to_new[old].is_none())
            .collect()
    }

    /// New indices with no live counterpart.
    pub fn created(&self) -> Vec<usize> {
        (0..self.new_to_old.len())
            .filter(|&new| self.new_to_old[new].is_none())
            .collect()
    }
}

/// Plan the reorder of `old` into `new`. Keys are expected to be unique on
/// each side; a repeated key keeps its last position.
pub fn plan<K: Eq + Hash>(old: &[K], new: &[K]) -> KeyedPlan {
    let old_index: HashMap<&K, usize> = old.iter().enumerate().map(|(i, k)| (k, i)).collect();
    let new_index: HashMap<&K, usize> = new.iter().enumerate().map(|(i, k)| (k, i)).collect();

    let new_to_old: Vec<Option<usize>> = new.iter().map(|k| old_index.get(k).copied()).collect();
    let old_to_new: Vec<Option<usize>> = old.iter().map(|k| new_index.get(k).copied()).collect();

    let projection: Vec<usize> = new_to_old.iter().flatten().copied().collect();
    let mut stable = longest_increasing_subsequence(&projection);
    stable.sort_unstable();
    stable.dedup();

    KeyedPlan {
        stable,
        old_to_new,
        new_to_old,
    }
}

/// Values of a longest strictly increasing subsequence of `seq`.
///
/// Patience method with predecessor links: O(n log n). The binary search
/// moves left on `>=`, so among equal values the earliest match is kept.
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    let n = seq.len();
    // tails[l] = index in seq of the smallest tail of an increasing run of length l + 1
    let mut tails: Vec<usize> = Vec::with_capacity(n);
    let mut prev: Vec<Option<usize>> = vec![None; n];

    for i in 0..n {
        let (mut low, mut high) = (0, tails.len());
        while low < high {
            let mid = low + (high - low) / 2;
            if seq[tails[mid]] >= seq[i] {
                high = mid;
            } else {
                low = mid + 1;
            }
        }
        prev[i] = if low > 0 { Some(tails[low - 1]) } else { None };
        if low == tails.len() {
            tails.push(i);
        } else {
            tails[low] = i;
        }
    }

    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(seq[i]);
        cursor = prev[i];
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn lis_len_reference(seq: &[usize]) -> usize {
        let mut best = vec![1usize; seq.len()];
        for i in 0..seq.len() {
            for j in 0..i {
                if seq[j] < seq[i] {
                    best[i] = best[i].max(best[j] + 1);
                }
            }
        }
        best.into_iter().max().unwrap_or(0)
    }

    #[test_case(&[], &[] ; "empty")]
    #[test_case(&[0, 1, 2], &[0, 1, 2] ; "already sorted")]
    #[test_case(&[0, 2, 1, 3], &[0, 1, 3] ; "swap in the middle")]
    #[test_case(&[3, 2, 1, 0], &[0] ; "reversed")]
    #[test_case(&[2, 2, 2], &[2] ; "equal values")]
    fn test_lis_table(seq: &[usize], expected: &[usize]) {
        assert_eq!(longest_increasing_subsequence(seq), expected);
    }

    #[test]
    fn test_swap_never_keeps_both() {
        // [A, B, C, D] -> [A, C, B, D]
        let plan = plan(&["A", "B", "C", "D"], &["A", "C", "B", "D"]);
        assert_eq!(plan.stable.len(), 3);
        assert!(plan.is_stable(0) && plan.is_stable(3));
        assert!(!(plan.is_stable(1) && plan.is_stable(2)));
        assert_eq!(plan.moved().len(), 1);
    }

    #[test_case(&["a"], &["b", "a"], &[0], &[], &[0] ; "insert before")]
    #[test_case(&["a", "b", "c"], &["a", "c"], &[0, 2], &[1], &[] ; "remove middle")]
    #[test_case(&["a", "b", "c"], &["c", "a", "b"], &[0, 1], &[], &[] ; "rotate right")]
    #[test_case(&["a", "b"], &["x", "y"], &[], &[0, 1], &[0, 1] ; "disjoint")]
    fn test_plan_table(
        old: &[&str],
        new: &[&str],
        stable: &[usize],
        removed: &[usize],
        created: &[usize],
    ) {
        let plan = plan(old, new);
        assert_eq!(plan.stable, stable);
        assert_eq!(plan.removed(), removed);
        assert_eq!(plan.created(), created);
    }

    #[test]
    fn test_rotate_moves_tail() {
        let plan = plan(&["a", "b", "c"], &["c", "a", "b"]);
        assert_eq!(plan.moved(), vec![2]);
        assert_eq!(plan.new_index_of(2), Some(0));
        assert_eq!(plan.new_to_old, vec![Some(2), Some(0), Some(1)]);
    }

    proptest! {
        #[test]
        fn prop_lis_strictly_increasing_and_maximal(seq in prop::collection::vec(0usize..50, 0..40)) {
            let lis = longest_increasing_subsequence(&seq);
            prop_assert!(lis.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(lis.len(), lis_len_reference(&seq));
        }

        #[test]
        fn prop_lis_is_subsequence(seq in prop::collection::vec(0usize..20, 0..30)) {
            let lis = longest_increasing_subsequence(&seq);
            let mut rest = seq.iter();
            prop_assert!(lis.iter().all(|v| rest.any(|x| x == v)));
        }

        #[test]
        fn prop_plan_partitions_old(perm in Just((0..12usize).collect::<Vec<_>>()).prop_shuffle(), keep in 0usize..12) {
            let old: Vec<usize> = (0..12).collect();
            let new: Vec<usize> = perm.into_iter().filter(|&k| k >= keep).collect();
            let plan = plan(&old, &new);
            let total = plan.stable.len() + plan.moved().len() + plan.removed().len();
            prop_assert_eq!(total, old.len());
            prop_assert!(plan.created().is_empty());
        }
    }
}
