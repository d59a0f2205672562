//! Comparison of the expected and the actually updated issue sets.

use crate::domain::IssueKey;
use serde::Serialize;
use std::collections::BTreeSet;

/// How two key sets overlap. Every list is sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapResult {
    /// Keys present on both sides.
    pub intersection: Vec<IssueKey>,
    /// Keys only on the left (expected) side.
    pub left_only: Vec<IssueKey>,
    /// Keys only on the right (updated) side.
    pub right_only: Vec<IssueKey>,
}

impl OverlapResult {
    /// Compare `left` against `right`.
    pub fn compute<'a>(
        left: impl IntoIterator<Item = &'a IssueKey>,
        right: impl IntoIterator<Item = &'a IssueKey>,
    ) -> Self {
        let left: BTreeSet<&IssueKey> = left.into_iter().collect();
        let right: BTreeSet<&IssueKey> = right.into_iter().collect();
        Self {
            intersection: left.intersection(&right).map(|k| (*k).clone()).collect(),
            left_only: left.difference(&right).map(|k| (*k).clone()).collect(),
            right_only: right.difference(&left).map(|k| (*k).clone()).collect(),
        }
    }

    /// Whether both sides contain the same keys.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keys(keys: &[&str]) -> Vec<IssueKey> {
        keys.iter().copied().map(IssueKey::from).collect()
    }

    #[test]
    fn test_overlap() {
        let expected = keys(&["X", "Y", "Z"]);
        let updated = keys(&["Y", "Z", "W"]);

        let overlap = OverlapResult::compute(&expected, &updated);

        assert_eq!(overlap.intersection, keys(&["Y", "Z"]));
        assert_eq!(overlap.left_only, keys(&["X"]));
        assert_eq!(overlap.right_only, keys(&["W"]));
        assert!(!overlap.is_exact());
    }

    #[test]
    fn test_overlap_ignores_duplicates_and_order() {
        let overlap = OverlapResult::compute(&keys(&["B", "A", "B"]), &keys(&["A", "B"]));

        assert_eq!(overlap.intersection, keys(&["A", "B"]));
        assert!(overlap.is_exact());
    }

    proptest! {
        #[test]
        fn prop_overlap_partitions_both_sides(
            left in prop::collection::vec("[A-E]-[0-9]", 0..12),
            right in prop::collection::vec("[A-E]-[0-9]", 0..12),
        ) {
            let left: Vec<IssueKey> = left.into_iter().map(IssueKey::from).collect();
            let right: Vec<IssueKey> = right.into_iter().map(IssueKey::from).collect();
            let overlap = OverlapResult::compute(&left, &right);

            for key in &overlap.intersection {
                prop_assert!(left.contains(key) && right.contains(key));
            }
            for key in &overlap.left_only {
                prop_assert!(left.contains(key) && !right.contains(key));
            }
            for key in &overlap.right_only {
                prop_assert!(right.contains(key) && !left.contains(key));
            }
            for key in &left {
                prop_assert!(overlap.intersection.contains(key) || overlap.left_only.contains(key));
            }
            for key in &right {
                prop_assert!(overlap.intersection.contains(key) || overlap.right_only.contains(key));
            }
            prop_assert!(overlap.intersection.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
