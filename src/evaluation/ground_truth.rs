//! Metrics comparing a candidate against a ground-truth decomposition.

use crate::membership::{ClassIndex, MembershipStructure};
use std::collections::BTreeSet;

/// The ground-truth group sharing the most classes with `members`.
///
/// Ties go to the lowest ground-truth id. Returns `None` when `members` is
/// empty or overlaps no ground-truth group.
pub fn corresponding_group<'a>(
    members: &BTreeSet<ClassIndex>,
    truth_groups: &'a [BTreeSet<ClassIndex>],
) -> Option<&'a BTreeSet<ClassIndex>> {
    let mut best: Option<(&BTreeSet<ClassIndex>, usize)> = None;
    for group in truth_groups {
        let overlap = group.intersection(members).count();
        if overlap > best.map_or(0, |(_, size)| size) {
            best = Some((group, overlap));
        }
    }
    best.map(|(group, _)| group)
}

fn group_sets(structure: &MembershipStructure) -> Vec<BTreeSet<ClassIndex>> {
    structure
        .groups()
        .into_iter()
        .map(|members| members.into_iter().collect())
        .collect()
}

/// For each candidate group `0..K`, the overlap with its corresponding
/// ground-truth group and the candidate group's size.
fn matches(
    candidate: &MembershipStructure,
    ground_truth: &MembershipStructure,
) -> Vec<(usize, usize)> {
    let truth = group_sets(ground_truth);
    group_sets(candidate)
        .iter()
        .map(|members| {
            let overlap = corresponding_group(members, &truth)
                .map_or(0, |group| group.intersection(members).count());
            (overlap, members.len())
        })
        .collect()
}

/// Mean over candidate groups of `|G ∩ T(G)| / |G|`.
///
/// Empty candidate groups score 0 but still count in the mean. 0 when the
/// candidate has no groups.
pub fn precision(candidate: &MembershipStructure, ground_truth: &MembershipStructure) -> f64 {
    let matched = matches(candidate, ground_truth);
    if matched.is_empty() {
        return 0.0;
    }
    let sum: f64 = matched
        .iter()
        .filter(|(_, size)| *size > 0)
        .map(|&(overlap, size)| overlap as f64 / size as f64)
        .sum();
    sum / matched.len() as f64
}

/// Success rate at `k`: the fraction of candidate groups whose share of
/// classes found in the corresponding ground-truth group is at least
/// `k / 10`. Empty candidate groups never match.
pub fn success_rate(
    candidate: &MembershipStructure,
    ground_truth: &MembershipStructure,
    k: u32,
) -> f64 {
    let matched = matches(candidate, ground_truth);
    if matched.is_empty() {
        return 0.0;
    }
    let threshold = f64::from(k) / 10.0;
    let successes = matched
        .iter()
        .filter(|&&(overlap, size)| size > 0 && overlap as f64 / size as f64 >= threshold)
        .count();
    successes as f64 / matched.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::Membership;

    fn labels(values: &[i64]) -> MembershipStructure {
        let labels: Vec<Option<usize>> = values
            .iter()
            .map(|&v| usize::try_from(v).ok())
            .collect();
        MembershipStructure::from_labels(&labels)
    }

    #[test]
    fn test_identical_partition_scores_one() {
        let truth = labels(&[0, 0, 1, 1, 2]);
        assert_eq!(precision(&truth, &truth), 1.0);
        assert_eq!(success_rate(&truth, &truth, 10), 1.0);
    }

    #[test]
    fn test_correspondence_prefers_lowest_id_on_ties() {
        let truth = vec![BTreeSet::from([0, 1]), BTreeSet::from([2, 3])];
        let members = BTreeSet::from([1, 2]);
        assert_eq!(corresponding_group(&members, &truth), Some(&truth[0]));
        assert_eq!(corresponding_group(&BTreeSet::new(), &truth), None);
        assert_eq!(corresponding_group(&BTreeSet::from([9]), &truth), None);
    }

    #[test]
    fn test_precision_averages_over_candidate_groups() {
        let truth = labels(&[0, 0, 0, 1, 1, 1]);
        // Group 0 = {0, 1, 3}: 2/3. Group 1 = {2, 4, 5}: 2/3.
        let candidate = labels(&[0, 0, 1, 0, 1, 1]);
        assert!((precision(&candidate, &truth) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_candidate_group_counts_as_zero() {
        let truth = labels(&[0, 0, 1, 1]);
        // Group 1 has no members.
        let candidate = labels(&[0, 0, 2, 2]);
        assert!((precision(&candidate, &truth) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(precision(&MembershipStructure::unassigned(4), &truth), 0.0);
    }

    #[test]
    fn test_success_rate_uses_matched_share() {
        let truth = labels(&[0, 0, 0, 1, 1]);
        // Group 0 = {0, 1, 2, 3}: 3/4 matched. Group 1 = {4}: fully matched.
        let candidate = MembershipStructure::new(vec![
            Membership::single(0),
            Membership::single(0),
            Membership::single(0),
            Membership::single(0),
            Membership::single(1),
        ]);
        assert_eq!(success_rate(&candidate, &truth, 7), 1.0);
        assert_eq!(success_rate(&candidate, &truth, 8), 0.5);
        assert_eq!(success_rate(&candidate, &truth, 10), 0.5);
    }

    #[test]
    fn test_success_rate_skips_empty_groups() {
        let truth = labels(&[0, 0]);
        let candidate = labels(&[1, 1]);
        assert_eq!(success_rate(&candidate, &truth, 1), 0.5);
    }
}
