use crate::membership::MembershipStructure;

/// Smallest group size that is not extreme.
pub const NED_MIN_SIZE: usize = 5;
/// Largest group size that is not extreme.
pub const NED_MAX_SIZE: usize = 20;

/// Non-extreme distribution (NED).
///
/// One minus the share of memberships that fall in groups of
/// `NED_MIN_SIZE..=NED_MAX_SIZE` classes. Every membership of an overlapping
/// class counts. 1 when nothing is assigned.
pub fn non_extreme_distribution(candidate: &MembershipStructure) -> f64 {
    let total = candidate.membership_count();
    if total == 0 {
        return 1.0;
    }
    let non_extreme: usize = candidate
        .groups()
        .iter()
        .map(Vec::len)
        .filter(|size| (NED_MIN_SIZE..=NED_MAX_SIZE).contains(size))
        .sum();
    1.0 - non_extreme as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::Membership;

    #[test]
    fn test_single_group_of_ten_is_not_extreme() {
        let candidate = MembershipStructure::from_labels(&[Some(0); 10]);
        assert_eq!(non_extreme_distribution(&candidate), 0.0);
    }

    #[test]
    fn test_small_groups_are_extreme() {
        let labels: Vec<Option<usize>> = (0..9).map(|i| Some(i / 3)).collect();
        let candidate = MembershipStructure::from_labels(&labels);
        assert_eq!(non_extreme_distribution(&candidate), 1.0);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let mut labels = vec![Some(0); 5];
        labels.extend(vec![Some(1); 20]);
        labels.extend(vec![Some(2); 21]);
        let candidate = MembershipStructure::from_labels(&labels);
        let expected = 1.0 - 25.0 / 46.0;
        assert!((non_extreme_distribution(&candidate) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_overlapping_memberships_all_count() {
        // Group 0 has 5 members, group 1 has 2; one class is in both.
        let mut memberships = vec![Membership::single(0); 4];
        memberships.push(Membership::from_groups([0, 1]));
        memberships.push(Membership::single(1));
        memberships.push(Membership::Unassigned);
        let candidate = MembershipStructure::new(memberships);
        assert!((non_extreme_distribution(&candidate) - (1.0 - 5.0 / 7.0)).abs() < 1e-12);
    }

    #[test]
    fn test_nothing_assigned() {
        assert_eq!(
            non_extreme_distribution(&MembershipStructure::unassigned(3)),
            1.0
        );
    }
}
