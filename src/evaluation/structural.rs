//! Call-graph metrics: structural modularity, inter-call percentage and
//! interface number.
//!
//! Unassigned classes carry no group and therefore never contribute a count.
//! Empty groups and zero call totals yield 0 terms rather than errors.

use crate::graph::ClassGraph;
use crate::membership::{Membership, MembershipStructure};
use std::collections::BTreeSet;

fn membership_of(candidate: &MembershipStructure, class: usize) -> &Membership {
    static UNASSIGNED: Membership = Membership::Unassigned;
    candidate.get(class).unwrap_or(&UNASSIGNED)
}

/// Structural modularity (SM).
///
/// `SM = (1/K) Σ μ_k / m_k² - (2 / (K(K-1))) Σ_{k≠l} σ_kl / (2 m_k m_l)`
///
/// `m_k` counts classes carrying `k`. Each resolved call `i -> j` adds one to
/// `μ_k` for every group `k` both classes carry, and one to `σ_kl` for every
/// `k` carried by `i` and `l ≠ k` carried by `j`. Summing over ordered pairs
/// counts traffic in both directions between two groups.
pub fn structural_modularity(candidate: &MembershipStructure, graph: &ClassGraph) -> f64 {
    let k_total = candidate.group_count();
    if k_total == 0 {
        return 0.0;
    }

    let mut sizes = vec![0usize; k_total];
    for membership in candidate {
        for group in membership.groups() {
            sizes[group] += 1;
        }
    }

    let mut inside = vec![0usize; k_total];
    let mut outside = vec![vec![0usize; k_total]; k_total];
    for (caller, callee) in graph.resolved_calls() {
        let from = membership_of(candidate, caller);
        let to = membership_of(candidate, callee);
        for k in from.groups() {
            for l in to.groups() {
                if k == l {
                    inside[k] += 1;
                } else {
                    outside[k][l] += 1;
                }
            }
        }
    }

    let cohesion: f64 = (0..k_total)
        .filter(|&k| sizes[k] > 0)
        .map(|k| inside[k] as f64 / (sizes[k] * sizes[k]) as f64)
        .sum::<f64>()
        / k_total as f64;

    let coupling = if k_total < 2 {
        0.0
    } else {
        let sum: f64 = (0..k_total)
            .flat_map(|k| (0..k_total).map(move |l| (k, l)))
            .filter(|&(k, l)| k != l && sizes[k] > 0 && sizes[l] > 0)
            .map(|(k, l)| outside[k][l] as f64 / (2 * sizes[k] * sizes[l]) as f64)
            .sum();
        2.0 * sum / (k_total * (k_total - 1)) as f64
    };

    cohesion - coupling
}

/// `ln(calls) + 1` summed over class pairs with at least one call.
fn log_call_weight(
    graph: &ClassGraph,
    callers: &[usize],
    callees: &[usize],
    skip_shared: bool,
) -> f64 {
    let calls = graph.call_matrix();
    let caller_set: BTreeSet<usize> = callers.iter().copied().collect();
    let callee_set: BTreeSet<usize> = callees.iter().copied().collect();
    let mut total = 0.0;
    for &i in callers {
        if skip_shared && callee_set.contains(&i) {
            continue;
        }
        for &j in callees {
            if skip_shared && caller_set.contains(&j) {
                continue;
            }
            let count = calls.calls(i, j);
            if count > 0 {
                total += f64::from(count).ln() + 1.0;
            }
        }
    }
    total
}

/// Inter-call percentage (ICP).
///
/// Log-weighted calls between different groups, leaving out classes the two
/// groups share, over log-weighted calls between every group pair including
/// a group with itself. 0 when no inter-group call exists.
pub fn inter_call_percentage(candidate: &MembershipStructure, graph: &ClassGraph) -> f64 {
    let groups = candidate.groups();
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (k, members_k) in groups.iter().enumerate() {
        for (l, members_l) in groups.iter().enumerate() {
            if k != l {
                numerator += log_call_weight(graph, members_k, members_l, true);
            }
            denominator += log_call_weight(graph, members_k, members_l, false);
        }
    }
    if numerator == 0.0 || denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Interface number (IFN).
///
/// A class is an interface of group `k` when it carries `k` and is called
/// from a class that does not carry `k` (unassigned callers included). IFN is
/// the number of (group, interface) pairs divided by `K`.
pub fn interface_number(candidate: &MembershipStructure, graph: &ClassGraph) -> f64 {
    let k_total = candidate.group_count();
    if k_total == 0 {
        return 0.0;
    }
    let mut interfaces: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); k_total];
    for (caller, callee) in graph.resolved_calls() {
        let from = membership_of(candidate, caller);
        for group in membership_of(candidate, callee).groups() {
            if !from.contains(group) {
                interfaces[group].insert(callee);
            }
        }
    }
    let total: usize = interfaces.iter().map(BTreeSet::len).sum();
    total as f64 / k_total as f64
}
