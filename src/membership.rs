//! Per-class group membership.
//!
//! A class is either [`Membership::Unassigned`] or carries a non-empty set of
//! group ids. Group ids are dense integers starting at 0. On the wire an
//! unassigned class is written as `[-1]`, matching the report format consumed
//! by downstream tabular tooling.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Dense group identifier.
pub type GroupId = usize;

/// Position of a class in the canonical class ordering.
pub type ClassIndex = usize;

/// Wire value used for "no group".
pub const UNASSIGNED_ID: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Membership {
    #[default]
    Unassigned,
    /// Never empty.
    Assigned(BTreeSet<GroupId>),
}

impl Membership {
    /// Build a membership from any collection of groups; an empty collection
    /// yields `Unassigned`.
    pub fn from_groups(groups: impl IntoIterator<Item = GroupId>) -> Self {
        let set: BTreeSet<GroupId> = groups.into_iter().collect();
        if set.is_empty() {
            Self::Unassigned
        } else {
            Self::Assigned(set)
        }
    }

    pub fn single(group: GroupId) -> Self {
        Self::Assigned(BTreeSet::from([group]))
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, Self::Unassigned)
    }

    pub fn contains(&self, group: GroupId) -> bool {
        match self {
            Self::Unassigned => false,
            Self::Assigned(set) => set.contains(&group),
        }
    }

    /// Number of real groups carried (0 when unassigned).
    pub fn len(&self) -> usize {
        match self {
            Self::Unassigned => 0,
            Self::Assigned(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        let set = match self {
            Self::Unassigned => None,
            Self::Assigned(set) => Some(set),
        };
        set.into_iter().flat_map(|s| s.iter().copied())
    }

    /// Add a group, dropping the unassigned state.
    pub fn insert(&mut self, group: GroupId) {
        match self {
            Self::Unassigned => *self = Self::single(group),
            Self::Assigned(set) => {
                set.insert(group);
            }
        }
    }
}

impl Serialize for Membership {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unassigned => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(&UNASSIGNED_ID)?;
                seq.end()
            }
            Self::Assigned(set) => {
                let mut seq = serializer.serialize_seq(Some(set.len()))?;
                for group in set {
                    seq.serialize_element(group)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Membership {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MembershipVisitor;

        impl<'de> Visitor<'de> for MembershipVisitor {
            type Value = Membership;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of group ids, with -1 for unassigned")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Membership, A::Error> {
                let mut groups = BTreeSet::new();
                while let Some(id) = seq.next_element::<i64>()? {
                    match id {
                        UNASSIGNED_ID => {}
                        id if id >= 0 => {
                            groups.insert(id as GroupId);
                        }
                        other => {
                            return Err(de::Error::invalid_value(
                                de::Unexpected::Signed(other),
                                &"a non-negative group id or -1",
                            ))
                        }
                    }
                }
                Ok(Membership::from_groups(groups))
            }
        }

        deserializer.deserialize_seq(MembershipVisitor)
    }
}

/// Membership of every class, indexed by [`ClassIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipStructure {
    memberships: Vec<Membership>,
}

impl MembershipStructure {
    pub fn new(memberships: Vec<Membership>) -> Self {
        Self { memberships }
    }

    /// All classes unassigned.
    pub fn unassigned(n_classes: usize) -> Self {
        Self::new(vec![Membership::Unassigned; n_classes])
    }

    /// Single-membership labelling, `None` meaning unassigned.
    pub fn from_labels(labels: &[Option<GroupId>]) -> Self {
        Self::new(
            labels
                .iter()
                .map(|label| match label {
                    Some(group) => Membership::single(*group),
                    None => Membership::Unassigned,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }

    pub fn get(&self, class: ClassIndex) -> Option<&Membership> {
        self.memberships.get(class)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Membership> {
        self.memberships.iter()
    }

    pub fn as_slice(&self) -> &[Membership] {
        &self.memberships
    }

    /// `K`: largest group id plus one, 0 when nothing is assigned.
    pub fn group_count(&self) -> usize {
        self.memberships
            .iter()
            .filter_map(|m| m.groups().max())
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Whether every id in `0..K` is carried by at least one class.
    pub fn is_dense(&self) -> bool {
        let ids: BTreeSet<GroupId> = self
            .memberships
            .iter()
            .flat_map(Membership::groups)
            .collect();
        ids.len() == self.group_count()
    }

    /// Members of each group `0..K`, in class order.
    pub fn groups(&self) -> Vec<Vec<ClassIndex>> {
        let mut groups = vec![Vec::new(); self.group_count()];
        for (class, membership) in self.memberships.iter().enumerate() {
            for group in membership.groups() {
                groups[group].push(class);
            }
        }
        groups
    }

    /// Total number of (class, group) pairs.
    pub fn membership_count(&self) -> usize {
        self.memberships.iter().map(Membership::len).sum()
    }

    pub fn unassigned_count(&self) -> usize {
        self.memberships
            .iter()
            .filter(|m| m.is_unassigned())
            .count()
    }

    /// Renumber groups so ids are dense and ordered by first appearance.
    pub fn compacted(&self) -> Self {
        let mut remap: BTreeMap<GroupId, GroupId> = BTreeMap::new();
        for membership in &self.memberships {
            for group in membership.groups() {
                let next = remap.len();
                remap.entry(group).or_insert(next);
            }
        }
        Self::new(
            self.memberships
                .iter()
                .map(|m| Membership::from_groups(m.groups().map(|g| remap[&g])))
                .collect(),
        )
    }
}

impl FromIterator<Membership> for MembershipStructure {
    fn from_iter<I: IntoIterator<Item = Membership>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MembershipStructure {
    type Item = &'a Membership;
    type IntoIter = std::slice::Iter<'a, Membership>;

    fn into_iter(self) -> Self::IntoIter {
        self.memberships.iter()
    }
}
