/// Describes how one group was perturbed by the in-flight move.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupChange {
    /// Index of the group in the configuration's group list.
    pub index: usize,
    /// Every particle of the group may have changed.
    pub all: bool,
    /// Energy between particles of the same group may have changed.
    pub internal: bool,
    /// Particles were inserted into or removed from the group.
    pub resized: bool,
    /// Sorted relative indices of moved particles; only meaningful when `all` is false.
    pub atoms: Vec<usize>,
}

impl GroupChange {
    /// Rigid update of a whole group with no internal energy change.
    pub fn rigid(index: usize) -> Self {
        Self {
            index,
            all: true,
            ..Default::default()
        }
    }

    /// A subset of particles moved inside the group.
    pub fn atoms(index: usize, atoms: impl IntoIterator<Item = usize>) -> Self {
        let mut atoms: Vec<usize> = atoms.into_iter().collect();
        atoms.sort_unstable();
        atoms.dedup();
        Self {
            index,
            internal: true,
            atoms,
            ..Default::default()
        }
    }

    /// Particles were inserted or removed; the whole group is re-evaluated.
    pub fn resized(index: usize) -> Self {
        Self {
            index,
            all: true,
            internal: true,
            resized: true,
            atoms: Vec::new(),
        }
    }

    /// Every particle changed, including intra-group energies.
    pub fn everything(index: usize) -> Self {
        Self {
            index,
            all: true,
            internal: true,
            ..Default::default()
        }
    }

    fn merge(&mut self, other: GroupChange) {
        debug_assert_eq!(self.index, other.index);
        self.internal |= other.internal;
        self.resized |= other.resized;
        if self.all || other.all {
            self.all = true;
            self.atoms.clear();
        } else {
            self.atoms.extend(other.atoms);
            self.atoms.sort_unstable();
            self.atoms.dedup();
        }
    }
}

/// Transient record of the groups touched by one move attempt.
///
/// A `Change` is produced fresh per attempt, consumed once by the energy evaluator and then
/// discarded. Group entries are kept sorted by index and de-duplicated, so membership can be
/// answered with a binary search. An empty change is a no-op and costs nothing to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Change {
    groups: Vec<GroupChange>,
}

impl Change {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks every group as fully and internally changed.
    pub fn everything(group_count: usize) -> Self {
        Self {
            groups: (0..group_count).map(GroupChange::everything).collect(),
        }
    }

    /// Adds a group change, merging it with an existing entry for the same group.
    pub fn push(&mut self, change: GroupChange) {
        match self.groups.binary_search_by_key(&change.index, |g| g.index) {
            Ok(pos) => self.groups[pos].merge(change),
            Err(pos) => self.groups.insert(pos, change),
        }
    }

    pub fn with(mut self, change: GroupChange) -> Self {
        self.push(change);
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[GroupChange] {
        &self.groups
    }

    /// Sorted, de-duplicated indices of all touched groups.
    pub fn touched_group_indices(&self) -> Vec<usize> {
        self.groups.iter().map(|g| g.index).collect()
    }

    #[inline]
    pub fn is_touched(&self, group_index: usize) -> bool {
        self.groups
            .binary_search_by_key(&group_index, |g| g.index)
            .is_ok()
    }

    pub fn get(&self, group_index: usize) -> Option<&GroupChange> {
        self.groups
            .binary_search_by_key(&group_index, |g| g.index)
            .ok()
            .map(|pos| &self.groups[pos])
    }

    /// True if any group changed its particle count.
    pub fn resizes(&self) -> bool {
        self.groups.iter().any(|g| g.resized)
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}
