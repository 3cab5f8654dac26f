use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Group '{name}' starts at {begin} but the previous group ends at {expected}")]
    Gap {
        name: String,
        begin: usize,
        expected: usize,
    },
    #[error("Group '{name}' has inverted range {begin}..{end}")]
    Inverted {
        name: String,
        begin: usize,
        end: usize,
    },
    #[error("Groups cover {covered} particles but the configuration holds {total}")]
    Coverage { covered: usize, total: usize },
}

/// A contiguous half-open index range into the particle array.
///
/// A group represents one molecule or one homogeneous collection of atomic species. Its name
/// is carried along so external collaborators can aggregate statistics per group kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    begin: usize,
    end: usize,
}

impl Group {
    pub fn new(name: &str, range: Range<usize>) -> Self {
        Self {
            name: name.to_string(),
            begin: range.start,
            end: range.end,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn begin(&self) -> usize {
        self.begin
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.begin..self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.range().contains(&index)
    }

    /// Absolute index of the particle at `relative` within this group.
    #[inline]
    pub fn absolute(&self, relative: usize) -> usize {
        debug_assert!(relative < self.len());
        self.begin + relative
    }

    pub(crate) fn grow(&mut self) {
        self.end += 1;
    }

    pub(crate) fn shrink(&mut self) {
        debug_assert!(!self.is_empty());
        self.end -= 1;
    }

    pub(crate) fn shift_up(&mut self) {
        self.begin += 1;
        self.end += 1;
    }

    pub(crate) fn shift_down(&mut self) {
        debug_assert!(self.begin > 0);
        self.begin -= 1;
        self.end -= 1;
    }
}

/// Checks that `groups` are sorted, non-overlapping and contiguously cover `0..total`.
pub fn check_partition(groups: &[Group], total: usize) -> Result<(), PartitionError> {
    let mut expected = 0;
    for group in groups {
        if group.begin > group.end {
            return Err(PartitionError::Inverted {
                name: group.name.clone(),
                begin: group.begin,
                end: group.end,
            });
        }
        if group.begin != expected {
            return Err(PartitionError::Gap {
                name: group.name.clone(),
                begin: group.begin,
                expected,
            });
        }
        expected = group.end;
    }
    if expected != total {
        return Err(PartitionError::Coverage {
            covered: expected,
            total,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_reports_range_and_membership() {
        let g = Group::new("salt", 3..7);
        assert_eq!(g.len(), 4);
        assert!(g.contains(3));
        assert!(!g.contains(7));
        assert_eq!(g.absolute(2), 5);
        assert_eq!(g.name(), "salt");
    }

    #[test]
    fn check_partition_accepts_contiguous_layout_with_empty_groups() {
        let groups = vec![
            Group::new("a", 0..2),
            Group::new("b", 2..2),
            Group::new("c", 2..5),
        ];
        assert!(check_partition(&groups, 5).is_ok());
    }

    #[test]
    fn check_partition_detects_gaps_overlaps_and_incomplete_coverage() {
        let gap = vec![Group::new("a", 0..2), Group::new("b", 3..5)];
        assert!(matches!(
            check_partition(&gap, 5),
            Err(PartitionError::Gap { begin: 3, .. })
        ));

        let overlap = vec![Group::new("a", 0..3), Group::new("b", 2..5)];
        assert!(matches!(
            check_partition(&overlap, 5),
            Err(PartitionError::Gap { .. })
        ));

        let short = vec![Group::new("a", 0..3)];
        assert!(matches!(
            check_partition(&short, 5),
            Err(PartitionError::Coverage { covered: 3, total: 5 })
        ));
    }
}
