//! Decomposition of target atoms across the members of a partition.

use crate::error::{ScatterError, ScatterResult};
use std::ops::Range;

/// Contiguous slice of `total` units owned by one partition member.
///
/// The first `total % size` members get one extra unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    size: usize,
    rank: usize,
    total: usize,
}

impl Assignment {
    pub fn new(size: usize, rank: usize, total: usize) -> ScatterResult<Self> {
        if size == 0 {
            return Err(ScatterError::InvalidArgument(
                "partition must have at least one member".into(),
            ));
        }
        if rank >= size {
            return Err(ScatterError::InvalidArgument(format!(
                "rank {} is outside a partition of {} members",
                rank, size
            )));
        }
        Ok(Self { size, rank, total })
    }

    pub fn offset(&self) -> usize {
        let base = self.total / self.size;
        let extra = self.total % self.size;
        self.rank * base + self.rank.min(extra)
    }

    pub fn len(&self) -> usize {
        let base = self.total / self.size;
        let extra = self.total % self.size;
        base + usize::from(self.rank < extra)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        let offset = self.offset();
        offset..offset + self.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        let ranges: Vec<_> = (0..4).map(|r| Assignment::new(4, r, 12).unwrap().range()).collect();
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..12]);
    }

    #[test]
    fn test_uneven_split_covers_all() {
        let parts: Vec<_> = (0..3).map(|r| Assignment::new(3, r, 10).unwrap()).collect();
        assert_eq!(parts[0].range(), 0..4);
        assert_eq!(parts[1].range(), 4..7);
        assert_eq!(parts[2].range(), 7..10);
        assert_eq!(parts.iter().map(Assignment::len).sum::<usize>(), 10);
    }

    #[test]
    fn test_more_members_than_units() {
        let parts: Vec<_> = (0..5).map(|r| Assignment::new(5, r, 2).unwrap()).collect();
        assert_eq!(parts[0].range(), 0..1);
        assert_eq!(parts[1].range(), 1..2);
        assert!(parts[4].is_empty());
        assert_eq!(parts[4].range(), 2..2);
    }

    #[test]
    fn test_single_member() {
        let a = Assignment::new(1, 0, 7).unwrap();
        assert_eq!(a.range(), 0..7);
    }

    #[test]
    fn test_rank_outside_partition_rejected() {
        assert!(matches!(
            Assignment::new(2, 2, 10),
            Err(ScatterError::InvalidArgument(_))
        ));
        assert!(matches!(
            Assignment::new(0, 0, 10),
            Err(ScatterError::InvalidArgument(_))
        ));
    }
}
