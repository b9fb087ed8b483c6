use std::collections::BTreeSet;

/// Every subset of a list of ids, enumerated by bitmask from the empty set to the full set
///
/// Subset `mask` holds the ids whose position bit is set, so the order is stable for a
/// given input order.
#[derive(Debug, Clone)]
pub struct PowerSet<'a> {
    ids: &'a [String],
    next: u64,
    end: u64,
}

impl<'a> PowerSet<'a> {
    /// `None` when the set is too large to enumerate (64 ids or more)
    pub fn new(ids: &'a [String]) -> Option<Self> {
        if ids.len() >= 64 {
            return None;
        }
        Some(Self {
            ids,
            next: 0,
            end: 1u64 << ids.len(),
        })
    }

    /// Number of subsets, `2^n`
    pub fn size(&self) -> u64 {
        self.end
    }
}

impl<'a> Iterator for PowerSet<'a> {
    type Item = BTreeSet<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let mask = self.next;
        self.next += 1;
        Some(
            self.ids
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1u64 << i) != 0)
                .map(|(_, id)| id.clone())
                .collect(),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next) as usize;
        (remaining, Some(remaining))
    }
}
