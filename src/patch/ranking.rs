//! Bounded best-k collections used by the fuzzy locator.

/// Anything that can be ranked by a single numeric score.
pub trait Scored {
    fn score(&self) -> f64;
}

/// A line of some file and its distance to a reference line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMatch {
    /// 0-based line index
    pub index: usize,
    pub distance: usize,
}

impl LineMatch {
    pub fn new(index: usize, distance: usize) -> Self {
        Self { index, distance }
    }
}

impl Scored for LineMatch {
    fn score(&self) -> f64 {
        self.distance as f64
    }
}

/// A located region: 1-based inclusive line range and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeMatch {
    pub start: usize,
    pub end: usize,
    pub distance: f64,
}

impl Scored for CodeMatch {
    fn score(&self) -> f64 {
        self.distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    SmallerIsBetter,
    LargerIsBetter,
}

/// What happens when a full list meets an element equal to its worst one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiePolicy {
    /// The element already in the list stays.
    #[default]
    KeepFirst,
    /// The newcomer replaces it.
    KeepLatest,
}

/// Keeps the `limit` best elements seen so far, best first.
///
/// Elements with equal scores keep their insertion order.
#[derive(Debug, Clone)]
pub struct RankingList<T> {
    limit: usize,
    order: Order,
    ties: TiePolicy,
    items: Vec<T>,
}

impl<T: Scored> RankingList<T> {
    pub fn new(limit: usize) -> Self {
        Self::with_policy(limit, Order::default(), TiePolicy::default())
    }

    pub fn with_policy(limit: usize, order: Order, ties: TiePolicy) -> Self {
        Self {
            limit,
            order,
            ties,
            items: Vec::with_capacity(limit),
        }
    }

    /// Offer `item`; returns whether it was retained.
    pub fn add(&mut self, item: T) -> bool {
        if self.limit == 0 {
            return false;
        }

        if self.items.len() >= self.limit {
            let Some(worst) = self.worst() else {
                return false;
            };
            let admitted = match self.ties {
                TiePolicy::KeepFirst => self.better(&item, worst),
                TiePolicy::KeepLatest => !self.better(worst, &item),
            };
            if !admitted {
                return false;
            }
            self.items.pop();
        }

        let position = self
            .items
            .iter()
            .position(|existing| self.better(&item, existing))
            .unwrap_or(self.items.len());
        self.items.insert(position, item);
        true
    }

    /// `a` strictly outranks `b`.
    fn better(&self, a: &T, b: &T) -> bool {
        match self.order {
            Order::SmallerIsBetter => a.score() < b.score(),
            Order::LargerIsBetter => a.score() > b.score(),
        }
    }

    pub fn best(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn worst(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Scored> Extend<T> for RankingList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.add(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn matches(distances: &[usize]) -> Vec<LineMatch> {
        distances
            .iter()
            .enumerate()
            .map(|(index, &distance)| LineMatch::new(index, distance))
            .collect()
    }

    #[test]
    fn keeps_smallest_in_order() {
        let mut list = RankingList::new(3);
        list.extend(matches(&[5, 1, 4, 2, 3]));

        let kept: Vec<_> = list.as_slice().iter().map(|m| m.distance).collect();
        assert_eq!(kept, vec![1, 2, 3]);
        assert_eq!(list.best().map(|m| m.index), Some(1));
        assert_eq!(list.worst().map(|m| m.index), Some(4));
    }

    #[test]
    fn full_list_only_admits_items_better_than_worst() {
        let mut list = RankingList::new(2);
        list.extend(matches(&[1, 3]));

        assert!(!list.add(LineMatch::new(7, 4)));
        assert_eq!(list.worst().map(|m| m.distance), Some(3));
        assert!(list.add(LineMatch::new(8, 2)));
        assert_eq!(list.worst().map(|m| m.index), Some(8));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn ties_keep_first_by_default() {
        let mut list = RankingList::new(2);
        list.extend(matches(&[2, 2, 2]));

        let kept: Vec<_> = list.as_slice().iter().map(|m| m.index).collect();
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn ties_keep_latest_when_asked() {
        let mut list = RankingList::with_policy(2, Order::SmallerIsBetter, TiePolicy::KeepLatest);
        list.extend(matches(&[2, 2, 2]));

        let kept: Vec<_> = list.as_slice().iter().map(|m| m.index).collect();
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn larger_is_better() {
        let mut list = RankingList::with_policy(2, Order::LargerIsBetter, TiePolicy::KeepFirst);
        list.extend(matches(&[1, 9, 4, 7]));

        let kept: Vec<_> = list.as_slice().iter().map(|m| m.distance).collect();
        assert_eq!(kept, vec![9, 7]);
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let mut list = RankingList::new(0);
        assert!(!list.add(LineMatch::new(0, 0)));
        assert!(list.is_empty());
    }

    proptest! {
        #[test]
        fn retains_the_k_smallest(
            distances in proptest::collection::vec(0usize..50, 0..40),
            limit in 1usize..8,
        ) {
            let mut list = RankingList::new(limit);
            list.extend(matches(&distances));

            prop_assert_eq!(list.len(), distances.len().min(limit));

            let mut sorted = distances.clone();
            sorted.sort_unstable();
            let kept: Vec<usize> = list.as_slice().iter().map(|m| m.distance).collect();
            prop_assert_eq!(&kept[..], &sorted[..kept.len()]);
        }
    }
}
