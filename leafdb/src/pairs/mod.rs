//! Overlapping consecutive pairs over any iterator.
//!
//! `[a, b, c].pairs()` yields `(a, b), (b, c)`. Exactly one element is held
//! back between calls, and a pair is produced only after the base iterator
//! has produced its second element, so a blocking base (such as a stream of
//! directory signals) blocks the pair iterator at the same points.

/// Iterator adapter returned by [`PairsExt::pairs`].
#[derive(Debug, Clone)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Pairs<I: Iterator> {
    base: I,
    last: Option<I::Item>,
}

impl<I: Iterator> Pairs<I> {
    pub fn new(base: I) -> Self {
        Pairs { base, last: None }
    }

    pub fn into_inner(self) -> I {
        self.base
    }
}

impl<I> Iterator for Pairs<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = (I::Item, I::Item);

    fn next(&mut self) -> Option<Self::Item> {
        let previous = match self.last.take() {
            Some(previous) => previous,
            None => self.base.next()?,
        };
        let current = self.base.next()?;
        self.last = Some(current.clone());
        Some((previous, current))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.base.size_hint();
        let buffered = usize::from(self.last.is_some());
        let pairs = |n: usize| (n + buffered).saturating_sub(1);
        (pairs(lower), upper.map(pairs))
    }
}

pub trait PairsExt: Iterator + Sized {
    fn pairs(self) -> Pairs<Self>
    where
        Self::Item: Clone,
    {
        Pairs::new(self)
    }
}

impl<I: Iterator> PairsExt for I {}
