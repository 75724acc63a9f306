//! Sized, indexable sequences.

use std::collections::VecDeque;
use std::ops::Range;

/// A finite collection with a known size and random access by index.
///
/// `total` is read once when a traversal is created and must not change
/// while it runs. `None` means the collection cannot report a usable size;
/// traversals treat that as an empty sequence.
pub trait Sequence {
    /// Element produced for each index.
    type Item;

    /// Number of elements, if known.
    ///
    /// Traversals trust this value for their exact `size_hint`; a sequence
    /// whose `get` runs out early ends the traversal early, with a size hint
    /// that overstated the remaining items until then.
    fn total(&self) -> Option<usize>;

    /// Element at `index`. Only called with `index < total`.
    fn get(&self, index: usize) -> Option<Self::Item>;
}

impl<'a, T> Sequence for &'a [T] {
    type Item = &'a T;

    fn total(&self) -> Option<usize> {
        Some(self.len())
    }

    fn get(&self, index: usize) -> Option<&'a T> {
        let items: &'a [T] = *self;
        items.get(index)
    }
}

impl<'a, T, const N: usize> Sequence for &'a [T; N] {
    type Item = &'a T;

    fn total(&self) -> Option<usize> {
        Some(N)
    }

    fn get(&self, index: usize) -> Option<&'a T> {
        let items: &'a [T; N] = *self;
        items.as_slice().get(index)
    }
}

impl<'a, T> Sequence for &'a Vec<T> {
    type Item = &'a T;

    fn total(&self) -> Option<usize> {
        Some(self.len())
    }

    fn get(&self, index: usize) -> Option<&'a T> {
        let items: &'a Vec<T> = *self;
        items.as_slice().get(index)
    }
}

impl<'a, T> Sequence for &'a VecDeque<T> {
    type Item = &'a T;

    fn total(&self) -> Option<usize> {
        Some(self.len())
    }

    fn get(&self, index: usize) -> Option<&'a T> {
        let items: &'a VecDeque<T> = *self;
        items.get(index)
    }
}

/// Integer ranges yield their values, so `0..n` counts through `n` steps.
impl Sequence for Range<usize> {
    type Item = usize;

    fn total(&self) -> Option<usize> {
        Some(self.end.saturating_sub(self.start))
    }

    fn get(&self, index: usize) -> Option<usize> {
        let len = self.end.saturating_sub(self.start);
        (index < len).then(|| self.start + index)
    }
}

/// A sequence backed by a closure from index to element.
///
/// Built with [`from_fn`] when the size is known, or [`unsized_fn`] when it
/// is not.
#[derive(Debug, Clone)]
pub struct FromFn<F> {
    total: Option<usize>,
    f: F,
}

impl<T, F> Sequence for FromFn<F>
where
    F: Fn(usize) -> T,
{
    type Item = T;

    fn total(&self) -> Option<usize> {
        self.total
    }

    fn get(&self, index: usize) -> Option<T> {
        let total = self.total?;
        (index < total).then(|| (self.f)(index))
    }
}

/// Sequence of `total` elements produced by `f(index)`.
pub fn from_fn<T, F>(total: usize, f: F) -> FromFn<F>
where
    F: Fn(usize) -> T,
{
    FromFn {
        total: Some(total),
        f,
    }
}

/// Sequence with no usable size. Traversals over it yield nothing.
pub fn unsized_fn<T, F>(f: F) -> FromFn<F>
where
    F: Fn(usize) -> T,
{
    FromFn { total: None, f }
}
