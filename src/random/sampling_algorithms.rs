//! Algorithms for uniform random sampling from containers of known length. These are generic over
//! the container type so that callers can sample straight from a filtered index list or a range.

use crate::rand::seq::index::sample as choose_range;
use crate::rand::Rng;

/// Sample a random element uniformly from a container of known length.
///
/// We do not assume the container is randomly indexable, only that it can be iterated over.
pub fn sample_single_from_known_length<I, R, T>(rng: &mut R, mut iter: I) -> Option<T>
where
    R: Rng,
    I: ExactSizeIterator<Item = T>,
{
    let len = iter.len();
    if len == 0 {
        return None;
    }
    // Drawing a `u32` index is noticeably faster than a `usize` one.
    let index = rng.random_range(0..len as u32) as usize;
    iter.nth(index)
}

/// Sample multiple random elements uniformly without replacement from a container of known length.
/// If more samples are requested than the container holds, every element is returned.
///
/// Selected items are returned in the order the iterator yields them, which keeps downstream
/// processing independent of the order in which indexes were drawn.
pub fn sample_multiple_from_known_length<I, R, T>(rng: &mut R, iter: I, requested: usize) -> Vec<T>
where
    R: Rng,
    I: ExactSizeIterator<Item = T>,
{
    let requested = requested.min(iter.len());
    if requested == 0 {
        return Vec::new();
    }

    let mut indexes = choose_range(rng, iter.len(), requested).into_vec();
    indexes.sort_unstable();
    let mut index_iterator = indexes.into_iter();
    let mut next_idx = index_iterator.next();
    let mut selected = Vec::with_capacity(requested);

    for (idx, item) in iter.enumerate() {
        if Some(idx) == next_idx {
            selected.push(item);
            next_idx = index_iterator.next();
            if next_idx.is_none() {
                break;
            }
        }
    }

    selected
}
