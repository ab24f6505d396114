//! Downsampling of long memory-level enumerations.
//!
//! Both samplers take any restartable sequence (anything `IntoIterator +
//! Clone`, such as [`MemoryLevels`](crate::levels::MemoryLevels) or a
//! slice), make one pass to count it and a second to pick elements, and
//! keep the source order.

/// Pick `num` elements spaced as evenly as integer arithmetic allows.
///
/// With `length = q * num + r`, the first `num - r` gaps are `q` wide
/// and the rest `q + 1`; the last pick is always the last element.
/// Sequences shorter than `num` come back whole. `num == 1` returns the
/// first element and `num == 0` returns nothing.
pub fn bounded_mem_levels<I>(source: I, num: usize) -> Vec<I::Item>
where
    I: IntoIterator + Clone,
{
    if num == 0 {
        return Vec::new();
    }
    if num == 1 {
        return source.into_iter().take(1).collect();
    }

    let length = source.clone().into_iter().count();
    if length <= num {
        return source.into_iter().collect();
    }

    let (quanta, rem) = (length / num, length % num);
    let even_gaps = num - rem;
    let index_of = |k: usize| {
        if k == num - 1 {
            length - 1
        } else {
            k * quanta + k.saturating_sub(even_gaps)
        }
    };

    let mut picked = Vec::with_capacity(num);
    let mut k = 0;
    for (i, item) in source.into_iter().enumerate() {
        if k < num && i == index_of(k) {
            picked.push(item);
            k += 1;
        }
    }
    picked
}

/// Coarse sampling over most of the sequence, every element of the tail.
///
/// The trailing `highres` elements come back verbatim. From the leading
/// `length - highres` elements every `(length - highres) / lowres`-th is
/// kept, starting with the first (a stride of at least one). With
/// `lowres == 0` the leading region contributes nothing.
pub fn massive_levels<I>(source: I, lowres: usize, highres: usize) -> Vec<I::Item>
where
    I: IntoIterator + Clone,
{
    let length = source.clone().into_iter().count();
    let coarse = length.saturating_sub(highres);

    let mut picked = Vec::with_capacity(lowres.min(coarse) + highres.min(length));
    let mut items = source.into_iter();

    if lowres > 0 {
        let stride = (coarse / lowres).max(1);
        picked.extend(
            items
                .by_ref()
                .take(coarse)
                .enumerate()
                .filter(|(i, _)| i % stride == 0)
                .map(|(_, item)| item),
        );
    } else {
        items.by_ref().take(coarse).for_each(drop);
    }

    picked.extend(items);
    picked
}
