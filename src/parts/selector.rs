//! Deterministic part selection.
//!
//! Two strategies are kept side by side because each avatar family has
//! always used exactly one of them. Switching a family to the other strategy
//! would change every avatar it has ever produced.
//!
//! - [`SeededSelector`] draws from a [`SeedRng`] stream seeded from the identity
//!   seed. A new selector is built for every `build()` call and consumed by
//!   it, so no state survives between seeds.
//! - [`DigitSelector`] reads a fixed-width hex number straight out of the
//!   seed at a per-category offset. It has no state at all.

use super::PartCatalog;
use crate::error::{AvatarError, AvatarResult};
use crate::rng::SeedRng;

/// Picks an index into a category's candidate list.
pub trait PartSelector {
    /// Returns an index in `0..count` for `category`.
    ///
    /// Fails with [`AvatarError::PartsNotFound`] when `count` is zero.
    fn part_index(&mut self, category: &str, count: usize) -> AvatarResult<usize>;
}

/// One chosen part per category, in the order the categories were requested.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartSelection {
    chosen: Vec<(String, String)>,
}

impl PartSelection {
    /// The part chosen for `category`.
    pub fn get(&self, category: &str) -> Option<&str> {
        self.chosen
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, part)| part.as_str())
    }

    /// Iterates over `(category, part)` pairs in selection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.chosen.iter().map(|(c, p)| (c.as_str(), p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.chosen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }
}

/// Chooses one part per category from `catalog`.
///
/// Categories are visited in the order given, which fixes the order in which
/// a stateful selector consumes its stream.
pub fn select_parts<S: PartSelector + ?Sized>(
    selector: &mut S,
    catalog: &PartCatalog,
    categories: &[&str],
) -> AvatarResult<PartSelection> {
    let mut chosen = Vec::with_capacity(categories.len());
    for &category in categories {
        let parts = catalog.parts(category);
        let index = selector.part_index(category, parts.len())?;
        chosen.push((category.to_string(), parts[index].clone()));
    }
    Ok(PartSelection { chosen })
}

// ============================================================================
// SeededSelector
// ============================================================================

/// Selector backed by a seeded [`SeedRng`] stream.
#[derive(Debug, Clone)]
pub struct SeededSelector {
    rng: SeedRng,
}

impl SeededSelector {
    /// Seeds the stream from the SHA-256 digest of `seed`.
    pub fn new(seed: &str) -> Self {
        Self {
            rng: SeedRng::from_seed_str(seed),
        }
    }

    /// The underlying stream, for draws that are not part indices (colors).
    pub fn rng(&mut self) -> &mut SeedRng {
        &mut self.rng
    }

    /// Draws a number in `min..=max`.
    pub fn random_in(&mut self, min: u32, max: u32) -> u32 {
        self.rng.range_inclusive(min, max)
    }
}

impl PartSelector for SeededSelector {
    fn part_index(&mut self, category: &str, count: usize) -> AvatarResult<usize> {
        if count == 0 {
            return Err(AvatarError::parts_not_found(category));
        }
        Ok(self.rng.below(count as u64) as usize)
    }
}

// ============================================================================
// DigitSelector
// ============================================================================

/// Selector that reads its choices directly from the seed's hex digits.
#[derive(Debug, Clone, Copy)]
pub struct DigitSelector<'a> {
    seed: &'a str,
    offsets: &'a [(&'a str, usize)],
    digits: usize,
}

impl<'a> DigitSelector<'a> {
    /// Creates a selector reading `digits` hex digits at the offset listed
    /// for each category in `offsets`.
    pub fn new(seed: &'a str, offsets: &'a [(&'a str, usize)], digits: usize) -> Self {
        Self {
            seed,
            offsets,
            digits,
        }
    }

    /// Reads `len` hex digits of the seed starting at `offset`.
    pub fn value(&self, offset: usize, len: usize) -> AvatarResult<u64> {
        seed_value(self.seed, offset, len)
    }

    /// The offset configured for `category`.
    pub fn offset_of(&self, category: &str) -> Option<usize> {
        self.offsets
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, offset)| *offset)
    }
}

impl PartSelector for DigitSelector<'_> {
    fn part_index(&mut self, category: &str, count: usize) -> AvatarResult<usize> {
        if count == 0 {
            return Err(AvatarError::parts_not_found(category));
        }
        let offset = self.offset_of(category).ok_or_else(|| {
            AvatarError::invalid_seed(self.seed, format!("no seed offset for category `{category}`"))
        })?;
        let value = self.value(offset, self.digits)?;
        Ok((value % count as u64) as usize)
    }
}

/// Interprets `len` hex digits of `seed` starting at `offset` as a number.
pub fn seed_value(seed: &str, offset: usize, len: usize) -> AvatarResult<u64> {
    if len == 0 || len > 16 {
        return Err(AvatarError::invalid_seed(seed, format!("cannot read {len} digits")));
    }
    let digits = seed.get(offset..offset + len).ok_or_else(|| {
        AvatarError::invalid_seed(seed, format!("too short for {len} digits at offset {offset}"))
    })?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AvatarError::invalid_seed(seed, format!("`{digits}` is not hexadecimal")));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|_| AvatarError::invalid_seed(seed, format!("`{digits}` is not hexadecimal")))
}
