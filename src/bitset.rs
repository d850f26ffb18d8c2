//! Word-backed bitset shared by the parsimony scorer and the split snapshots.
//!
//! # Overview
//! Two different things are stored as bitsets in this crate:
//! - **Candidate state sets** during Fitch scoring: bit `b` is set when the
//!   character with byte value `b` is a candidate state. Four words cover
//!   every byte value.
//! - **Leaf clusters** for Robinson–Foulds: bit `i` is set when the leaf with
//!   index `i` lies below a node.
//!
//! # Example
//! For the states `{A, C}`:
//! - `A` is byte 65 → bit 1 of word 1
//! - `C` is byte 67 → bit 3 of word 1
//!
//! Intersection and union are then plain `&` and `|` over the words.

/// A compact bitset. Bits live in `Vec<u64>` words, 64 bits per word.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Creates a new bitset with all bits set to 0.
    ///
    /// # Parameters
    /// - `words`: Number of u64 words needed. Calculate as `bits.div_ceil(64)`
    ///
    /// # Example
    /// ```
    /// # use rust_python_parsimony::bitset::Bitset;
    /// let bs = Bitset::zeros(2);
    /// assert_eq!(bs.0.len(), 2);
    /// assert!(bs.is_empty());
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Sets the bit at the given index to 1.
    ///
    /// # Example
    /// ```
    /// # use rust_python_parsimony::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(5);
    /// assert_eq!(bs.0[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        let word = idx >> 6;
        let bit = idx & 63;
        self.0[word] |= 1u64 << bit;
    }

    /// Returns true when the bit at `idx` is set. Indices past the end are unset.
    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        let word = idx >> 6;
        let bit = idx & 63;
        self.0.get(word).is_some_and(|w| (w >> bit) & 1 == 1)
    }

    /// Union in place: `self` becomes `self ∪ other`.
    ///
    /// # Example
    /// ```
    /// # use rust_python_parsimony::bitset::Bitset;
    /// let mut left = Bitset::zeros(1);
    /// left.set(0);
    ///
    /// let mut right = Bitset::zeros(1);
    /// right.set(1);
    ///
    /// left.or_assign(&right);
    /// assert_eq!(left.0[0], 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Intersection in place: `self` becomes `self ∩ other`.
    ///
    /// Words of `self` past the end of `other` are cleared.
    ///
    /// # Example
    /// ```
    /// # use rust_python_parsimony::bitset::Bitset;
    /// let mut left = Bitset::zeros(1);
    /// left.set(0);
    /// left.set(1);
    ///
    /// let mut right = Bitset::zeros(1);
    /// right.set(1);
    /// right.set(2);
    ///
    /// left.and_assign(&right);
    /// assert_eq!(left.0[0], 0b010);
    /// ```
    #[inline]
    pub fn and_assign(&mut self, other: &Bitset) {
        for (i, a) in self.0.iter_mut().enumerate() {
            *a &= other.0.get(i).copied().unwrap_or(0);
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    /// Counts the number of set bits (population count).
    ///
    /// # Example
    /// ```
    /// # use rust_python_parsimony::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(2);
    /// bs.set(5);
    /// assert_eq!(bs.count_ones(), 3);
    /// ```
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates over the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(w, &word)| {
            (0..64).filter(move |b| (word >> b) & 1 == 1).map(move |b| (w << 6) | b)
        })
    }

    /// Complement restricted to the first `len` bits; bits at or past `len` stay 0.
    ///
    /// # Example
    /// ```
    /// # use rust_python_parsimony::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(1);
    /// assert_eq!(bs.complement(4).0[0], 0b1100);
    /// ```
    pub fn complement(&self, len: usize) -> Bitset {
        let mut out = Bitset::zeros(self.0.len());
        for (i, (dst, src)) in out.0.iter_mut().zip(&self.0).enumerate() {
            let lo = i << 6;
            if lo >= len {
                break;
            }
            let valid = len - lo;
            let mask = if valid >= 64 { u64::MAX } else { (1u64 << valid) - 1 };
            *dst = !*src & mask;
        }
        out
    }
}
