//! Dense claimed-bit space for (part, node position) pairs.
//!
//! Bit `group_size * part + node_pos` records that `part` has already been
//! placed on the worker at `node_pos`. When several workers share a host the
//! same replica matches each of them; the first claim wins.

#[derive(Clone, Debug)]
pub(crate) struct ClaimedParts {
    group_size: usize,
    words: Vec<u64>,
}

impl ClaimedParts {
    pub(crate) fn new(group_size: usize, parts: usize) -> Self {
        let bits = group_size.saturating_mul(parts);
        Self {
            group_size,
            words: vec![0; bits.div_ceil(64)],
        }
    }

    /// Set the bit for (`part`, `node_pos`), returning whether it was already set.
    pub(crate) fn test_and_set(&mut self, part: usize, node_pos: usize) -> bool {
        let bit = self.group_size * part + node_pos;
        let (word, mask) = (bit / 64, 1u64 << (bit % 64));
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        was_set
    }

    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
