//! Ratcliff/Obershelp sequence similarity.
//!
//! Finds the longest common block, recurses on the pieces to its left and
//! right, and scores `2 * matched / (len(a) + len(b))`. Characters that are
//! very common in a long second sequence are left out of the lookup index
//! (they are still absorbed when a match is extended), which keeps large
//! page texts cheap to compare.

use std::collections::HashMap;

/// Second sequences shorter than this keep every character in the index
const POPULAR_MIN_LEN: usize = 200;

pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
    b2j: HashMap<char, Vec<usize>>,
}

/// A run of `size` equal characters at `a[i..]` and `b[j..]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Block {
    pub i: usize,
    pub j: usize,
    pub size: usize,
}

impl SequenceMatcher {
    pub fn new(a: &str, b: &str) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let b2j = index_positions(&b);
        Self { a, b, b2j }
    }

    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Block {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);

        // j2len[j] = length of the match ending at a[i - 1] and b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular characters are missing from the index; soak them up here
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        Block { i: besti, j: bestj, size: bestsize }
    }

    /// Non-overlapping matching blocks, ordered by position
    pub fn matching_blocks(&self) -> Vec<Block> {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let block = self.find_longest_match(alo, ahi, blo, bhi);
            if block.size == 0 {
                continue;
            }
            if alo < block.i && blo < block.j {
                queue.push((alo, block.i, blo, block.j));
            }
            if block.i + block.size < ahi && block.j + block.size < bhi {
                queue.push((block.i + block.size, ahi, block.j + block.size, bhi));
            }
            blocks.push(block);
        }

        blocks.sort_unstable();
        blocks
    }

    /// Similarity in [0, 1]; two empty sequences are identical (1.0)
    pub fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matched: usize = self.matching_blocks().iter().map(|block| block.size).sum();
        2.0 * matched as f64 / total as f64
    }
}

/// Convenience wrapper for a one-off comparison
pub fn ratio(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(a, b).ratio()
}

fn index_positions(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &ch) in b.iter().enumerate() {
        b2j.entry(ch).or_default().push(j);
    }

    if b.len() >= POPULAR_MIN_LEN {
        let ntest = b.len() / 100 + 1;
        b2j.retain(|_, positions| positions.len() <= ntest);
    }

    b2j
}
