//! Myers O(ND) sequence alignment shared by the text and structural engines.
//!
//! Linear-space variant: each range is split at the middle snake of its
//! shortest edit script and both halves are solved recursively. Only two
//! diagonal vectors of `O(N + M)` entries are kept, whatever the edit
//! distance.

use std::ops::{Index, IndexMut, Range};

/// One step of an alignment between `old` and `new`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edit {
    /// `old[old] == new[new]`
    Equal { old: usize, new: usize },
    /// `old[old]` has no counterpart
    Delete { old: usize },
    /// `new[new]` has no counterpart
    Insert { new: usize },
}

/// Align two sequences, returning edits in sequence order
pub(crate) fn diff<T: PartialEq>(old: &[T], new: &[T]) -> Vec<Edit> {
    let max_d = max_d(old.len(), new.len());
    let mut search = Search {
        old,
        new,
        forward: Diagonals::new(max_d),
        backward: Diagonals::new(max_d),
        edits: Vec::with_capacity(old.len().max(new.len())),
    };
    search.conquer(0..old.len(), 0..new.len());
    search.edits
}

/// Upper bound on the number of rounds a middle-snake search needs
fn max_d(n: usize, m: usize) -> usize {
    (n + m + 1) / 2 + 1
}

/// Furthest-reaching x per diagonal `k`, indexed by signed `k`
struct Diagonals {
    offset: isize,
    v: Vec<usize>,
}

impl Diagonals {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize,
            v: vec![0; 2 * max_d + 1],
        }
    }
}

impl Index<isize> for Diagonals {
    type Output = usize;

    fn index(&self, k: isize) -> &usize {
        &self.v[(k + self.offset) as usize]
    }
}

impl IndexMut<isize> for Diagonals {
    fn index_mut(&mut self, k: isize) -> &mut usize {
        &mut self.v[(k + self.offset) as usize]
    }
}

struct Search<'s, T> {
    old: &'s [T],
    new: &'s [T],
    forward: Diagonals,
    backward: Diagonals,
    edits: Vec<Edit>,
}

impl<T: PartialEq> Search<'_, T> {
    fn conquer(&mut self, mut old: Range<usize>, mut new: Range<usize>) {
        let prefix = self.common_prefix(old.clone(), new.clone());
        for i in 0..prefix {
            self.edits.push(Edit::Equal {
                old: old.start + i,
                new: new.start + i,
            });
        }
        old.start += prefix;
        new.start += prefix;

        let suffix = self.common_suffix(old.clone(), new.clone());
        old.end -= suffix;
        new.end -= suffix;

        if old.is_empty() {
            self.edits.extend(new.clone().map(|new| Edit::Insert { new }));
        } else if new.is_empty() {
            self.edits.extend(old.clone().map(|old| Edit::Delete { old }));
        } else if let Some((x, y)) = self.middle_snake(old.clone(), new.clone()) {
            self.conquer(old.start..x, new.start..y);
            self.conquer(x..old.end, y..new.end);
        } else {
            self.edits.extend(old.clone().map(|old| Edit::Delete { old }));
            self.edits.extend(new.clone().map(|new| Edit::Insert { new }));
        }

        for i in 0..suffix {
            self.edits.push(Edit::Equal {
                old: old.end + i,
                new: new.end + i,
            });
        }
    }

    fn common_prefix(&self, old: Range<usize>, new: Range<usize>) -> usize {
        self.old[old]
            .iter()
            .zip(&self.new[new])
            .take_while(|(a, b)| a == b)
            .count()
    }

    fn common_suffix(&self, old: Range<usize>, new: Range<usize>) -> usize {
        self.old[old]
            .iter()
            .rev()
            .zip(self.new[new].iter().rev())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Split point of the shortest edit script between the two ranges.
    ///
    /// Forward and backward searches run in lockstep until their
    /// furthest-reaching paths overlap; the snake where they meet divides
    /// the script into two halves of roughly equal edit distance.
    fn middle_snake(&mut self, old: Range<usize>, new: Range<usize>) -> Option<(usize, usize)> {
        let n = old.len();
        let m = new.len();
        let delta = n as isize - m as isize;
        let odd = delta & 1 == 1;

        self.forward[1] = 0;
        self.backward[1] = 0;

        for d in 0..max_d(n, m) as isize {
            for k in (-d..=d).rev().step_by(2) {
                let mut x = if k == -d || (k != d && self.forward[k - 1] < self.forward[k + 1]) {
                    self.forward[k + 1]
                } else {
                    self.forward[k - 1] + 1
                };
                let y = (x as isize - k) as usize;
                let (x0, y0) = (x, y);
                if x < n && y < m {
                    x += self.common_prefix(old.start + x..old.end, new.start + y..new.end);
                }
                self.forward[k] = x;

                if odd
                    && (k - delta).abs() <= d - 1
                    && self.forward[k] + self.backward[-(k - delta)] >= n
                {
                    return Some((old.start + x0, new.start + y0));
                }
            }

            for k in (-d..=d).rev().step_by(2) {
                let mut x = if k == -d || (k != d && self.backward[k - 1] < self.backward[k + 1]) {
                    self.backward[k + 1]
                } else {
                    self.backward[k - 1] + 1
                };
                let mut y = (x as isize - k) as usize;
                if x < n && y < m {
                    let advance = self.common_suffix(
                        old.start..old.start + n - x,
                        new.start..new.start + m - y,
                    );
                    x += advance;
                    y += advance;
                }
                self.backward[k] = x;

                if !odd
                    && (k - delta).abs() <= d
                    && self.backward[k] + self.forward[-(k - delta)] >= n
                {
                    return Some((old.start + n - x, new.start + m - y));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(old: &[char], new: &[char], edits: &[Edit]) -> Vec<char> {
        let mut out = Vec::new();
        for edit in edits {
            match *edit {
                Edit::Equal { old: i, new: j } => {
                    assert_eq!(old[i], new[j]);
                    out.push(new[j]);
                }
                Edit::Insert { new: j } => out.push(new[j]),
                Edit::Delete { .. } => {}
            }
        }
        out
    }

    fn edit_count(edits: &[Edit]) -> usize {
        edits
            .iter()
            .filter(|e| !matches!(e, Edit::Equal { .. }))
            .count()
    }

    #[test]
    fn test_identical_sequences_are_all_equal() {
        let a: Vec<char> = "abcdef".chars().collect();
        let edits = diff(&a, &a);
        assert_eq!(edits.len(), 6);
        assert_eq!(edit_count(&edits), 0);
    }

    #[test]
    fn test_classic_example_is_minimal() {
        let a: Vec<char> = "ABCABBA".chars().collect();
        let b: Vec<char> = "CBABAC".chars().collect();
        let edits = diff(&a, &b);
        assert_eq!(edit_count(&edits), 5);
        assert_eq!(apply(&a, &b, &edits), b);
    }

    #[test]
    fn test_empty_sides() {
        let a: Vec<char> = Vec::new();
        let b: Vec<char> = "xy".chars().collect();
        assert_eq!(diff(&a, &b), vec![Edit::Insert { new: 0 }, Edit::Insert { new: 1 }]);
        assert_eq!(diff(&b, &a), vec![Edit::Delete { old: 0 }, Edit::Delete { old: 1 }]);
        assert!(diff(&a, &a).is_empty());
    }

    #[test]
    fn test_edits_reconstruct_target() {
        let cases = [
            ("kitten", "sitting"),
            ("abc", "xyz"),
            ("aaaa", "aa"),
            ("a", "baaab"),
            ("the quick brown", "quick brown fox"),
        ];
        for (from, to) in cases {
            let a: Vec<char> = from.chars().collect();
            let b: Vec<char> = to.chars().collect();
            let edits = diff(&a, &b);
            assert_eq!(apply(&a, &b, &edits), b, "{} -> {}", from, to);

            let deleted = edits.iter().filter(|e| matches!(e, Edit::Delete { .. })).count();
            let inserted = edits.iter().filter(|e| matches!(e, Edit::Insert { .. })).count();
            assert_eq!(a.len() - deleted, b.len() - inserted);
        }
    }

    /// Edit distance from a dynamic-programming LCS
    fn lcs_distance(a: &[u8], b: &[u8]) -> usize {
        let mut row = vec![0usize; b.len() + 1];
        for &x in a {
            let mut diag = 0;
            for (j, &y) in b.iter().enumerate() {
                let above = row[j + 1];
                row[j + 1] = if x == y { diag + 1 } else { above.max(row[j]) };
                diag = above;
            }
        }
        a.len() + b.len() - 2 * row[b.len()]
    }

    #[test]
    fn test_matches_lcs_distance_on_generated_inputs() {
        let mut seed = 0x2545_f491_u32;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed
        };

        for _ in 0..200 {
            let a: Vec<u8> = (0..next() % 24).map(|_| b'a' + (next() % 4) as u8).collect();
            let b: Vec<u8> = (0..next() % 24).map(|_| b'a' + (next() % 4) as u8).collect();
            let edits = diff(&a, &b);

            let mut out = Vec::new();
            let (mut i, mut j) = (0, 0);
            for edit in &edits {
                match *edit {
                    Edit::Equal { old, new } => {
                        assert_eq!((old, new), (i, j));
                        assert_eq!(a[old], b[new]);
                        out.push(b[new]);
                        i += 1;
                        j += 1;
                    }
                    Edit::Delete { old } => {
                        assert_eq!(old, i);
                        i += 1;
                    }
                    Edit::Insert { new } => {
                        assert_eq!(new, j);
                        out.push(b[new]);
                        j += 1;
                    }
                }
            }
            assert_eq!(out, b);
            assert_eq!((i, j), (a.len(), b.len()));
            assert_eq!(edit_count(&edits), lcs_distance(&a, &b), "{:?} -> {:?}", a, b);
        }
    }

    #[test]
    fn test_large_disjoint_sequences() {
        let a: Vec<u32> = (0..20_000).collect();
        let b: Vec<u32> = (20_000..40_000).collect();
        let edits = diff(&a, &b);

        assert_eq!(edits.len(), 40_000);
        assert_eq!(edit_count(&edits), 40_000);
    }
}
