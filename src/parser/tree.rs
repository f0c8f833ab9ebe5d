use alloc::string::String;
use alloc::vec::Vec;

/// Head of a token with the label of the arc.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Head {
    /// Token id of the head
    pub id: usize,

    /// Dependency label
    pub label: String,
}

impl Head {
    /// Creates a new head.
    pub fn new<S>(id: usize, label: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// Labeled dependency arcs over a sentence, one optional head per token.
///
/// Token 0 is the artificial root and never has a head.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DependencyTree {
    heads: Vec<Option<Head>>,
}

impl DependencyTree {
    /// Creates a tree of `len` tokens (root included) without arcs.
    pub fn new(len: usize) -> Self {
        Self {
            heads: vec![None; len],
        }
    }

    /// Returns the number of tokens including the root.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    /// Returns `true` if the tree has no token, not even the root.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Gets the heads indexed by token id.
    #[inline(always)]
    pub fn heads(&self) -> &[Option<Head>] {
        &self.heads
    }

    /// Gets the head of a token.
    #[inline(always)]
    pub fn head(&self, id: usize) -> Option<&Head> {
        self.heads.get(id).and_then(Option::as_ref)
    }

    /// Gets the head id of a token.
    #[inline(always)]
    pub fn head_id(&self, id: usize) -> Option<usize> {
        self.head(id).map(|h| h.id)
    }

    /// Returns `true` if the token has a head.
    #[inline(always)]
    pub fn has_head(&self, id: usize) -> bool {
        self.head(id).is_some()
    }

    /// Sets the head of a token, replacing the previous one.
    pub fn set_head<S>(&mut self, id: usize, head: usize, label: S)
    where
        S: Into<String>,
    {
        self.heads[id] = Some(Head::new(head, label));
    }

    /// Removes the head of a token.
    pub fn clear_head(&mut self, id: usize) {
        self.heads[id] = None;
    }

    /// Returns `true` if `ancestor` is `id` itself or is reached from `id` by
    /// following heads.
    pub fn is_ancestor(&self, ancestor: usize, id: usize) -> bool {
        let mut cur = id;
        // a walk longer than the sentence is inside a cycle
        for _ in 0..=self.len() {
            if cur == ancestor {
                return true;
            }
            match self.head_id(cur) {
                Some(h) => cur = h,
                None => return false,
            }
        }
        false
    }

    /// Returns the tokens of a cycle reachable through heads, if any.
    ///
    /// The cycle is listed in head order starting from its smallest id.
    pub fn find_cycle(&self) -> Option<Vec<usize>> {
        // 0: unvisited, 1: on the current path, 2: done
        let mut marks = vec![0u8; self.len()];
        for start in 0..self.len() {
            let mut path = vec![];
            let mut cur = start;
            let closed_at = loop {
                if marks[cur] != 0 {
                    break (marks[cur] == 1).then_some(cur);
                }
                marks[cur] = 1;
                path.push(cur);
                match self.head_id(cur) {
                    Some(h) if h < self.len() => cur = h,
                    _ => break None,
                }
            };
            if let Some(cur) = closed_at {
                if let Some(pos) = path.iter().position(|&t| t == cur) {
                    let mut cycle = path.split_off(pos);
                    let min_pos = cycle
                        .iter()
                        .enumerate()
                        .min_by_key(|&(_, &t)| t)
                        .map_or(0, |(i, _)| i);
                    cycle.rotate_left(min_pos);
                    return Some(cycle);
                }
            }
            for t in path {
                marks[t] = 2;
            }
        }
        None
    }

    fn span(&self, id: usize) -> Option<(usize, usize)> {
        self.head_id(id).map(|h| (h.min(id), h.max(id)))
    }

    /// Returns `true` if the arc of `id` crosses another arc.
    fn is_non_projective(&self, id: usize) -> bool {
        let Some((l1, r1)) = self.span(id) else {
            return false;
        };
        (1..self.len()).any(|other| match self.span(other) {
            Some((l2, r2)) => (l1 < l2 && l2 < r1 && r1 < r2) || (l2 < l1 && l1 < r2 && r2 < r1),
            None => false,
        })
    }

    /// Returns the dependents whose arcs cross another arc, in id order.
    pub fn non_projective_arcs(&self) -> Vec<usize> {
        (1..self.len())
            .filter(|&id| self.is_non_projective(id))
            .collect()
    }

    /// Removes crossing arcs by lifting dependents to their grandparents and
    /// returns the number of lifts.
    ///
    /// Each step lifts the crossing arc with the largest span (the leftmost
    /// one on ties) whose head is not the root. A lift that would close a
    /// cycle is never made.
    ///
    /// On an acyclic tree of `n` tokens every lift lowers the summed depth of
    /// the tokens, so at most `n * (n - 1) / 2` lifts are made; this can be
    /// more than `n`. Input with cycles stops after `len * len` lifts.
    pub fn projectivize(&mut self) -> usize {
        let mut n_lifts = 0;
        let max_lifts = self.len() * self.len();
        while n_lifts < max_lifts {
            let mut target: Option<(usize, usize, usize)> = None;
            for id in self.non_projective_arcs() {
                let Some(head) = self.head_id(id) else {
                    continue;
                };
                let Some(grandparent) = self.head(head).map(|h| h.id) else {
                    continue;
                };
                if self.is_ancestor(id, grandparent) {
                    continue;
                }
                let span = head.abs_diff(id);
                if target.map_or(true, |(_, _, best)| span > best) {
                    target = Some((id, grandparent, span));
                }
            }
            let Some((id, grandparent, _)) = target else {
                break;
            };
            if let Some(head) = self.heads[id].as_mut() {
                head.id = grandparent;
            }
            n_lifts += 1;
        }
        if n_lifts != 0 {
            log::debug!("projectivized with {} lifts", n_lifts);
        }
        n_lifts
    }

    /// Counts the tokens whose head and label both agree with `gold`.
    pub fn count_matches(&self, gold: &Self) -> usize {
        (1..self.len().min(gold.len()))
            .filter(|&id| match (self.head(id), gold.head(id)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(heads: &[(usize, &str)]) -> DependencyTree {
        let mut t = DependencyTree::new(heads.len() + 1);
        for (i, &(h, l)) in heads.iter().enumerate() {
            t.set_head(i + 1, h, l);
        }
        t
    }

    #[test]
    fn test_is_ancestor() {
        let t = tree(&[(2, "det"), (3, "nsubj"), (0, "root")]);
        assert!(t.is_ancestor(3, 1));
        assert!(t.is_ancestor(0, 1));
        assert!(t.is_ancestor(2, 2));
        assert!(!t.is_ancestor(1, 3));
    }

    #[test]
    fn test_find_cycle() {
        let t = tree(&[(2, "a"), (3, "b"), (0, "root")]);
        assert_eq!(None, t.find_cycle());

        let mut t = tree(&[(0, "root"), (4, "a"), (2, "b"), (3, "c")]);
        assert_eq!(Some(vec![2, 4, 3]), t.find_cycle());
        t.set_head(2, 1, "a");
        assert_eq!(None, t.find_cycle());
    }

    #[test]
    fn test_projectivize_lifts_largest_span() {
        // 1 <- 2 <- root, 3 <- 1, 4 <- 2: the arcs of 3 and 4 cross
        let mut t = tree(&[(2, "a"), (0, "root"), (1, "b"), (2, "c")]);
        assert_eq!(vec![2, 3, 4], t.non_projective_arcs());

        assert_eq!(1, t.projectivize());
        assert_eq!(Some(2), t.head_id(3));
        assert_eq!("b", t.head(3).unwrap().label);
        assert!(t.non_projective_arcs().is_empty());
    }

    #[cfg(feature = "train")]
    #[test]
    fn test_projectivize_random_trees() {
        use rand::seq::SliceRandom;
        use rand::{Rng, SeedableRng};
        use rand_chacha::ChaCha8Rng;

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut n_non_projective = 0;
        for _ in 0..500 {
            let n = rng.gen_range(3..14usize);
            let mut order: Vec<usize> = (1..=n).collect();
            order.shuffle(&mut rng);
            let mut t = DependencyTree::new(n + 1);
            let mut attached = vec![0];
            for id in order {
                let head = attached[rng.gen_range(0..attached.len())];
                t.set_head(id, head, "x");
                attached.push(id);
            }
            if t.non_projective_arcs().is_empty() {
                continue;
            }
            n_non_projective += 1;

            let n_lifts = t.projectivize();
            // every lift lowers the summed depth of the tokens by at least 1
            assert!((1..=n * (n - 1) / 2).contains(&n_lifts), "{n_lifts} lifts for {n} tokens");
            assert!(t.non_projective_arcs().is_empty());
            assert_eq!(None, t.find_cycle());
            assert!((1..=n).all(|i| t.has_head(i)));
        }
        assert!(n_non_projective >= 50, "{n_non_projective}");
    }

    #[test]
    fn test_projective_tree_unchanged() {
        let mut t = tree(&[(2, "det"), (3, "nsubj"), (0, "root"), (5, "det"), (3, "obj")]);
        let before = t.clone();
        assert_eq!(0, t.projectivize());
        assert_eq!(before, t);
    }

    #[test]
    fn test_count_matches() {
        let gold = tree(&[(2, "det"), (3, "nsubj"), (0, "root"), (5, "det"), (3, "obj")]);
        let mut t = gold.clone();
        assert_eq!(5, t.count_matches(&gold));
        t.set_head(5, 4, "obj");
        t.set_head(4, 5, "amod");
        t.clear_head(1);
        assert_eq!(2, t.count_matches(&gold));
    }
}
