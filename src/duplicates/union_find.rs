//! Disjoint-set forest over element indices `0..n`.
//!
//! Union by rank with path halving. Both grouping modes build their
//! partition here, then keep only the classes with two or more members.

/// A disjoint-set forest.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    /// `n` singleton sets.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Representative of the set containing `x`.
    ///
    /// # Panics
    ///
    /// Panics if `x >= self.len()`.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            let grandparent = self.parent[self.parent[x]];
            self.parent[x] = grandparent;
            x = grandparent;
        }
        x
    }

    /// Merge the sets containing `a` and `b`. Returns `false` if they were
    /// already one set.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
            }
        }
        true
    }

    /// Whether `a` and `b` are in the same set.
    pub fn same(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Every set as a list of ascending indices, ordered by smallest member.
    pub fn classes(&mut self) -> Vec<Vec<usize>> {
        let n = self.len();
        let mut slot_of_root: Vec<Option<usize>> = vec![None; n];
        let mut classes: Vec<Vec<usize>> = Vec::new();

        for i in 0..n {
            let root = self.find(i);
            match slot_of_root[root] {
                Some(slot) => classes[slot].push(i),
                None => {
                    slot_of_root[root] = Some(classes.len());
                    classes.push(vec![i]);
                }
            }
        }
        classes
    }
}
