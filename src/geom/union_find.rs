//! Disjoint-set over fragment indices, used to union clip islands and boundary pieces.

#[derive(Debug, Clone)]
pub(crate) struct UnionFind {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl UnionFind {
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            rank: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut cur = x;
        while self.parent[cur as usize] != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    /// Union by rank. Returns `true` if `a` and `b` were in different sets.
    pub fn union(&mut self, a: u32, b: u32) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let (ra_idx, rb_idx) = (ra as usize, rb as usize);
        match self.rank[ra_idx].cmp(&self.rank[rb_idx]) {
            std::cmp::Ordering::Less => self.parent[ra_idx] = rb,
            std::cmp::Ordering::Greater => self.parent[rb_idx] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb_idx] = ra;
                self.rank[ra_idx] = self.rank[ra_idx].saturating_add(1);
            }
        }
        true
    }

    /// Members of every set, each sorted ascending, ordered by their smallest member.
    #[allow(clippy::cast_possible_truncation)]
    pub fn groups(&mut self) -> Vec<Vec<u32>> {
        let mut by_root: std::collections::BTreeMap<u32, Vec<u32>> = std::collections::BTreeMap::new();
        let mut order: Vec<u32> = Vec::new();
        for i in 0..self.len() as u32 {
            let root = self.find(i);
            let members = by_root.entry(root).or_default();
            if members.is_empty() {
                order.push(root);
            }
            members.push(i);
        }
        order
            .into_iter()
            .filter_map(|root| by_root.remove(&root))
            .collect()
    }
}
