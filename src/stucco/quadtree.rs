//! Quadtree over the unit UV tile.
//!
//! Every cell keeps the entries that straddle its midlines ("edge entries");
//! leaves keep the entries fully enclosed in them. When a child is created,
//! one link per ancestor records which of that ancestor's edge entries touch
//! the child, so a query only collects the ancestor edge entries relevant to
//! the leaves it reaches.

use crate::geom::{Tile, Uv, UvBox};

pub const DEFAULT_LEAF_CAPACITY: usize = 32;
pub const MAX_DEPTH: u32 = 16;

/// One indexed placement of a map face: the face shifted by `shift` overlaps the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexEntry {
    pub face: u32,
    pub shift: Tile,
}

/// A map face placed at an absolute tile translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    pub face: u32,
    pub translation: Tile,
}

#[derive(Debug, Clone, Copy)]
struct Item {
    entry: IndexEntry,
    bbox: UvBox,
}

#[derive(Debug, Clone)]
struct Link {
    ancestor: u32,
    items: Vec<u32>,
}

#[derive(Debug, Clone)]
struct Cell {
    bounds: UvBox,
    depth: u32,
    children: Option<[u32; 4]>,
    /// Enclosed items for leaves, edge items for internal cells.
    items: Vec<u32>,
    links: Vec<Link>,
}

#[derive(Debug, Clone)]
pub struct QuadTree {
    items: Vec<Item>,
    cells: Vec<Cell>,
    leaf_capacity: usize,
}

impl QuadTree {
    /// Builds the tree from entries and their boxes in local tile space.
    ///
    /// Boxes are clipped to the unit tile.
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(entries: impl IntoIterator<Item = (IndexEntry, UvBox)>, leaf_capacity: usize) -> Self {
        let items: Vec<Item> = entries
            .into_iter()
            .filter_map(|(entry, bbox)| bbox.intersection(UvBox::UNIT).map(|bbox| Item { entry, bbox }))
            .collect();
        let root = Cell {
            bounds: UvBox::UNIT,
            depth: 0,
            children: None,
            items: (0..items.len() as u32).collect(),
            links: Vec::new(),
        };
        let mut tree = Self {
            items,
            cells: vec![root],
            leaf_capacity: leaf_capacity.max(1),
        };
        let mut path = Vec::new();
        tree.subdivide(0, &mut path);
        tree
    }

    #[allow(clippy::cast_possible_truncation)]
    fn subdivide(&mut self, cell: u32, path: &mut Vec<u32>) {
        let (bounds, depth) = {
            let c = &self.cells[cell as usize];
            if c.items.len() <= self.leaf_capacity || c.depth >= MAX_DEPTH {
                return;
            }
            (c.bounds, c.depth)
        };
        let mid = bounds.center();

        let mut child_items: [Vec<u32>; 4] = Default::default();
        let mut edge_items = Vec::new();
        for &item in &self.cells[cell as usize].items {
            match quadrant_of(self.items[item as usize].bbox, mid) {
                Some(q) => child_items[q].push(item),
                None => edge_items.push(item),
            }
        }
        if child_items.iter().all(Vec::is_empty) {
            return;
        }

        self.cells[cell as usize].items = edge_items;
        path.push(cell);
        let first = self.cells.len() as u32;
        let mut children = [0u32; 4];
        for (q, items) in child_items.into_iter().enumerate() {
            let child_bounds = quadrant_bounds(bounds, mid, q);
            let links = path
                .iter()
                .filter_map(|&ancestor| {
                    let linked: Vec<u32> = self.cells[ancestor as usize]
                        .items
                        .iter()
                        .copied()
                        .filter(|&i| self.items[i as usize].bbox.intersects(child_bounds))
                        .collect();
                    (!linked.is_empty()).then_some(Link { ancestor, items: linked })
                })
                .collect();
            children[q] = first + q as u32;
            self.cells.push(Cell {
                bounds: child_bounds,
                depth: depth + 1,
                children: None,
                items,
                links,
            });
        }
        self.cells[cell as usize].children = Some(children);
        for child in children {
            self.subdivide(child, path);
        }
        path.pop();
    }

    /// Entries whose box may overlap `bbox`, given in local tile space.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn query_tile(&self, bbox: UvBox) -> Vec<IndexEntry> {
        let mut hits: Vec<u32> = Vec::new();
        if bbox.contains_box(UvBox::UNIT) {
            hits.extend(0..self.items.len() as u32);
        } else if let Some(clipped) = bbox.intersection(UvBox::UNIT) {
            self.collect(0, clipped, &mut hits);
        }
        hits.sort_unstable();
        hits.dedup();
        let mut entries: Vec<IndexEntry> = hits.into_iter().map(|i| self.items[i as usize].entry).collect();
        entries.sort_unstable();
        entries
    }

    fn collect(&self, cell: u32, bbox: UvBox, hits: &mut Vec<u32>) {
        let c = &self.cells[cell as usize];
        let Some(children) = c.children else {
            hits.extend_from_slice(&c.items);
            for link in &c.links {
                hits.extend_from_slice(&link.items);
            }
            return;
        };
        let mid = c.bounds.center();
        let us: &[usize] = if bbox.max.u < mid.u {
            &[0]
        } else if bbox.min.u > mid.u {
            &[1]
        } else {
            &[0, 1]
        };
        let vs: &[usize] = if bbox.max.v < mid.v {
            &[0]
        } else if bbox.min.v > mid.v {
            &[1]
        } else {
            &[0, 1]
        };
        for &v in vs {
            for &u in us {
                self.collect(children[u | v << 1], bbox, hits);
            }
        }
    }

    /// Candidates for a box in absolute UV space, across every integer tile it overlaps.
    #[must_use]
    pub fn query_periodic(&self, bbox: UvBox) -> Vec<Candidate> {
        let mut out: Vec<Candidate> = bbox
            .tiles()
            .into_iter()
            .flat_map(|tile| {
                self.query_tile(bbox.translate(tile.offset() * -1.0))
                    .into_iter()
                    .map(move |e| Candidate {
                        face: e.face,
                        translation: tile.add(e.shift),
                    })
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.cells.iter().map(|c| c.depth).max().unwrap_or(0)
    }

    #[must_use]
    pub const fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    /// Ancestor links of the leaf containing `p`, as `(ancestor depth, linked entries)`.
    #[must_use]
    pub fn leaf_links(&self, p: Uv) -> Vec<(u32, Vec<IndexEntry>)> {
        let mut cell = 0u32;
        while let Some(children) = self.cells[cell as usize].children {
            let mid = self.cells[cell as usize].bounds.center();
            let q = usize::from(p.u >= mid.u) | usize::from(p.v >= mid.v) << 1;
            cell = children[q];
        }
        self.cells[cell as usize]
            .links
            .iter()
            .map(|link| {
                let depth = self.cells[link.ancestor as usize].depth;
                let entries = link.items.iter().map(|&i| self.items[i as usize].entry).collect();
                (depth, entries)
            })
            .collect()
    }
}

/// Child index (`u_high | v_high << 1`) fully enclosing `bbox`, if any.
fn quadrant_of(bbox: UvBox, mid: Uv) -> Option<usize> {
    let u = if bbox.max.u <= mid.u {
        0
    } else if bbox.min.u >= mid.u {
        1
    } else {
        return None;
    };
    let v = if bbox.max.v <= mid.v {
        0
    } else if bbox.min.v >= mid.v {
        1
    } else {
        return None;
    };
    Some(u | v << 1)
}

fn quadrant_bounds(bounds: UvBox, mid: Uv, q: usize) -> UvBox {
    let (u0, u1) = if q & 1 == 0 { (bounds.min.u, mid.u) } else { (mid.u, bounds.max.u) };
    let (v0, v1) = if q & 2 == 0 { (bounds.min.v, mid.v) } else { (mid.v, bounds.max.v) };
    UvBox::new(Uv::new(u0, v0), Uv::new(u1, v1))
}
