//! Uniform-grid broad phase for shadow casters.

use std::collections::HashMap;

use crate::coords::Rect;

/// Items covering more cells than this skip the grid and are tested by bounds on every query.
const MAX_ITEM_CELLS: i64 = 64;

type CellRange = (i32, i32, i32, i32);

/// Buckets item bounds into square cells so a light only visits colliders near it.
///
/// Items spanning several cells are stored in each; a per-query stamp reports every item
/// at most once per query. The stamp counter belongs to the hash, so independent hashes never
/// interfere. Query cost is bounded by the number of occupied cells, not by the query area.
#[derive(Debug)]
pub struct SpatialHash {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
    oversized: Vec<(usize, Rect)>,
    stamps: Vec<u64>,
    query_stamp: u64,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 && cell_size.is_finite() { cell_size } else { 64.0 };
        Self {
            cell_size,
            cells: HashMap::new(),
            oversized: Vec::new(),
            stamps: Vec::new(),
            query_stamp: 0,
        }
    }

    /// Replaces the contents with `bounds`; item `i` is the `i`-th entry. `None` entries
    /// (degenerate items) are never returned by queries.
    pub fn rebuild(&mut self, bounds: impl IntoIterator<Item = Option<Rect>>) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.oversized.clear();

        let mut count = 0;
        for (i, b) in bounds.into_iter().enumerate() {
            count = i + 1;
            let Some(b) = b.filter(|b| b.is_finite()).map(Rect::normalized) else { continue };
            let range = self.cell_range(b);
            if cell_count(range) > MAX_ITEM_CELLS {
                self.oversized.push((i, b));
                continue;
            }
            let (x0, y0, x1, y1) = range;
            for cy in y0..=y1 {
                for cx in x0..=x1 {
                    self.cells.entry((cx, cy)).or_default().push(i);
                }
            }
        }

        self.cells.retain(|_, bucket| !bucket.is_empty());
        self.stamps.clear();
        self.stamps.resize(count, 0);
    }

    /// Collects the indices of items whose cells intersect `area` into `out` (cleared first),
    /// in ascending order.
    pub fn query(&mut self, area: Rect, out: &mut Vec<usize>) {
        out.clear();
        if !area.is_finite() {
            return;
        }

        self.query_stamp = self.query_stamp.wrapping_add(1);
        if self.query_stamp == 0 {
            self.stamps.fill(0);
            self.query_stamp = 1;
        }
        let stamp = self.query_stamp;

        let area = area.normalized();
        let range = self.cell_range(area);
        let (x0, y0, x1, y1) = range;
        let Self { cells, oversized, stamps, .. } = self;
        let mut visit = |bucket: &[usize]| {
            for &i in bucket {
                if stamps[i] != stamp {
                    stamps[i] = stamp;
                    out.push(i);
                }
            }
        };

        if cell_count(range) > cells.len() as i64 {
            for (&(cx, cy), bucket) in cells.iter() {
                if (x0..=x1).contains(&cx) && (y0..=y1).contains(&cy) {
                    visit(bucket);
                }
            }
        } else {
            for cy in y0..=y1 {
                for cx in x0..=x1 {
                    if let Some(bucket) = cells.get(&(cx, cy)) {
                        visit(bucket);
                    }
                }
            }
        }

        for &(i, b) in oversized.iter() {
            if b.overlaps(area) {
                visit(&[i]);
            }
        }
        out.sort_unstable();
    }

    fn cell_range(&self, r: Rect) -> CellRange {
        let cell = |v: f32| (v / self.cell_size).floor() as i32;
        let (lo, hi) = (r.min(), r.max());
        (cell(lo.x), cell(lo.y), cell(hi.x), cell(hi.y))
    }
}

fn cell_count((x0, y0, x1, y1): CellRange) -> i64 {
    let w = i64::from(x1) - i64::from(x0) + 1;
    let h = i64::from(y1) - i64::from(y0) + 1;
    w.saturating_mul(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_spanning_cells_is_reported_once() {
        let mut hash = SpatialHash::new(10.0);
        hash.rebuild([Some(Rect::new(0.0, 0.0, 35.0, 35.0))]);

        let mut out = Vec::new();
        hash.query(Rect::new(-5.0, -5.0, 50.0, 50.0), &mut out);
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn far_items_are_not_returned() {
        let mut hash = SpatialHash::new(10.0);
        hash.rebuild([
            Some(Rect::new(0.0, 0.0, 5.0, 5.0)),
            Some(Rect::new(100.0, 100.0, 5.0, 5.0)),
            None,
        ]);

        let mut out = Vec::new();
        hash.query(Rect::new(0.0, 0.0, 8.0, 8.0), &mut out);
        assert_eq!(out, vec![0]);
        hash.query(Rect::new(95.0, 95.0, 20.0, 20.0), &mut out);
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn repeated_queries_stay_deduplicated() {
        let mut hash = SpatialHash::new(4.0);
        hash.rebuild([Some(Rect::new(0.0, 0.0, 20.0, 2.0)), Some(Rect::new(6.0, 0.0, 1.0, 1.0))]);

        let mut out = Vec::new();
        for _ in 0..3 {
            hash.query(Rect::new(0.0, 0.0, 20.0, 20.0), &mut out);
            assert_eq!(out, vec![0, 1]);
        }
    }

    #[test]
    fn independent_hashes_do_not_share_stamps() {
        let mut a = SpatialHash::new(8.0);
        let mut b = SpatialHash::new(8.0);
        a.rebuild([Some(Rect::new(0.0, 0.0, 1.0, 1.0))]);
        b.rebuild([Some(Rect::new(0.0, 0.0, 1.0, 1.0))]);

        let mut out = Vec::new();
        a.query(Rect::new(0.0, 0.0, 2.0, 2.0), &mut out);
        b.query(Rect::new(0.0, 0.0, 2.0, 2.0), &mut out);
        assert_eq!(out, vec![0]);
    }

    // ── large areas ───────────────────────────────────────────────────────

    #[test]
    fn huge_query_over_sparse_hash_scans_occupied_cells() {
        let mut hash = SpatialHash::new(128.0);
        hash.rebuild([Some(Rect::new(0.0, 0.0, 10.0, 10.0)), Some(Rect::new(5e5, 5e5, 1.0, 1.0))]);

        let mut out = Vec::new();
        hash.query(Rect::around(crate::coords::Vec2::ZERO, 1.6e5), &mut out);
        assert_eq!(out, vec![0]);
        hash.query(Rect::new(-1e6, -1e6, 2e6, 2e6), &mut out);
        assert_eq!(out, vec![0, 1]);
    }

    #[test]
    fn huge_collider_does_not_fill_the_grid() {
        let mut hash = SpatialHash::new(8.0);
        hash.rebuild([Some(Rect::new(-1e6, -1e6, 2e6, 2e6)), Some(Rect::new(0.0, 0.0, 1.0, 1.0))]);
        assert_eq!(hash.cells.len(), 1);

        let mut out = Vec::new();
        hash.query(Rect::new(0.0, 0.0, 4.0, 4.0), &mut out);
        assert_eq!(out, vec![0, 1]);
        hash.query(Rect::new(2e6, 2e6, 4.0, 4.0), &mut out);
        assert!(out.is_empty());
    }
}
