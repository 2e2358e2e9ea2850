use crate::math::Rect;

/// Splits one axis into `count` equal bands.
#[derive(Debug, Copy, Clone)]
struct Indexer {
    start: f64,
    length: f64,
    count: usize,
}

impl Indexer {
    fn new(start: f64, stop: f64, count: usize) -> Self {
        let length = (stop - start) / count as f64;
        Indexer {
            start,
            length,
            count,
        }
    }

    fn band(&self, index: usize) -> (f64, f64) {
        (self.start + self.length * index as f64, self.length)
    }
}

/// A coarse grid of equal zones over the canvas, numbered row-major.
#[derive(Debug, Copy, Clone)]
pub struct Zones {
    ix: Indexer,
    iy: Indexer,
}

impl Zones {
    /// # Panics
    ///
    /// Panics if `cols` or `rows` is zero.
    pub fn new(canvas: Rect, cols: usize, rows: usize) -> Self {
        assert!(cols > 0 && rows > 0, "zone grid must be non-empty");
        Zones {
            ix: Indexer::new(canvas.x, canvas.right(), cols),
            iy: Indexer::new(canvas.y, canvas.bottom(), rows),
        }
    }

    pub fn len(&self) -> usize {
        self.ix.count * self.iy.count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn zone(&self, index: usize) -> Rect {
        let (x, width) = self.ix.band(index % self.ix.count);
        let (y, height) = self.iy.band((index / self.ix.count) % self.iy.count);
        Rect::new(x, y, width, height)
    }

    /// Zone indices ordered by the distance of their centres from the canvas centre, nearest
    /// first. Ties keep row-major order.
    pub fn by_centrality(&self) -> Vec<usize> {
        let cx = self.ix.start + self.ix.length * self.ix.count as f64 / 2.0;
        let cy = self.iy.start + self.iy.length * self.iy.count as f64 / 2.0;
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| {
            let da = crate::math::dist(self.zone(a).center(), (cx, cy));
            let db = crate::math::dist(self.zone(b).center(), (cx, cy));
            da.total_cmp(&db)
        });
        order
    }
}
