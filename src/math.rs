/// Computes the distance between two points.
pub fn dist((x1, y1): (f64, f64), (x2, y2): (f64, f64)) -> f64 {
    f64::hypot(x2 - x1, y2 - y1)
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Largest uniform scale at which a `width` x `height` box fits inside `max_width` x `max_height`.
pub fn contain_scale(width: f64, height: f64, max_width: f64, max_height: f64) -> f64 {
    f64::min(max_width / width, max_height / height)
}

/// Clamps the interval `[start, start + len)` into `[lo, hi)`. If it is longer than the target
/// range, it is centred on it instead.
pub fn clamp_span(start: f64, len: f64, lo: f64, hi: f64) -> f64 {
    if len >= hi - lo {
        return lo + (hi - lo - len) / 2.0;
    }
    start.clamp(lo, hi - len)
}

/// How far an aspect ratio is from square, symmetric in portrait and landscape.
pub fn squareness(aspect_ratio: f64) -> f64 {
    aspect_ratio.ln().abs()
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Rect::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// Whether `self` lies inside `outer`, allowing `eps` of floating-point slack.
    pub fn within(&self, outer: &Rect, eps: f64) -> bool {
        self.x >= outer.x - eps
            && self.y >= outer.y - eps
            && self.right() <= outer.right() + eps
            && self.bottom() <= outer.bottom() + eps
    }
}
