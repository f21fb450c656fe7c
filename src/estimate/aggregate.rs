//! Exact aggregation of per-table scan sizes.
//!
//! Floating-point addition is not associative, so summing `f64` sizes in
//! table order would make the total depend on the order the engine lists
//! tables in. Sizes are instead kept as a list of non-overlapping partial
//! sums (Shewchuk's algorithm) which together hold the exact total; it is
//! rounded to `f64` once, when the total is read. The correctly rounded
//! result is the same for every input order.

/// Normalize a coerced per-table size.
///
/// NaN and negative values become `0.0` (a table the engine could not size is
/// treated as negligible). Everything else, fractions and `+inf` included, is
/// kept as is.
pub fn normalize_scan_bytes(value: f64) -> f64 {
    if value.is_nan() || value <= 0.0 {
        0.0
    } else {
        value
    }
}

/// Order-independent accumulator for scan sizes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeAggregator {
    /// Non-overlapping partials in increasing magnitude.
    partials: Vec<f64>,
    unbounded: bool,
}

impl SizeAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one table's size. The value is normalized first.
    pub fn add(&mut self, bytes: f64) {
        let mut x = normalize_scan_bytes(bytes);
        if x.is_infinite() {
            self.unbounded = true;
            return;
        }

        let mut kept = 0;
        for j in 0..self.partials.len() {
            let mut y = self.partials[j];
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            if hi.is_infinite() {
                // Past f64::MAX; no finite total exists.
                self.unbounded = true;
                return;
            }
            let lo = y - (hi - x);
            if lo != 0.0 {
                self.partials[kept] = lo;
                kept += 1;
            }
            x = hi;
        }
        self.partials.truncate(kept);
        self.partials.push(x);
    }

    /// Whether the total is unbounded: a table reported `+inf`, or the sum
    /// exceeds the largest finite `f64`.
    pub fn is_unbounded(&self) -> bool {
        self.unbounded
    }

    /// The exact total, correctly rounded to `f64`.
    pub fn total(&self) -> f64 {
        if self.unbounded {
            return f64::INFINITY;
        }

        let partials = &self.partials;
        let mut n = partials.len();
        if n == 0 {
            return 0.0;
        }

        n -= 1;
        let mut hi = partials[n];
        let mut lo = 0.0;
        while n > 0 {
            n -= 1;
            let x = hi;
            let y = partials[n];
            hi = x + y;
            lo = y - (hi - x);
            if lo != 0.0 {
                break;
            }
        }

        // Round half-way cases using the sign of the remaining partials.
        if n > 0 && ((lo < 0.0 && partials[n - 1] < 0.0) || (lo > 0.0 && partials[n - 1] > 0.0)) {
            let y = lo * 2.0;
            let x = hi + y;
            if y == x - hi {
                hi = x;
            }
        }
        hi
    }
}

impl Extend<f64> for SizeAggregator {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for bytes in iter {
            self.add(bytes);
        }
    }
}

impl FromIterator<f64> for SizeAggregator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut agg = SizeAggregator::new();
        agg.extend(iter);
        agg
    }
}

/// Sum scan sizes exactly, independent of their order.
pub fn total_bytes<I: IntoIterator<Item = f64>>(sizes: I) -> f64 {
    sizes.into_iter().collect::<SizeAggregator>().total()
}
