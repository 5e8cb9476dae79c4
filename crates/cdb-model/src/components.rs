//! CMBLOCK run-length compression of component id lists.
//!
//! A component block stores a sorted id list where a consecutive run
//! `a, a+1, ..., b` is written as `a, -b`. Both codec directions share
//! these two functions so compression stays an exact inverse of expansion.

/// Compress a list of ids into the CMBLOCK run convention.
///
/// The input is sorted and deduplicated first; the output encodes each
/// maximal consecutive run `a..=b` with `b > a` as the pair `[a, -b]` and
/// singletons as themselves.
pub fn compress(items: &[i32]) -> Vec<i32> {
    let mut sorted: Vec<i32> = items.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut packed = Vec::with_capacity(sorted.len());
    let mut i = 0;
    while i < sorted.len() {
        let start = sorted[i];
        let mut end = start;
        while i + 1 < sorted.len() && sorted[i + 1] == end + 1 {
            end = sorted[i + 1];
            i += 1;
        }
        packed.push(start);
        if end > start {
            packed.push(-end);
        }
        i += 1;
    }
    packed
}

/// Expand a CMBLOCK run-encoded list back into explicit ids.
///
/// A negative value `-b` extends the previously seen id `a` into the run
/// `a+1..=b`.
pub fn expand(packed: &[i32]) -> Vec<i32> {
    let mut items = Vec::with_capacity(packed.len());
    let mut last = 0i32;
    for &value in packed {
        if value >= 0 {
            items.push(value);
            last = value;
        } else {
            for id in (last + 1)..=(-value) {
                items.push(id);
            }
            last = -value;
        }
    }
    items
}
