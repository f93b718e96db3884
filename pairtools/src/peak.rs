//! Locating the coincidence peak in a g2 histogram

/// Contiguous run of bins around the histogram maximum that stand out of
/// the accidental background.
#[derive(Clone, Debug, PartialEq)]
pub struct LikelyWindow {
    pub peak_value: u64,
    pub peak_index: usize,
    /// Offset of the first bin of the window relative to the peak, `<= 0`
    pub left: i64,
    /// Offset of the last bin of the window relative to the peak, `>= 0`
    pub right: i64,
    /// Histogram values from `peak_index + left` to `peak_index + right`
    pub values: Vec<u64>,
    /// The scan stopped at the first or last bin rather than at background
    pub at_edge: bool,
}

/// Find the maximum bin (first one on ties) and widen the window on both
/// sides while neighbouring bins exceed twice `acc_per_bin`.
///
/// The scan is clamped to the histogram, so a peak sitting next to either
/// end yields a window cut off at that end. `None` for an empty histogram.
pub fn likely_window(histogram: &[u64], acc_per_bin: f64) -> Option<LikelyWindow> {
    if histogram.is_empty() {
        return None;
    }
    let mut peak_index = 0;
    for (i, &v) in histogram.iter().enumerate() {
        if v > histogram[peak_index] {
            peak_index = i;
        }
    }

    let threshold = 2.0 * acc_per_bin;
    let above = |i: usize| histogram[i] as f64 > threshold;

    let mut lo = peak_index;
    while lo > 0 && above(lo - 1) {
        lo -= 1;
    }
    let mut hi = peak_index;
    while hi + 1 < histogram.len() && above(hi + 1) {
        hi += 1;
    }

    let at_edge = lo == 0 || hi + 1 == histogram.len();

    Some(LikelyWindow {
        peak_value: histogram[peak_index],
        peak_index,
        left: lo as i64 - peak_index as i64,
        right: hi as i64 - peak_index as i64,
        values: histogram[lo..=hi].to_vec(),
        at_edge,
    })
}
