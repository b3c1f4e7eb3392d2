// Gap filling for series sharing one axis

/// Carry the last known value forward; leading gaps stay empty
pub fn forward_fill(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    series
        .iter()
        .map(|v| {
            if v.is_some() {
                last = *v;
            }
            last
        })
        .collect()
}

/// Fill gaps linearly between the nearest known neighbours.
///
/// A gap with a known value on one side only takes that value; a series
/// with no known values is returned unchanged.
pub fn interpolate(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let known: Vec<(usize, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();

    if known.is_empty() {
        return series.to_vec();
    }

    // Index into `known` of the first point at or after i
    let mut next_idx = 0;
    (0..series.len())
        .map(|i| {
            if let Some(v) = series[i] {
                return Some(v);
            }
            while next_idx < known.len() && known[next_idx].0 < i {
                next_idx += 1;
            }
            let prev = next_idx.checked_sub(1).map(|k| known[k]);
            let next = known.get(next_idx).copied();
            match (prev, next) {
                (Some((pi, pv)), Some((ni, nv))) => {
                    let ratio = (i - pi) as f64 / (ni - pi) as f64;
                    Some(pv + (nv - pv) * ratio)
                }
                (Some((_, pv)), None) => Some(pv),
                (None, Some((_, nv))) => Some(nv),
                (None, None) => None,
            }
        })
        .collect()
}
