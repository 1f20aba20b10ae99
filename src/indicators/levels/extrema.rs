use serde::Serialize;

/// Indices of local minima (supports) and maxima (resistances).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extrema {
    pub supports: Vec<usize>,
    pub resistances: Vec<usize>,
}

/// Finds points that are `<=` (support) or `>=` (resistance) every value
/// within `window` positions on both sides. Ties count, so a flat stretch
/// yields several candidates. Only points with a full neighbourhood are
/// considered; NaN points and neighbourhoods containing NaN are skipped.
pub fn local_extrema(series: &[f64], window: usize) -> Extrema {
    let mut out = Extrema::default();
    if window == 0 || series.len() < 2 * window + 1 {
        return out;
    }

    for i in window..series.len() - window {
        let v = series[i];
        let neighbours = &series[i - window..=i + window];
        if neighbours.iter().any(|x| x.is_nan()) {
            continue;
        }

        if neighbours.iter().all(|&x| v <= x) {
            out.supports.push(i);
        }
        if neighbours.iter().all(|&x| v >= x) {
            out.resistances.push(i);
        }
    }

    out
}

/// Closest support below and resistance above a reference price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SupportResistance {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

pub fn nearest_levels(series: &[f64], extrema: &Extrema, price: f64) -> SupportResistance {
    let support = extrema
        .supports
        .iter()
        .map(|&i| series[i])
        .filter(|&v| v <= price)
        .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v))));
    let resistance = extrema
        .resistances
        .iter()
        .map(|&i| series[i])
        .filter(|&v| v >= price)
        .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.min(v))));

    SupportResistance {
        support,
        resistance,
    }
}
