//! Histogram binning and kernel density estimate for the distribution chart

/// Number of points the density curve is sampled at
const KDE_POINTS: usize = 200;

/// Equal-width histogram of one column
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Bin edges; `edges.len() == counts.len() + 1`
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Bin `values` with the "auto" rule: the smaller of the Sturges and
    /// Freedman-Diaconis bin widths, Sturges alone when the IQR is zero.
    pub fn auto(values: &[f64]) -> Option<Self> {
        let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }

        let (min, max) = min_max(&values);
        if max == min {
            return Some(Self {
                edges: vec![min - 0.5, max + 0.5],
                counts: vec![values.len() as u64],
            });
        }

        let n = values.len() as f64;
        let range = max - min;
        let sturges = range / (n.log2() + 1.0);
        let fd = 2.0 * iqr(&values) * n.powf(-1.0 / 3.0);
        let width = if fd > 0.0 { fd.min(sturges) } else { sturges };
        let bins = ((range / width).ceil() as usize).max(1);

        Some(Self::with_bins(&values, min, max, bins))
    }

    fn with_bins(values: &[f64], min: f64, max: f64, bins: usize) -> Self {
        let width = (max - min) / bins as f64;
        let edges = (0..=bins).map(|i| min + width * i as f64).collect();

        let mut counts = vec![0u64; bins];
        for &v in values {
            // The last bin is closed on the right
            let idx = (((v - min) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Self { edges, counts }
    }

    pub fn bin_width(&self) -> f64 {
        self.edges[1] - self.edges[0]
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Gaussian KDE with Scott's bandwidth, sampled over the data range and
/// scaled to histogram counts (`density * n * bin_width`).
///
/// Returns `None` when there are fewer than two values or no spread.
pub fn density_curve(values: &[f64], bin_width: f64) -> Option<Vec<(f64, f64)>> {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = values.len();
    if n < 2 {
        return None;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return None;
    }

    let bandwidth = std_dev * (n as f64).powf(-1.0 / 5.0);
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    let scale = n as f64 * bin_width;

    let (min, max) = min_max(&values);
    let step = (max - min) / (KDE_POINTS - 1) as f64;

    let curve = (0..KDE_POINTS)
        .map(|i| {
            let x = min + step * i as f64;
            let density: f64 = values
                .iter()
                .map(|v| {
                    let u = (x - v) / bandwidth;
                    (-0.5 * u * u).exp()
                })
                .sum::<f64>()
                * norm;
            (x, density * scale)
        })
        .collect();

    Some(curve)
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Interquartile range with linear interpolation between order statistics
fn iqr(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile(&sorted, 75.0) - percentile(&sorted, 25.0)
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_cover_every_value() {
        let values: Vec<f64> = (0..100).map(|i| (i % 37) as f64).collect();
        let hist = Histogram::auto(&values).unwrap();

        assert_eq!(hist.total(), 100);
        assert_eq!(hist.edges.len(), hist.counts.len() + 1);
        assert_eq!(hist.edges[0], 0.0);
        assert!((hist.edges.last().unwrap() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_sturges_bin_count() {
        // Uniform 0..=15, n = 16: IQR-based width is larger than Sturges here
        let values: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let hist = Histogram::auto(&values).unwrap();
        // Sturges: range 15 / (log2(16) + 1) = 3 -> 5 bins
        assert_eq!(hist.counts.len(), 5);
    }

    #[test]
    fn test_constant_column_gets_single_bin() {
        let hist = Histogram::auto(&[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(hist.counts, vec![3]);
        assert_eq!(hist.edges, vec![3.5, 4.5]);
    }

    #[test]
    fn test_empty_column() {
        assert!(Histogram::auto(&[]).is_none());
        assert!(density_curve(&[1.0], 1.0).is_none());
        assert!(density_curve(&[2.0, 2.0], 1.0).is_none());
    }

    #[test]
    fn test_density_curve_area_matches_counts() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 7919) % 101) as f64).collect();
        let hist = Histogram::auto(&values).unwrap();
        let curve = density_curve(&values, hist.bin_width()).unwrap();

        assert_eq!(curve.len(), KDE_POINTS);
        assert!(curve.iter().all(|(_, y)| *y >= 0.0));

        // Integrating the scaled curve over the data range recovers most of n * bin_width
        let area: f64 = curve
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum();
        let expected = values.len() as f64 * hist.bin_width();
        assert!(area > 0.8 * expected && area <= expected * 1.001);
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 25.0), 1.75);
        assert_eq!(percentile(&sorted, 75.0), 3.25);
    }
}
