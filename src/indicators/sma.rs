// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Rolling arithmetic mean over a fixed look-back window:
//
//   SMA_t = (close_t + close_{t-1} + ... + close_{t-window+1}) / window
//
// Output is aligned with the input: the first `window - 1` slots have no
// value, so the series can be overlaid on the candles index for index.
// =============================================================================

/// Windows overlaid on the chart when moving averages are requested.
pub const DEFAULT_WINDOWS: [usize; 3] = [20, 50, 100];

/// Compute the SMA of `closes` over `window`, aligned with the input.
///
/// # Edge cases
/// - `window == 0` => every slot is `None`
/// - `closes.len() < window` => every slot is `None`
/// - A window containing a non-finite close yields `None` for that slot.
pub fn calculate_sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return result;
    }

    for (offset, chunk) in closes.windows(window).enumerate() {
        let mean = chunk.iter().sum::<f64>() / window as f64;
        if mean.is_finite() {
            result[offset + window - 1] = Some(mean);
        }
    }
    result
}

/// A named SMA series ready to overlay on a chart.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MovingAverage {
    pub window: usize,
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Compute one aligned SMA per window in `windows`.
pub fn moving_averages(closes: &[f64], windows: &[usize]) -> Vec<MovingAverage> {
    windows
        .iter()
        .map(|&window| MovingAverage {
            window,
            name: format!("SMA {window}"),
            values: calculate_sma(closes, window),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_window_zero() {
        assert_eq!(calculate_sma(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn sma_insufficient_data() {
        assert_eq!(calculate_sma(&[1.0, 2.0], 3), vec![None, None]);
        assert!(calculate_sma(&[], 3).is_empty());
    }

    #[test]
    fn sma_known_values_are_aligned() {
        let closes = [2.0, 4.0, 6.0, 8.0, 10.0];
        let sma = calculate_sma(&closes, 3);
        assert_eq!(sma.len(), closes.len());
        assert_eq!(sma[0], None);
        assert_eq!(sma[1], None);
        assert!((sma[2].unwrap() - 4.0).abs() < 1e-12);
        assert!((sma[3].unwrap() - 6.0).abs() < 1e-12);
        assert!((sma[4].unwrap() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn sma_window_one_is_identity() {
        let closes = [3.5, 1.25, 9.0];
        let sma = calculate_sma(&closes, 1);
        assert_eq!(sma, vec![Some(3.5), Some(1.25), Some(9.0)]);
    }

    #[test]
    fn sma_skips_windows_with_nan() {
        let closes = [1.0, f64::NAN, 3.0, 4.0, 5.0];
        let sma = calculate_sma(&closes, 2);
        assert_eq!(sma[1], None);
        assert_eq!(sma[2], None);
        assert!((sma[3].unwrap() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn default_windows_are_named() {
        let closes: Vec<f64> = (1..=120).map(|x| x as f64).collect();
        let mas = moving_averages(&closes, &DEFAULT_WINDOWS);
        let names: Vec<&str> = mas.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["SMA 20", "SMA 50", "SMA 100"]);

        let sma100 = &mas[2].values;
        assert_eq!(sma100.iter().filter(|v| v.is_some()).count(), 21);
        // Mean of 1..=100 is 50.5.
        assert!((sma100[99].unwrap() - 50.5).abs() < 1e-12);
    }
}
