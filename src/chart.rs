// =============================================================================
// Chart Payload — everything a candlestick renderer needs, as data
// =============================================================================
//
// The payload carries the candles, an optional volume series for a secondary
// axis, moving-average overlays and the support/resistance lines evaluated
// at every bar.  Drawing is left to the client.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::indicators::MovingAverage;
use crate::market_data::Bar;
use crate::trendline::FitResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// A line overlay: one value per candle, `None` where undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Volume bars drawn against the right-hand axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeSeries {
    pub name: String,
    pub axis: &'static str,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub title: String,
    pub candles: Vec<Candle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeSeries>,
    pub overlays: Vec<Overlay>,
    /// Range slider is off for daily candles.
    pub range_slider: bool,
}

impl ChartPayload {
    /// Candles only, titled after `ticker`.
    pub fn new(ticker: &str, bars: &[Bar]) -> Self {
        Self {
            title: format!("Stock Data for {ticker}"),
            candles: bars
                .iter()
                .map(|b| Candle {
                    timestamp: b.timestamp,
                    open: b.open,
                    high: b.high,
                    low: b.low,
                    close: b.close,
                })
                .collect(),
            volume: None,
            overlays: Vec::new(),
            range_slider: false,
        }
    }

    pub fn with_volume(mut self, bars: &[Bar]) -> Self {
        self.volume = Some(VolumeSeries {
            name: "Volume".to_string(),
            axis: "y2",
            values: bars.iter().map(|b| b.volume).collect(),
        });
        self
    }

    pub fn with_moving_averages(mut self, averages: &[MovingAverage]) -> Self {
        self.overlays.extend(averages.iter().map(|ma| Overlay {
            name: ma.name.clone(),
            values: ma.values.clone(),
        }));
        self
    }

    /// Evaluate both trend lines over the candle index and add them as
    /// overlays.
    pub fn with_trend_lines(mut self, lines: &FitResult) -> Self {
        let n = self.candles.len();
        for (name, line) in [("Support", &lines.support), ("Resistance", &lines.resistance)] {
            self.overlays.push(Overlay {
                name: name.to_string(),
                values: line.project(n).into_iter().map(Some).collect(),
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::moving_averages;
    use crate::trendline::Line;
    use chrono::TimeZone;

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let ts = Utc.with_ymd_and_hms(2023, 1, 2 + i as u32, 5, 0, 0).unwrap();
                let c = 100.0 + i as f64;
                Bar::new(ts, c, c + 2.0, c - 2.0, c + 1.0, 10.0 * (i + 1) as f64)
            })
            .collect()
    }

    #[test]
    fn candles_only_by_default() {
        let b = bars(3);
        let chart = ChartPayload::new("AMZN", &b);
        assert_eq!(chart.title, "Stock Data for AMZN");
        assert_eq!(chart.candles.len(), 3);
        assert!(chart.volume.is_none());
        assert!(chart.overlays.is_empty());

        let json = serde_json::to_value(&chart).unwrap();
        assert!(json.get("volume").is_none());
        assert_eq!(json["range_slider"], false);
    }

    #[test]
    fn volume_goes_on_secondary_axis() {
        let b = bars(4);
        let chart = ChartPayload::new("AMZN", &b).with_volume(&b);
        let vol = chart.volume.unwrap();
        assert_eq!(vol.axis, "y2");
        assert_eq!(vol.values, vec![10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn overlays_align_with_candles() {
        let b = bars(5);
        let closes: Vec<f64> = b.iter().map(|x| x.close).collect();
        let lines = FitResult {
            support: Line::new(1.0, 99.0),
            resistance: Line::new(1.0, 103.0),
        };
        let chart = ChartPayload::new("AMZN", &b)
            .with_moving_averages(&moving_averages(&closes, &[2]))
            .with_trend_lines(&lines);

        let names: Vec<&str> = chart.overlays.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["SMA 2", "Support", "Resistance"]);
        for o in &chart.overlays {
            assert_eq!(o.values.len(), 5);
        }
        assert_eq!(chart.overlays[1].values[4], Some(103.0));
        assert_eq!(chart.overlays[2].values[0], Some(103.0));
    }
}
