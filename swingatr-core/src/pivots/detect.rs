//! Pivot detection and line construction.

use serde::{Deserialize, Serialize};

use super::line::{Line, LineKind, PivotSide};
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotConfig {
    /// Half-width of the window a line's first anchor must dominate.
    pub start_width: usize,
    /// Half-width of the window a line's second anchor must dominate.
    pub end_width: usize,
    /// Slopes within +/- this are horizontal.
    pub horizontal_slope: f64,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            start_width: 3,
            end_width: 5,
            horizontal_slope: 0.005,
        }
    }
}

/// Indices `i` where no bar in `[i - width, i + width]` is more extreme.
///
/// Bars closer than `width` to either end are never pivots.
pub fn find_pivots(bars: &[Bar], side: PivotSide, width: usize) -> Vec<usize> {
    if bars.len() <= 2 * width {
        return Vec::new();
    }
    (width..bars.len() - width)
        .filter(|&i| {
            let here = side.price(&bars[i]);
            bars[i - width..=i + width].iter().all(|b| match side {
                PivotSide::Low => b.low >= here,
                PivotSide::High => b.high <= here,
            })
        })
        .collect()
}

/// Lines from each start pivot to later end pivots.
///
/// A candidate is kept when no end pivot from its second anchor onward lies
/// beyond it, and it is no steeper into price than the previous line kept
/// for the same start.
pub fn build_lines(
    bars: &[Bar],
    side: PivotSide,
    start_pivots: &[usize],
    end_pivots: &[usize],
) -> Vec<Line> {
    let mut lines = Vec::new();
    for &start in start_pivots {
        let mut previous: Option<Line> = None;
        for (j, &end) in end_pivots.iter().enumerate() {
            if end <= start {
                continue;
            }
            let line = Line::through(bars, side, start, end);
            if !line.contains_pivots(bars, side, &end_pivots[j..]) {
                continue;
            }
            let shallower = previous.map_or(true, |prev| match side {
                PivotSide::Low => line.slope() <= prev.slope(),
                PivotSide::High => line.slope() >= prev.slope(),
            });
            if shallower {
                previous = Some(line);
                lines.push(line);
            }
        }
    }
    lines
}

/// Lines grouped by slope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLines {
    pub trend: Vec<Line>,
    pub channel: Vec<Line>,
    pub horizontal: Vec<Line>,
}

pub fn classify_line(line: &Line, side: PivotSide, horizontal_slope: f64) -> LineKind {
    let slope = line.slope();
    let (rising, falling) = match side {
        PivotSide::Low => (LineKind::TrendLine, LineKind::TrendChannelLine),
        PivotSide::High => (LineKind::TrendChannelLine, LineKind::TrendLine),
    };
    if slope > horizontal_slope {
        rising
    } else if slope < -horizontal_slope {
        falling
    } else {
        LineKind::Horizontal
    }
}

/// Detect pivots, build lines and group them.
pub fn detect_lines(bars: &[Bar], side: PivotSide, config: &PivotConfig) -> ClassifiedLines {
    let starts = find_pivots(bars, side, config.start_width);
    let ends = find_pivots(bars, side, config.end_width);
    let mut out = ClassifiedLines::default();
    for line in build_lines(bars, side, &starts, &ends) {
        match classify_line(&line, side, config.horizontal_slope) {
            LineKind::TrendLine => out.trend.push(line),
            LineKind::TrendChannelLine => out.channel.push(line),
            LineKind::Horizontal => out.horizontal.push(line),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    /// Bars whose low is given; high sits 2 above.
    fn bars_from_lows(lows: &[f64]) -> Vec<Bar> {
        let data: Vec<_> = lows.iter().map(|&l| (l + 1.0, l + 2.0, l, l + 1.0)).collect();
        make_ohlc_bars(&data)
    }

    #[test]
    fn single_trough_is_a_low_pivot() {
        let bars = bars_from_lows(&[5.0, 4.0, 3.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(find_pivots(&bars, PivotSide::Low, 3), vec![3]);
    }

    #[test]
    fn peak_is_a_high_pivot() {
        let bars = bars_from_lows(&[1.0, 2.0, 3.0, 9.0, 3.0, 2.0, 1.0]);
        assert_eq!(find_pivots(&bars, PivotSide::High, 3), vec![3]);
        assert!(find_pivots(&bars, PivotSide::Low, 3).is_empty());
    }

    #[test]
    fn short_series_has_no_pivots() {
        let bars = bars_from_lows(&[3.0, 1.0, 3.0]);
        assert!(find_pivots(&bars, PivotSide::Low, 3).is_empty());
    }

    #[test]
    fn line_undercut_by_later_pivot_is_dropped() {
        let mut lows = vec![20.0; 16];
        lows[3] = 10.0;
        lows[8] = 11.0;
        lows[14] = 12.0;
        let bars = bars_from_lows(&lows);
        // 3 -> 8 projects 12.2 at 14, above the pivot low of 12
        let lines = build_lines(&bars, PivotSide::Low, &[3], &[8, 14]);
        assert_eq!(lines.len(), 1);
        assert_eq!((lines[0].x1, lines[0].x2), (3, 14));
    }

    #[test]
    fn steeper_follow_up_line_is_dropped() {
        let mut lows = vec![20.0; 12];
        lows[0] = 10.0;
        lows[5] = 11.0;
        lows[10] = 13.0;
        let bars = bars_from_lows(&lows);
        let lines = build_lines(&bars, PivotSide::Low, &[0], &[5, 10]);
        assert_eq!(lines.len(), 1);
        assert_eq!((lines[0].x1, lines[0].x2), (0, 5));
    }

    #[test]
    fn classification_mirrors_by_side() {
        let rising = Line {
            x1: 0,
            y1: 10.0,
            x2: 10,
            y2: 11.0,
        };
        let flat = Line {
            x1: 0,
            y1: 10.0,
            x2: 10,
            y2: 10.04,
        };
        assert_eq!(classify_line(&rising, PivotSide::Low, 0.005), LineKind::TrendLine);
        assert_eq!(
            classify_line(&rising, PivotSide::High, 0.005),
            LineKind::TrendChannelLine
        );
        assert_eq!(classify_line(&flat, PivotSide::Low, 0.005), LineKind::Horizontal);
    }

    #[test]
    fn flat_series_yields_only_horizontals() {
        let bars = bars_from_lows(&[10.0; 20]);
        let lines = detect_lines(&bars, PivotSide::Low, &PivotConfig::default());
        assert!(!lines.horizontal.is_empty());
        assert!(lines.trend.is_empty());
        assert!(lines.channel.is_empty());
    }
}
