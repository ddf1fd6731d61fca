//! Lines crossing the last bar, and the best channel/trend setup among them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::detect::{detect_lines, ClassifiedLines, PivotConfig};
use super::line::{Line, LineKind, PivotSide};
use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    pub line: Line,
    pub kind: LineKind,
    pub price: f64,
    pub date: NaiveDate,
}

/// Lines whose projection at the last bar falls inside its range.
pub fn intersections(bars: &[Bar], lines: &[Line], kind: LineKind) -> Vec<Intersection> {
    let Some(last) = bars.last() else {
        return Vec::new();
    };
    let x = bars.len() - 1;
    lines
        .iter()
        .filter_map(|line| {
            line.crosses(x, last.high, last.low)
                .map(|price| Intersection {
                    line: *line,
                    kind,
                    price,
                    date: last.date,
                })
        })
        .collect()
}

/// Closest channel/trend pair plus every horizontal crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    pub channel: Intersection,
    pub trend: Intersection,
    pub horizontals: Vec<Intersection>,
}

impl Setup {
    pub fn gap(&self) -> f64 {
        (self.channel.price - self.trend.price).abs()
    }

    pub fn intersections(&self) -> impl Iterator<Item = &Intersection> {
        [&self.channel, &self.trend]
            .into_iter()
            .chain(self.horizontals.iter())
    }
}

/// A setup exists only when at least one channel and one trend line cross.
pub fn best_setup(
    channel: &[Intersection],
    trend: &[Intersection],
    horizontal: &[Intersection],
) -> Option<Setup> {
    let mut best: Option<(f64, &Intersection, &Intersection)> = None;
    for c in channel {
        for t in trend {
            let gap = (c.price - t.price).abs();
            if best.map_or(true, |(g, _, _)| gap < g) {
                best = Some((gap, c, t));
            }
        }
    }
    best.map(|(_, c, t)| Setup {
        channel: c.clone(),
        trend: t.clone(),
        horizontals: horizontal.to_vec(),
    })
}

/// Full pivot analysis of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotAnalysis {
    pub symbol: String,
    pub side: PivotSide,
    pub lines: ClassifiedLines,
    pub channel_hits: Vec<Intersection>,
    pub trend_hits: Vec<Intersection>,
    pub horizontal_hits: Vec<Intersection>,
    pub setup: Option<Setup>,
}

pub fn analyze(symbol: &str, bars: &[Bar], side: PivotSide, config: &PivotConfig) -> PivotAnalysis {
    let lines = detect_lines(bars, side, config);
    let channel_hits = intersections(bars, &lines.channel, LineKind::TrendChannelLine);
    let trend_hits = intersections(bars, &lines.trend, LineKind::TrendLine);
    let horizontal_hits = intersections(bars, &lines.horizontal, LineKind::Horizontal);
    let setup = best_setup(&channel_hits, &trend_hits, &horizontal_hits);
    PivotAnalysis {
        symbol: symbol.to_string(),
        side,
        lines,
        channel_hits,
        trend_hits,
        horizontal_hits,
        setup,
    }
}

impl PivotAnalysis {
    /// Text block for the scan report; empty when there is no setup.
    pub fn render(&self, bars: &[Bar]) -> String {
        let Some(setup) = &self.setup else {
            return String::new();
        };
        let mut out = String::new();
        let _ = writeln!(out, "=============== {} ===============", self.symbol);
        out.push_str("++++++++++++ Best Setup ++++++++++++\n");
        for hit in setup.intersections() {
            self.render_hit(&mut out, hit, bars);
        }
        out.push_str("++++++++++++ All Lines ++++++++++++\n");
        for hit in self
            .channel_hits
            .iter()
            .chain(&self.trend_hits)
            .chain(&self.horizontal_hits)
        {
            self.render_hit(&mut out, hit, bars);
        }
        out
    }

    fn render_hit(&self, out: &mut String, hit: &Intersection, bars: &[Bar]) {
        let _ = writeln!(out, "----- {} -----", hit.kind.label(self.side));
        out.push_str(&hit.line.describe(bars));
        let _ = writeln!(out, "Crosses ${:.2} on {}", hit.price, hit.date);
    }
}
