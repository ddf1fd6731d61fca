//! Daily simulation loop for one symbol.
//!
//! The run moves through `Uninitialized -> Active -> Finished`. The first
//! step scans history for the reference extreme and opens the entry
//! position; every later step marks the position to market, updates the
//! extreme and rebalances when the target allocation changes.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::SimulationError;
use crate::domain::{
    Allocation, Bar, BarSeries, Extreme, ExtremeUpdate, Portfolio, Position, SimulationState,
    Transaction, TransactionKind,
};
use crate::strategy::{
    classify, establish_extreme, target_allocation, AllocationBand, ExtremeScan, StrategyParams,
};

/// What happened on one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub close: f64,
    /// Mark-to-market change of the position (zero on the entry day).
    pub net_change: f64,
    pub portfolio_value: f64,
    pub position_value: f64,
    pub band: AllocationBand,
    /// Extreme after the day's close was observed.
    pub extreme: Extreme,
    /// `None` on the entry day, which is scanned rather than observed.
    pub extreme_update: Option<ExtremeUpdate>,
    pub transaction: Option<TransactionKind>,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub portfolio: Portfolio,
    pub days: Vec<DayOutcome>,
    pub initial_scan: Option<ExtremeScan>,
    /// Bars inside the range skipped because they carried no prices.
    pub void_bars_skipped: usize,
}

impl SimulationOutcome {
    /// Peak-to-trough decline of the daily portfolio value, as a fraction.
    pub fn max_drawdown(&self) -> f64 {
        let mut peak = f64::MIN;
        let mut worst = 0.0_f64;
        for day in &self.days {
            peak = peak.max(day.portfolio_value);
            if peak > 0.0 {
                worst = worst.max((peak - day.portfolio_value) / peak);
            }
        }
        worst
    }
}

/// Stepwise simulation over a borrowed bar series.
pub struct Simulation<'a> {
    series: &'a BarSeries,
    params: StrategyParams,
    portfolio: Portfolio,
    days: Vec<DayOutcome>,
    initial_scan: Option<ExtremeScan>,
    void_bars_skipped: usize,
}

impl<'a> Simulation<'a> {
    pub fn new(
        series: &'a BarSeries,
        params: &StrategyParams,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        if start > end {
            return Err(SimulationError::InvalidRange { start, end });
        }
        let portfolio = Portfolio::new(series.symbol.clone(), start, end, params.initial_capital);
        Ok(Self {
            series,
            params: params.clone(),
            portfolio,
            days: Vec::new(),
            initial_scan: None,
            void_bars_skipped: 0,
        })
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Simulate the bar at `index`. Steps must be taken in date order.
    pub fn step(&mut self, index: usize) -> Result<DayOutcome, SimulationError> {
        let series = self.series;
        let bar = series.bars.get(index).ok_or_else(|| {
            SimulationError::InvariantViolation(format!(
                "bar index {index} out of bounds for {} bars",
                series.len()
            ))
        })?;
        if bar.is_void() {
            return Err(SimulationError::InvariantViolation(format!(
                "bar {} has no price data",
                bar.date
            )));
        }
        if bar.date < self.portfolio.start_date || bar.date > self.portfolio.end_date {
            return Err(SimulationError::InvariantViolation(format!(
                "bar {} is outside {}..={}",
                bar.date, self.portfolio.start_date, self.portfolio.end_date
            )));
        }

        let state = std::mem::replace(&mut self.portfolio.state, SimulationState::Uninitialized);
        let outcome = match state {
            SimulationState::Uninitialized => {
                let (position, outcome) = self.enter(index, bar)?;
                self.portfolio.state = SimulationState::Active(position);
                outcome
            }
            SimulationState::Active(mut position) => {
                let result = self.advance(&mut position, bar);
                self.portfolio.state = SimulationState::Active(position);
                result?
            }
            finished @ SimulationState::Finished(_) => {
                self.portfolio.state = finished;
                return Err(SimulationError::AlreadyFinished);
            }
        };

        self.days.push(outcome.clone());
        Ok(outcome)
    }

    /// Freeze the position. A run that never entered had no bars to trade.
    pub fn finish(&mut self) -> Result<(), SimulationError> {
        let state = std::mem::replace(&mut self.portfolio.state, SimulationState::Uninitialized);
        match state {
            SimulationState::Uninitialized => Err(SimulationError::NoBarsInRange),
            SimulationState::Active(position) => {
                info!(
                    symbol = %self.portfolio.symbol,
                    date = %self.portfolio.current_date,
                    value = self.portfolio.current_value,
                    transactions = self.portfolio.transactions.len(),
                    "simulation finished"
                );
                self.portfolio.state = SimulationState::Finished(position);
                Ok(())
            }
            finished @ SimulationState::Finished(_) => {
                self.portfolio.state = finished;
                Err(SimulationError::AlreadyFinished)
            }
        }
    }

    pub fn into_outcome(self) -> SimulationOutcome {
        SimulationOutcome {
            portfolio: self.portfolio,
            days: self.days,
            initial_scan: self.initial_scan,
            void_bars_skipped: self.void_bars_skipped,
        }
    }

    fn enter(&mut self, index: usize, bar: &Bar) -> Result<(Position, DayOutcome), SimulationError> {
        let scan = establish_extreme(&self.series.bars, index, self.params.add_multiple)?;
        let band = classify(&scan.extreme, bar.close, &self.params)?;
        let allocation = target_allocation(band, &scan.extreme, &self.params);
        let capital = self.portfolio.current_value * allocation.fraction;

        let position = Position::open(
            self.portfolio.symbol.clone(),
            allocation,
            self.params.leverage,
            capital,
            bar.date,
            bar.close,
            scan.extreme,
        );
        self.portfolio.current_date = bar.date;
        self.portfolio.transactions.push(Transaction {
            date: bar.date,
            kind: TransactionKind::Entry,
            price: bar.close,
            from: None,
            to: allocation,
            band,
            capital_delta: capital,
            portfolio_value: self.portfolio.current_value,
            extreme: scan.extreme,
        });
        info!(
            symbol = %self.portfolio.symbol,
            date = %bar.date,
            extreme = %scan.extreme,
            reference = %scan.reference_date,
            flips = scan.flips,
            %band,
            allocation = %allocation,
            "entered position"
        );

        let outcome = DayOutcome {
            date: bar.date,
            close: bar.close,
            net_change: 0.0,
            portfolio_value: self.portfolio.current_value,
            position_value: position.current_value,
            band,
            extreme: scan.extreme,
            extreme_update: None,
            transaction: Some(TransactionKind::Entry),
        };
        self.initial_scan = Some(scan);
        Ok((position, outcome))
    }

    fn advance(&mut self, position: &mut Position, bar: &Bar) -> Result<DayOutcome, SimulationError> {
        if bar.date <= position.current_date {
            return Err(SimulationError::OutOfOrder {
                previous: position.current_date,
                next: bar.date,
            });
        }
        let atr = bar
            .atr
            .ok_or(SimulationError::UnavailableAtr { date: bar.date })?;

        let net_change = position.update(bar.date, bar.close);
        self.portfolio.current_value += net_change;
        self.portfolio.current_date = bar.date;

        let extreme_update = position
            .extreme
            .observe(bar.close, atr, self.params.add_multiple);
        if let ExtremeUpdate::Flipped { from } = extreme_update {
            info!(date = %bar.date, %from, to = %position.extreme, "extreme flipped");
        }

        let band = classify(&position.extreme, bar.close, &self.params)?;
        let target = target_allocation(band, &position.extreme, &self.params);
        let transaction = if target == position.allocation() {
            None
        } else {
            Some(self.rebalance(position, target, band, bar))
        };

        debug!(
            date = %bar.date,
            close = bar.close,
            net_change,
            value = self.portfolio.current_value,
            %band,
            "day simulated"
        );

        Ok(DayOutcome {
            date: bar.date,
            close: bar.close,
            net_change,
            portfolio_value: self.portfolio.current_value,
            position_value: position.current_value,
            band,
            extreme: position.extreme,
            extreme_update: Some(extreme_update),
            transaction,
        })
    }

    /// Move to `target`. Same side resizes in place; a side change closes
    /// the position and opens a replacement carrying the same extreme.
    fn rebalance(
        &mut self,
        position: &mut Position,
        target: Allocation,
        band: AllocationBand,
        bar: &Bar,
    ) -> TransactionKind {
        let from = position.allocation();
        let target_value = self.portfolio.current_value * target.fraction;

        let (kind, capital_delta) = if target.side == from.side {
            let delta = position.scale_to(target.fraction, target_value);
            (TransactionKind::Rescale, delta)
        } else {
            let replacement = Position::open(
                self.portfolio.symbol.clone(),
                target,
                self.params.leverage,
                target_value,
                bar.date,
                bar.close,
                position.extreme,
            );
            let closed = std::mem::replace(position, replacement);
            let delta = target_value - closed.current_value;
            self.portfolio.closed_positions.push(closed);
            (TransactionKind::Flip, delta)
        };

        info!(
            date = %bar.date,
            %kind,
            %from,
            to = %target,
            %band,
            capital_delta,
            "rebalanced"
        );
        self.portfolio.transactions.push(Transaction {
            date: bar.date,
            kind,
            price: bar.close,
            from: Some(from),
            to: target,
            band,
            capital_delta,
            portfolio_value: self.portfolio.current_value,
            extreme: position.extreme,
        });
        kind
    }
}

/// Simulate every bar of `series` dated within `start..=end`.
pub fn run_simulation(
    series: &BarSeries,
    params: &StrategyParams,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<SimulationOutcome, SimulationError> {
    let mut simulation = Simulation::new(series, params, start, end)?;
    let first = series
        .index_on_or_after(start)
        .ok_or(SimulationError::NoBarsInRange)?;

    for (index, bar) in series.bars.iter().enumerate().skip(first) {
        if bar.date > end {
            break;
        }
        if bar.is_void() {
            warn!(symbol = %series.symbol, date = %bar.date, "skipping bar without prices");
            simulation.void_bars_skipped += 1;
            continue;
        }
        simulation.step(index)?;
    }

    simulation.finish()?;
    Ok(simulation.into_outcome())
}
