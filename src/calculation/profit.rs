use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::declare::Instrument;

/// 單一 ETF 的即時市值與損益
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Valuation {
    pub held_units: Decimal,
    pub current_value: Decimal,
    pub profit: Decimal,
    /// 百分比，例如 19.05 代表 19.05%
    pub profit_rate: Decimal,
}

/// 計算單一 ETF 的市值與損益
///
/// 持有股數優先使用設定的 `hold`，否則以 `capital × ratio ÷ cost_price` 推算。
/// 成本為零時報酬率為零；任何一步超出 Decimal 範圍都回傳錯誤。
pub fn compute(instrument: &Instrument, current_price: Decimal, capital: Decimal) -> Result<Valuation> {
    let held_units = held_units(instrument, capital)?;
    let current_value = held_units
        .checked_mul(current_price)
        .ok_or_else(|| overflow("current value", instrument))?;
    let profit = current_value
        .checked_sub(instrument.cost_total)
        .ok_or_else(|| overflow("profit", instrument))?;
    let profit_rate =
        rate(profit, instrument.cost_total).ok_or_else(|| overflow("profit rate", instrument))?;

    Ok(Valuation {
        held_units,
        current_value,
        profit,
        profit_rate,
    })
}

fn held_units(instrument: &Instrument, capital: Decimal) -> Result<Decimal> {
    if let Some(hold) = instrument.hold {
        return Ok(hold);
    }

    match instrument.ratio {
        Some(ratio) if !instrument.cost_price.is_zero() => capital
            .checked_mul(ratio)
            .and_then(|v| v.checked_div(instrument.cost_price))
            .ok_or_else(|| overflow("held units", instrument)),
        _ => Ok(Decimal::ZERO),
    }
}

fn overflow(what: &str, instrument: &Instrument) -> anyhow::Error {
    anyhow!("The {} of {}({}) overflowed", what, instrument.name, instrument.code)
}

/// profit / base × 100，base 為零時回傳零，溢位時回傳 None
pub fn rate(profit: Decimal, base: Decimal) -> Option<Decimal> {
    if base.is_zero() {
        return Some(Decimal::ZERO);
    }

    profit.checked_div(base)?.checked_mul(dec!(100))
}

/// 組合（或全部組合）的累計數據
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct PortfolioTotals {
    /// 投入的總資金，報酬率以此為分母
    pub capital: Decimal,
    /// 各 ETF 成本加總
    pub cost_total: Decimal,
    pub total_value: Decimal,
    pub total_profit: Decimal,
    pub total_rate: Decimal,
}

impl PortfolioTotals {
    pub fn new(capital: Decimal) -> Self {
        PortfolioTotals {
            capital,
            ..Default::default()
        }
    }

    /// 累加一檔 ETF；溢位時回傳錯誤且不改變目前的數據
    pub fn add(&mut self, instrument: &Instrument, valuation: &Valuation) -> Result<()> {
        self.merge(
            self.capital,
            instrument.cost_total,
            valuation.current_value,
            valuation.profit,
        )
    }

    /// 加總所有組合，報酬率以加總後的資金計算
    pub fn aggregate<'a>(all: impl IntoIterator<Item = &'a PortfolioTotals>) -> Result<Self> {
        let mut total = PortfolioTotals::default();
        for t in all {
            let capital = total
                .capital
                .checked_add(t.capital)
                .ok_or_else(|| anyhow!("The aggregate capital overflowed"))?;
            total.merge(capital, t.cost_total, t.total_value, t.total_profit)?;
        }

        Ok(total)
    }

    fn merge(
        &mut self,
        capital: Decimal,
        cost_total: Decimal,
        value: Decimal,
        profit: Decimal,
    ) -> Result<()> {
        let sum = || -> Option<PortfolioTotals> {
            let total_profit = self.total_profit.checked_add(profit)?;
            Some(PortfolioTotals {
                capital,
                cost_total: self.cost_total.checked_add(cost_total)?,
                total_value: self.total_value.checked_add(value)?,
                total_profit,
                total_rate: rate(total_profit, capital)?,
            })
        };

        let merged = sum().ok_or_else(|| anyhow!("The portfolio totals overflowed"))?;
        *self = merged;
        Ok(())
    }
}
