use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    calculation::profit::{PortfolioTotals, Valuation},
    crawler::Quote,
    declare::{Instrument, Market},
    report,
};

/// 單一 ETF 在快照中的紀錄
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FundSnapshot {
    pub code: String,
    pub name: String,
    pub market: Market,
    pub cost_price: Decimal,
    pub cost_total: Decimal,
    pub held_units: Decimal,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub profit: Decimal,
    pub profit_rate: Decimal,
    /// 報價失敗時為 None
    pub quote_time: Option<DateTime<Local>>,
    pub fallback: bool,
}

impl FundSnapshot {
    pub fn new(instrument: &Instrument, quote: &Quote, valuation: &Valuation) -> Self {
        FundSnapshot {
            code: instrument.code.clone(),
            name: instrument.name.clone(),
            market: instrument.market,
            cost_price: instrument.cost_price,
            cost_total: instrument.cost_total,
            held_units: valuation.held_units,
            current_price: quote.price,
            current_value: valuation.current_value,
            profit: valuation.profit,
            profit_rate: valuation.profit_rate,
            quote_time: quote.captured_at,
            fallback: quote.fallback,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
    pub key: String,
    pub name: String,
    pub totals: PortfolioTotals,
    pub funds: Vec<FundSnapshot>,
}

/// 一次同步後的完整狀態，Decimal 以字串輸出，重新讀回不會有誤差
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub generated_at: DateTime<Local>,
    pub portfolios: Vec<PortfolioSnapshot>,
    pub aggregate: PortfolioTotals,
}

impl Snapshot {
    pub fn new(generated_at: DateTime<Local>, portfolios: Vec<PortfolioSnapshot>) -> Result<Self> {
        let aggregate = PortfolioTotals::aggregate(portfolios.iter().map(|p| &p.totals))?;

        Ok(Snapshot {
            generated_at,
            portfolios,
            aggregate,
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        report::write_atomic(path, json.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }
}
