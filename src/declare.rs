use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// 市場別，決定報價來源
#[derive(Serialize, Deserialize, Display, EnumString, EnumIter, PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum Market {
    /// 上海證券交易所
    #[serde(rename = "sh")]
    #[strum(serialize = "sh")]
    Shanghai,
    /// 深圳證券交易所
    #[serde(rename = "sz")]
    #[strum(serialize = "sz")]
    Shenzhen,
    /// 香港交易所
    #[serde(rename = "hk")]
    #[strum(serialize = "hk")]
    HongKong,
    /// 美股
    #[serde(rename = "us")]
    #[strum(serialize = "us")]
    UnitedStates,
}

impl Market {
    /// 東方財富的市場代號，美股不走東方財富
    pub fn eastmoney_market_id(&self) -> Option<u32> {
        match self {
            Market::Shanghai => Some(1),
            Market::Shenzhen => Some(0),
            Market::HongKong => Some(116),
            Market::UnitedStates => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Market::Shanghai => "上海",
            Market::Shenzhen => "深圳",
            Market::HongKong => "香港",
            Market::UnitedStates => "美國",
        }
    }
}

/// 單一檔 ETF 的設定，執行期間不會被修改
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Instrument {
    pub code: String,
    pub market: Market,
    pub name: String,
    /// 持有股數，與 `ratio` 擇一設定
    #[serde(default)]
    pub hold: Option<Decimal>,
    /// 目標配置比例，持有股數 = 投入資金 × ratio ÷ 成本價
    #[serde(default)]
    pub ratio: Option<Decimal>,
    /// 成本價，報價失敗時的替代價格
    pub cost_price: Decimal,
    /// 投入成本
    pub cost_total: Decimal,
}

impl Instrument {
    pub fn new(
        code: &str,
        market: Market,
        name: &str,
        hold: Decimal,
        cost_price: Decimal,
        cost_total: Decimal,
    ) -> Self {
        Instrument {
            code: code.to_string(),
            market,
            name: name.to_string(),
            hold: Some(hold),
            ratio: None,
            cost_price,
            cost_total,
        }
    }
}

/// 投資組合；`key` 同時是報表中 placeholder id 的前綴
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub key: String,
    #[serde(default)]
    pub name: String,
    /// 投入的總資金
    pub total_cost: Decimal,
    pub funds: Vec<Instrument>,
}
