//! # 東方財富行情
//!
//! 滬深與港股 ETF 的即時報價，接口為
//! `/api/qt/stock/details?secid={市場代號}.{代碼}`，市場代號見
//! [`Market::eastmoney_market_id`](crate::declare::Market::eastmoney_market_id)。

/// 即時報價
pub mod price;

/// 東方財富採集器
pub struct EastMoney {
    host: String,
}

impl EastMoney {
    pub fn new(host: &str) -> Self {
        EastMoney {
            host: host.trim_end_matches('/').to_string(),
        }
    }
}
