use anyhow::{anyhow, Result};
use async_trait::async_trait;
use concat_string::concat_string;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    crawler::{eastmoney::EastMoney, QuoteSite},
    declare::Instrument,
    util::{self, text},
};

#[derive(Deserialize, Debug)]
struct DetailsResponse {
    data: Option<Details>,
}

#[derive(Deserialize, Debug)]
struct Details {
    /// 有時是數字，有時是字串，停牌時可能是 "-"
    price: Option<Value>,
}

#[async_trait]
impl QuoteSite for EastMoney {
    async fn get_price(&self, instrument: &Instrument) -> Result<Decimal> {
        let market_id = instrument.market.eastmoney_market_id().ok_or_else(|| {
            anyhow!("{} market is not served by eastmoney", instrument.market)
        })?;
        let url = concat_string!(
            self.host,
            "/api/qt/stock/details?secid=",
            market_id.to_string(),
            ".",
            instrument.code
        );
        let text = util::http::get(&url, None).await?;

        parse_price(&text).map_err(|why| anyhow!("{} from {}", why, url))
    }
}

/// 從 `{"data":{"price":...}}` 取出最新成交價，缺值或為零都視為失敗
pub(crate) fn parse_price(text: &str) -> Result<Decimal> {
    let response: DetailsResponse = serde_json::from_str(text)
        .map_err(|why| anyhow!("Failed to parse eastmoney response because {:?}", why))?;
    let price = response
        .data
        .and_then(|details| details.price)
        .ok_or_else(|| anyhow!("eastmoney response has no data.price"))?;

    let price = match price {
        Value::Number(n) => text::parse_decimal(&n.to_string(), None)?,
        Value::String(s) => text::parse_decimal(s.trim(), None)?,
        other => return Err(anyhow!("Unexpected eastmoney price {}", other)),
    };

    if price <= Decimal::ZERO {
        return Err(anyhow!("eastmoney price is {}", price));
    }

    Ok(price.normalize())
}
