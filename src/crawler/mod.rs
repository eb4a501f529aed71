use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    config,
    crawler::{eastmoney::EastMoney, sina::Sina},
    declare::Instrument,
    logging,
};

/// 東方財富（滬深、港股）
pub mod eastmoney;
/// 新浪財經（美股）
pub mod sina;

/// 單次報價結果，用完即丟
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Quote {
    pub code: String,
    pub price: Decimal,
    /// 只有從網路取得報價時才有值
    pub captured_at: Option<DateTime<Local>>,
    /// true 表示報價失敗，price 為成本價
    pub fallback: bool,
}

impl Quote {
    /// 以成本價代替的報價
    pub fn fallback(instrument: &Instrument) -> Self {
        Quote {
            code: instrument.code.clone(),
            price: instrument.cost_price,
            captured_at: None,
            fallback: true,
        }
    }
}

#[async_trait]
pub trait QuoteSite: Send + Sync {
    async fn get_price(&self, instrument: &Instrument) -> Result<Decimal>;
}

/// 依市場別挑選報價來源
pub struct Crawler {
    eastmoney: EastMoney,
    sina: Sina,
}

impl Crawler {
    pub fn new(quote: &config::Quote) -> Self {
        Crawler {
            eastmoney: EastMoney::new(&quote.eastmoney_url),
            sina: Sina::new(&quote.sina_url, &quote.sina_referer),
        }
    }
}

#[async_trait]
impl QuoteSite for Crawler {
    async fn get_price(&self, instrument: &Instrument) -> Result<Decimal> {
        match instrument.market.eastmoney_market_id() {
            Some(_) => self.eastmoney.get_price(instrument).await,
            None => self.sina.get_price(instrument).await,
        }
    }
}

/// 取得 ETF 目前的報價
///
/// 不會回傳錯誤：任何失敗（連線、逾時、格式不符）都記錄下來並以成本價代替，
/// 呼叫端只會看到一個等於成本價的價格。
pub async fn fetch_price(site: &dyn QuoteSite, instrument: &Instrument) -> Quote {
    match site.get_price(instrument).await {
        Ok(price) => {
            logging::info_file_async(format!(
                "{}({}) price fetched: {}",
                instrument.name, instrument.code, price
            ));

            Quote {
                code: instrument.code.clone(),
                price,
                captured_at: Some(Local::now()),
                fallback: false,
            }
        }
        Err(why) => {
            logging::warn_file_async(format!(
                "Failed to fetch the {} price of {}({}), using cost price {} because {:?}",
                instrument.market.name(),
                instrument.name,
                instrument.code,
                instrument.cost_price,
                why
            ));

            Quote::fallback(instrument)
        }
    }
}
