//! # 新浪財經行情
//!
//! 美股 ETF 的即時報價，接口為 `/list=gb_{小寫代碼}`，
//! 必須帶 Referer，回應內容為 GBK 編碼的 JavaScript 變數。

/// 即時報價
pub mod price;

/// 新浪財經採集器
pub struct Sina {
    host: String,
    referer: String,
}

impl Sina {
    pub fn new(host: &str, referer: &str) -> Self {
        Sina {
            host: host.trim_end_matches('/').to_string(),
            referer: referer.to_string(),
        }
    }
}
