use anyhow::{anyhow, Result};
use async_trait::async_trait;
use concat_string::concat_string;
use reqwest::header::{self, HeaderMap, HeaderValue};
use rust_decimal::Decimal;

use crate::{
    crawler::{sina::Sina, QuoteSite},
    declare::Instrument,
    util::{self, text},
};

#[async_trait]
impl QuoteSite for Sina {
    async fn get_price(&self, instrument: &Instrument) -> Result<Decimal> {
        let url = concat_string!(self.host, "/list=gb_", instrument.code.to_lowercase());
        let mut headers = HeaderMap::new();
        headers.insert(
            header::REFERER,
            HeaderValue::from_str(&self.referer)
                .map_err(|why| anyhow!("Invalid referer {} because {:?}", self.referer, why))?,
        );

        let text = util::http::get_use_gbk(&url, Some(headers)).await?;

        parse_price(&text).map_err(|why| anyhow!("{} from {}", why, url))
    }
}

/// 解析 `var hq_str_gb_qqq="名稱,現價,漲跌幅,時間,...";`
///
/// 欄位數不固定，只取雙引號內以逗號分隔的第二個欄位。
pub(crate) fn parse_price(text: &str) -> Result<Decimal> {
    let body = text
        .split('"')
        .nth(1)
        .ok_or_else(|| anyhow!("sina response has no quoted quote line"))?;
    let price = body
        .split(',')
        .nth(1)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("sina quote line has no price field: {:?}", body))?;
    let price = text::parse_decimal(price, None)?;

    if price <= Decimal::ZERO {
        return Err(anyhow!("sina price is {}", price));
    }

    Ok(price.normalize())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;
    use crate::declare::Market;

    #[test]
    fn test_parse_price() {
        let line = "var hq_str_gb_qqq=\"纳指100ETF,620.5100,0.35,2026-10-16 16:00:00,2.1700,618.9000\";\n";
        assert_eq!(parse_price(line).unwrap(), dec!(620.51));

        // 只有兩個欄位也可以
        assert_eq!(parse_price("var hq_str_gb_ring=\"RING,40.12\";").unwrap(), dec!(40.12));
    }

    #[test]
    fn test_parse_price_tolerates_short_lines() {
        assert!(parse_price("var hq_str_gb_xxxx=\"\";").is_err());
        assert!(parse_price("var hq_str_gb_xxxx=\"FUND\";").is_err());
        assert!(parse_price("var hq_str_gb_xxxx=\"FUND, ,1.2\";").is_err());
        assert!(parse_price("var hq_str_gb_xxxx=\"FUND,0.000\";").is_err());
        assert!(parse_price("Forbidden").is_err());
        assert!(parse_price("").is_err());
    }

    #[tokio::test]
    async fn test_get_price_sends_referer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let (body, _, _) = encoding_rs::GBK.encode("var hq_str_gb_copx=\"全球铜矿股ETF,31.05,1.2\";");
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        let fund = Instrument::new("COPX", Market::UnitedStates, "全球铜矿股ETF", dec!(6666.67), dec!(30.00), dec!(200000.00));
        let price = Sina::new(&host, "https://finance.sina.com.cn/")
            .get_price(&fund)
            .await
            .unwrap();
        assert_eq!(price, dec!(31.05));

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /list=gb_copx "), "{}", request);
        assert!(request.contains("referer: https://finance.sina.com.cn/"), "{}", request);
    }
}
