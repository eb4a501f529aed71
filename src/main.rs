/// 市值與損益計算
pub mod calculation;
/// 設定檔
pub mod config;
/// 報價來源
pub mod crawler;
/// 市場、ETF 與組合的定義
pub mod declare;
/// 同步事件
pub mod event;
/// 日誌
pub mod logging;
/// HTML 報表與 JSON 快照
pub mod report;
/// 排程
pub mod scheduler;
pub mod util;

use crate::config::SETTINGS;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let result = if SETTINGS.system.cron.trim().is_empty() {
        event::fund_sync::execute().await
    } else {
        scheduler::start(SETTINGS.system.cron.trim()).await
    };

    if let Err(why) = &result {
        logging::error_console(format!("{:?}", why));
    }

    logging::flush();

    result
}
