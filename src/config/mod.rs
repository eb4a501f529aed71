use std::{env, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{
    declare::{Instrument, Market, Portfolio},
    logging,
};

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct App {
    pub report: Report,
    pub http: Http,
    pub quote: Quote,
    pub system: System,
    pub portfolios: Vec<Portfolio>,
}

const REPORT_HTML_PATH: &str = "REPORT_HTML_PATH";
const REPORT_SNAPSHOT_PATH: &str = "REPORT_SNAPSHOT_PATH";
const REPORT_UPDATE_TIME_LABEL: &str = "REPORT_UPDATE_TIME_LABEL";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Report {
    pub html_path: String,
    /// 空字串表示不輸出 JSON
    pub snapshot_path: String,
    pub update_time_label: String,
}

impl Default for Report {
    fn default() -> Self {
        Report {
            html_path: "index.html".to_string(),
            snapshot_path: "data.json".to_string(),
            update_time_label: "数据更新时间".to_string(),
        }
    }
}

const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Http {
    pub timeout_secs: u64,
}

impl Default for Http {
    fn default() -> Self {
        Http { timeout_secs: 15 }
    }
}

impl Http {
    /// 解析 env 給的秒數，格式不對時記錄警告並保留原值
    fn set_timeout(&mut self, secs: &str) {
        match u64::from_str(secs.trim()) {
            Ok(secs) => self.timeout_secs = secs,
            Err(why) => logging::warn_file_async(format!(
                "{}={:?} is not a number of seconds, keeping {} because {:?}",
                HTTP_TIMEOUT_SECS, secs, self.timeout_secs, why
            )),
        }

        self.clamp_timeout();
    }

    /// 逾時至少 1 秒
    fn clamp_timeout(&mut self) {
        if self.timeout_secs == 0 {
            logging::warn_file_async(
                "http.timeout_secs is 0, using 1 second instead".to_string(),
            );
            self.timeout_secs = 1;
        }
    }
}

const QUOTE_EASTMONEY_URL: &str = "QUOTE_EASTMONEY_URL";
const QUOTE_SINA_URL: &str = "QUOTE_SINA_URL";
const SINA_REFERER: &str = "SINA_REFERER";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Quote {
    pub eastmoney_url: String,
    pub sina_url: String,
    pub sina_referer: String,
}

impl Default for Quote {
    fn default() -> Self {
        Quote {
            eastmoney_url: "https://push2.eastmoney.com".to_string(),
            sina_url: "https://hq.sinajs.cn".to_string(),
            sina_referer: "https://finance.sina.com.cn/".to_string(),
        }
    }
}

const SYSTEM_CRON: &str = "SYSTEM_CRON";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct System {
    /// 例如 "0 */30 1-8 * * Mon-Fri"；空字串表示只執行一次
    pub cron: String,
}

impl Default for App {
    fn default() -> Self {
        App {
            report: Default::default(),
            http: Default::default(),
            quote: Default::default(),
            system: Default::default(),
            portfolios: default_portfolios(),
        }
    }
}

pub static SETTINGS: Lazy<App> = Lazy::new(App::load);

impl App {
    /// 讀取 app.json，失敗時記錄錯誤並使用預設值
    fn load() -> Self {
        let config_path = config_path();
        if !config_path.exists() {
            return App::default().override_with_env();
        }

        match App::from_file(config_path) {
            Ok(app) => app.override_with_env(),
            Err(why) => {
                logging::error_file_async(format!(
                    "I can't read the config context because {:?}",
                    why
                ));
                App::default().override_with_env()
            }
        }
    }

    pub fn from_file(path: PathBuf) -> Result<Self> {
        let app: App = config_config::builder()
            .add_source(config_file::from(path))
            .build()?
            .try_deserialize()?;

        Ok(app)
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(path) = env::var(REPORT_HTML_PATH) {
            self.report.html_path = path;
        }

        if let Ok(path) = env::var(REPORT_SNAPSHOT_PATH) {
            self.report.snapshot_path = path;
        }

        if let Ok(label) = env::var(REPORT_UPDATE_TIME_LABEL) {
            self.report.update_time_label = label;
        }

        if let Ok(secs) = env::var(HTTP_TIMEOUT_SECS) {
            self.http.set_timeout(&secs);
        }
        self.http.clamp_timeout();

        if let Ok(url) = env::var(QUOTE_EASTMONEY_URL) {
            self.quote.eastmoney_url = url;
        }

        if let Ok(url) = env::var(QUOTE_SINA_URL) {
            self.quote.sina_url = url;
        }

        if let Ok(referer) = env::var(SINA_REFERER) {
            self.quote.sina_referer = referer;
        }

        if let Ok(cron) = env::var(SYSTEM_CRON) {
            self.system.cron = cron;
        }

        self
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

/// 2026 年開盤價建立的三個組合，成本數據永不更動
fn default_portfolios() -> Vec<Portfolio> {
    vec![
        Portfolio {
            key: "a".to_string(),
            name: "A股组合".to_string(),
            total_cost: dec!(1000000),
            funds: vec![
                Instrument::new("513390", Market::Shanghai, "纳指100ETF", dec!(119047.62), dec!(2.10), dec!(250000.00)),
                Instrument::new("159652", Market::Shenzhen, "有色50ETF", dec!(35260.93), dec!(7.09), dec!(250000.00)),
                Instrument::new("588200", Market::Shanghai, "科创芯片ETF", dec!(23300.00), dec!(10.73), dec!(250000.00)),
                Instrument::new("515880", Market::Shanghai, "通信ETF", dec!(29469.55), dec!(5.09), dec!(150000.00)),
                Instrument::new("518880", Market::Shanghai, "黄金ETF", dec!(22727.27), dec!(4.40), dec!(100000.00)),
            ],
        },
        Portfolio {
            key: "hk".to_string(),
            name: "港股组合".to_string(),
            total_cost: dec!(1000000),
            funds: vec![
                Instrument::new("03455", Market::HongKong, "纳指100ETF", dec!(25000.00), dec!(10.00), dec!(250000.00)),
                Instrument::new("03132", Market::HongKong, "全球半导体ETF", dec!(25000.00), dec!(8.00), dec!(200000.00)),
                Instrument::new("03147", Market::HongKong, "中国创业板ETF", dec!(40000.00), dec!(5.00), dec!(200000.00)),
                Instrument::new("03110", Market::HongKong, "恒生高股息ETF", dec!(33333.33), dec!(6.00), dec!(200000.00)),
                Instrument::new("02840", Market::HongKong, "黄金ETF", dec!(21428.57), dec!(7.00), dec!(150000.00)),
            ],
        },
        Portfolio {
            key: "us".to_string(),
            name: "美股组合".to_string(),
            total_cost: dec!(1000000),
            funds: vec![
                Instrument::new("QQQ", Market::UnitedStates, "纳指100ETF", dec!(403.23), dec!(620.00), dec!(250000.00)),
                Instrument::new("SPY", Market::UnitedStates, "标普500ETF", dec!(500.00), dec!(500.00), dec!(250000.00)),
                Instrument::new("RING", Market::UnitedStates, "全球黄金矿股ETF", dec!(5000.00), dec!(40.00), dec!(200000.00)),
                Instrument::new("COPX", Market::UnitedStates, "全球铜矿股ETF", dec!(6666.67), dec!(30.00), dec!(200000.00)),
                Instrument::new("BITB", Market::UnitedStates, "大饼ETF", dec!(2040.82), dec!(49.00), dec!(100000.00)),
            ],
        },
    ]
}
