use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// HTML 報表的 placeholder 改寫
pub mod html;
/// JSON 快照
pub mod snapshot;

pub const PROFIT_POSITIVE: &str = "profit-positive";
pub const PROFIT_NEGATIVE: &str = "profit-negative";

/// 報表中要被覆寫的節點
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    /// `id` 屬性等於此值的元素
    Id(String),
    /// 沒有子元素且文字內容（去掉前後空白）完全等於此值的元素
    Literal(String),
    /// 屬性 `name` 的值完全等於 `value` 的元素
    Attr { name: String, value: String },
}

impl Placeholder {
    pub fn id(id: impl Into<String>) -> Self {
        Placeholder::Id(id.into())
    }

    pub fn attr(name: impl Into<String>, value: impl Into<String>) -> Self {
        Placeholder::Attr {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// 一次執行要寫進報表的所有文字與 class
#[derive(Debug, Default, Clone)]
pub struct ReportUpdate {
    pub texts: BTreeMap<Placeholder, String>,
    pub classes: BTreeMap<Placeholder, String>,
}

impl ReportUpdate {
    pub fn set_text(&mut self, placeholder: Placeholder, value: String) {
        self.texts.insert(placeholder, value);
    }

    pub fn set_class(&mut self, placeholder: Placeholder, class: &str) {
        self.classes.insert(placeholder, class.to_string());
    }

    /// 損益欄位同時設定文字與正負 class
    pub fn set_profit(&mut self, placeholder: Placeholder, profit: Decimal) {
        self.set_class(placeholder.clone(), profit_class(profit));
        self.set_text(placeholder, format_amount(profit));
    }
}

/// 四捨五入到 `dp` 位並補零，-0.00 顯示為 0.00
fn format_dp(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let rounded = if rounded.is_zero() { rounded.abs() } else { rounded };
    format!("{:.*}", dp as usize, rounded)
}

/// 價格低於 10 時顯示三位小數
pub fn format_price(price: Decimal) -> String {
    if price < Decimal::TEN {
        format_dp(price, 3)
    } else {
        format_dp(price, 2)
    }
}

pub fn format_amount(amount: Decimal) -> String {
    format_dp(amount, 2)
}

pub fn format_rate(rate: Decimal) -> String {
    format!("{}%", format_dp(rate, 2))
}

pub fn profit_class(profit: Decimal) -> &'static str {
    if profit >= Decimal::ZERO {
        PROFIT_POSITIVE
    } else {
        PROFIT_NEGATIVE
    }
}

/// 先寫到同目錄的暫存檔再改名，避免寫到一半留下殘缺的檔案
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("{} is not a file path", path.display()))?;
    let mut tmp_name = OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path: PathBuf = path.with_file_name(tmp_name);

    fs::write(&tmp_path, content)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    if let Err(why) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(anyhow!("Failed to replace {} because {:?}", path.display(), why));
    }

    Ok(())
}
