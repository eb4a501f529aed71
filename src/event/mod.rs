/// 抓取報價、更新報表與快照
pub mod fund_sync;
