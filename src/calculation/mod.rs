/// 市值與損益計算
pub mod profit;
