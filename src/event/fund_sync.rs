use std::{collections::BTreeSet, path::Path};

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::{
    calculation::profit::{self, PortfolioTotals, Valuation},
    config::{App, SETTINGS},
    crawler::{self, Crawler, Quote, QuoteSite},
    declare::Portfolio,
    logging,
    report::{
        self,
        html::HtmlReport,
        snapshot::{FundSnapshot, PortfolioSnapshot, Snapshot},
        Placeholder, ReportUpdate,
    },
};

/// 依設定抓取所有 ETF 的報價，改寫 HTML 報表並輸出 JSON 快照
pub async fn execute() -> Result<()> {
    let crawler = Crawler::new(&SETTINGS.quote);
    let snapshot = run(&SETTINGS, &crawler, Local::now()).await?;

    logging::info_file_async(format!(
        "fund sync finished, total value {} profit {} ({})",
        report::format_amount(snapshot.aggregate.total_value),
        report::format_amount(snapshot.aggregate.total_profit),
        report::format_rate(snapshot.aggregate.total_rate)
    ));

    Ok(())
}

/// 執行一次同步
///
/// 讀不到報表範本時直接回傳錯誤，不會寫入任何檔案。
pub async fn run(app: &App, site: &dyn QuoteSite, now: DateTime<Local>) -> Result<Snapshot> {
    let mut document = match HtmlReport::load(&app.report.html_path) {
        Ok(document) => document,
        Err(why) => {
            logging::error_file_async(format!(
                "Failed to load the report template because {:?}",
                why
            ));
            return Err(why);
        }
    };

    let mut update = ReportUpdate::default();
    let mut portfolios = Vec::with_capacity(app.portfolios.len());
    let update_time = format!(
        "{}: {}",
        app.report.update_time_label,
        now.format("%Y-%m-%d %H:%M:%S")
    );

    for portfolio in &app.portfolios {
        portfolios.push(sync_portfolio(portfolio, site, &mut update).await);
        update.set_text(
            Placeholder::id(format!("{}-update-time", portfolio.key)),
            update_time.clone(),
        );
    }

    let ids: BTreeSet<&str> = update
        .texts
        .keys()
        .chain(update.classes.keys())
        .filter_map(|placeholder| match placeholder {
            Placeholder::Id(id) => Some(id.as_str()),
            _ => None,
        })
        .collect();
    let missing = document.missing_ids(ids);
    if !missing.is_empty() {
        logging::warn_file_async(format!(
            "{} placeholders are missing from {}: {}",
            missing.len(),
            app.report.html_path,
            missing.join(", ")
        ));
    }

    let snapshot = match Snapshot::new(now, portfolios) {
        Ok(snapshot) => snapshot,
        Err(why) => {
            logging::error_file_async(format!("Failed to build the snapshot because {:?}", why));
            return Err(why);
        }
    };

    let applied = document.apply(&update);
    if let Err(why) = document.save() {
        logging::error_file_async(format!("Failed to save the report because {:?}", why));
        return Err(why);
    }

    logging::info_file_async(format!(
        "{} placeholders written to {}",
        applied, app.report.html_path
    ));

    if !app.report.snapshot_path.is_empty() {
        if let Err(why) = snapshot.write(Path::new(&app.report.snapshot_path)) {
            logging::error_file_async(format!("Failed to write the snapshot because {:?}", why));
            return Err(why);
        }
    }

    Ok(snapshot)
}

async fn sync_portfolio(
    portfolio: &Portfolio,
    site: &dyn QuoteSite,
    update: &mut ReportUpdate,
) -> PortfolioSnapshot {
    let key = &portfolio.key;
    let mut totals = PortfolioTotals::new(portfolio.total_cost);
    let mut funds = Vec::with_capacity(portfolio.funds.len());

    for (i, fund) in portfolio.funds.iter().enumerate() {
        let mut quote = crawler::fetch_price(site, fund).await;
        let valuation = match profit::compute(fund, quote.price, portfolio.total_cost) {
            Ok(valuation) => valuation,
            Err(why) => {
                logging::warn_file_async(format!(
                    "Price {} of {}({}) is out of range, using cost price {} because {:?}",
                    quote.price, fund.name, fund.code, fund.cost_price, why
                ));
                quote = Quote::fallback(fund);
                profit::compute(fund, quote.price, portfolio.total_cost).unwrap_or_else(|why| {
                    logging::error_file_async(format!("{:?}", why));
                    Valuation::default()
                })
            }
        };

        update.set_text(
            Placeholder::id(format!("{}-price-{}", key, i)),
            report::format_price(quote.price),
        );
        update.set_text(
            Placeholder::id(format!("{}-current-{}", key, i)),
            report::format_amount(valuation.current_value),
        );
        update.set_profit(Placeholder::id(format!("{}-profit-{}", key, i)), valuation.profit);
        update.set_text(
            Placeholder::id(format!("{}-rate-{}", key, i)),
            report::format_rate(valuation.profit_rate),
        );

        if let Err(why) = totals.add(fund, &valuation) {
            logging::error_file_async(format!(
                "{}({}) is left out of the {} totals because {:?}",
                fund.name, fund.code, key, why
            ));
        }
        funds.push(FundSnapshot::new(fund, &quote, &valuation));
    }

    update.set_text(
        Placeholder::id(format!("{}-total-value", key)),
        report::format_amount(totals.total_value),
    );
    update.set_profit(Placeholder::id(format!("{}-total-profit", key)), totals.total_profit);
    update.set_text(
        Placeholder::id(format!("{}-total-rate", key)),
        report::format_rate(totals.total_rate),
    );

    logging::info_file_async(format!(
        "{}({}) value {} profit {} ({})",
        portfolio.name,
        key,
        report::format_amount(totals.total_value),
        report::format_amount(totals.total_profit),
        report::format_rate(totals.total_rate)
    ));

    PortfolioSnapshot {
        key: key.clone(),
        name: portfolio.name.clone(),
        totals,
        funds,
    }
}
