use std::future::Future;

use anyhow::{Error, Result};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{event, logging};

/// 依 cron 表示式定時同步，直到收到 Ctrl-C
///
/// 表示式包含秒，例如 `0 */30 1-8 * * Mon-Fri`（UTC 時間）。
pub async fn start(cron_expr: &str) -> Result<()> {
    let mut sched = JobScheduler::new().await?;
    sched
        .add(create_job(cron_expr, event::fund_sync::execute)?)
        .await?;
    sched.start().await?;

    logging::info_file_async(format!("fund sync scheduled at {}", cron_expr));

    tokio::signal::ctrl_c().await?;
    logging::info_file_async("Ctrl-C received, shutting down".to_string());
    sched.shutdown().await?;

    Ok(())
}

fn create_job<F, Fut>(cron_expr: &str, task: F) -> Result<Job>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send,
{
    let expr = cron_expr.to_string();

    Ok(Job::new_async(cron_expr, move |_uuid, _l| {
        let task = task.clone();
        let expr = expr.clone();
        Box::pin(async move {
            if let Err(why) = task().await {
                logging::error_file_async(format!(
                    "Failed to execute task({}) because {:?}",
                    expr, why
                ));
            }
        })
    })?)
}
