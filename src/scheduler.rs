use std::{env, future::Future};

use anyhow::{Error, Result};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{event, logging};

/// 啟動排程
///
/// `cron_expr` 為六欄位的 cron 表示式（秒 分 時 日 月 星期），以 UTC 計算。
pub async fn start(sched: &JobScheduler, cron_expr: &str) -> Result<()> {
    //                 sec  min   hour   day of month   month   day of week
    // 每小時整點抓一次 "0     0     *          *          *          *"
    let job = create_job(cron_expr.to_string(), event::fuel_price::execute)?;
    sched.add(job).await?;
    sched.start().await?;

    logging::info_file_async(format!(
        "FuelCrawler 已啟動 ({})\r\nRust OS/Arch: {}/{}\r\n",
        cron_expr,
        env::consts::OS,
        env::consts::ARCH
    ));

    Ok(())
}

fn create_job<F, Fut>(cron_expr: String, task: F) -> Result<Job>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send,
{
    let expr = cron_expr.clone();
    Ok(Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
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
