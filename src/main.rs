#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use tokio_cron_scheduler::JobScheduler;

use crate::config::SETTINGS;

pub mod config;
pub mod crawler;
pub mod declare;
pub mod error;
pub mod event;
pub mod history;
pub mod logging;
pub mod policy;
pub mod report;
pub mod scheduler;
pub mod util;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    util::http::install_crypto_provider();

    let schedule = SETTINGS.system.schedule.trim();
    if schedule.is_empty() {
        if let Err(why) = event::fuel_price::execute().await {
            logging::error_console(format!("Failed to fetch fuel prices because {:?}", why));
            logging::error_file_async(format!("Failed to fuel_price::execute because {:?}", why));
        }
    } else {
        let sched = JobScheduler::new().await?;
        scheduler::start(&sched, schedule).await?;
        logging::info_console(format!("Scheduled with '{}', Ctrl-C to stop", schedule));

        tokio::signal::ctrl_c().await?;
        logging::info_console("Received shutdown signal".to_string());
    }

    util::http::flush_log();
    logging::flush();

    Ok(())
}
