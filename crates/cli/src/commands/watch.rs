use anyhow::{Result, bail};
use tracing::info;

use super::{context, task_manager};

/// Follow realtime task changes, reloading the list on every push.
/// Each push triggers a full reload; if pushes overlap, the last
/// reload wins.
pub async fn run() -> Result<()> {
    let ctx = context()?;
    let mut manager = task_manager(&ctx);
    manager.load().await;

    let Some(mut subscription) = manager.subscribe_changes().await else {
        bail!("watch needs a signed-in session and a reachable backend");
    };

    println!("watching task changes, ctrl-c to stop");
    loop {
        tokio::select! {
            event = subscription.next_event() => {
                let Some(event) = event else {
                    bail!("realtime stream closed");
                };
                info!(table = %event.table, kind = ?event.kind, "change received");
                let tasks = manager.load().await;
                println!("-- {} tasks --", tasks.len());
                for task in &tasks {
                    println!("[{}] {}  {}", task.status.as_str(), task.date, task.title);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                subscription.unsubscribe();
                println!("stopped");
                return Ok(());
            }
        }
    }
}
