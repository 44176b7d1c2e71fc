use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveTime};
use clap::Subcommand;

use tasks::{Category, Task, TaskDraft, TaskPatch};

use super::{context, task_manager};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        title: String,
        /// Day, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Time of day, HH:MM
        #[arg(long)]
        time: Option<NaiveTime>,
        /// "life" or "work"
        #[arg(long, default_value = "life")]
        category: String,
        /// Shift start, work tasks only
        #[arg(long)]
        work_start: Option<NaiveTime>,
        /// Shift end, work tasks only
        #[arg(long)]
        work_end: Option<NaiveTime>,
    },
    /// List tasks, optionally filtered
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        category: Option<String>,
        /// Only this week's tasks
        #[arg(long)]
        week: bool,
        /// Only today's tasks
        #[arg(long)]
        today: bool,
    },
    /// Edit a task
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        time: Option<NaiveTime>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Toggle a task between pending and completed
    Done { id: String },
    /// Delete a task
    Rm { id: String },
    /// Search task titles
    Search { query: String },
    /// Completion statistics
    Stats,
}

fn parse_category(s: &str) -> Result<Category> {
    match s {
        "life" => Ok(Category::Life),
        "work" => Ok(Category::Work),
        other => bail!("unknown category {other:?}, expected \"life\" or \"work\""),
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("no tasks");
        return;
    }
    for task in tasks {
        let time = task
            .time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        let done = match task.status {
            tasks::Status::Completed => "x",
            tasks::Status::Pending => " ",
        };
        println!(
            "[{done}] {} {time}  {}  ({}, {})",
            task.date, task.title, task.category, task.id
        );
    }
}

pub async fn run(action: TaskAction) -> Result<()> {
    let ctx = context()?;
    let mut manager = task_manager(&ctx);
    manager.load().await;

    match action {
        TaskAction::Add {
            title,
            date,
            time,
            category,
            work_start,
            work_end,
        } => {
            let draft = TaskDraft {
                title,
                date,
                time,
                category: parse_category(&category)?,
                work_start,
                work_end,
            };
            match manager.create(draft).await {
                Some(id) => println!("created task {id}"),
                None => bail!("task was not created"),
            }
        }
        TaskAction::List {
            date,
            category,
            week,
            today,
        } => {
            let list = if let Some(date) = date {
                manager.tasks_by_date(date).await
            } else if let Some(category) = category {
                manager.tasks_by_category(parse_category(&category)?).await
            } else if week {
                manager.week_tasks().await
            } else if today {
                manager.today_tasks()
            } else {
                manager.all()
            };
            print_tasks(&list);
        }
        TaskAction::Edit {
            id,
            title,
            date,
            time,
            category,
        } => {
            let patch = TaskPatch {
                title,
                date,
                time,
                category: category.as_deref().map(parse_category).transpose()?,
                ..Default::default()
            };
            if patch.is_empty() {
                bail!("nothing to change");
            }
            if !manager.update(&id, patch).await {
                bail!("task {id} was not updated");
            }
            println!("updated task {id}");
        }
        TaskAction::Done { id } => {
            if !manager.toggle_status(&id).await {
                bail!("task {id} was not toggled");
            }
            let status = manager.get(&id).map(|t| t.status.as_str()).unwrap_or("?");
            println!("task {id} is now {status}");
        }
        TaskAction::Rm { id } => {
            if !manager.delete(&id).await {
                bail!("task {id} was not deleted");
            }
            println!("deleted task {id}");
        }
        TaskAction::Search { query } => {
            print_tasks(&manager.search(&query));
        }
        TaskAction::Stats => {
            let stats = manager.stats();
            println!("total:     {}", stats.total);
            println!("completed: {}", stats.completed);
            println!("pending:   {}", stats.pending);
            println!("rate:      {}%", stats.completion_rate);
            let mut by_category: Vec<_> = stats.by_category.iter().collect();
            by_category.sort_by_key(|(c, _)| c.as_str());
            for (category, count) in by_category {
                println!("{category}:      {count}");
            }
        }
    }

    Ok(())
}
