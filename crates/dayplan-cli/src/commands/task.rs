//! Task management commands.

use chrono::NaiveDate;
use clap::Subcommand;
use dayplan_core::storage::task_db::NewTask;
use dayplan_core::storage::TaskDb;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Project ID to associate with
        #[arg(long)]
        project_id: Option<String>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
        /// Estimated duration in minutes
        #[arg(long)]
        minutes: Option<i64>,
        /// Priority (1 is highest)
        #[arg(long)]
        priority: Option<i64>,
        /// Manual ordering position
        #[arg(long, default_value = "0")]
        position: i64,
    },
    /// List tasks
    List {
        /// Emit tasks as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a task completed
    Done {
        /// Task ID
        id: String,
    },
    /// Record that a task slipped to a later day
    Reschedule {
        /// Task ID
        id: String,
    },
}

pub fn run(user: &str, action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = TaskDb::open()?;

    match action {
        TaskAction::Add {
            title,
            description,
            project_id,
            due,
            minutes,
            priority,
            position,
        } => {
            let due_date = match due {
                Some(raw) => Some(
                    raw.parse::<NaiveDate>()
                        .map_err(|_| format!("Invalid due date (expected YYYY-MM-DD): {raw}"))?,
                ),
                None => None,
            };
            let task = db.create_task(
                user,
                NewTask {
                    title,
                    description,
                    project_id,
                    due_date,
                    estimated_minutes: minutes,
                    priority,
                    position,
                },
            )?;
            println!("Task created: {}", task.id);
        }
        TaskAction::List { json } => {
            let tasks = db.list_tasks(user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
                return Ok(());
            }
            for task in tasks {
                let due = task
                    .due_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{} [{}] due {} {}",
                    task.id,
                    if task.completed { "x" } else { " " },
                    due,
                    task.title,
                );
            }
        }
        TaskAction::Done { id } => {
            if db.complete_task(user, &id)? {
                println!("Task completed: {id}");
            } else {
                return Err(format!("Task not found: {id}").into());
            }
        }
        TaskAction::Reschedule { id } => {
            if db.record_reschedule(user, &id)? {
                println!("Reschedule recorded: {id}");
            } else {
                return Err(format!("Task not found: {id}").into());
            }
        }
    }
    Ok(())
}
