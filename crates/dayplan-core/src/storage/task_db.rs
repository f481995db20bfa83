//! SQLite-based storage for tasks.
//!
//! The planner only reads from here; writes come from the CLI and the
//! (out-of-scope) API layer.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::data_dir;
use crate::task::Task;

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Build a Task from a database row
fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
    let due_date: Option<String> = row.get(5)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;
    Ok(Task {
        id: row.get(0)?,
        user: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        project_id: row.get(4)?,
        due_date: due_date.and_then(|s| s.parse().ok()),
        estimated_minutes: row.get(6)?,
        priority: row.get(7)?,
        position: row.get(8)?,
        reschedule_count: row.get(9)?,
        completed: row.get(10)?,
        created_at: parse_datetime_fallback(&created_at),
        updated_at: parse_datetime_fallback(&updated_at),
    })
}

const TASK_COLUMNS: &str = "id, user, title, description, project_id, due_date, \
     estimated_minutes, priority, position, reschedule_count, completed, \
     created_at, updated_at";

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub estimated_minutes: Option<i64>,
    pub priority: Option<i64>,
    pub position: i64,
}

/// SQLite database for task storage.
pub struct TaskDb {
    conn: Connection,
}

impl TaskDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/dayplan/dayplan.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("dayplan.db");
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id                 TEXT PRIMARY KEY,
                user               TEXT NOT NULL,
                title              TEXT NOT NULL,
                description        TEXT,
                project_id         TEXT,
                due_date           TEXT,
                estimated_minutes  INTEGER,
                priority           INTEGER,
                position           INTEGER NOT NULL DEFAULT 0,
                reschedule_count   INTEGER NOT NULL DEFAULT 0,
                completed          INTEGER NOT NULL DEFAULT 0,
                created_at         TEXT NOT NULL,
                updated_at         TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_user_due
                ON tasks(user, completed, due_date);",
        )?;
        Ok(())
    }

    /// Create a new task and return it.
    pub fn create_task(&self, user: &str, new: NewTask) -> Result<Task, rusqlite::Error> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            user: user.to_string(),
            title: new.title,
            description: new.description,
            project_id: new.project_id,
            due_date: new.due_date,
            estimated_minutes: new.estimated_minutes,
            priority: new.priority,
            position: new.position,
            reschedule_count: 0,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.conn.execute(
            &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
            params![
                task.id,
                task.user,
                task.title,
                task.description,
                task.project_id,
                task.due_date.map(|d| d.to_string()),
                task.estimated_minutes,
                task.priority,
                task.position,
                task.reschedule_count,
                task.completed,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(task)
    }

    /// Get a task by ID.
    pub fn get_task(&self, user: &str, id: &str) -> Result<Option<Task>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user = ?1 AND id = ?2"),
                params![user, id],
                row_to_task,
            )
            .optional()
    }

    /// All tasks for a user, incomplete first, ordered by position.
    pub fn list_tasks(&self, user: &str) -> Result<Vec<Task>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user = ?1
             ORDER BY completed, position, created_at"
        ))?;
        let tasks = stmt
            .query_map(params![user], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Mark a task completed. Returns false if the task is unknown.
    pub fn complete_task(&self, user: &str, id: &str) -> Result<bool, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE tasks SET completed = 1, updated_at = ?3
             WHERE user = ?1 AND id = ?2",
            params![user, id, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Bump the reschedule counter, pulling the task earlier in future plans.
    pub fn record_reschedule(&self, user: &str, id: &str) -> Result<bool, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET reschedule_count = reschedule_count + 1, updated_at = ?3
             WHERE user = ?1 AND id = ?2",
            params![user, id, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Incomplete tasks due on or before `cutoff`, ordered by
    /// `(due_date, priority nulls-last, position)`, capped at `limit`.
    ///
    /// Tasks without a due date are excluded from planning.
    pub fn incomplete_due_by(
        &self,
        user: &str,
        cutoff: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Task>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user = ?1 AND completed = 0
               AND due_date IS NOT NULL AND due_date <= ?2
             ORDER BY due_date, priority IS NULL, priority, position
             LIMIT ?3"
        ))?;
        let tasks = stmt
            .query_map(
                params![user, cutoff.to_string(), limit as i64],
                row_to_task,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Incomplete tasks due strictly after `cutoff`, same ordering as
    /// [`Self::incomplete_due_by`], capped at `limit`.
    pub fn incomplete_due_after(
        &self,
        user: &str,
        cutoff: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Task>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user = ?1 AND completed = 0
               AND due_date IS NOT NULL AND due_date > ?2
             ORDER BY due_date, priority IS NULL, priority, position
             LIMIT ?3"
        ))?;
        let tasks = stmt
            .query_map(
                params![user, cutoff.to_string(), limit as i64],
                row_to_task,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_task(title: &str, due: Option<NaiveDate>, priority: Option<i64>) -> NewTask {
        NewTask {
            title: title.to_string(),
            due_date: due,
            priority,
            ..Default::default()
        }
    }

    #[test]
    fn create_and_fetch_round_trip() {
        let db = TaskDb::open_memory().unwrap();
        let created = db
            .create_task(
                "u1",
                NewTask {
                    title: "Write report".to_string(),
                    due_date: Some(date(2025, 3, 7)),
                    estimated_minutes: Some(90),
                    priority: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();

        let fetched = db.get_task("u1", &created.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Write report");
        assert_eq!(fetched.due_date, Some(date(2025, 3, 7)));
        assert_eq!(fetched.estimated_minutes, Some(90));
        assert!(!fetched.completed);

        // Tasks are scoped per user.
        assert!(db.get_task("u2", &created.id).unwrap().is_none());
    }

    #[test]
    fn complete_task_flips_flag() {
        let db = TaskDb::open_memory().unwrap();
        let task = db.create_task("u1", new_task("A", None, None)).unwrap();
        assert!(db.complete_task("u1", &task.id).unwrap());
        assert!(db.get_task("u1", &task.id).unwrap().unwrap().completed);
        assert!(!db.complete_task("u1", "missing").unwrap());
    }

    #[test]
    fn planning_queries_exclude_undated_and_completed() {
        let db = TaskDb::open_memory().unwrap();
        db.create_task("u1", new_task("backlog", None, None)).unwrap();
        let done = db
            .create_task("u1", new_task("done", Some(date(2025, 3, 5)), None))
            .unwrap();
        db.complete_task("u1", &done.id).unwrap();
        db.create_task("u1", new_task("due", Some(date(2025, 3, 5)), None))
            .unwrap();

        let due = db.incomplete_due_by("u1", date(2025, 3, 9), 30).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "due");
    }

    #[test]
    fn due_by_orders_by_date_then_priority_then_position() {
        let db = TaskDb::open_memory().unwrap();
        db.create_task(
            "u1",
            NewTask {
                position: 2,
                ..new_task("late-pos", Some(date(2025, 3, 5)), None)
            },
        )
        .unwrap();
        db.create_task("u1", new_task("urgent", Some(date(2025, 3, 5)), Some(1)))
            .unwrap();
        db.create_task("u1", new_task("earlier-day", Some(date(2025, 3, 4)), None))
            .unwrap();

        let tasks = db.incomplete_due_by("u1", date(2025, 3, 9), 30).unwrap();
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["earlier-day", "urgent", "late-pos"]);
    }

    #[test]
    fn due_after_excludes_cutoff_day() {
        let db = TaskDb::open_memory().unwrap();
        db.create_task("u1", new_task("on-cutoff", Some(date(2025, 3, 9)), None))
            .unwrap();
        db.create_task("u1", new_task("after", Some(date(2025, 3, 10)), None))
            .unwrap();

        let tasks = db.incomplete_due_after("u1", date(2025, 3, 9), 30).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "after");
    }

    #[test]
    fn limits_are_respected() {
        let db = TaskDb::open_memory().unwrap();
        for i in 0..10 {
            db.create_task(
                "u1",
                NewTask {
                    position: i,
                    ..new_task(&format!("t{i}"), Some(date(2025, 3, 5)), None)
                },
            )
            .unwrap();
        }
        assert_eq!(db.incomplete_due_by("u1", date(2025, 3, 9), 4).unwrap().len(), 4);
    }
}
