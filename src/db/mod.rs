use rusqlite::{Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// One row of a user's about-me profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRow {
    pub info: String,
    pub value: Option<String>,
    pub shown: bool,
}

impl Database {
    pub fn open(path: &str) -> rusqlite::Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    let _ = std::fs::create_dir_all(parent);
                }
            }
        }
        let conn = Connection::open(path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn execute_init(&self) -> anyhow::Result<()> {
        info!("Database: Initializing schema...");
        let sql = "
            CREATE TABLE IF NOT EXISTS settings (
                setting TEXT,
                value TEXT
            );

            CREATE TABLE IF NOT EXISTS startup_times (
                startup_time REAL
            );

            CREATE TABLE IF NOT EXISTS aboutme (
                user_id INTEGER NOT NULL,
                info TEXT NOT NULL,
                value TEXT,
                toggle INTEGER DEFAULT 1 CHECK (toggle < 2),
                PRIMARY KEY (user_id, info)
            );
        ";
        let conn = self.conn()?;
        conn.execute_batch(sql)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    /// Runs a synchronous database closure on the blocking pool.
    pub async fn run_blocking<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection mutex poisoned"))
    }

    // --- Settings ---

    /// `None` when no row exists, `Some(None)` when the row holds a null value.
    pub fn get_setting(&self, name: &str) -> anyhow::Result<Option<Option<String>>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE setting = ?1 LIMIT 1",
                [name],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Inserts a null placeholder row unless one already exists.
    pub fn insert_setting_placeholder(&self, name: &str) -> anyhow::Result<bool> {
        let conn = self.conn()?;
        let exists = conn
            .prepare("SELECT 1 FROM settings WHERE setting = ?1")?
            .exists([name])?;
        if exists {
            return Ok(false);
        }
        conn.execute("INSERT INTO settings (setting) VALUES (?1)", [name])?;
        Ok(true)
    }

    pub fn set_setting(&self, name: &str, value: &str) -> anyhow::Result<()> {
        let conn = self.conn()?;
        let exists = conn
            .prepare("SELECT 1 FROM settings WHERE setting = ?1")?
            .exists([name])?;

        if exists {
            conn.execute(
                "UPDATE settings SET value = ?1 WHERE setting = ?2",
                (value, name),
            )?;
        } else {
            conn.execute(
                "INSERT INTO settings (setting, value) VALUES (?1, ?2)",
                (name, value),
            )?;
        }
        Ok(())
    }

    /// Resets the value to null, keeping the row.
    pub fn clear_setting(&self, name: &str) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute("UPDATE settings SET value = NULL WHERE setting = ?1", [name])?;
        Ok(())
    }

    #[cfg(test)]
    pub fn count_setting_rows(&self, name: &str) -> anyhow::Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM settings WHERE setting = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // --- Startup times ---

    pub fn startup_times(&self) -> anyhow::Result<Vec<f64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT startup_time FROM startup_times ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Clears the table and reinserts `times` in one transaction.
    pub fn replace_startup_times(&self, times: &[f64]) -> anyhow::Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM startup_times", [])?;
        for time in times {
            tx.execute("INSERT INTO startup_times (startup_time) VALUES (?1)", [time])?;
        }
        tx.commit()?;
        Ok(())
    }

    // --- About me ---

    /// Creates the missing `(user_id, info)` rows, shown and empty.
    pub fn ensure_profile(&self, user_id: u64, fields: &[&str]) -> anyhow::Result<()> {
        let conn = self.conn()?;
        for info in fields {
            conn.execute(
                "INSERT OR IGNORE INTO aboutme (user_id, info) VALUES (?1, ?2)",
                (user_id as i64, info),
            )?;
        }
        Ok(())
    }

    pub fn profile_rows(&self, user_id: u64) -> anyhow::Result<Vec<ProfileRow>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT info, value, toggle FROM aboutme WHERE user_id = ?1")?;
        let rows = stmt.query_map([user_id as i64], |row| {
            let toggle: i64 = row.get(2)?;
            Ok(ProfileRow {
                info: row.get(0)?,
                value: row.get(1)?,
                shown: toggle == 1,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn set_profile_shown(&self, user_id: u64, info: &str, shown: bool) -> anyhow::Result<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "UPDATE aboutme SET toggle = ?1 WHERE user_id = ?2 AND info = ?3",
            (shown as i64, user_id as i64, info),
        )?;
        Ok(count)
    }

    pub fn set_profile_value(
        &self,
        user_id: u64,
        info: &str,
        value: Option<&str>,
    ) -> anyhow::Result<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "UPDATE aboutme SET value = ?1 WHERE user_id = ?2 AND info = ?3",
            (value, user_id as i64, info),
        )?;
        Ok(count)
    }
}
