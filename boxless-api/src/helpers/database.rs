use std::path::PathBuf;

/// Returns the path to the boxless database based on the operating system
///
/// # Platform-specific paths
///
/// - **macOS**: `~/Library/Application Support/boxless/db.sqlite3`
/// - **Linux**: `~/.local/share/boxless/db.sqlite3`
/// - **Windows**: `%LOCALAPPDATA%\boxless\db.sqlite3`
pub fn get_db_path() -> anyhow::Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    let db_path = data_dir.join("boxless").join("db.sqlite3");

    Ok(db_path)
}

/// Initialize the database connection
pub fn initialize_database() -> anyhow::Result<std::sync::Arc<crate::database::Database>> {
    let db_path = get_db_path()?;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = crate::database::Database::new(&db_path)?;
    Ok(std::sync::Arc::new(db))
}
