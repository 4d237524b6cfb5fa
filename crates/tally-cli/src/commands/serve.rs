//! Web server command

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use tally_server::AppState;

use super::open_db;

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16) -> Result<()> {
    let db = open_db(db_path)?;

    println!("🚀 Tally server starting on http://{}:{}", host, port);
    println!("   Database: {}", db_path.display());

    let state = Arc::new(AppState { db });
    tally_server::serve(state, host, port).await
}
