//! Init command implementation

use anyhow::Result;
use tracing::info;

use ferri::config::Config;

use super::CliContext;

/// Create the database schema and, unless `--config` was given, the global config
pub fn init_command(ctx: &CliContext) -> Result<()> {
    let db_path = ctx.database_path();
    ctx.open_manager()?;
    info!("Database ready at {}", db_path.display());
    println!("Database: {}", db_path.display());

    if ctx.explicit_config {
        return Ok(());
    }

    let (config_path, written) = Config::init_global()?;
    if written {
        println!("Created config: {}", config_path.display());
    } else {
        println!("Config:   {} (unchanged)", config_path.display());
    }

    Ok(())
}
