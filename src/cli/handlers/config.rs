//! Configuration display handler.

use anyhow::Result;

use crate::cli::output::{output_json, print_hint, OutputMode};
use crate::config::CONFIG_FILE;
use crate::init::AppContext;

pub fn handle_config(ctx: &AppContext, mode: OutputMode) -> Result<()> {
    if mode == OutputMode::Json {
        output_json(&ctx.config);
        return Ok(());
    }

    let config_path = ctx.data_path.join(CONFIG_FILE);
    if config_path.exists() {
        print_hint(&format!("# loaded from {}", config_path.display()));
    } else {
        print_hint(&format!("# {} not found, showing defaults", config_path.display()));
    }
    print!("{}", ctx.config.to_toml()?);
    Ok(())
}
