//! Cache commands - inspect and reset local storage
//!
//! `show` prints every stored key; `clear` forgets the resolved site and
//! list IDs of the configured list so the next request resolves them again.

use anyhow::{Context, Result};
use clap::Subcommand;
use parkslots_core::ports::IKeyValueStore;

use crate::app::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Show stored entries
    Show,
    /// Forget the resolved site and list IDs
    Clear,
}

impl CacheCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        let store = ctx.open_store()?;

        match self {
            CacheCommand::Show => {
                let keys = store.keys().context("Failed to read local storage")?;
                let mut entries = serde_json::Map::new();
                for key in keys {
                    let value = store.get_item(&key)?.unwrap_or_default();
                    entries.insert(key, serde_json::Value::String(value));
                }

                if format == OutputFormat::Json {
                    fmt.print_json(&serde_json::json!({
                        "path": store.path().display().to_string(),
                        "entries": entries,
                    }));
                } else {
                    fmt.success(&format!("Local storage ({})", store.path().display()));
                    if entries.is_empty() {
                        fmt.info("No entries");
                    }
                    for (key, value) in &entries {
                        fmt.info(&format!("{} = {}", key, value.as_str().unwrap_or_default()));
                    }
                }
            }
            CacheCommand::Clear => {
                let identity = ctx.identity(store.clone());
                let service = ctx.slots_service(store, identity)?;
                service.invalidate_ids().await;

                fmt.success(&format!(
                    "Cleared cached IDs for {}",
                    service.location().cache_key()
                ));
            }
        }
        Ok(())
    }
}
