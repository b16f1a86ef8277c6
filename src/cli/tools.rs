//! Tools command handler.

use anyhow::Result;

use turnstile::tools::ToolRegistry;

pub(crate) fn cmd_tools(schema: bool) -> Result<()> {
    let registry = ToolRegistry::with_builtins();

    println!("Available tools ({}):", registry.len());
    println!();
    for def in registry.definitions() {
        println!("  {:<16} {}", def.name, def.description);
        if schema {
            println!("{}", serde_json::to_string_pretty(&def.parameters)?);
            println!();
        }
    }

    Ok(())
}
