use anyhow::{Context, Result};
use jeka_runner_core::Workspace;
use std::path::Path;
use tracing::warn;

use crate::display::{print_kbeans, print_options};

/// Prints the standard options, then the KBeans visible from `base_dir`.
pub fn help_command(workspace: &mut Workspace, base_dir: &Path) -> Result<()> {
    println!("Usage: jeka [options] [@dependency...] [bean: [field=value...] [method...]]...");
    println!();
    print_options();

    let base_dir = base_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", base_dir.display()))?;
    // A broken project still gets the option list
    match workspace.resolve_kbeans(&base_dir) {
        Ok(resolution) => {
            println!();
            print_kbeans(&workspace.catalog(), &resolution);
        }
        Err(e) => warn!("Cannot list KBeans of {}: {e}", base_dir.display()),
    }
    Ok(())
}
