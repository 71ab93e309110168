use anyhow::{Context, Result};
use jeka_runner_core::bean::BeanCatalog;
use jeka_runner_core::cmdline::{expand_shorthands, strip_shell_tokens, tokenize};
use jeka_runner_core::config::{Properties, Settings, global_properties_file};
use jeka_runner_core::Workspace;
use std::collections::BTreeMap;
use std::env;
use tracing::{debug, info};

use crate::commands::help_command;
use crate::display::print_runtime_info;

/// Resolves the project of the current directory and runs the actions of
/// `args`.
pub fn run_command(args: &[String]) -> Result<()> {
    let base_dir = env::current_dir().context("Failed to read the current directory")?;
    let env: BTreeMap<String, String> = env::vars().collect();

    let args = strip_shell_tokens(args);
    // -D values must be known before shorthands are expanded
    let raw = tokenize(&args)?;
    let global_file = global_properties_file(&env);
    let props = Properties::load(&base_dir, &raw.system_properties, &env, global_file.as_deref())
        .with_context(|| format!("Failed to load properties of {}", base_dir.display()))?;

    let expanded = expand_shorthands(&args, &props);
    let cmdline = tokenize(&expanded)?;
    debug!("Expanded command line: {:?}", expanded);
    let settings = Settings::from_options(&cmdline.standard_options);

    let mut workspace = Workspace::builder(BeanCatalog::new())
        .settings(settings.clone())
        .system_properties(cmdline.system_properties.clone())
        .env(env)
        .global_properties_file(global_file)
        .dependencies(cmdline.dependencies.clone())
        .build();

    if settings.help {
        return help_command(&mut workspace, &base_dir);
    }

    let report = workspace.prepare(&base_dir, &cmdline.actions)?;
    if settings.runtime_info {
        print_runtime_info(&report);
    }
    info!("Running {} method(s)", report.actions.invokes().count());
    workspace.run(&report.base_dir)?;
    Ok(())
}
