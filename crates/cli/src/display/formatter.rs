use jeka_runner_core::bean::{BeanCatalog, short_name};
use jeka_runner_core::config::Settings;
use jeka_runner_core::engine::KBeanResolution;
use jeka_runner_core::{Error, ExecutionReport, KBeanAction};

/// One row per effective action: type, target and origin, aligned.
pub fn format_actions(actions: &[KBeanAction]) -> Vec<String> {
    let target_width = actions.iter().map(|a| a.target().len()).max().unwrap_or(0);
    actions
        .iter()
        .map(|action| {
            format!(
                "{:<9}  {:<target_width$}  {}",
                action.label(),
                action.target(),
                action.source
            )
        })
        .collect()
}

/// Output of `-ri`: what the engine resolved before running anything.
pub fn print_runtime_info(report: &ExecutionReport) {
    println!("Base dir  : {}", report.base_dir.display());
    println!("Classpath : {} entries", report.classpath.len());
    for entry in report.classpath.iter() {
        println!("  {}", entry.display());
    }
    if !report.imported_dirs.is_empty() {
        println!("Imports   :");
        for dir in &report.imported_dirs {
            println!("  {}", dir.display());
        }
    }
    for runbase in &report.runbases {
        println!();
        println!("Effective actions of {}:", runbase.base_dir.display());
        for row in format_actions(&runbase.effective_actions) {
            println!("  {row}");
        }
    }
    let invokes: Vec<&KBeanAction> = report.actions.invokes().collect();
    if !invokes.is_empty() {
        println!();
        println!("Methods to run:");
        for action in invokes {
            println!("  {}", action.target());
        }
    }
    println!();
}

pub fn print_options() {
    let options = Settings::option_docs();
    let width = options.iter().map(|(names, _)| names.len()).max().unwrap_or(0);
    println!("Options:");
    for (names, doc) in options {
        println!("  {names:<width$}  {doc}");
    }
}

/// Lists the KBeans of a resolution, the default one marked with `*`.
pub fn print_kbeans(catalog: &BeanCatalog, resolution: &KBeanResolution) {
    let width = resolution
        .all
        .iter()
        .map(|name| short_name(name).len())
        .max()
        .unwrap_or(0);
    println!("KBeans:");
    for class_name in &resolution.all {
        let header = catalog
            .info(class_name)
            .and_then(|info| info.doc)
            .map(|doc| doc.header)
            .unwrap_or_default();
        let marker = if *class_name == resolution.default_bean { "*" } else { " " };
        println!("{marker} {:<width$}  {header}", short_name(class_name));
    }
}

/// Failure message: the innermost error alone, or every context level when
/// `stacktrace` is set.
pub fn format_error(err: &anyhow::Error, stacktrace: bool) -> String {
    match err.downcast_ref::<Error>() {
        Some(core) if !stacktrace => core.root().to_string(),
        Some(core) => core.to_string(),
        None if stacktrace => format!("{err:#}"),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jeka_runner_core::ActionSource;

    #[test]
    fn test_format_actions_aligns_columns() {
        let rows = format_actions(&[
            KBeanAction::init("org.ProjectKBean", ActionSource::InitBean),
            KBeanAction::set_field("org.ProjectKBean", "version", "1.0", ActionSource::CommandLine),
        ]);
        assert_eq!(
            rows,
            vec![
                "INIT       project              init bean",
                "SET_FIELD  project.version=1.0  command line",
            ]
        );
    }

    #[test]
    fn test_format_error_hides_context_by_default() {
        let err = anyhow::Error::from(
            Error::BeanBusy("org.AppKBean".to_string()).context("Initializing KBean app"),
        );
        let short = format_error(&err, false);
        assert!(short.starts_with("KBean org.AppKBean is already in use"));
        let full = format_error(&err, true);
        assert!(full.starts_with("Initializing KBean app: KBean org.AppKBean"));
    }
}
