//! `croptaxa run | validate | explain`: catalogue loading, settings
//! overrides, artifact writing and console output.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use croptaxa_recon::model::Level;
use croptaxa_recon::report::{to_json, write_text};
use croptaxa_recon::{
    run, Catalogue, DurationResolver, HierarchyStore, ReportSettings, SourceClassEntry,
};

use crate::exit_codes::{EXIT_ERROR, EXIT_UNKNOWN_ENTRY};
use crate::CliError;

pub struct RunArgs {
    pub catalogue: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub generated: Option<String>,
    pub stamp_today: bool,
    pub json: bool,
    pub quiet: bool,
}

fn load_catalogue(dir: Option<&Path>) -> Result<Catalogue, CliError> {
    let catalogue = match dir {
        Some(dir) => Catalogue::load_dir(dir)?,
        None => Catalogue::builtin()?,
    };
    Ok(catalogue)
}

/// Settings file (or defaults), then command-line overrides, then validation.
fn load_settings(args: &RunArgs) -> Result<ReportSettings, CliError> {
    let mut settings = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
            ReportSettings::from_toml(&text)?
        }
        None => ReportSettings::default(),
    };

    if let Some(output) = &args.output {
        settings.output = output.to_string_lossy().into_owned();
    }
    if let Some(generated) = &args.generated {
        settings.generated = generated.clone();
    } else if args.stamp_today {
        settings.generated = chrono::Local::now().format("%Y-%m-%d").to_string();
    }

    settings.validate()?;
    Ok(settings)
}

fn stdout_err(e: io::Error) -> CliError {
    CliError::io(format!("cannot write to stdout: {e}"))
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let settings = load_settings(&args)?;
    let catalogue = load_catalogue(args.catalogue.as_deref())?;

    let model = run(catalogue);
    let document = to_json(&model, &settings)?;

    let path = Path::new(&settings.output);
    std::fs::write(path, &document)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    log::info!("wrote {} ({} bytes)", path.display(), document.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        writeln!(out, "{document}").map_err(stdout_err)?;
    } else if !args.quiet {
        writeln!(out, "Written: {}", path.display()).map_err(stdout_err)?;
        writeln!(out).map_err(stdout_err)?;
        write_text(&mut out, &model, &settings).map_err(stdout_err)?;
    }
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(catalogue: Option<PathBuf>) -> Result<(), CliError> {
    let catalogue = load_catalogue(catalogue.as_deref())?;

    let per_level: Vec<String> = Level::ALL
        .iter()
        .map(|&level| format!("{level} {}", catalogue.hierarchy.nodes(level).len()))
        .collect();
    let taxa = catalogue.hierarchy.len();
    let sources = catalogue.registry.len();
    let classes = catalogue.registry.total_classes();

    let model = run(catalogue);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(
        out,
        "catalogue OK: {taxa} taxa ({}), {sources} sources, {classes} classes",
        per_level.join(", ")
    )
    .map_err(stdout_err)?;
    writeln!(out, "unresolved references: {}", model.index.unresolved.len()).map_err(stdout_err)?;
    writeln!(out, "lineage conflicts: {}", model.index.conflicts.len()).map_err(stdout_err)?;
    Ok(())
}

// ============================================================================
// explain
// ============================================================================

fn describe(hierarchy: &HierarchyStore, entry: &SourceClassEntry, level: Level) -> String {
    match entry.name_at(level) {
        Some(name) if hierarchy.contains(level, name) => name.to_string(),
        Some(name) => format!("{name} (not in hierarchy)"),
        None => "-".to_string(),
    }
}

pub fn cmd_explain(
    source_id: &str,
    code: &str,
    catalogue: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let catalogue = load_catalogue(catalogue.as_deref())?;

    let dataset = catalogue.registry.get(source_id).ok_or_else(|| {
        let ids: Vec<&str> = catalogue.registry.iter().map(|d| d.id()).collect();
        CliError::new(EXIT_UNKNOWN_ENTRY, format!("unknown source '{source_id}'"))
            .with_hint(format!("known sources: {}", ids.join(", ")))
    })?;
    let entry = dataset.entry(code).ok_or_else(|| {
        CliError::new(
            EXIT_UNKNOWN_ENTRY,
            format!("source '{source_id}' has no class code '{code}'"),
        )
        .with_hint(format!("'{source_id}' defines {} codes", dataset.classes.len()))
    })?;

    let hierarchy = &catalogue.hierarchy;
    let resolver = DurationResolver::new(hierarchy);
    let resolution = resolver.explain(entry);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        let value = serde_json::json!({
            "source": source_id,
            "code": code,
            "entry": entry,
            "duration": resolution.map(|r| r.duration),
            "rule": resolution.map(|r| r.rule),
        });
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        writeln!(out, "{text}").map_err(stdout_err)?;
        return Ok(());
    }

    writeln!(out, "source:   {} ({})", dataset.id(), dataset.source.label).map_err(stdout_err)?;
    writeln!(out, "code:     {}", entry.code).map_err(stdout_err)?;
    writeln!(out, "name:     {}", entry.display_name).map_err(stdout_err)?;
    for level in Level::ALL {
        writeln!(out, "{:<9} {}", format!("{level}:"), describe(hierarchy, entry, level))
            .map_err(stdout_err)?;
    }
    let finest = Level::ALL.iter().rev().find_map(|&level| {
        entry
            .name_at(level)
            .filter(|name| hierarchy.contains(level, name))
            .map(|name| (level, name))
    });
    if let Some((level, name)) = finest {
        let path: Vec<&str> = hierarchy
            .lineage(level, name)
            .iter()
            .rev()
            .map(|n| n.name.as_str())
            .collect();
        writeln!(out, "path:     {}", path.join(" > ")).map_err(stdout_err)?;
    }
    let override_text = entry
        .duration_override
        .map_or_else(|| "-".to_string(), |d| d.to_string());
    writeln!(out, "override: {override_text}").map_err(stdout_err)?;

    writeln!(out).map_err(stdout_err)?;
    writeln!(out, "rules:").map_err(stdout_err)?;
    for &rule in resolver.rules() {
        let value = rule
            .apply(entry, hierarchy)
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        let marker = if resolution.map(|r| r.rule) == Some(rule) { "*" } else { " " };
        writeln!(out, "  {marker} {:<22} {value}", rule.to_string()).map_err(stdout_err)?;
    }
    writeln!(out).map_err(stdout_err)?;

    let verdict = match resolution {
        Some(r) => format!("{} (rule: {})", r.duration, r.rule),
        None => "undefined (no rule applies)".to_string(),
    };
    writeln!(out, "duration: {verdict}").map_err(stdout_err)?;
    Ok(())
}
