//! Schema loading shared by the commands, plus the `schema` command itself.

use std::path::{Path, PathBuf};

use crate::cli::SchemaArgs;
use crate::config::ProjectConfig;

/// Load the project config when one exists at `config_path`.
pub fn load_project(config_path: &Path) -> anyhow::Result<Option<ProjectConfig>> {
    if config_path.exists() {
        ProjectConfig::load(config_path).map(Some)
    } else {
        Ok(None)
    }
}

/// Where the schema DDL lives: an explicit `--schema` wins over the config.
pub fn resolve_schema_path(
    config_path: &Path,
    schema_override: Option<&Path>,
    project: Option<&ProjectConfig>,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = schema_override {
        return Ok(path.to_path_buf());
    }
    if let Some(project) = project {
        return Ok(project.schema_path());
    }
    anyhow::bail!(
        "failed to load config {}; provide --schema or create a pgvet.toml first",
        config_path.display()
    )
}

pub fn load_schema(path: &Path) -> anyhow::Result<pgvet::Schema> {
    let ddl = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read schema {}: {e}", path.display()))?;
    pgvet::Schema::from_sql(&ddl)
        .map_err(|e| anyhow::anyhow!("failed to parse schema {}: {e}", path.display()))
}

pub fn run(args: SchemaArgs) -> anyhow::Result<()> {
    let project = load_project(&args.config)?;
    let path = resolve_schema_path(&args.config, args.schema.as_deref(), project.as_ref())?;
    let schema = load_schema(&path)?;

    let json = serde_json::to_string_pretty(&schema)
        .map_err(|e| anyhow::anyhow!("failed to serialize schema: {e}"))?;
    println!("{json}");
    Ok(())
}
