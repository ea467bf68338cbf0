use std::io::Read;
use std::path::PathBuf;

use crate::cli::CheckArgs;
use crate::schema::{load_project, load_schema, resolve_schema_path};
use pgvet::Schema;

#[derive(Debug, Clone, Copy, Default)]
struct CheckSummary {
    statements: usize,
    failures: usize,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let project = load_project(&args.config)?;
    let schema_path = resolve_schema_path(&args.config, args.schema.as_deref(), project.as_ref())?;
    let schema = load_schema(&schema_path)?;

    let files: Vec<PathBuf> = if !args.files.is_empty() {
        args.files
    } else if let Some(project) = &project {
        project.query_paths()
    } else {
        Vec::new()
    };

    let mut summary = CheckSummary::default();

    if files.is_empty() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| anyhow::anyhow!("failed to read stdin: {e}"))?;

        if buf.trim().is_empty() {
            anyhow::bail!("no SQL provided (pass files or pipe SQL to stdin)");
        }

        check_input("stdin", &buf, &schema, &mut summary)?;
    } else {
        for file in &files {
            let content = std::fs::read_to_string(file)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", file.display()))?;
            check_input(&file.display().to_string(), &content, &schema, &mut summary)?;
        }
    }

    if summary.failures > 0 {
        anyhow::bail!(
            "{} of {} statements failed validation",
            summary.failures,
            summary.statements
        );
    }

    println!("checked {} statements", summary.statements);
    Ok(())
}

fn check_input(
    header: &str,
    sql: &str,
    schema: &Schema,
    summary: &mut CheckSummary,
) -> anyhow::Result<()> {
    let stmts = pg_query::split_with_parser(sql)
        .map_err(|e| anyhow::anyhow!("failed to split SQL statements from {header}: {e}"))?;
    if stmts.is_empty() {
        anyhow::bail!("no SQL statements found in {header}");
    }

    for (idx, stmt) in stmts.into_iter().enumerate() {
        summary.statements += 1;
        if let Err(e) = pgvet::validate_query(schema, stmt) {
            summary.failures += 1;
            match e.location() {
                Some(offset) => {
                    eprintln!("[ERROR] {header}:stmt{}: {e} (offset {offset})", idx + 1)
                }
                None => eprintln!("[ERROR] {header}:stmt{}: {e}", idx + 1),
            }
        }
    }

    Ok(())
}
