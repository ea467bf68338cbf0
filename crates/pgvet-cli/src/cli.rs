use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Check,
    Schema,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Check(CheckArgs),
    Schema(SchemaArgs),
}

#[derive(Debug, Clone)]
pub struct CheckArgs {
    pub config: PathBuf,
    pub schema: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SchemaArgs {
    pub config: PathBuf,
    pub schema: Option<PathBuf>,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" => Ok(Command::Help(HelpTopic::Root)),
        "check" => parse_check(it.map(|s| s.as_str())),
        "schema" => parse_schema(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

fn parse_check<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("pgvet.toml");
    let mut schema: Option<PathBuf> = None;
    let mut files: Vec<PathBuf> = Vec::new();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Check)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--schema" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--schema requires a value");
                };
                schema = Some(PathBuf::from(v));
            }
            _ if token.starts_with("--schema=") => {
                schema = Some(PathBuf::from(token.trim_start_matches("--schema=")));
            }
            _ if token.starts_with('-') => anyhow::bail!("unknown argument: {token}"),
            path => files.push(PathBuf::from(path)),
        }
    }

    Ok(Command::Check(CheckArgs {
        config,
        schema,
        files,
    }))
}

fn parse_schema<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("pgvet.toml");
    let mut schema: Option<PathBuf> = None;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Schema)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--schema" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--schema requires a value");
                };
                schema = Some(PathBuf::from(v));
            }
            _ if token.starts_with("--schema=") => {
                schema = Some(PathBuf::from(token.trim_start_matches("--schema=")));
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Schema(SchemaArgs { config, schema }))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
pgvet - validate SQL queries against a declared schema

USAGE:
  pgvet check [OPTIONS] [FILES...]
  pgvet schema [OPTIONS]

COMMANDS:
  check         Validate SQL statements against the schema
  schema        Print the parsed schema as JSON

Run `pgvet check --help` for more."
            );
        }
        HelpTopic::Check => {
            println!(
                "\
USAGE:
  pgvet check [OPTIONS] [FILES...]

Validates every statement in FILES (or in the config's `queries`, or piped
to stdin) against the schema, and exits non-zero on the first failing file.

OPTIONS:
  --config <FILE>       Config file path (default: pgvet.toml)
  --schema <FILE>       Schema DDL path (overrides config)
  -h, --help            Print help"
            );
        }
        HelpTopic::Schema => {
            println!(
                "\
USAGE:
  pgvet schema [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path (default: pgvet.toml)
  --schema <FILE>       Schema DDL path (overrides config)
  -h, --help            Print help"
            );
        }
    }
}
