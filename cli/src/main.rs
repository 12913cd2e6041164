use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tacz_core::{
    CommandStore, CommandValidator, NewCommand, PatternMatcher, Populator, SafetyConfig,
    SeedSource, sanitize,
};

#[derive(Parser)]
#[command(name = "tacz")]
#[command(about = "Look up shell commands and check them for hazards")]
struct Cli {
    /// Catalog database (default: ~/.tacz/commands.db)
    #[arg(long, global = true)]
    db: Option<String>,
    /// JSON file overriding the built-in hazard rules
    #[arg(long, global = true)]
    rules: Option<String>,
    /// JSON seed dataset (default: the bundled one)
    #[arg(long, global = true)]
    seed: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog
    Search {
        /// Natural-language query
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output results as JSON
        #[arg(long)]
        json: bool,
        /// Output commands only, one per line
        #[arg(long)]
        plain: bool,
    },
    /// Check a command against the hazard rules
    Check {
        /// Command string (named arg to avoid clap treating -flags as options)
        #[arg(long)]
        cmd: String,
        #[arg(long)]
        json: bool,
    },
    /// Add a command to the catalog
    Add {
        #[arg(long)]
        cmd: String,
        #[arg(long)]
        explanation: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value_t = default_platform())]
        platform: String,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Record a chosen or executed command in history
    Record {
        /// What the user asked for
        #[arg(long)]
        query: String,
        #[arg(long)]
        cmd: String,
        /// The command was run
        #[arg(long)]
        executed: bool,
        /// The command exited non-zero
        #[arg(long)]
        failed: bool,
        #[arg(long, default_value_t = default_platform())]
        platform: String,
        /// Catalog id of the chosen search result
        #[arg(long)]
        id: Option<i64>,
    },
    /// Show recent history
    History {
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only entries whose query or command contains this text
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Load the seed dataset into the catalog
    Populate {
        /// Wipe the catalog and reload, repairing the schema if needed
        #[arg(long)]
        force: bool,
    },
    /// List the active hazard rules and whitelist
    Rules,
}

fn default_platform() -> String {
    std::env::consts::OS.to_string()
}

fn default_db_path() -> PathBuf {
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(".tacz").join("commands.db"),
        None => PathBuf::from(shellexpand::tilde("~/.tacz/commands.db").into_owned()),
    }
}

fn resolve_db_path(db: Option<&str>) -> PathBuf {
    match db {
        Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
        None => default_db_path(),
    }
}

fn seed_source(seed: Option<&str>) -> SeedSource {
    match seed {
        Some(path) => SeedSource::File(PathBuf::from(shellexpand::tilde(path).into_owned())),
        None => SeedSource::Bundled,
    }
}

fn load_safety(rules: Option<&str>) -> Result<SafetyConfig> {
    let Some(path) = rules else {
        return Ok(SafetyConfig::builtin()?);
    };
    let path = shellexpand::tilde(path).into_owned();
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read rules file {}", path))?;
    SafetyConfig::from_json(&json).with_context(|| format!("Invalid rules file {}", path))
}

fn open_store(db: &Path) -> Result<CommandStore> {
    debug!("Opening catalog at {}", db.display());
    CommandStore::open(db).with_context(|| format!("Failed to open catalog {}", db.display()))
}

fn cmd_search(
    db: &Path,
    seed: SeedSource,
    safety: &SafetyConfig,
    query: &str,
    limit: usize,
    json: bool,
    plain: bool,
) -> Result<()> {
    let store = open_store(db)?;
    Populator::new(&store, seed)
        .populate(false)
        .context("Failed to seed catalog")?;

    let results = store.search(query, limit)?;
    store.close()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        if !plain {
            println!("No results found");
        }
        return Ok(());
    }

    let matcher = PatternMatcher::new(safety);
    for result in &results {
        let cmd = &result.command;
        if plain {
            println!("{}", cmd.command);
            continue;
        }

        println!("[{}] {}", cmd.id, sanitize(&cmd.command));
        println!("    {}", cmd.explanation);
        if !cmd.platform.is_empty() {
            println!("    platform: {}", cmd.platform);
        }
        if !result.tags.is_empty() {
            println!("    tags: {}", result.tags.join(", "));
        }

        let verdict = matcher.classify(&cmd.command);
        if cmd.dangerous {
            println!("    DANGEROUS: {}", cmd.danger_reason);
        } else if verdict.dangerous {
            println!("    DANGEROUS: {}", verdict.reason);
        }
    }

    Ok(())
}

fn cmd_check(safety: &SafetyConfig, cmd: &str, json: bool) -> Result<bool> {
    let validator = CommandValidator::new(safety);
    let validation = validator.validate_and_suggest(cmd);

    if json {
        let out = serde_json::json!({
            "command": cmd,
            "whitelisted": validator.is_safe(cmd),
            "ok": validation.ok,
            "reason": validation.reason,
            "suggestions": validation.suggestions,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(validation.ok);
    }

    if validation.ok {
        let note = if validator.is_safe(cmd) { " (whitelisted)" } else { "" };
        println!("OK{}", note);
    } else {
        println!("DANGEROUS: {}", validation.reason);
        for suggestion in &validation.suggestions {
            println!("  - {}", suggestion);
        }
    }

    Ok(validation.ok)
}

fn cmd_add(db: &Path, safety: &SafetyConfig, new: NewCommand) -> Result<()> {
    let verdict = PatternMatcher::new(safety).classify(&new.command);
    let new = if verdict.dangerous {
        new.dangerous(verdict.reason)
    } else {
        new
    };

    let store = open_store(db)?;
    let id = store.add_command(&new)?;
    store.close()?;

    println!("Added command {}", id);
    if new.dangerous {
        eprintln!("Warning: {}", new.danger_reason);
    }
    Ok(())
}

fn cmd_record(
    db: &Path,
    query: &str,
    cmd: &str,
    executed: bool,
    success: bool,
    platform: &str,
    id: Option<i64>,
) -> Result<()> {
    let store = open_store(db)?;
    let history_id = store.record_history(query, cmd, executed, success, platform)?;
    if executed {
        if let Some(id) = id {
            store.bump_popularity(id)?;
        }
    }
    store.close()?;

    debug!("Recorded history entry {}", history_id);
    Ok(())
}

fn cmd_history(db: &Path, limit: usize, search: Option<&str>, json: bool) -> Result<()> {
    let store = open_store(db)?;
    let entries = match search {
        Some(term) => store.search_history(term, limit)?,
        None => store.get_history(limit)?,
    };
    store.close()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No history");
        return Ok(());
    }

    for entry in &entries {
        let status = match (entry.executed, entry.success) {
            (false, _) => "chosen",
            (true, true) => "ok",
            (true, false) => "failed",
        };
        println!(
            "{:>5}  {:<7} {}  ({})",
            entry.id, status, entry.command, entry.query
        );
    }
    Ok(())
}

fn cmd_populate(db: &Path, seed: SeedSource, force: bool) -> Result<()> {
    let store = if force {
        CommandStore::open_rebuilding(db)
            .with_context(|| format!("Failed to rebuild catalog {}", db.display()))?
    } else {
        open_store(db)?
    };

    let report = Populator::new(&store, seed)
        .populate(force)
        .context("Failed to populate catalog")?;
    let total = store.count_commands()?;
    store.close()?;

    if report.skipped {
        println!("Catalog already populated ({} commands)", total);
    } else {
        println!(
            "Inserted {} commands ({} already present, {} cleared); catalog now holds {}",
            report.inserted, report.duplicates, report.cleared, total
        );
    }
    Ok(())
}

fn cmd_rules(safety: &SafetyConfig) -> Result<()> {
    println!("Hazard rules (first match wins):");
    for rule in safety.rules() {
        println!("  {}\n      {}", rule.pattern(), rule.reason());
    }

    println!("\nDestructive keywords:");
    println!("  {}", safety.keywords().join(", "));

    println!("\nAdvisories:");
    for advisory in safety.advisories() {
        println!("  {:?}", advisory.needle);
        for advice in &advisory.advice {
            println!("      {}", advice);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // stdout is reserved for results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tacz=warn".parse()?)
                .add_directive("tacz_core=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let db = resolve_db_path(cli.db.as_deref());
    let seed = seed_source(cli.seed.as_deref());

    match cli.command {
        Commands::Search { query, limit, json, plain } => {
            let safety = load_safety(cli.rules.as_deref())?;
            cmd_search(&db, seed, &safety, &query.join(" "), limit, json, plain)?;
        }
        Commands::Check { cmd, json } => {
            let safety = load_safety(cli.rules.as_deref())?;
            if !cmd_check(&safety, &cmd, json)? {
                std::process::exit(1);
            }
        }
        Commands::Add { cmd, explanation, category, platform, tags } => {
            let safety = load_safety(cli.rules.as_deref())?;
            let new = NewCommand::new(cmd, explanation)
                .category(category)
                .platform(platform)
                .tags(tags.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()));
            cmd_add(&db, &safety, new)?;
        }
        Commands::Record { query, cmd, executed, failed, platform, id } => {
            cmd_record(&db, &query, &cmd, executed, executed && !failed, &platform, id)?;
        }
        Commands::History { limit, search, json } => {
            cmd_history(&db, limit, search.as_deref(), json)?;
        }
        Commands::Populate { force } => {
            cmd_populate(&db, seed, force)?;
        }
        Commands::Rules => {
            let safety = load_safety(cli.rules.as_deref())?;
            cmd_rules(&safety)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_db_path_is_tilde_expanded() {
        let path = resolve_db_path(Some("~/catalog.db"));
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("catalog.db"));

        assert_eq!(resolve_db_path(Some("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn test_default_db_path() {
        assert!(resolve_db_path(None).ends_with(".tacz/commands.db"));
    }

    #[test]
    fn test_parse_check_with_dash_flags() {
        let cli = Cli::try_parse_from(["tacz", "check", "--cmd", "rm -rf /"]).unwrap();
        match cli.command {
            Commands::Check { cmd, json } => {
                assert_eq!(cmd, "rm -rf /");
                assert!(!json);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_parse_add_tags_and_global_db() {
        let cli = Cli::try_parse_from([
            "tacz", "add", "--cmd", "htop", "--explanation", "Process viewer", "--tags",
            "monitor,processes", "--db", "/tmp/t.db",
        ])
        .unwrap();
        assert_eq!(cli.db.as_deref(), Some("/tmp/t.db"));
        match cli.command {
            Commands::Add { tags, platform, .. } => {
                assert_eq!(tags, vec!["monitor", "processes"]);
                assert_eq!(platform, std::env::consts::OS);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_search_requires_query() {
        assert!(Cli::try_parse_from(["tacz", "search"]).is_err());
    }

    #[test]
    fn test_check_reports_danger() {
        let safety = SafetyConfig::builtin().unwrap();
        assert!(!cmd_check(&safety, "chmod 777 /srv", true).unwrap());
        assert!(cmd_check(&safety, "ls -la", false).unwrap());
    }

    #[test]
    fn test_missing_rules_file() {
        let err = load_safety(Some("/nonexistent/tacz-rules.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read rules file"));
    }
}
