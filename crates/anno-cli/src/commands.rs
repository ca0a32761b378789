use std::path::Path;

use anno_server::{AnnoServer, ServerConfig, StorageConfig};
use anno_store::{LogConfig, LogKvStore};
use anyhow::Context;
use colored::Colorize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Config(args) => cmd_config(args),
        Command::Compact(args) => cmd_compact(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn apply_overrides(config: &mut ServerConfig, args: &ServeArgs) {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(data) = &args.data {
        let sync = match &config.storage {
            StorageConfig::Log { sync, .. } => *sync,
            StorageConfig::Memory => Default::default(),
        };
        config.storage = StorageConfig::Log { path: data.clone(), sync };
    }
}

fn describe_storage(storage: &StorageConfig) -> String {
    match storage {
        StorageConfig::Memory => "memory (not persisted)".to_string(),
        StorageConfig::Log { path, .. } => format!("log at {}", path.display()),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    println!("{} anno server on {}", "✓".green().bold(), config.bind_addr.to_string().bold());
    println!("  Storage: {}", describe_storage(&config.storage).cyan());

    let server = AnnoServer::new(config).context("opening store")?;
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn cmd_compact(args: CompactArgs) -> anyhow::Result<()> {
    let store = LogKvStore::open(&args.data, LogConfig::default())
        .with_context(|| format!("opening store log {}", args.data.display()))?;
    let before = store.log_size()?;
    store.compact()?;
    let after = store.log_size()?;
    tracing::debug!(before, after, "compaction finished");
    println!(
        "{} Compacted {}: {} keys, {} → {} bytes",
        "✓".green().bold(),
        args.data.display().to_string().bold(),
        store.len(),
        before,
        after
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anno_store::{KvStore, SyncMode};
    use clap::Parser;

    fn serve_args(argv: &[&str]) -> ServeArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Serve(args) => args,
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = ServerConfig::default();
        apply_overrides(
            &mut config,
            &serve_args(&["anno", "serve", "--bind", "0.0.0.0:9000", "--data", "a.log"]),
        );
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(
            config.storage,
            StorageConfig::Log { path: "a.log".into(), sync: SyncMode::OsDefault }
        );
    }

    #[test]
    fn data_override_keeps_configured_sync() {
        let mut config = ServerConfig {
            storage: StorageConfig::Log { path: "old.log".into(), sync: SyncMode::EveryWrite },
            ..Default::default()
        };
        apply_overrides(&mut config, &serve_args(&["anno", "serve", "--data", "new.log"]));
        assert_eq!(
            config.storage,
            StorageConfig::Log { path: "new.log".into(), sync: SyncMode::EveryWrite }
        );
    }

    #[test]
    fn no_overrides_is_identity() {
        let mut config = ServerConfig::default();
        apply_overrides(&mut config, &serve_args(&["anno", "serve"]));
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn missing_config_file_is_error() {
        assert!(load_config(Some(Path::new("/nonexistent/anno.toml"))).is_err());
        assert_eq!(load_config(None).unwrap(), ServerConfig::default());
    }

    #[test]
    fn compact_command_shrinks_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.log");
        {
            let store = LogKvStore::open(&path, LogConfig::default()).unwrap();
            for i in 0..10u8 {
                store.put("k", &[i]).unwrap();
            }
        }
        let before = std::fs::metadata(&path).unwrap().len();
        cmd_compact(CompactArgs { data: path.clone() }).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() < before);
    }

    #[test]
    fn storage_description() {
        assert!(describe_storage(&StorageConfig::Memory).starts_with("memory"));
        assert_eq!(
            describe_storage(&StorageConfig::Log { path: "x.log".into(), sync: SyncMode::OsDefault }),
            "log at x.log"
        );
    }
}
