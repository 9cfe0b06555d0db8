use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use seqbox_core::{parse_index, IndexRecord, Submission, Uploader};
use seqbox_server::{BackendConfig, SeqboxServer, ServerConfig};
use seqbox_store::ObjectStore;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Submit(args) => cmd_submit(config, args, cli.format).await,
        Command::Next => cmd_next(config, cli.format).await,
        Command::Index => cmd_index(config, cli.format).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(root) = &cli.root {
        config.backend = BackendConfig::Local { root: root.clone() };
    }
    Ok(config)
}

async fn open_uploader(config: &ServerConfig) -> anyhow::Result<Uploader> {
    if matches!(config.backend, BackendConfig::Memory) {
        tracing::warn!("using the in-memory backend; nothing will persist");
    }
    let store = config.backend.open().await?;
    Ok(Uploader::new(store, config.upload.clone())?)
}

async fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    println!("seqbox server on {}", config.bind_addr.to_string().bold());
    SeqboxServer::from_config(config).await?.serve().await?;
    Ok(())
}

async fn cmd_submit(config: ServerConfig, args: SubmitArgs, format: OutputFormat) -> anyhow::Result<()> {
    let extension = match args.ext {
        Some(ext) => ext,
        None => file_extension(&args.file)
            .with_context(|| format!("{} has no extension; pass --ext", args.file.display()))?,
    };
    let content = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let token = select_token(args.token, args.auto_token);

    let uploader = open_uploader(&config).await?;
    let mut submission = Submission::new(content, extension, args.title);
    if let Some(token) = &token {
        submission = submission.with_token(token.clone());
    }
    let receipt = uploader.submit(submission).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
        OutputFormat::Text => {
            println!("{} Stored {}", "✓".green().bold(), receipt.filename.yellow().bold());
            println!("  Locator: {}", receipt.raw_locator.blue());
            if let Some(token) = token {
                println!("  Token: {}", token.dimmed());
            }
        }
    }
    Ok(())
}

async fn cmd_next(config: ServerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let uploader = open_uploader(&config).await?;
    let next = uploader.allocator().next_number().await?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "next": next, "strategy": uploader.allocator().strategy() })
        ),
        OutputFormat::Text => println!("Next entry: {}", format!("{next:03}").yellow().bold()),
    }
    Ok(())
}

async fn cmd_index(config: ServerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let store = config.backend.open().await?;
    let records = load_index(store.as_ref(), &config.upload.layout.index_file).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text if records.is_empty() => println!("No entries."),
        OutputFormat::Text => {
            for record in &records {
                println!("{}  {}", record.filename.yellow(), record.title);
            }
            println!("\n{} entries", records.len().to_string().bold());
        }
    }
    Ok(())
}

async fn load_index(store: &dyn ObjectStore, path: &str) -> anyhow::Result<Vec<IndexRecord>> {
    let Some(index) = store.get(path).await? else {
        return Ok(Vec::new());
    };
    let text = String::from_utf8(index.content.to_vec())
        .with_context(|| format!("{path} is not valid UTF-8"))?;
    Ok(parse_index(&text))
}

fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
}

fn select_token(explicit: Option<String>, auto: bool) -> Option<String> {
    explicit.or_else(|| auto.then(|| uuid::Uuid::now_v7().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use seqbox_store::InMemoryObjectStore;

    #[test]
    fn extension_from_file_name() {
        assert_eq!(file_extension(Path::new("dir/noon.JPG")).as_deref(), Some("JPG"));
        assert_eq!(file_extension(Path::new("noon")), None);
        assert_eq!(file_extension(Path::new(".hidden")), None);
    }

    #[test]
    fn explicit_token_wins() {
        assert_eq!(select_token(Some("abc".into()), false).as_deref(), Some("abc"));
        assert_eq!(select_token(None, false), None);
    }

    #[test]
    fn auto_tokens_are_unique() {
        let a = select_token(None, true).unwrap();
        let b = select_token(None, true).unwrap();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[tokio::test]
    async fn index_listing() {
        let store = InMemoryObjectStore::new();
        assert!(load_index(&store, "photos/photos.txt").await.unwrap().is_empty());

        store
            .insert("photos/photos.txt", "001.jpg|Sunset\n\n002.jpg|Dawn\n")
            .unwrap();
        let records = load_index(&store, "photos/photos.txt").await.unwrap();
        assert_eq!(
            records,
            vec![
                IndexRecord::new("001.jpg", "Sunset"),
                IndexRecord::new("002.jpg", "Dawn"),
            ]
        );
    }

    #[tokio::test]
    async fn submit_to_local_root() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("noon.png");
        std::fs::write(&image, b"png-bytes").unwrap();

        let config = ServerConfig {
            backend: BackendConfig::Local {
                root: dir.path().join("store"),
            },
            ..ServerConfig::default()
        };
        let args = SubmitArgs {
            file: PathBuf::from(&image),
            title: "Noon".into(),
            ext: None,
            token: None,
            auto_token: true,
        };
        cmd_submit(config, args, OutputFormat::Json).await.unwrap();

        let stored = std::fs::read(dir.path().join("store/photos/001.png")).unwrap();
        assert_eq!(stored, b"png-bytes");
        let index = std::fs::read_to_string(dir.path().join("store/photos/photos.txt")).unwrap();
        assert_eq!(index, "001.png|Noon\n");
    }
}
