use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::error::AppError;
use crate::config::{PipelineConfig, Settings};
use crate::engine::{Substation, TestOutcome};
use crate::io::{LineSource, MessageStream, WriterSink};
use crate::storage::Resources;
use crate::transform::TransformRegistry;

const USAGE: &str = "Usage: substation run <config.json> [input] | substation test <config.json>...";

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stream a file (or stdin) through a configuration into stdout
    Run {
        config: PathBuf,
        input: Option<PathBuf>,
    },
    /// Run the self-tests declared in each configuration
    Test { configs: Vec<PathBuf> },
}

impl Command {
    /// Parse arguments, program name included
    pub fn parse(args: Vec<String>) -> Result<Self, AppError> {
        let mut args = args.into_iter().skip(1);
        match args.next().as_deref() {
            Some("run") => {
                let config = args.next().ok_or_else(usage)?;
                let input = args.next().map(PathBuf::from);
                if args.next().is_some() {
                    return Err(usage());
                }
                Ok(Self::Run {
                    config: config.into(),
                    input,
                })
            }
            Some("test") => {
                let configs: Vec<PathBuf> = args.map(PathBuf::from).collect();
                if configs.is_empty() {
                    return Err(usage());
                }
                Ok(Self::Test { configs })
            }
            _ => Err(usage()),
        }
    }

    pub async fn execute(self, settings: Settings, ctx: CancellationToken) -> Result<(), AppError> {
        match self {
            Self::Run { config, input } => run(&config, input, &settings, ctx).await,
            Self::Test { configs } => test(&configs, &settings).await,
        }
    }
}

fn usage() -> AppError {
    AppError::InvalidArguments(USAGE.to_string())
}

async fn load(path: &Path, settings: &Settings) -> Result<Substation, AppError> {
    let config = PipelineConfig::from_file(path).await?;
    let resources = Resources::from_config(&config.kv_stores)?;
    Ok(Substation::with_registry(
        config,
        resources,
        settings,
        TransformRegistry::default(),
    )?)
}

async fn run(
    config: &Path,
    input: Option<PathBuf>,
    settings: &Settings,
    ctx: CancellationToken,
) -> Result<(), AppError> {
    let sub = load(config, settings).await?;
    let source: MessageStream = match input {
        Some(path) => Box::pin(LineSource::from_file(&path).await?),
        None => Box::pin(LineSource::stdin()),
    };

    let result = sub.run(source, WriterSink::stdout(), ctx).await;
    // Close even when the run failed so stores are released.
    sub.close().await?;
    result?;

    info!(config = %config.display(), "Run complete");
    Ok(())
}

async fn test(configs: &[PathBuf], settings: &Settings) -> Result<(), AppError> {
    let mut stdout = tokio::io::stdout();
    let mut failed = 0;

    for path in configs {
        let sub = load(path, settings).await?;
        let reports = sub.self_test(&path.display().to_string()).await?;
        sub.close().await?;

        for report in reports {
            if report.outcome == TestOutcome::Failed {
                failed += 1;
            }
            stdout.write_all(format!("{report}\n").as_bytes()).await?;
        }
    }
    stdout.flush().await?;

    if failed > 0 {
        return Err(AppError::TestsFailed(failed));
    }
    Ok(())
}
