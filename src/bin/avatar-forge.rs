//! avatar-forge command line: render avatars, resolve cache paths, evict.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use avatar_forge::{
    AvatarFactory, AvatarStyle, CacheProxy, Config, EvictionJob, EvictionOutcome, FileStore,
    GeneratorSpec, OutputFormat, TransientStore,
};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "avatar-forge", version)]
struct Cli {
    /// Configuration file (TOML). Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "avatar-forge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one avatar to a file.
    Render(RenderArgs),
    /// Resolve a cache path, regenerating the file if missing, and print the
    /// response headers.
    Serve {
        /// Path relative to the cache directory, e.g. `monster/a/<hash>-64.png`.
        path: String,
    },
    /// Run both eviction jobs once.
    Evict,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Avatar style: monster, wavatar, bird, cat, retro or robohash.
    #[arg(long)]
    style: AvatarStyle,

    /// Identity seed, normally a 64-digit hex hash.
    #[arg(long)]
    seed: String,

    /// Pixel size; defaults to `default_size` from the configuration.
    #[arg(long)]
    size: Option<u32>,

    /// Output format: png, jpg or svg.
    #[arg(long, default_value = "png")]
    format: OutputFormat,

    /// Output file.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("AVATAR_FORGE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)?;
    debug!(?config, "loaded configuration");
    let store: Arc<dyn TransientStore> = Arc::new(
        FileStore::open(&config.store_dir)
            .with_context(|| format!("opening store at {}", config.store_dir.display()))?,
    );

    match cli.cmd {
        Command::Render(args) => cmd_render(&config, store, args),
        Command::Serve { path } => cmd_serve(&config, store, &path),
        Command::Evict => cmd_evict(&config, store),
    }
}

fn cmd_render(config: &Config, store: Arc<dyn TransientStore>, args: RenderArgs) -> anyhow::Result<()> {
    let factory = AvatarFactory::from_config(config, store);
    let spec = GeneratorSpec::new(
        args.style,
        args.size.unwrap_or(config.default_size),
        args.format,
    );
    let image = factory
        .try_build(&spec, &args.seed)
        .with_context(|| format!("rendering {} avatar", args.style))?;

    std::fs::write(&args.out, &image.bytes)
        .with_context(|| format!("writing {}", args.out.display()))?;
    println!("{} ({}, {} bytes)", args.out.display(), image.mime, image.len());
    Ok(())
}

fn cmd_serve(config: &Config, store: Arc<dyn TransientStore>, path: &str) -> anyhow::Result<()> {
    let proxy = CacheProxy::from_config(config, store)?;
    let response = proxy.serve(path)?;
    for (name, value) in &response.headers {
        println!("{name}: {value}");
    }
    Ok(())
}

fn cmd_evict(config: &Config, store: Arc<dyn TransientStore>) -> anyhow::Result<()> {
    for job in EvictionJob::from_config(config, store) {
        match job.run()? {
            EvictionOutcome::Skipped => println!("{}: skipped, ran recently", job.scope().name()),
            EvictionOutcome::Completed { removed } => {
                println!("{}: removed {removed} file(s)", job.scope().name())
            }
        }
    }
    Ok(())
}
