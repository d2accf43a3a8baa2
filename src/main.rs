use anyhow::Result;
use autopack::application::format_search_result;
use autopack::runtime::RealRuntime;
use autopack::{Autopack, PackConfig};
use clap::Parser;
use log::error;
use std::path::PathBuf;

/// autopack - install and discover tool packs for LLM agents
///
/// Packs are recorded in a `.autopack` directory in the current directory or
/// one of its parents; one is created when none exists.
///
/// Examples:
///   autopack search "read a file"
///   autopack install beckyjakes/autopack-tools/read_file
#[derive(Parser, Debug)]
#[command(author, version = env!("AUTOPACK_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pack directory (overrides discovery; also via AUTOPACK_DIR)
    #[arg(long = "dir", short = 'd', env = "AUTOPACK_DIR", value_name = "PATH", global = true)]
    pub pack_dir: Option<PathBuf>,

    /// Registry API URL (defaults to https://autopack.ai/)
    #[arg(long = "api-url", env = "AUTOPACK_API_URL", value_name = "URL", global = true)]
    pub api_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install a pack from the registry
    Install(InstallArgs),

    /// Search the registry for packs
    Search(SearchArgs),

    /// List installed packs
    List,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// ID of the pack to install
    #[arg(value_name = "AUTHOR/REPO/PACK")]
    pub pack: String,

    /// Install missing dependencies without asking
    #[arg(short = 'f', long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Free-text query; empty lists every pack
    #[arg(default_value = "")]
    pub query: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    let mut config = PackConfig::from_env(&runtime)?;
    if let Some(dir) = cli.pack_dir {
        config.pack_dir = Some(dir);
    }
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    let app = Autopack::new(runtime, config)?;

    match cli.command {
        Commands::Install(args) => match app.install_pack(&args.pack, args.force).await {
            Ok(_) => println!("Installation completed"),
            Err(e) => {
                error!("{}", e);
                println!("Installation failed");
                std::process::exit(1);
            }
        },
        Commands::Search(args) => {
            for pack in app.search(&args.query).await? {
                println!("{}", format_search_result(&pack));
            }
        }
        Commands::List => {
            for pack_id in app.installed_pack_ids()? {
                println!("{}", pack_id);
            }
        }
    }
    Ok(())
}
