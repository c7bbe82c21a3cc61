use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use tourplan_optimizer::json::schema::{generate_json_schema, generate_result_schema};

use crate::optimize::OptimizeArgs;

mod optimize;
mod parsers;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(visible_alias = "o")]
    Optimize {
        #[command(flatten)]
        args: OptimizeArgs,
    },
    /// Prints the JSON schema of the snapshot document
    Schema {
        /// Schema of the optimization result instead
        #[arg(long)]
        result: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Some(Commands::Optimize { args }) => optimize::run(args).await?,
        Some(Commands::Schema { result }) => {
            let schema = if result {
                generate_result_schema()?
            } else {
                generate_json_schema()?
            };
            println!("{schema}");
        }
        None => {}
    }

    Ok(())
}
