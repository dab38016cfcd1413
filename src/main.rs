use anyhow::{Result, bail};
use clap::Parser;

use agent_tour::config::load_env;
use agent_tour::trace::init_tracing;

mod console;
mod demos;

/// Runnable tour of agent patterns
#[derive(Debug, Parser)]
#[command(name = "agent-tour", version, about)]
struct Cli {
    /// Demo to run (see --list)
    demo: Option<String>,

    /// Replace the demo's default query
    #[arg(short, long)]
    query: Option<String>,

    /// List the available demos
    #[arg(short, long)]
    list: bool,

    /// Verbosity level (use -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn print_demos() {
    println!("Available demos:\n");
    for demo in demos::all() {
        println!("  {:<14} {}", demo.name(), demo.description());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let name = match (&cli.demo, cli.list) {
        (Some(name), false) => name,
        _ => {
            print_demos();
            return Ok(());
        }
    };
    let Some(demo) = demos::find(name) else {
        print_demos();
        bail!("unknown demo `{name}`");
    };

    load_env();
    let query = cli.query.as_deref().unwrap_or(demo.default_query());
    tracing::info!(demo = demo.name(), "starting");
    demo.run(query).await
}
