//! # catprint CLI
//!
//! ```bash
//! # Convert a photo with Floyd-Steinberg and spool it
//! catprint convert photo.jpg
//!
//! # Ordered dithering, written to a file with a preview
//! catprint convert photo.jpg --algorithm new -o photo.pbm --preview photo.png
//!
//! # Print text
//! echo "hello" | catprint text - --font DejaVuSans.ttf
//!
//! # Tune interactively
//! catprint watch photo.jpg --preview live.png
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

use catprint_lib::cli::{Cli, Commands};
use catprint_lib::commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let foundation = catprint_lib::init_foundation(cli.data_dir.clone())?;

    match &cli.command {
        Commands::Convert(args) => commands::convert(&foundation, args)?,
        Commands::Text(args) => commands::text(&foundation, args)?,
        Commands::Watch(args) => commands::watch(&foundation, args).await?,
        Commands::Models => commands::models(),
        Commands::Settings { action } => commands::settings(&foundation, action)?,
    }
    Ok(())
}
