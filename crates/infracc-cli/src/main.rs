use clap::Parser;

use infracc::{Cli, InfraccOptions, run_main};

fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let args = Cli::parse();
    let opts = InfraccOptions {
        inventory: args.inventory.clone(),
        graphdict: args.graphdict.clone(),
        format: args.format,
        name: args.name.clone(),
    };

    let output = run_main(&opts)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, &output)?;
            tracing::info!(path, "output written");
        }
        None => println!("{output}"),
    }
    Ok(())
}
