mod cli;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    payday::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config {
            user_name,
            user_id,
            export_dir,
            export_prefix,
        } => cli::config(user_name, user_id, export_dir, export_prefix),
        Commands::Health => cli::health(),
        command => cli.source.load().and_then(|mut ctx| match command {
            Commands::Summary => cli::summary(&ctx),
            Commands::Accounts => cli::accounts(&ctx),
            Commands::Transactions { limit } => cli::transactions(&ctx, limit),
            Commands::Forecast { all } => cli::forecast(&ctx, all),
            Commands::Budget => cli::budget(&ctx),
            Commands::Export { kind, output } => cli::export(&ctx, kind, output),
            Commands::Ask { question, seed } => cli::ask(&ctx, &question, seed),
            Commands::Link { public_token } => cli::link(&mut ctx, public_token),
            Commands::Sync => cli::sync(&mut ctx),
            Commands::Config { .. } | Commands::Health => Ok(()),
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
