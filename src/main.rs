use clap::Command;
use icloud_backup::configuration::{create_config, ConfigFolder};
use icloud_backup::startup::run;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Command::new("icloud-backup")
        .about("📷 Back up an iCloud photo library to local disk 📷")
        .subcommand(
            Command::new("run").about("🚀 Sign in and back up albums and photos (default)"),
        )
        .subcommand(
            Command::new("config").about("🛠️ Create or update configuration file for icloud-backup"),
        )
        .get_matches();

    let cfg_folder = ConfigFolder::new();

    let result = match args.subcommand() {
        Some(("run", _)) | None => {
            println!("\x1b[1m\x1b[34mStarting the backup...\x1b[0m");
            run(cfg_folder).await
        }
        Some(("config", _)) => {
            println!("\x1b[1m\x1b[34mConfiguring icloud-backup...\x1b[0m");
            create_config(cfg_folder)
        }
        _ => {
            print_usage();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[1m\x1b[31m{:#}\x1b[0m", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("📖 Available Commands:");
    println!("  \x1b[1m\x1b[32micloud-backup run\x1b[0m    - 🚀 Back up albums and photos (default)");
    println!("  \x1b[1m\x1b[32micloud-backup config\x1b[0m - 🛠️  Create or update configuration file");
    println!("\x1b[33mCredentials are always asked for interactively.\x1b[0m\n");
}
