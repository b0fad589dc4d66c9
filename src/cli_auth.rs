//! Account administration CLI: create users, reset passwords, list accounts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use streamlyze_server::user::{SqliteUserStore, UserManager};

#[derive(Parser, Debug)]
#[command(about = "Manage streamlyze-server user accounts")]
struct CliArgs {
    /// Path to the SQLite user database file.
    pub user_db: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new user with password credentials.
    AddUser { handle: String, password: String },
    /// Replace an existing user's password.
    SetPassword { handle: String, password: String },
    /// List all user handles.
    ListUsers,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let user_store = Arc::new(SqliteUserStore::new(&cli_args.user_db)?);
    let user_manager = UserManager::new(user_store);

    match cli_args.command {
        Command::AddUser { handle, password } => {
            let user_id = user_manager.register_user(&handle, &password)?;
            println!("Created user {} with id {}", handle, user_id);
        }
        Command::SetPassword { handle, password } => {
            user_manager.set_user_password(&handle, &password)?;
            println!("Updated password for {}", handle);
        }
        Command::ListUsers => {
            for handle in user_manager.get_all_user_handles()? {
                println!("{}", handle);
            }
        }
    }

    Ok(())
}
