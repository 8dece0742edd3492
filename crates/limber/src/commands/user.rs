//! User command - manage credentials without a running server.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};

use limber_auth::CredentialStore;

use super::Context;

/// Arguments for the user command.
#[derive(Args, Debug)]
pub struct UserArgs {
    /// Directory holding credential records (overrides config)
    #[arg(long, global = true)]
    pub auth_dir: Option<PathBuf>,

    /// Read the password from the first line of stdin instead of prompting
    #[arg(long, global = true)]
    pub password_stdin: bool,

    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a new user
    Add {
        /// Username
        name: String,
    },

    /// Check a user's password
    Check {
        /// Username
        name: String,
    },
}

/// Run the user command.
pub async fn run(args: UserArgs, ctx: &Context) -> Result<()> {
    let auth_dir = super::auth_dir(ctx, args.auth_dir);
    let store = CredentialStore::open(&auth_dir).with_context(|| {
        format!("Failed to open credential store at {}", auth_dir.display())
    })?;

    match args.command {
        UserCommand::Add { name } => {
            let password = read_password(args.password_stdin, true)?;
            store.register(&name, &password).await?;
            println!("Registered user '{}'", name);
        }
        UserCommand::Check { name } => {
            let password = read_password(args.password_stdin, false)?;
            store.verify(&name, &password).await?;
            println!("Password OK for '{}'", name);
        }
    }

    Ok(())
}

fn read_password(from_stdin: bool, confirm: bool) -> Result<String> {
    let password = if from_stdin {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        let password = rpassword::prompt_password("Password: ")?;
        if confirm && rpassword::prompt_password("Confirm password: ")? != password {
            bail!("Passwords do not match");
        }
        password
    };

    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}
