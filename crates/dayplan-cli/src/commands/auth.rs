//! Provider credential commands.
//!
//! Tokens are stored in the OS keyring. Acquiring a token (the OAuth
//! flow) happens outside this tool.

use clap::Subcommand;
use dayplan_core::provider::google::ACCESS_TOKEN_KEY;
use dayplan_core::provider::keyring_store;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store a Google Calendar access token
    SetToken {
        /// The access token
        token: String,
    },
    /// Check whether a token is stored
    Status,
    /// Remove the stored token
    Disconnect,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::SetToken { token } => {
            keyring_store::set(ACCESS_TOKEN_KEY, &token)?;
            println!("Token stored");
        }
        AuthAction::Status => {
            match keyring_store::get(ACCESS_TOKEN_KEY)? {
                Some(token) if !token.is_empty() => println!("authenticated"),
                _ => println!("not authenticated"),
            }
        }
        AuthAction::Disconnect => {
            keyring_store::delete(ACCESS_TOKEN_KEY)?;
            println!("Token removed");
        }
    }
    Ok(())
}
