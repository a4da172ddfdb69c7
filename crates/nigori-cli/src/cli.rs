use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use nigori_types::Revision;

/// Public keys, record keys and values are taken as UTF-8 text, or as hex
/// when prefixed with `hex:`.
#[derive(Parser)]
#[command(
    name = "nigori",
    about = "Nigori store: versioned per-user record storage",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Snapshot file holding the store between runs
    #[arg(long, global = true, default_value = "nigori.snap", env = "NIGORI_STORE")]
    pub store: PathBuf,

    /// Engine configuration (TOML)
    #[arg(long, global = true, env = "NIGORI_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register a public key
    AddUser(UserArgs),
    /// Check whether a public key is registered
    HaveUser(UserArgs),
    /// Show a registered user
    GetUser(UserArgs),
    /// Remove a user registration
    DeleteUser(UserArgs),
    /// Write the next revision of a record
    Put(PutArgs),
    /// Read a record
    Get(GetArgs),
    /// Conditionally replace a record's current revision
    Update(UpdateArgs),
    /// Delete a record and all of its revisions
    Delete(KeyArgs),
    /// Show the current revision of a record
    Revision(KeyArgs),
    /// List the retained revisions of a record
    History(KeyArgs),
}

#[derive(Args)]
pub struct UserArgs {
    pub public_key: String,
}

#[derive(Args)]
pub struct KeyArgs {
    pub public_key: String,
    pub key: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub public_key: String,
    pub key: String,
    pub value: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub public_key: String,
    pub key: String,
    /// Read a retained revision instead of the current one
    #[arg(short, long)]
    pub revision: Option<Revision>,
}

#[derive(Args)]
pub struct UpdateArgs {
    pub public_key: String,
    pub key: String,
    pub value: String,
    /// Revision the caller believes is current
    #[arg(long)]
    pub expected: Revision,
    /// Revision to publish; defaults to the one after `--expected`
    #[arg(long = "new")]
    pub new_revision: Option<Revision>,
}
