use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mycloud")]
#[command(author, version, about = "Command line client for MyCloud file storage", long_about = None)]
pub struct Cli {
    /// REST API base URL
    #[arg(long, global = true, env = "MYCLOUD_API_BASE_URL")]
    pub api_url: Option<String>,

    /// Directory holding the persisted session
    #[arg(long, global = true, env = "MYCLOUD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        username: String,
        email: String,
        #[arg(long, default_value = "")]
        full_name: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout {
        /// Only drop the local credential, do not tell the server
        #[arg(long)]
        local: bool,
    },

    /// Show the signed-in account and its storage usage
    Whoami {
        /// Keep refreshing the usage until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Change your own password
    Passwd {
        #[arg(long)]
        password: Option<String>,
    },

    /// Check whether a username is still free
    CheckUsername { username: String },

    /// Check whether an email is still unused
    CheckEmail { email: String },

    /// Manage your files
    #[command(subcommand)]
    Files(FilesCommand),

    /// Administer accounts (superusers only)
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
pub enum FilesCommand {
    /// List files
    List {
        /// List another account's files (administrators)
        #[arg(long)]
        user: Option<u64>,
    },

    /// Upload one or more files in a single batch
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Save a file locally
    Download {
        id: u64,
        /// Defaults to the original file name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace a file's comment
    Comment { id: u64, text: String },

    /// Delete a file
    Delete {
        id: u64,
        /// Skip the confirmation question
        #[arg(long)]
        yes: bool,
    },

    /// Generate a public download link and print it
    Share {
        id: u64,
        /// Link lifetime in days (1-365); server default otherwise
        #[arg(long)]
        days: Option<u32>,
    },

    /// Revoke a public link
    Unshare { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// List regular accounts
    Users {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Activate or deactivate an account
    Toggle { id: u64 },

    /// Set an account's quota in GB
    Quota {
        id: u64,
        gb: String,
        /// Confirmation phrase; asked for when omitted
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Reset an account's password
    Password {
        id: u64,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Delete an account and its files
    Delete {
        id: u64,
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Create another administrator
    CreateAdmin {
        username: String,
        email: String,
        full_name: String,
        #[arg(long)]
        password: Option<String>,
    },
}
