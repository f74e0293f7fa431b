//! MediaLab CLI
//!
//! Command-line administration for a Media Lab store.
//!
//! # Commands
//!
//! - `init` - Create a store and seed the admin account
//! - `inspect` - Display schema version, collections and log size
//! - `compact` - Rewrite the record log without superseded frames
//! - `user` - Add, list or remove accounts
//! - `asset add` - Upload a resource file
//! - `resource set` - Attach an asset to a stage
//! - `bundle` - Write a stage's resources as a ZIP
//! - `export-csv` - Write class progress as CSV
//! - `verify-archive` - Check a ZIP produced by `bundle`

mod commands;

use clap::{Parser, Subcommand};
use medialab_lab::{Role, Stage};
use medialab_lab::settings::ResourceKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Media Lab store administration.
#[derive(Parser)]
#[command(name = "medialab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Account to sign in as for commands that change data
    #[arg(global = true, long, default_value = "admin@oakhill.local")]
    login: String,

    /// Password of the `--login` account
    #[arg(global = true, long, default_value = "admin123")]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store and seed the admin account
    Init,

    /// Display schema version, collections and log size
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rewrite the record log without superseded frames
    Compact,

    /// Manage accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage resource files
    Asset {
        #[command(subcommand)]
        command: AssetCommands,
    },

    /// Manage stage resources
    Resource {
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Write every resource of a stage into a ZIP
    Bundle {
        /// Stage key or prefix (development, pre, production, post)
        stage: Stage,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write class progress as CSV
    ExportCsv {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check the structure and checksums of a ZIP
    VerifyArchive {
        /// Archive to check
        file: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create or replace an account
    Add {
        /// Login email
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (student, teacher, admin, guardian)
        #[arg(short, long, default_value = "student")]
        role: Role,

        /// Initial password
        #[arg(long)]
        user_password: String,

        /// Student a guardian may view
        #[arg(long)]
        guardian_of: Option<String>,
    },

    /// List every account
    List,

    /// Delete an account and its project
    Remove {
        /// Login email
        email: String,
    },
}

#[derive(Subcommand)]
enum AssetCommands {
    /// Upload a file as a resource asset
    Add {
        /// File to upload
        file: PathBuf,

        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[derive(Subcommand)]
enum ResourceCommands {
    /// Attach an asset to a stage slot
    Set {
        /// Stage key or prefix
        stage: Stage,

        /// Slot (word, pdf, pptx)
        kind: ResourceKind,

        /// Asset id printed by `asset add`
        asset_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let credentials = commands::Credentials {
        email: cli.login,
        password: cli.password,
    };

    match cli.command {
        Commands::Init => {
            let path = cli.path.ok_or("Store path required for init")?;
            commands::init::run(&path).await?;
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format).await?;
        }
        Commands::Compact => {
            let path = cli.path.ok_or("Store path required for compact")?;
            commands::compact::run(&path).await?;
        }
        Commands::User { command } => {
            let path = cli.path.ok_or("Store path required for user")?;
            match command {
                UserCommands::Add {
                    email,
                    name,
                    role,
                    user_password,
                    guardian_of,
                } => {
                    let new = medialab_lab::NewUser {
                        email,
                        name,
                        role,
                        password: user_password,
                        guardian_of,
                    };
                    commands::user::add(&path, &credentials, new).await?;
                }
                UserCommands::List => commands::user::list(&path, &credentials).await?,
                UserCommands::Remove { email } => {
                    commands::user::remove(&path, &credentials, &email).await?;
                }
            }
        }
        Commands::Asset {
            command: AssetCommands::Add { file, content_type },
        } => {
            let path = cli.path.ok_or("Store path required for asset")?;
            commands::asset::add(&path, &credentials, &file, content_type.as_deref()).await?;
        }
        Commands::Resource {
            command:
                ResourceCommands::Set {
                    stage,
                    kind,
                    asset_id,
                },
        } => {
            let path = cli.path.ok_or("Store path required for resource")?;
            commands::asset::set_resource(&path, &credentials, stage, kind, &asset_id).await?;
        }
        Commands::Bundle { stage, output } => {
            let path = cli.path.ok_or("Store path required for bundle")?;
            commands::bundle::run(&path, stage, &output).await?;
        }
        Commands::ExportCsv { output } => {
            let path = cli.path.ok_or("Store path required for export-csv")?;
            commands::export::csv(&path, &credentials, &output).await?;
        }
        Commands::VerifyArchive { file } => {
            commands::bundle::verify(&file)?;
        }
        Commands::Version => {
            println!("MediaLab CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("MediaLab Store v{}", medialab_store::VERSION);
            println!("Lab schema version {}", medialab_lab::SCHEMA_VERSION);
        }
    }

    Ok(())
}
