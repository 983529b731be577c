use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "picto")]
#[command(about = "Index, classify and organise local photos and videos", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the configured root and bring the database up to date
    Sync,
    /// Show media grouped by class or by directory
    Group {
        #[arg(long, value_enum, default_value_t = GroupBy::Class)]
        by: GroupBy,
        #[arg(long, default_value = "active")]
        visibility: String,
        /// img, vid or any
        #[arg(long = "type", default_value = "any")]
        file_type: String,
        /// Refresh the index before querying
        #[arg(long)]
        refresh: bool,
        #[arg(long)]
        json: bool,
    },
    /// List media that has no classes yet
    Unlinked,
    /// Hide active media
    Hide { paths: Vec<String> },
    /// Make hidden media active again
    Unhide { paths: Vec<String> },
    /// Move active media to the trash
    Trash { paths: Vec<String> },
    /// Restore trashed media
    Restore { paths: Vec<String> },
    /// Permanently delete trashed media from disk and database
    Delete {
        paths: Vec<String>,
        /// Delete every trashed file tagged with this class (repeatable)
        #[arg(long = "class")]
        classes: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show stored details for one file
    Info { path: String },
    /// Display row counts
    Stats,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupBy {
    Class,
    Directory,
}
