//! CLI module - Command-line interface for Postline
//!
//! This module provides a structured CLI using clap for argument parsing.

use clap::{Parser, Subcommand};

/// Postline - Social feed API server
#[derive(Parser)]
#[command(name = "postline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP API server (default)
    #[command(alias = "web")]
    Serve,

    /// Fill the database with synthetic users, posts, comments and follows
    Seed {
        /// Number of users to create
        #[arg(long, default_value_t = 100)]
        users: usize,
        /// Number of posts to create
        #[arg(long, default_value_t = 100)]
        posts: usize,
        /// Number of comments to create
        #[arg(long, default_value_t = 100)]
        comments: usize,
        /// Upper bound on follow edges to create
        #[arg(long, default_value_t = 200)]
        follows: usize,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}
