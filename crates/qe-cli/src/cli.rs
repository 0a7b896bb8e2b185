//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// Query engine - a schema-driven query engine with relational and document backends
#[derive(Parser, Debug)]
#[command(name = "qe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the catalog config file path (defaults to `CONFIG_PATH` env, then `./catalog.json`)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP surface (§6.2)
    Serve(ServeArgs),

    /// Introspect a live backend and print a catalog config
    Introspect(IntrospectArgs),

    /// Validate a DSL query file against the catalog, without planning or executing it
    Validate(QueryFileArgs),

    /// Validate, plan and build a DSL query file, printing the compiled statement
    Plan(QueryFileArgs),
}

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the bind address (defaults to `HTTP_HOST`/`HTTP_PORT`, then `127.0.0.1:8080`)
    #[arg(short, long)]
    pub addr: Option<String>,
}

/// Arguments for the introspect command
#[derive(Args, Debug)]
pub struct IntrospectArgs {
    #[command(subcommand)]
    pub target: IntrospectTarget,

    /// Write the resulting catalog config to this path instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum IntrospectTarget {
    /// Introspect a Postgres database via `DATABASE_URL` (§4.7)
    Relational,
    /// Introspect a MongoDB database via `MONGODB_URI`/`MONGODB_DATABASE` (§4.8)
    Document(DocumentIntrospectArgs),
}

#[derive(Args, Debug)]
pub struct DocumentIntrospectArgs {
    /// Comma-separated collection names (default: every collection in the database)
    #[arg(long)]
    pub collections: Option<String>,

    /// Number of documents to sample per collection
    #[arg(long, default_value_t = 100)]
    pub sample_size: i64,
}

/// Arguments shared by `validate` and `plan`: a path to a JSON-encoded DSL query
#[derive(Args, Debug)]
pub struct QueryFileArgs {
    /// Path to a JSON file containing a DSL query (§6.3)
    pub query_file: String,
}
