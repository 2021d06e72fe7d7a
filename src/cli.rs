use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum IngestArgs {
    /// Ingest a random page of recipes for a cuisine
    Cuisine {
        /// e.g. "Italian", "South East Asian"
        cuisine: String,
    },
    /// Ingest recipes found by searching for an ingredient
    Ingredient { ingredient: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum VectorsArgs {
    /// Convert a word2vec text export into the vector table
    Import {
        /// word2vec text file (optional "count dims" header line)
        path: PathBuf,
    },
    /// Embed a vocabulary with the configured model
    #[cfg(feature = "embed")]
    Build {
        /// One token per line; phrases as "olive_oil" or "olive oil"
        #[clap(long)]
        vocab: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve an ingredient name to a node, creating it if nothing matches
    Resolve {
        name: String,

        /// Category stored on a newly created node
        #[clap(short, long, default_value = "")]
        category: String,

        /// Show the decision without writing anything
        #[clap(long, default_value = "false")]
        dry_run: bool,
    },
    /// Add an ingredient line to a stored recipe
    Attach {
        /// Recipe url or name
        recipe: String,

        /// Ingredient name, resolved like any ingredient line
        ingredient: String,

        #[clap(short, long, default_value = "")]
        quantity: String,

        #[clap(short, long, default_value = "")]
        measure: String,

        /// Category stored if the ingredient is new
        #[clap(short, long, default_value = "")]
        category: String,
    },
    /// Ingest recipes from the recipe search API
    Ingest {
        #[clap(subcommand)]
        what: IngestArgs,
    },
    /// Ingest configured cuisines until the graph reaches the node target
    Build {
        /// Override ingest.node_target
        #[clap(short, long)]
        target: Option<usize>,
    },
    /// Create the built-in catalogue of common ingredients
    Seed {},
    /// Print node and edge counts
    Stats {},
    /// Manage the token vector table
    Vectors {
        #[clap(subcommand)]
        action: VectorsArgs,
    },
}
