use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

mod app;
mod audit;
mod candidates;
mod cli;
mod config;
mod graph;
mod ingest;
mod normalize;
mod relationships;
mod resolver;
mod seed;
mod similarity;
#[cfg(test)]
mod tests;

use app::AppFactory;
use cli::{IngestArgs, VectorsArgs};
use config::Config;
use relationships::RelationshipBuilder;
use resolver::IngredientMention;
use similarity::{model_id_hash, TokenVectors, VectorStorage};

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Flag raised on Ctrl+C; long-running ingestion checks it between recipes.
fn stop_flag() -> anyhow::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal, finishing current recipe");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;
    Ok(stop)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let paths = AppFactory::get_paths()?;

    match args.command {
        cli::Command::Resolve {
            name,
            category,
            dry_run,
        } => {
            let app = AppFactory::create_app(&paths, dry_run)?;
            if dry_run {
                print_json(&app.resolver.preview(&name)?)?;
            } else {
                let resolution = app
                    .resolver
                    .resolve(&IngredientMention::new(name, category))?;
                print_json(&resolution)?;
            }
        }

        cli::Command::Attach {
            recipe,
            ingredient,
            quantity,
            measure,
            category,
        } => {
            let app = AppFactory::create_app(&paths, false)?;
            let recipe_node = ingest::find_recipe(app.store.as_ref(), &recipe, &recipe)?
                .with_context(|| format!("No recipe with url or name '{recipe}'"))?;

            let mention = IngredientMention {
                food_name: ingredient,
                category,
                quantity,
                measure,
            };
            let resolution = app.resolver.resolve(&mention)?;
            RelationshipBuilder::new(app.store.clone()).attach(
                &recipe_node,
                &resolution.node,
                &mention.quantity,
                &mention.measure,
            )?;
            print_json(&resolution)?;
        }

        cli::Command::Ingest { what } => {
            let app = AppFactory::create_app(&paths, false)?;
            let ingestor = app.create_ingestor()?;
            let feed = app.create_feed()?;
            let stop = stop_flag()?;

            let stats = match what {
                IngestArgs::Cuisine { cuisine } => {
                    ingestor.ingest_cuisine(&feed, &cuisine, &stop)?
                }
                IngestArgs::Ingredient { ingredient } => {
                    ingestor.ingest_ingredient(&feed, &ingredient, &stop)?
                }
            };
            print_json(&stats)?;
        }

        cli::Command::Build { target } => {
            let app = AppFactory::create_app(&paths, false)?;
            let ingestor = app.create_ingestor()?;
            let feed = app.create_feed()?;
            let stop = stop_flag()?;

            let target = target.unwrap_or(app.config.ingest.node_target);
            log::info!("building the graph for diverse cuisines, target {target} nodes");

            let report = ingestor.build(&feed, &app.config.ingest.cuisines, target, &stop)?;
            print_json(&report)?;
        }

        cli::Command::Seed {} => {
            let app = AppFactory::create_app(&paths, false)?;
            let report = seed::seed(&app.resolver, &app.retriever, seed::CATALOGUE)?;
            print_json(&report)?;
        }

        cli::Command::Stats {} => {
            let app = AppFactory::create_app(&paths, true)?;
            print_json(&app.stats()?)?;
        }

        cli::Command::Vectors { action } => {
            let config = Config::load_with(&paths.base_path).context("Failed to load config")?;
            let storage = VectorStorage::new(config.resolve_path(&config.similarity.vectors));

            match action {
                VectorsArgs::Import { path } => {
                    let table = TokenVectors::load_word2vec_text(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    storage.save(&table, &model_id_hash(similarity::WORD2VEC_MODEL))?;
                    log::info!(
                        "imported {} tokens ({} dimensions) into {}",
                        table.len(),
                        table.dimensions(),
                        storage.path().display()
                    );
                }

                #[cfg(feature = "embed")]
                VectorsArgs::Build { vocab } => {
                    let vocabulary: Vec<String> = std::fs::read_to_string(&vocab)
                        .with_context(|| format!("Failed to read {}", vocab.display()))?
                        .lines()
                        .map(|line| line.trim().replace(' ', "_"))
                        .filter(|line| !line.is_empty() && !line.starts_with('#'))
                        .collect();

                    let model = similarity::embeddings::EmbeddingModel::new(
                        &config.similarity.model,
                        paths.base_path.clone(),
                        Some(std::time::Duration::from_secs(
                            config.similarity.download_timeout_secs,
                        )),
                    )?;
                    let table =
                        model.build_token_vectors(&vocabulary, config.similarity.batch_size)?;
                    storage.save(&table, &model_id_hash(model.name()))?;
                    log::info!(
                        "built {} tokens into {}",
                        table.len(),
                        storage.path().display()
                    );
                }
            }
        }
    }

    Ok(())
}
