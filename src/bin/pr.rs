use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use precio_radar::logging;
use precio_radar::models::{SearchQuery, Store};
use precio_radar::util::env as env_util;
use precio_radar::CrossStoreAggregator;

#[derive(Parser, Debug)]
#[command(name = "pr", version, about = "PrecioRadar admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Search one store (or all of them) and print the normalized results
    Search {
        /// Search text
        query: String,
        /// Store slug (walmart, maxipali, masxmenos, automercado) or "all"
        #[arg(long, default_value = "all")]
        store: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Compare a product across all stores and print the best price
    Compare {
        /// Product name to compare
        name: String,
        /// Optional barcode for exact matching
        #[arg(long)]
        barcode: Option<String>,
        /// Store the product originally came from
        #[arg(long)]
        original_store: Option<String>,
    },
    /// Look up a product by barcode in one store
    Lookup {
        /// Store slug
        store: String,
        /// Barcode (EAN)
        code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing("warn,precio_radar=info")?;
    env_util::init_env();

    let cli = Cli::parse();
    let aggregator = CrossStoreAggregator::from_env()?;

    match cli.command {
        Commands::Search {
            query,
            store,
            page,
            page_size,
        } => {
            let search = SearchQuery {
                text: query,
                page,
                page_size,
                original_store: None,
            };
            if store == "all" {
                let result = aggregator.search_all(&search).await;
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let store: Store = match store.parse() {
                    Ok(s) => s,
                    Err(e) => bail!(e),
                };
                let catalogs = precio_radar::stores::default_catalogs()?;
                let Some(catalog) = catalogs.into_iter().find(|c| c.store() == store) else {
                    bail!("store not configured: {store}");
                };
                let products = catalog.search(&search.text, page, page_size).await?;
                let products = precio_radar::relevance::filter_products(products, &search);
                println!("{}", serde_json::to_string_pretty(&products)?);
            }
        }
        Commands::Compare {
            name,
            barcode,
            original_store,
        } => {
            let original_store = match original_store {
                Some(raw) => match raw.parse::<Store>() {
                    Ok(s) => Some(s),
                    Err(e) => bail!(e),
                },
                None => None,
            };
            let result = aggregator
                .compare(&name, barcode.as_deref(), original_store)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Lookup { store, code } => {
            let store: Store = match store.parse() {
                Ok(s) => s,
                Err(e) => bail!(e),
            };
            let catalogs = precio_radar::stores::default_catalogs()?;
            let Some(catalog) = catalogs.into_iter().find(|c| c.store() == store) else {
                bail!("store not configured: {store}");
            };
            match catalog.lookup_by_code(&code).await {
                Ok(product) => println!("{}", serde_json::to_string_pretty(&product)?),
                Err(err) if err.is_not_found() => {
                    eprintln!("no verified match for {code} at {}", store.label());
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(())
}
