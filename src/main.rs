//! PriceHunt CLI - compare grocery prices across sources
//!
//! ```text
//! pricehunt milk
//! pricehunt "atta 5kg" --pincode 560034
//! pricehunt bread eggs butter --json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use pricehunt::infrastructure::{ConfigManager, init_logging_with_config};
use pricehunt::{Aggregator, ComparisonResult, SourceInfo, SourceRegistry, list_sources};

const RULE_WIDTH: usize = 60;
const PRODUCTS_SHOWN_PER_SOURCE: usize = 5;
const NAME_WIDTH: usize = 50;

/// Compare prices for grocery products across BigBasket, JioMart Quick and Zepto
#[derive(Parser)]
#[command(name = "pricehunt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Product(s) to search for
    #[arg(required_unless_present = "list_sources")]
    products: Vec<String>,

    /// Delivery pincode (defaults to the configured region)
    #[arg(short, long)]
    pincode: Option<String>,

    /// Print the comparison results as JSON
    #[arg(long)]
    json: bool,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated source ids, in comparison order
    #[arg(short, long, value_delimiter = ',')]
    sources: Option<Vec<String>>,

    /// List the available sources and exit
    #[arg(long)]
    list_sources: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let mut config = manager.load_config().await.context("Failed to load configuration")?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Err(e) = init_logging_with_config(&config.logging) {
        eprintln!("Logging disabled: {e:#}");
    }

    let catalog = list_sources();
    if cli.list_sources {
        print_sources(&catalog, cli.json)?;
        return Ok(());
    }

    let mut registry = SourceRegistry::from_config(&config);
    if let Some(ids) = cli.sources {
        registry = registry.with_enabled(ids);
    }
    let sources = registry.build()?;
    let aggregator = Aggregator::new(&config.aggregator);
    let region = cli.pincode.unwrap_or_else(|| config.sources.default_region.clone());

    let mut results = Vec::with_capacity(cli.products.len());
    for (i, product) in cli.products.iter().enumerate() {
        if !cli.json {
            if i > 0 {
                println!("\n{}\n", "─".repeat(RULE_WIDTH));
            }
            println!("\n🔎 Searching for '{product}' in pincode {region}...");
            println!("{}", "=".repeat(RULE_WIDTH));
        }

        let result = aggregator.compare(product, &region, &sources).await?;
        if cli.json {
            results.push(result);
        } else {
            print_result(&result, &catalog);
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

fn display_name<'a>(catalog: &'a [SourceInfo], source_id: &'a str) -> &'a str {
    catalog
        .iter()
        .find(|info| info.id == source_id)
        .map_or(source_id, |info| info.display_name)
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn print_result(result: &ComparisonResult, catalog: &[SourceInfo]) {
    for report in &result.sources {
        let products: Vec<_> = result
            .products
            .iter()
            .filter(|product| product.source_id() == report.source_id)
            .collect();
        if products.is_empty() {
            continue;
        }

        println!(
            "\n📦 {} ({} products):",
            display_name(catalog, &report.source_id),
            products.len()
        );
        for product in products.iter().take(PRODUCTS_SHOWN_PER_SOURCE) {
            println!("   ₹{:.0} - {}", product.price(), truncate(product.name(), NAME_WIDTH));
        }
    }

    match &result.lowest {
        Some(lowest) => {
            println!("\n{}", "=".repeat(RULE_WIDTH));
            println!("🏆 LOWEST PRICE: ₹{:.0}", lowest.price());
            println!("   {}", lowest.name());
            println!("   Platform: {}", display_name(catalog, lowest.source_id()));
            println!("   Delivery: {}", lowest.delivery_estimate().unwrap_or("N/A"));
            println!("{}", "=".repeat(RULE_WIDTH));
        }
        None => println!("\n❌ No results found from any platform"),
    }
}

fn print_sources(catalog: &[SourceInfo], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog)?);
        return Ok(());
    }
    for info in catalog {
        println!(
            "{:<15} {:<15} {:<12} {}",
            info.id, info.display_name, info.delivery_window, info.base_url
        );
    }
    Ok(())
}
