use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stackcloud::records::{Category, Record, load_records};
use stackcloud::sim::{Dimensions, NodeSpec, Simulation};
use stackcloud::util::format_months;
use stackcloud::weighting::{size_factors, usage_by_tag};
use stackcloud::{FilterCache, SelectionIndex, category_summary, filter_records_cached, suggest_tag};

const BASE_NODE_RADIUS: f32 = 26.0;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the record dataset (JSON)
    #[arg(long, default_value = "data/records.json")]
    data: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Filter records by a free-text query and optional category
    Filter {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long)]
        category: Option<Category>,
        /// Gate by direct tag scan instead of the selection index
        #[arg(long)]
        no_index: bool,
    },
    /// Print per-tag usage and size factors
    Sizes {
        /// Reference date for open-ended records (defaults to today)
        #[arg(long)]
        now: Option<NaiveDate>,
    },
    /// Run the layout simulation headless and print settled positions
    Layout {
        #[arg(long, default_value_t = 1280.0)]
        width: f32,
        #[arg(long, default_value_t = 800.0)]
        height: f32,
        /// Tag to mark as selected before settling
        #[arg(long)]
        select: Option<String>,
        #[arg(long, default_value_t = 2000)]
        max_ticks: usize,
        #[arg(long)]
        now: Option<NaiveDate>,
    },
    /// Per-category tag and record summary
    Categories {
        #[arg(long)]
        now: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let records = load_records(&args.data)
        .with_context(|| format!("failed to load records from {}", args.data.display()))?;

    match args.command {
        Command::Filter {
            query,
            category,
            no_index,
        } => run_filter(&records, &query, category, no_index),
        Command::Sizes { now } => run_sizes(&records, resolve_now(now)),
        Command::Layout {
            width,
            height,
            select,
            max_ticks,
            now,
        } => run_layout(&records, width, height, select, max_ticks, resolve_now(now)),
        Command::Categories { now } => run_categories(&records, resolve_now(now)),
    }

    Ok(())
}

fn resolve_now(now: Option<NaiveDate>) -> NaiveDate {
    now.unwrap_or_else(|| Local::now().date_naive())
}

fn run_filter(records: &[Record], query: &str, category: Option<Category>, no_index: bool) {
    let index = (!no_index).then(|| SelectionIndex::build(records));
    let mut cache = FilterCache::default();
    let matches = filter_records_cached(records, query, category, index.as_ref(), &mut cache);

    if matches.is_empty() {
        println!("no records match");
        if let Some(hint) = suggest_tag(records, query) {
            println!("did you mean: {hint}?");
        }
        return;
    }

    for record in matches {
        let end = record
            .end
            .map(|date| date.format("%Y-%m").to_string())
            .unwrap_or_else(|| "present".to_owned());
        println!(
            "{}  {} @ {}  ({} - {})",
            record.id,
            record.role,
            record.organization,
            record.start.format("%Y-%m"),
            end
        );
    }
}

fn run_sizes(records: &[Record], now: NaiveDate) {
    let usage = usage_by_tag(records, now);
    let factors = size_factors(records, now);

    let mut rows: Vec<_> = factors.iter().collect();
    rows.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

    println!("{:<24} {:>10} {:>8}", "tag", "usage", "factor");
    for (name, factor) in &rows {
        let months = usage.get(*name).map(|entry| entry.total_months).unwrap_or(0);
        println!("{:<24} {:>10} {:>8.3}", name, format_months(months), factor);
    }

    let count = factors.len();
    if count > 0 {
        let sum_squares: f64 = factors.values().map(|factor| factor * factor).sum();
        println!(
            "\n{count} tags, area ratio {:.3} (1.0 = conserved)",
            sum_squares / count as f64
        );
    }
}

fn run_layout(
    records: &[Record],
    width: f32,
    height: f32,
    select: Option<String>,
    max_ticks: usize,
    now: NaiveDate,
) {
    let factors = size_factors(records, now);

    // Category of an effective tag name: taken from the first tag that
    // folds into it.
    let mut categories: HashMap<&str, Category> = HashMap::new();
    for record in records {
        for tag in &record.tags {
            categories.entry(tag.effective_name()).or_insert(tag.category);
        }
    }

    let mut specs: Vec<NodeSpec> = factors
        .iter()
        .filter_map(|(name, factor)| {
            categories.get(name.as_str()).map(|&category| NodeSpec {
                id: name.clone(),
                category,
                radius: BASE_NODE_RADIUS,
                scale: *factor as f32,
            })
        })
        .collect();
    specs.sort_by(|a, b| a.id.cmp(&b.id));

    let mut sim = Simulation::new("stack", specs);
    if let Some(tag) = &select {
        sim.set_selected(tag, true);
    }
    sim.update_dimensions(Dimensions::new(width, height));

    let ticks = sim.run_until_settled(max_ticks);
    println!(
        "settled={} after {ticks} ticks (alpha {:.4})\n",
        sim.is_settled(),
        sim.alpha()
    );

    println!("{:<24} {:>8} {:>8} {:>7}  category", "node", "x", "y", "r");
    for node in sim.positions() {
        let category = node
            .category
            .map(|category| category.label())
            .unwrap_or("anchor");
        println!(
            "{:<24} {:>8.1} {:>8.1} {:>7.1}  {category}",
            node.id, node.x, node.y, node.radius
        );
    }

    sim.dispose();
}

fn run_categories(records: &[Record], now: NaiveDate) {
    println!("{:<16} {:>6} {:>8} {:>12}", "category", "tags", "records", "usage");
    for slice in category_summary(records, now) {
        println!(
            "{:<16} {:>6} {:>8} {:>12}",
            slice.category.label(),
            slice.tag_count,
            slice.record_count,
            format_months(slice.total_months)
        );
    }
}
