use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use wikitree::db::Db;
use wikitree::entity::tally;
use wikitree::graph::export::write_snapshot;
use wikitree::ner::{EntityRecognizer, HttpRecognizer};
use wikitree::wiki::{TextRetriever, WikipediaClient};
use wikitree::{Config, Scheduler, Session, SessionStore, TraversalOptions, WikitreeError};

#[derive(Parser, Debug)]
#[command(name = "wikitree")]
#[command(version, about = "Grow a person-relationship graph from Wikipedia articles")]
struct Args {
    /// Article title or search phrase to seed from; omit to resume a session
    query: Option<String>,

    /// Neighbours selected per expanded article (defaults to [traversal] width)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    width: Option<u32>,

    /// Maximum distance from the seed (defaults to [traversal] depth)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Named session to load, grow and save; without it the graph is not persisted
    #[arg(short, long)]
    session: Option<String>,

    /// Print the entity tally for the seed article instead of building a graph
    #[arg(long)]
    single_page: bool,

    /// Write the resulting graph to a .json or .dot file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.wikitree.log_level.as_str())
    ).init();

    log::info!("Starting Wikitree v{}", env!("CARGO_PKG_VERSION"));

    let wiki = WikipediaClient::new(&config.wikipedia)?;
    let ner = HttpRecognizer::new(&config.ner, config.ner.api_key()?)?;

    if args.single_page {
        let query = args
            .query
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--single-page needs a query"))?;
        return run_single_page(&wiki, &ner, query).await;
    }

    let store = match &args.session {
        Some(_) => Some(SessionStore::open(Db::new(config.db_path())).await?),
        None => None,
    };

    let (mut session, existed) = match (&store, &args.session) {
        (Some(store), Some(name)) => match store.load(name).await? {
            Some(session) => {
                log::info!(
                    "Loaded session {} ({} nodes, {} edges)",
                    name,
                    session.graph.node_count(),
                    session.graph.edge_count()
                );
                (session, true)
            }
            None if args.query.is_none() => {
                return Err(WikitreeError::SessionNotFound(name.clone()).into());
            }
            None => {
                log::info!("Creating session {}", name);
                (
                    Session::new(name.as_str(), config.traversal.width, config.traversal.depth),
                    false,
                )
            }
        },
        _ => {
            let query = args
                .query
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("a query is required when no --session is given"))?;
            (
                Session::new(query, config.traversal.width, config.traversal.depth),
                false,
            )
        }
    };

    if let Some(width) = args.width {
        session.width = width as usize;
    }
    if let Some(depth) = args.depth {
        session.depth = depth as usize;
    }

    let options = TraversalOptions::new(session.width, session.depth)
        .with_retries(config.ner.max_retries, config.ner.retry_base_delay());
    log::info!("Traversal bounds: width={}, depth={}", options.width, options.depth);

    let mut scheduler = Scheduler::new(&wiki, &ner, options);
    let growth = tokio::select! {
        result = scheduler.grow(&mut session, args.query.as_deref()) => Some(result?),
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted, keeping the graph built so far");
            None
        }
    };
    session.touch();

    if let (Some(growth), Some(query)) = (&growth, &args.query) {
        if growth.seed.is_none() {
            if !existed {
                anyhow::bail!("'{}' did not resolve to a Wikipedia article", query);
            }
            log::warn!("'{}' did not resolve; session {} left as it was", query, session.name);
        }
    }

    if let Some(store) = &store {
        store.save(&session).await?;
    }

    if let Some(path) = &args.output {
        write_snapshot(&session.graph.snapshot(), path)?;
        log::info!("Graph written to {}", path.display());
    }

    print_graph(&session);
    Ok(())
}

fn print_graph(session: &Session) {
    println!(
        "\n{}: {} nodes, {} edges\n",
        session.name,
        session.graph.node_count(),
        session.graph.edge_count()
    );
    for node in session.graph.nodes() {
        let targets: Vec<&str> = session
            .graph
            .outgoing(&node.id)
            .map(|e| e.target_id.as_str())
            .collect();
        if targets.is_empty() {
            continue;
        }
        println!("{} -> {}", node.id, targets.join(", "));
    }
}

/// Tally table for one article, most frequent first.
async fn run_single_page(wiki: &WikipediaClient, ner: &HttpRecognizer, query: &str) -> Result<()> {
    let article = wiki
        .fetch_article(query, None)
        .await?
        .ok_or_else(|| anyhow::anyhow!("'{}' did not resolve to a Wikipedia article", query))?;
    log::info!("Fetched {}", article.title);

    let spans = ner.extract_spans(&article.body).await?;
    let mut candidates = tally(&spans);
    candidates.sort_by(|a, b| b.occurrence_count.cmp(&a.occurrence_count));

    println!("\nEntities in {}:\n", article.title);
    println!("{:-<72}", "");
    println!("{:<48} {:<14} {:>8}", "Entity", "Type", "Count");
    println!("{:-<72}", "");
    for candidate in &candidates {
        println!(
            "{:<48} {:<14} {:>8}",
            candidate.text,
            candidate.entity_type.as_str(),
            candidate.occurrence_count
        );
    }
    println!("{:-<72}", "");

    Ok(())
}
