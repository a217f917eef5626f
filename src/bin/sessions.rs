use anyhow::Result;
use clap::Parser;
use wikitree::db::Db;
use wikitree::graph::export::to_json;
use wikitree::{Config, SessionStore, WikitreeError};

#[derive(Parser, Debug)]
#[command(name = "sessions")]
#[command(about = "List stored Wikitree sessions or print one as JSON")]
struct Args {
    /// Print the named session's graph as JSON
    #[arg(long, value_name = "NAME", conflicts_with = "delete")]
    show: Option<String>,

    /// Remove the named session and its graph
    #[arg(long, value_name = "NAME")]
    delete: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "warn")
    ).init();

    let args = Args::parse();
    let config = Config::load()?;
    let store = SessionStore::open(Db::new(config.db_path())).await?;

    if let Some(name) = &args.show {
        let session = store.load_existing(name).await?;
        println!("{}", to_json(&session.graph.snapshot())?);
        return Ok(());
    }

    if let Some(name) = &args.delete {
        if !store.delete(name).await? {
            return Err(WikitreeError::SessionNotFound(name.clone()).into());
        }
        println!("Deleted session {}", name);
        return Ok(());
    }

    let sessions = store.list().await?;
    if sessions.is_empty() {
        println!("No sessions stored in {}.", config.db_path().display());
        return Ok(());
    }

    println!("{:-<100}", "");
    println!(
        "{:<24} {:>7} {:>7} {:>6} {:>6}  {:<20} {}",
        "Session", "Nodes", "Edges", "Width", "Depth", "Updated", "Last query"
    );
    println!("{:-<100}", "");
    for s in &sessions {
        println!(
            "{:<24} {:>7} {:>7} {:>6} {:>6}  {:<20} {}",
            s.name,
            s.node_count,
            s.edge_count,
            s.width,
            s.depth,
            s.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            s.last_query.as_deref().unwrap_or("-")
        );
    }
    println!("{:-<100}", "");
    println!("{} session(s)", sessions.len());

    Ok(())
}
