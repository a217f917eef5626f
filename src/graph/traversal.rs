//! Bounded breadth-first expansion over Wikipedia articles.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use crate::entity::{infer_self_type, select_candidates, EntityType, Span};
use crate::graph::{Graph, NodeChange};
use crate::ner::EntityRecognizer;
use crate::session::Session;
use crate::wiki::summary::label_from_summary;
use crate::wiki::{Article, TextRetriever};
use crate::Result;

/// Width/depth bounds and NER retry policy for one traversal.
#[derive(Debug, Clone)]
pub struct TraversalOptions {
    /// Max new neighbours selected per mined node.
    pub width: usize,
    /// Max distance from a seed; nodes at this depth are recorded but not mined.
    pub depth: usize,
    pub ner_retries: usize,
    pub retry_base_delay: Duration,
}

impl TraversalOptions {
    pub fn new(width: usize, depth: usize) -> Self {
        Self {
            width,
            depth,
            ner_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }

    pub fn with_retries(mut self, ner_retries: usize, retry_base_delay: Duration) -> Self {
        self.ner_retries = ner_retries;
        self.retry_base_delay = retry_base_delay;
        self
    }
}

/// Outcome of one [`Scheduler::process_one`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Frontier is empty.
    Idle,
    /// Node was already expanded or is no longer in the graph.
    Skipped,
    /// Node recorded without mining: depth limit, type gate, or degraded NER.
    Leaf,
    Expanded {
        selected: usize,
        nodes_added: usize,
        edges_added: usize,
    },
    /// Permanent failure; node left unexpanded for a later run.
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub expanded: usize,
    pub leaves: usize,
    pub skipped: usize,
    pub failed: usize,
    pub nodes_added: usize,
    pub edges_added: usize,
}

impl TraversalStats {
    fn record(&mut self, step: Step) {
        match step {
            Step::Idle => {}
            Step::Skipped => self.skipped += 1,
            Step::Leaf => self.leaves += 1,
            Step::Failed => self.failed += 1,
            Step::Expanded {
                nodes_added,
                edges_added,
                ..
            } => {
                self.expanded += 1;
                self.nodes_added += nodes_added;
                self.edges_added += edges_added;
            }
        }
    }
}

/// Result of growing a session from one query (or resuming it).
#[derive(Debug, Clone, Default)]
pub struct Growth {
    /// Canonical title the query resolved to; `None` for unresolved or resumed runs.
    pub seed: Option<String>,
    pub stats: TraversalStats,
}

struct FrontierEntry {
    id: String,
    depth: usize,
    seed: bool,
    /// Already fetched while resolving; saves a second lookup.
    article: Option<Article>,
}

/// Frontier queue driving the expansion.
///
/// Entries are processed FIFO, so every depth-`d` node is mined before any
/// depth-`d + 1` node. All graph writes of a step happen after its last
/// external call returns; dropping a step mid-flight leaves no partial edges.
pub struct Scheduler<'a, R, N> {
    retriever: &'a R,
    recognizer: &'a N,
    options: TraversalOptions,
    queue: VecDeque<FrontierEntry>,
    /// Exact canonical titles; titles differing only in case are distinct articles.
    visited: HashSet<String>,
}

impl<'a, R, N> Scheduler<'a, R, N>
where
    R: TextRetriever,
    N: EntityRecognizer,
{
    pub fn new(retriever: &'a R, recognizer: &'a N, options: TraversalOptions) -> Self {
        Self {
            retriever,
            recognizer,
            options,
            queue: VecDeque::new(),
            visited: HashSet::new(),
        }
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    /// Entries waiting in the frontier.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn push(&mut self, entry: FrontierEntry) -> bool {
        if entry.depth > self.options.depth {
            return false;
        }
        if !self.visited.insert(entry.id.clone()) {
            return false;
        }
        self.queue.push_back(entry);
        true
    }

    /// Resolve `query` and enqueue it as a depth-0 seed.
    ///
    /// Returns the canonical title, or `None` when the query does not resolve.
    pub async fn enqueue_seed(&mut self, graph: &mut Graph, query: &str) -> Result<Option<String>> {
        let Some(article) = self.retriever.fetch_article(query, None).await? else {
            log::warn!("Seed query '{}' did not resolve to an article", query);
            return Ok(None);
        };

        let id = article.title.clone();
        match graph.upsert_node(&id, EntityType::Misc, 0) {
            NodeChange::Inserted => log::info!("Seed: {} -> {}", query, id),
            NodeChange::DepthLowered { from } => {
                log::info!("Seed: {} -> {} (existing node, depth {} -> 0)", query, id, from)
            }
            NodeChange::Unchanged => log::info!("Seed: {} -> {} (existing node)", query, id),
        }
        graph.set_label(&id, label_from_summary(&article.body));

        self.push(FrontierEntry {
            id: id.clone(),
            depth: 0,
            seed: true,
            article: Some(article),
        });
        Ok(Some(id))
    }

    /// Enqueue an existing node at its stored depth. Depth-0 nodes count as seeds.
    pub fn enqueue_node(&mut self, graph: &Graph, id: &str) -> bool {
        let Some(node) = graph.node(id) else {
            return false;
        };
        self.push(FrontierEntry {
            id: node.id.clone(),
            depth: node.depth,
            seed: node.depth == 0,
            article: None,
        })
    }

    /// Re-enqueue every unexpanded node that a run would still mine, shallowest first.
    pub fn resume(&mut self, graph: &Graph) -> usize {
        let mut pending: Vec<(usize, String)> = graph
            .nodes()
            .iter()
            .filter(|n| !n.expanded && n.depth < self.options.depth)
            .filter(|n| n.depth == 0 || n.entity_type.is_person())
            .map(|n| (n.depth, n.id.clone()))
            .collect();
        pending.sort_by_key(|(depth, _)| *depth);

        let mut count = 0;
        for (_, id) in pending {
            if self.enqueue_node(graph, &id) {
                count += 1;
            }
        }
        if count > 0 {
            log::info!("Resuming {} unexpanded node(s)", count);
        }
        count
    }

    /// Pop one frontier entry and mine it.
    pub async fn process_one(&mut self, graph: &mut Graph) -> Result<Step> {
        let Some(entry) = self.queue.pop_front() else {
            return Ok(Step::Idle);
        };

        let Some(node) = graph.node(&entry.id) else {
            log::warn!("Frontier entry {} is not in the graph", entry.id);
            return Ok(Step::Skipped);
        };
        if node.expanded {
            log::debug!("{} already expanded, skipping", entry.id);
            return Ok(Step::Skipped);
        }
        if entry.depth >= self.options.depth {
            log::debug!("{} at depth limit {}, recorded as leaf", entry.id, entry.depth);
            return Ok(Step::Leaf);
        }
        if !entry.seed && !node.entity_type.is_person() {
            log::debug!("{} is {}, recorded as leaf", entry.id, node.entity_type);
            return Ok(Step::Leaf);
        }

        let article = match entry.article {
            Some(article) => article,
            None => match self.retriever.fetch_article(&entry.id, None).await {
                Ok(Some(article)) => article,
                Ok(None) => {
                    log::warn!("{} no longer resolves, recorded as leaf", entry.id);
                    graph.mark_expanded(&entry.id);
                    return Ok(Step::Leaf);
                }
                Err(e) => {
                    log::warn!("Failed to fetch {}: {}", entry.id, e);
                    return Ok(Step::Failed);
                }
            },
        };

        log::info!("Expanding {} (depth {})", entry.id, entry.depth);

        let spans = match self.extract_with_retry(&article.body).await {
            Ok(spans) => spans,
            Err(e) if e.is_transient() => {
                log::warn!("NER gave up on {}: {}; recorded as leaf", entry.id, e);
                graph.mark_expanded(&entry.id);
                return Ok(Step::Leaf);
            }
            Err(e) => {
                log::error!("NER failed for {}: {}", entry.id, e);
                return Ok(Step::Failed);
            }
        };

        let selected = select_candidates(&spans, &entry.id, self.options.width);
        let selected_count = selected.len();
        log::debug!(
            "{}: {} span(s), selected [{}]",
            entry.id,
            spans.len(),
            selected
                .iter()
                .map(|c| format!("{} ({}x {})", c.text, c.occurrence_count, c.entity_type))
                .collect::<Vec<_>>()
                .join(", ")
        );

        // A candidate that fails to resolve or resolves back to this node gives up
        // its slot; lower-ranked candidates are not pulled in to replace it.
        let mut resolved = Vec::with_capacity(selected.len());
        for candidate in selected {
            match self
                .retriever
                .fetch_article(&candidate.text, Some(&article.body))
                .await
            {
                Ok(Some(target)) if target.title == entry.id => {
                    log::debug!("{} resolves back to {}, dropped", candidate.text, entry.id);
                }
                Ok(Some(target)) => {
                    log::info!("{} -> {}", candidate.text, target.title);
                    resolved.push((candidate.entity_type, target));
                }
                Ok(None) => log::debug!("{} did not resolve, dropped", candidate.text),
                Err(e) => log::warn!("Failed to resolve {}: {}", candidate.text, e),
            }
        }

        // No awaits past this point: the step's graph writes land together.
        if entry.seed {
            if let Some(self_type) = infer_self_type(&spans, &entry.id) {
                graph.refine_type(&entry.id, self_type);
            }
        }

        let child_depth = entry.depth + 1;
        let mut nodes_added = 0;
        let mut edges_added = 0;
        for (entity_type, target) in resolved {
            if graph.upsert_node(&target.title, entity_type, child_depth) == NodeChange::Inserted {
                nodes_added += 1;
            } else if entity_type.is_person() {
                graph.refine_type(&target.title, EntityType::Person);
            }
            graph.set_label(&target.title, label_from_summary(&target.body));
            if graph.add_edge(&entry.id, &target.title) {
                edges_added += 1;
            }

            let unexpanded = graph.node(&target.title).is_some_and(|n| !n.expanded);
            if unexpanded {
                self.push(FrontierEntry {
                    id: target.title.clone(),
                    depth: child_depth,
                    seed: false,
                    article: Some(target),
                });
            }
        }
        graph.mark_expanded(&entry.id);

        Ok(Step::Expanded {
            selected: selected_count,
            nodes_added,
            edges_added,
        })
    }

    /// Drain the frontier.
    pub async fn run(&mut self, graph: &mut Graph) -> Result<TraversalStats> {
        let mut stats = TraversalStats::default();
        loop {
            match self.process_one(graph).await? {
                Step::Idle => break,
                step => stats.record(step),
            }
        }
        log::info!(
            "Traversal finished: {} expanded, {} leaves, {} failed, +{} nodes, +{} edges",
            stats.expanded,
            stats.leaves,
            stats.failed,
            stats.nodes_added,
            stats.edges_added
        );
        Ok(stats)
    }

    /// Grow `session` from `query`, or resume its unexpanded nodes when no query is given.
    pub async fn grow(&mut self, session: &mut Session, query: Option<&str>) -> Result<Growth> {
        let seed = match query {
            Some(query) => match self.enqueue_seed(&mut session.graph, query).await? {
                Some(id) => {
                    session.last_query = Some(query.to_string());
                    Some(id)
                }
                None => return Ok(Growth::default()),
            },
            None => {
                self.resume(&session.graph);
                None
            }
        };

        let stats = self.run(&mut session.graph).await?;
        session.touch();
        Ok(Growth { seed, stats })
    }

    async fn extract_with_retry(&self, text: &str) -> Result<Vec<Span>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 0;
        let mut delay = self.options.retry_base_delay;
        loop {
            match self.recognizer.extract_spans(text).await {
                Ok(spans) => return Ok(spans),
                Err(e) if e.is_transient() && attempt < self.options.ner_retries => {
                    log::warn!(
                        "NER retry {}/{} after error: {}",
                        attempt + 1,
                        self.options.ner_retries,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
