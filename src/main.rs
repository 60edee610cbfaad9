use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use unidirect::telemetry::init_tracing;
use unidirect::{Effect, Reduce, Scheduler, Settings, Store, TokioScheduler};

/// Simulated typing into a debounced search box.
#[derive(Parser, Debug)]
#[command(name = "unidirect-demo", version, about)]
struct Cli {
    /// Path to a config file (defaults to the user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Quiet period before a search starts.
    #[arg(long, default_value_t = 300)]
    debounce_ms: u64,

    /// Delay between successive queries, as if typed.
    #[arg(long, default_value_t = 100)]
    typing_interval_ms: u64,

    /// Queries to type, in order.
    queries: Vec<String>,
}

const CATALOG: &[&str] = &[
    "alpaca", "albatross", "alligator", "badger", "bison", "camel", "capybara", "cheetah",
    "dolphin", "falcon", "ferret", "gazelle", "heron", "ibex", "jackal", "lemur",
];

#[derive(Debug, Clone, Default)]
struct SearchState {
    query: String,
    results: Vec<String>,
    searches_started: u32,
}

#[derive(Debug, Clone)]
enum SearchAction {
    QueryChanged(String),
    SearchResponse { query: String, results: Vec<String> },
}

struct SearchEnvironment {
    scheduler: TokioScheduler,
    debounce: Duration,
    latency: Duration,
    catalog: Rc<Vec<String>>,
}

#[derive(Debug, Hash, PartialEq, Eq)]
struct SearchId;

fn search_reducer() -> Reduce<SearchState, SearchAction, SearchEnvironment> {
    Reduce::new(|state: &mut SearchState, action, env: &SearchEnvironment| match action {
        SearchAction::QueryChanged(query) => {
            state.query = query.clone();
            if query.is_empty() {
                state.results.clear();
                return Effect::cancel(SearchId);
            }
            state.searches_started += 1;

            let catalog = Rc::clone(&env.catalog);
            let clock = env.scheduler.clone();
            let latency = env.latency;
            Effect::task(&env.scheduler, async move {
                clock.sleep(latency).await;
                let results = catalog
                    .iter()
                    .filter(|name| name.starts_with(&query))
                    .cloned()
                    .collect();
                SearchAction::SearchResponse { query, results }
            })
            .debounce(SearchId, env.debounce, &env.scheduler)
        }
        SearchAction::SearchResponse { query, results } => {
            if query == state.query {
                state.results = results;
            }
            Effect::none()
        }
    })
    .traced("search")
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(cli, settings));
    Ok(())
}

async fn run(cli: Cli, settings: Settings) {
    let scheduler = TokioScheduler::new();
    let environment = SearchEnvironment {
        scheduler: scheduler.clone(),
        debounce: Duration::from_millis(cli.debounce_ms),
        latency: Duration::from_millis(50),
        catalog: Rc::new(CATALOG.iter().map(|name| name.to_string()).collect()),
    };
    let store = Store::with_config(
        SearchState::default(),
        search_reducer(),
        environment,
        settings.store,
    );
    let _results = store.observe(|state: &SearchState| {
        tracing::debug!(query = %state.query, results = state.results.len(), "state changed");
    });

    let queries = if cli.queries.is_empty() {
        vec!["a".to_string(), "al".to_string(), "alp".to_string()]
    } else {
        cli.queries
    };

    let typing = Duration::from_millis(cli.typing_interval_ms);
    for query in queries {
        tracing::info!(%query, "typed");
        store.send(SearchAction::QueryChanged(query));
        scheduler.sleep(typing).await;
    }

    while store.live_effect_count() > 0 {
        scheduler.sleep(Duration::from_millis(10)).await;
    }

    let state = store.state();
    tracing::info!(
        query = %state.query,
        searches = state.searches_started,
        "search settled"
    );
    for result in &state.results {
        println!("{result}");
    }
}
