//! Anime search CLI application.

use std::path::PathBuf;
use std::sync::Arc;

use anime_search::presentation::{available_genres, shows_pagination, title_suggestions, PageRange};
use anime_search::{
    best_image_url, recommendations, DetailState, DetailView, JikanClient, PickSettings,
    RandomPicker, ResultView, SearchSession, SessionUpdate, SortKey, ViewMode,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::{AnimeDetail, AnimeSummary, Config, LogConfig, PaginationInfo};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the catalog by title
    Search {
        query: String,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Keep only titles with this genre (repeatable)
        #[arg(long = "genre")]
        genres: Vec<String>,

        #[arg(long, default_value_t = SortKey::RatingHigh)]
        sort: SortKey,

        /// grid or list
        #[arg(long, default_value = "grid")]
        view: ViewMode,
    },

    /// Show one title by its MyAnimeList id
    Detail { id: u32 },

    /// Show the top-ranked titles
    Top {
        /// Defaults to the configured recommendations limit
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Pick a random title from the top list
    Random,

    /// Line-driven search session
    Interactive,

    /// Write the effective configuration to the config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let mut log_config = LogConfig::from_config(&config, "anime-search");
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    shared::logging::init(log_config)?;

    info!(config_file = %args.config.display(), "Anime search starting");

    if let Command::InitConfig = args.command {
        config
            .save(&args.config)
            .with_context(|| format!("Failed to write config to {}", args.config.display()))?;
        println!("Wrote {}", args.config.display());
        return Ok(());
    }

    let client = Arc::new(
        JikanClient::from_config(&config.catalog).context("Failed to create Jikan client")?,
    );

    match args.command {
        Command::Search {
            query,
            page,
            genres,
            sort,
            view,
        } => {
            let mut result_view = ResultView {
                sort,
                view_mode: view,
                ..ResultView::default()
            };
            for genre in &genres {
                result_view.toggle_genre(genre);
            }
            run_search(client, &config, &query, page, &result_view).await
        }
        Command::Detail { id } => run_detail(client, id).await,
        Command::Top { limit } => {
            let limit = limit.unwrap_or(config.recommendations.limit);
            let items = recommendations(client.as_ref(), limit)
                .await
                .context("Failed to load top anime")?;
            let refs: Vec<&AnimeSummary> = items.iter().collect();
            render_results(&refs, ViewMode::List);
            Ok(())
        }
        Command::Random => {
            let mut picker = RandomPicker::new(client, PickSettings::from(&config.random));
            let anime = picker.pick().await?;
            render_results(&[&anime], ViewMode::List);
            Ok(())
        }
        Command::Interactive => run_interactive(client, &config).await,
        Command::InitConfig => Ok(()),
    }
}

async fn run_search(
    client: Arc<JikanClient>,
    config: &Config,
    query: &str,
    page: u32,
    view: &ResultView,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Search query must not be empty");
    }

    let mut session = SearchSession::new(client, config.debounce(), config.catalog.page_size);
    session.set_query(query);
    session.set_page(page)?;
    session.run_until_idle().await;

    let state = session.state();
    if let Some(error) = &state.error {
        bail!("{error}");
    }
    render_session(&state.results, state.pagination.as_ref(), view);
    Ok(())
}

async fn run_detail(client: Arc<JikanClient>, id: u32) -> Result<()> {
    let mut detail = DetailView::new(client);
    detail.open(id).await;

    match detail.state() {
        DetailState::Loaded(anime) => {
            render_detail(anime);
            Ok(())
        }
        DetailState::NotFound(id) => bail!("Anime {id} not found"),
        DetailState::Failed { message, .. } => bail!("{message}"),
        DetailState::Idle | DetailState::Loading(_) => Ok(()),
    }
}

async fn run_interactive(client: Arc<JikanClient>, config: &Config) -> Result<()> {
    let mut session =
        SearchSession::new(Arc::clone(&client), config.debounce(), config.catalog.page_size);
    let mut detail = DetailView::new(Arc::clone(&client));
    let mut picker = RandomPicker::new(Arc::clone(&client), PickSettings::from(&config.random));
    let mut view = ResultView::default();

    match recommendations(client.as_ref(), config.recommendations.limit).await {
        Ok(items) => {
            println!("Recommended:");
            let refs: Vec<&AnimeSummary> = items.iter().collect();
            render_results(&refs, view.view_mode);
        }
        Err(e) => warn!(error = %e, "Failed to load recommendations"),
    }
    println!("Type to search, :help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                let line = line.trim_end();

                match line.strip_prefix(':') {
                    Some(command) => {
                        let keep_going = handle_command(
                            command.trim(),
                            &mut session,
                            &mut detail,
                            &mut picker,
                            &mut view,
                        )
                        .await;
                        if !keep_going {
                            break;
                        }
                    }
                    None => {
                        let suggestions = title_suggestions(&session.state().results, line.trim());
                        if !suggestions.is_empty() {
                            println!("Suggestions: {}", suggestions.join(" | "));
                        }
                        session.set_query(line);
                    }
                }
            }
            Some(update) = session.step(), if !session.is_idle() => {
                match update {
                    SessionUpdate::Issued(request) => {
                        println!("Searching \"{}\" (page {})...", request.query, request.page);
                    }
                    SessionUpdate::Applied { corrected_page, .. } => {
                        if let Some(page) = corrected_page {
                            println!("Showing page {page}");
                        }
                        let state = session.state();
                        render_session(&state.results, state.pagination.as_ref(), &view);
                    }
                    SessionUpdate::Failed(message) => println!("Error: {message}"),
                    SessionUpdate::Discarded(_) => {}
                }
            }
        }
    }

    session.close();
    info!("Interactive session ended");
    Ok(())
}

/// Handle one `:command` line. Returns false to quit.
async fn handle_command(
    command: &str,
    session: &mut SearchSession<JikanClient>,
    detail: &mut DetailView<JikanClient>,
    picker: &mut RandomPicker<JikanClient>,
    view: &mut ResultView,
) -> bool {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "q" | "quit" => return false,
        "page" => match arg.parse::<u32>() {
            Ok(n) => {
                if let Err(e) = session.set_page(n) {
                    println!("{e}");
                }
            }
            Err(_) => println!("Usage: :page N"),
        },
        "next" => {
            if !session.next_page() {
                println!("Already on the last page");
            }
        }
        "prev" => {
            if !session.prev_page() {
                println!("Already on the first page");
            }
        }
        "sort" => match arg.parse::<SortKey>() {
            Ok(sort) => {
                view.sort = sort;
                rerender(session, view);
            }
            Err(e) => println!("{e}"),
        },
        "genre" => {
            if arg.is_empty() {
                println!("Genres: {}", available_genres(&session.state().results).join(", "));
            } else {
                view.toggle_genre(arg);
                rerender(session, view);
            }
        }
        "view" => match arg.parse::<ViewMode>() {
            Ok(mode) => {
                view.view_mode = mode;
                rerender(session, view);
            }
            Err(e) => println!("{e}"),
        },
        "clear" => {
            session.clear();
            view.reset_filters();
            detail.close();
            println!("Cleared");
        }
        "open" => match arg.parse::<u32>() {
            Ok(id) => {
                detail.open(id).await;
                match detail.state() {
                    DetailState::Loaded(anime) => render_detail(anime),
                    DetailState::NotFound(id) => println!("Anime {id} not found"),
                    DetailState::Failed { message, .. } => println!("Error: {message}"),
                    DetailState::Idle | DetailState::Loading(_) => {}
                }
            }
            Err(_) => println!("Usage: :open ID"),
        },
        "random" => match picker.pick().await {
            Ok(anime) => render_results(&[&anime], ViewMode::List),
            Err(e) => println!("{e}"),
        },
        "help" => print_help(),
        other => println!("Unknown command :{other}, try :help"),
    }
    true
}

fn print_help() {
    println!(":page N        go to page N");
    println!(":next / :prev  step through pages");
    println!(":sort KEY      {}", SortKey::ALL.map(|k| k.as_str()).join(", "));
    println!(":genre [NAME]  toggle a genre filter, or list genres");
    println!(":view MODE     grid or list");
    println!(":clear         reset search and filters");
    println!(":open ID       show details");
    println!(":random        pick a random title");
    println!(":quit");
}

fn rerender(session: &SearchSession<JikanClient>, view: &ResultView) {
    let state = session.state();
    if !state.results.is_empty() {
        render_session(&state.results, state.pagination.as_ref(), view);
    }
}

fn render_session(results: &[AnimeSummary], pagination: Option<&PaginationInfo>, view: &ResultView) {
    if results.is_empty() {
        println!("No results");
        return;
    }

    let shown = view.apply(results);
    if shown.is_empty() {
        println!("No results match the selected genres");
    } else {
        render_results(&shown, view.view_mode);
    }

    if let Some(info) = pagination {
        println!("{}", PageRange::from_pagination(info));
        if shows_pagination(info) {
            println!("Page {} of {}", info.current_page, info.last_visible_page);
        }
    }
}

fn render_results(items: &[&AnimeSummary], mode: ViewMode) {
    match mode {
        ViewMode::Grid => {
            for row in items.chunks(3) {
                let cells: Vec<String> = row.iter().map(|a| grid_cell(a)).collect();
                println!("{}", cells.join("  "));
            }
        }
        ViewMode::List => {
            for anime in items {
                println!(
                    "[{}] {}  {}  {}  {} eps",
                    anime.id,
                    anime.title,
                    format_score(anime.score),
                    anime.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
                    anime.episodes.map(|e| e.to_string()).unwrap_or_else(|| "?".to_string()),
                );
                let genres: Vec<&str> = anime.genres.iter().map(|g| g.name.as_str()).collect();
                if !genres.is_empty() {
                    println!("    {}", genres.join(", "));
                }
                if let Some(synopsis) = &anime.synopsis {
                    println!("    {}", truncate(synopsis, 160));
                }
            }
        }
    }
}

fn grid_cell(anime: &AnimeSummary) -> String {
    let label = format!("[{}] {}", anime.id, anime.title);
    format!("{:<36} {:>5}", truncate(&label, 36), format_score(anime.score))
}

fn render_detail(anime: &AnimeDetail) {
    let summary = &anime.summary;
    println!("{}", summary.title);
    if let Some(english) = &summary.title_english {
        println!("  English:    {english}");
    }
    if let Some(japanese) = &summary.title_japanese {
        println!("  Japanese:   {japanese}");
    }

    let field = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            println!("  {label:<11} {value}");
        }
    };
    field("Type:", anime.anime_type.clone());
    field("Episodes:", summary.episodes.map(|e| e.to_string()));
    field("Status:", anime.status.clone());
    field("Aired:", summary.aired.display.clone());
    field("Season:", anime.season.clone());
    field("Source:", anime.source.clone());
    field("Duration:", anime.duration.clone());
    field("Rating:", anime.rating.clone());
    field("Score:", summary.score.map(|s| format!("{s:.2}")));
    field("Ranked:", anime.rank.map(|r| format!("#{r}")));
    field("Popularity:", anime.popularity.map(|p| format!("#{p}")));
    field("Members:", anime.members.map(|m| m.to_string()));
    field("Genres:", join_names(summary.genres.iter().map(|g| g.name.as_str())));
    field("Themes:", join_names(anime.themes.iter().map(|g| g.name.as_str())));
    field("Studios:", join_names(summary.studios.iter().map(|s| s.name.as_str())));
    field("Image:", best_image_url(&summary.images, true));
    field("URL:", summary.url.clone());

    if let Some(synopsis) = &summary.synopsis {
        println!();
        println!("{synopsis}");
    }
    if let Some(background) = &anime.background {
        println!();
        println!("{background}");
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
    let names: Vec<&str> = names.collect();
    (!names.is_empty()).then(|| names.join(", "))
}

fn format_score(score: Option<f64>) -> String {
    score
        .map(|s| format!("★{s:.2}"))
        .unwrap_or_else(|| "N/A".to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}
