use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tgcm::channel::{self, ChannelMeta, ChannelPaths};
use tgcm::index::{self, FetchedPost};
use tgcm::keywords::extract_keywords;
use tgcm::queue::{self, Diagnostic, QueueReport};
use tgcm::{Config, MatchResult, Matcher};

type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// tgcm - Channel workspace manager: duplicate checks and content-queue validation
#[derive(Parser)]
#[command(name = "tgcm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace directory holding `tgcm/`
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Config file path
    #[arg(short, long, global = true, default_value = ".tgcm.toml")]
    config: PathBuf,

    /// Quiet mode - only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new channel workspace
    Init {
        /// Channel name (lowercase letters, digits, '-' and '_')
        name: String,
    },

    /// List channels in the workspace
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bind a channel to its platform channel id
    Bind {
        name: String,

        /// Platform channel id, e.g. -1001234567890
        #[arg(allow_hyphen_values = true)]
        channel_id: String,
    },

    /// Add a published post to the channel index
    Add {
        channel: String,
        msg_id: i64,

        /// Post topic
        #[arg(short, long)]
        topic: String,

        /// Links contained in the post
        #[arg(short, long, num_args = 1..)]
        links: Vec<String>,

        /// Keywords (derived from the topic when omitted)
        #[arg(short, long, num_args = 1..)]
        keywords: Vec<String>,
    },

    /// Check a candidate post for duplicates before publishing
    Check {
        channel: String,

        /// Candidate topic
        #[arg(short, long)]
        topic: Option<String>,

        /// Candidate links
        #[arg(short, long, num_args = 1..)]
        links: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import fetched posts (JSON array of {msgId, text, links}) into the index
    Import {
        channel: String,
        file: PathBuf,

        /// Report what would be added without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show how to rebuild a channel index from its history
    Rebuild {
        channel: String,

        /// Platform channel id
        #[arg(long, allow_hyphen_values = true)]
        channel_id: Option<String>,
    },

    /// Validate the content queue and reconcile it with the index
    Validate {
        channel: String,

        /// Rewrite Status of already-published posts
        #[arg(long)]
        fix: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    tgcm::logging::init(cli.quiet);

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    };
    let ws = cli.workspace.as_path();

    let result = match cli.command {
        Commands::Init { name } => cmd_init(ws, &name),
        Commands::List { json } => cmd_list(ws, json),
        Commands::Bind { name, channel_id } => cmd_bind(ws, &name, &channel_id),
        Commands::Add { channel, msg_id, topic, links, keywords } => {
            cmd_add(ws, &channel, msg_id, &topic, links, keywords)
        }
        Commands::Check { channel, topic, links, json } => {
            cmd_check(ws, &config, &channel, topic.as_deref(), &links, json)
        }
        Commands::Import { channel, file, dry_run } => cmd_import(ws, &channel, &file, dry_run),
        Commands::Rebuild { channel, channel_id } => cmd_rebuild(ws, &channel, channel_id.as_deref()),
        Commands::Validate { channel, fix, json } => cmd_validate(ws, &config, &channel, fix, json),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn cmd_init(ws: &Path, name: &str) -> CmdResult<i32> {
    let paths = channel::init_channel(ws, name)?;
    println!("{} {}", "Created channel".green().bold(), name.cyan());
    println!("  {}", paths.dir.display());
    Ok(0)
}

fn cmd_list(ws: &Path, json: bool) -> CmdResult<i32> {
    let channels = channel::list_channels(ws);

    if json {
        println!("{}", serde_json::to_string_pretty(&channels)?);
        return Ok(0);
    }

    if channels.is_empty() {
        println!("{}", "No channels. Create one with `tgcm init <name>`.".dimmed());
        return Ok(0);
    }

    println!("{}", "Channels".green().bold());
    for meta in &channels {
        let status = match meta.status.as_str() {
            "connected" => meta.status.green(),
            _ => meta.status.yellow(),
        };
        println!(
            "  {} [{}] {}",
            meta.name.cyan(),
            status,
            meta.channel_id.as_deref().unwrap_or("-").dimmed()
        );
    }
    Ok(0)
}

fn cmd_bind(ws: &Path, name: &str, channel_id: &str) -> CmdResult<i32> {
    let meta = channel::bind_channel(ws, name, channel_id)?;
    println!(
        "{} {} -> {}",
        "Bound".green().bold(),
        meta.name.cyan(),
        channel_id
    );
    Ok(0)
}

fn cmd_add(
    ws: &Path,
    name: &str,
    msg_id: i64,
    topic: &str,
    links: Vec<String>,
    keywords: Vec<String>,
) -> CmdResult<i32> {
    let paths = ChannelPaths::existing(ws, name)?;
    let keywords = if keywords.is_empty() { None } else { Some(keywords) };

    if index::add_post(&paths.index, msg_id, topic, Some(links), keywords)? {
        println!("{} {}", "Added post".green(), msg_id);
    } else {
        println!("{} {} {}", "Post".yellow(), msg_id, "already in index".yellow());
    }
    Ok(0)
}

fn cmd_check(
    ws: &Path,
    config: &Config,
    name: &str,
    topic: Option<&str>,
    links: &[String],
    json: bool,
) -> CmdResult<i32> {
    let topic = topic.filter(|t| !t.trim().is_empty());
    if topic.is_none() && links.is_empty() {
        eprintln!("{}", "Nothing to check: provide --topic and/or --links".yellow());
        return Ok(1);
    }

    let paths = ChannelPaths::existing(ws, name)?;
    let start = Instant::now();
    let index = index::load_index(&paths.index);
    let matcher = Matcher::new(config.matching.clone());

    let link_matches = matcher.check_links(links, &index);
    let topic_matches = topic
        .map(|t| matcher.check_topic(t, &index))
        .unwrap_or_default();
    let elapsed = start.elapsed();

    if config.perf.enabled {
        let topic_words = topic.map(|t| extract_keywords(t).len()).unwrap_or(0);
        let line = format!(
            "check links={} topic_words={} matches={}",
            links.len(),
            topic_words,
            link_matches.len() + topic_matches.len()
        );
        if let Err(e) = channel::append_perf_line(&paths, &line, elapsed.as_millis()) {
            tracing::warn!("could not write perf log: {}", e);
        }
    }

    if json {
        let output = serde_json::json!({
            "links": link_matches,
            "topic": topic_matches,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(0);
    }

    if link_matches.is_empty() && topic_matches.is_empty() {
        println!("{}", "No duplicates found".green());
        return Ok(0);
    }

    if !link_matches.is_empty() {
        println!("{} ({})", "Link matches".red().bold(), link_matches.len());
        for m in &link_matches {
            print_match(m);
        }
    }
    if !topic_matches.is_empty() {
        if !link_matches.is_empty() {
            println!();
        }
        println!("{} ({})", "Topic matches".yellow().bold(), topic_matches.len());
        for m in &topic_matches {
            print_match(m);
        }
    }
    Ok(0)
}

fn print_match(m: &MatchResult) {
    println!(
        "  {} {} {}",
        format!("msg {}", m.msg_id).cyan(),
        format!("{:.0}%", m.score * 100.0).yellow(),
        m.topic
    );
    if let Some(link) = &m.link {
        println!("    {} {}", "link:".dimmed(), link);
    }
    if !m.overlap.is_empty() {
        println!("    {} {}", "shared:".dimmed(), m.overlap.join(", "));
    }
}

fn cmd_import(ws: &Path, name: &str, file: &Path, dry_run: bool) -> CmdResult<i32> {
    let paths = ChannelPaths::existing(ws, name)?;
    let content = fs::read_to_string(file)?;
    let fetched: Vec<FetchedPost> = serde_json::from_str(&content)?;

    let summary = index::ingest_posts(&paths.index, &fetched, dry_run)?;
    let verb = if dry_run { "Would add" } else { "Added" };
    println!(
        "{} {} post(s), skipped {} already indexed",
        verb.green().bold(),
        summary.added,
        summary.skipped
    );
    Ok(0)
}

fn cmd_rebuild(ws: &Path, name: &str, channel_id: Option<&str>) -> CmdResult<i32> {
    let paths = ChannelPaths::existing(ws, name)?;
    let bound = ChannelMeta::load(&paths.meta).ok().and_then(|m| m.channel_id);
    let channel_id = channel_id.or(bound.as_deref());

    print!("{}", channel::rebuild_instructions(name, channel_id));
    Ok(0)
}

fn cmd_validate(ws: &Path, config: &Config, name: &str, fix: bool, json: bool) -> CmdResult<i32> {
    let paths = ChannelPaths::existing(ws, name)?;
    let matcher = Matcher::new(config.matching.clone());
    let report = queue::validate_channel_queue(&paths.dir, fix, &matcher)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.exit_code())
}

fn print_report(report: &QueueReport) {
    for d in &report.errors {
        println!("{} {}", "❌".red(), format_diagnostic(d).red());
    }
    for d in &report.warnings {
        println!("{}  {}", "⚠️".yellow(), format_diagnostic(d).yellow());
    }

    if report.fixed > 0 {
        println!("{} {} status line(s) set to published", "Fixed".green().bold(), report.fixed);
    }
    if !report.ok_posts.is_empty() {
        println!("{} {}", "✓ OK:".green(), format_ranges(&report.ok_posts));
    }

    let mut summary = format!(
        "{} post(s), {} error(s), {} warning(s)",
        report.posts,
        report.errors.len(),
        report.warnings.len()
    );
    if report.synced > 0 {
        summary.push_str(&format!(" (synced {} post(s) to index)", report.synced));
    }
    if report.errors.is_empty() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
}

fn format_diagnostic(d: &Diagnostic) -> String {
    format!("#{} (line {}): {}", d.post, d.line, d.message)
}

/// Collapse ascending post numbers into `#1–3, #5`
fn format_ranges(numbers: &[u64]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut iter = numbers.iter().copied();
    let Some(first) = iter.next() else {
        return String::new();
    };

    let (mut start, mut end) = (first, first);
    for n in iter {
        if n == end + 1 {
            end = n;
            continue;
        }
        parts.push(format_range(start, end));
        start = n;
        end = n;
    }
    parts.push(format_range(start, end));
    parts.join(", ")
}

fn format_range(start: u64, end: u64) -> String {
    if start == end {
        format!("#{}", start)
    } else {
        format!("#{}–{}", start, end)
    }
}
