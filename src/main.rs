//! # convoscope CLI
//!
//! Thin report wrapper over the convoscope library: ingest an export (or
//! reload its snapshot) and print the counters and rankings.

use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use convoscope::assemble::Assembled;
use convoscope::config::ReaderConfig;
use convoscope::reader::ConvoReader;
use convoscope::snapshot;
use convoscope::{ConvoscopeError, User};

#[derive(Debug, Parser)]
#[command(name = "convoscope", version, about = "Explore a personal messaging export")]
struct Args {
    /// Primary (Facebook) export root
    root: PathBuf,

    /// Display name of the corpus owner
    #[arg(long)]
    user: String,

    /// Secondary (Instagram) export root to merge in
    #[arg(long)]
    instagram_root: Option<PathBuf>,

    /// CSV of manual cross-platform folder pairs
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Cache directory for the ingestion snapshot
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Ignore any existing snapshot and re-ingest
    #[arg(long)]
    rebuild: bool,

    /// Rows per ranking table (0 = all)
    #[arg(long, default_value_t = 15)]
    top: usize,

    /// Exclude group chats from the rankings
    #[arg(long)]
    no_groupchats: bool,

    /// Per-speaker message floor for the character-ratio ranking
    #[arg(long, default_value_t = 200)]
    min_msgs: usize,

    /// Print a single conversation instead of the corpus rankings
    #[arg(long)]
    convo: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), ConvoscopeError> {
    let total_start = Instant::now();
    let args = Args::parse();

    println!("📦 convoscope v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("👤 User:    {}", args.user);
    println!("📂 Export:  {}", args.root.display());
    if let Some(ref ig) = args.instagram_root {
        println!("📂 Merged:  {}", ig.display());
    }
    println!();

    let mut config = ReaderConfig::new(&args.user, &args.root);
    if let Some(ref ig) = args.instagram_root {
        config = config.with_secondary_root(ig);
    }
    if let Some(ref overrides) = args.overrides {
        config = config.with_overrides(overrides);
    }

    if let Some(ref name) = args.convo {
        return print_single(&config, name);
    }

    let reader = ConvoReader::new(config);
    let user = match (&args.cache_dir, args.rebuild) {
        (Some(cache_dir), false) => {
            snapshot::load_or_rebuild(cache_dir, || reader.read_corpus())?
        }
        (Some(cache_dir), true) => {
            println!("⏳ Rebuilding (snapshot ignored)...");
            let user = reader.read_corpus()?;
            snapshot::save(&user, cache_dir)?;
            user
        }
        (None, _) => reader.read_corpus()?,
    };

    print_summary(&user);
    print_rankings(&user, &args);

    println!();
    println!("⚡ Done in {:.2}s", total_start.elapsed().as_secs_f64());
    Ok(())
}

fn print_single(config: &ReaderConfig, name: &str) -> Result<(), ConvoscopeError> {
    let reader = ConvoReader::new(config.clone());
    match reader.read_single(name)? {
        Assembled::Convo(convo) => {
            println!("{convo}");
            println!("Messages by hour of day:");
            let table = convo.msg_counts_by_hour();
            println!("      {}", table.senders.join("  "));
            for hour in 0..24 {
                let row: Vec<String> =
                    table.row(hour).iter().map(|c| c.to_string()).collect();
                println!("{hour:>2}:00 {}", row.join("  "));
            }
            Ok(())
        }
        Assembled::Empty => {
            println!("Conversation '{name}' holds no real exchange");
            Ok(())
        }
    }
}

fn print_summary(user: &User) {
    let counters = &user.counters;
    println!("📊 Summary:");
    println!("   Conversations:  {}", user.convos.len());
    println!("   Persons:        {}", user.persons.len());
    println!("   Empty convos:   {}", counters.empty_convos);
    println!("   Failed convos:  {}", counters.failed_convos);
    println!("   Failed shards:  {}", counters.failed_shards);
    println!("   Deleted-account msgs: {}", counters.depersonalized_msgs);
    println!("   Synthesized titles:   {}", counters.blank_titles);
}

fn print_rankings(user: &User, args: &Args) {
    println!();
    println!("🏆 By message count:");
    for (title, count) in user.ranked_by_msg_count(args.top, args.no_groupchats) {
        println!("   {count:>8}  {title}");
    }

    println!();
    println!("⚖️  By character-dominance ratio (low = you dominate):");
    for (title, ratio) in
        user.ranked_by_char_ratio(false, args.top, args.no_groupchats, args.min_msgs)
    {
        println!("   {ratio:>8.3}  {title}");
    }
}
