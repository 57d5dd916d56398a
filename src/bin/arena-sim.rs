//! Arena Simulator
//!
//! Runs the matchmaking and duel engine in-process with scripted players and
//! reports the results. Every player queues once, answers each question after
//! a random latency with its own accuracy, and leaves after GAME_OVER.
//!
//! Usage:
//!   cargo run --bin arena-sim -- --players 10
//!   cargo run --bin arena-sim -- --players 7 --round-seconds 3 --seed 42

use anyhow::{anyhow, Result};
use clap::Parser;
use quiz_arena::config::AppConfig;
use quiz_arena::protocol::{ClientMessage, ServerMessage, Winner};
use quiz_arena::questions::{QuestionSupplier, StaticQuestionBank};
use quiz_arena::rating::{InMemoryPlayerStore, RatingRules};
use quiz_arena::service::ServiceContext;
use quiz_arena::types::PlayerProfile;
use quiz_arena::utils::wrong_option_labels;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "arena-sim")]
#[command(about = "Drive the quiz-arena engine in-process with scripted players")]
struct Cli {
    /// Number of scripted players
    #[arg(short, long, default_value = "10")]
    players: usize,

    /// Round timeout in seconds
    #[arg(long, default_value = "4")]
    round_seconds: u64,

    /// Questions per game
    #[arg(long, default_value = "5")]
    questions: usize,

    /// Seed for player behavior and bot answers
    #[arg(long)]
    seed: Option<u64>,

    /// Disable bot fallback; odd players out then never finish
    #[arg(long)]
    no_bot_fallback: bool,

    /// Give up after this many seconds
    #[arg(long, default_value = "300")]
    deadline: u64,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// How a scripted player behaves
#[derive(Debug, Clone)]
struct Script {
    accuracy: f64,
    min_latency_ms: u64,
    max_latency_ms: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    wins: u32,
    losses: u32,
    draws: u32,
    abandoned: u32,
}

fn simulation_config(cli: &Cli) -> AppConfig {
    let mut config = AppConfig::default();
    config.duel.questions_per_game = cli.questions;
    config.duel.round_timeout_seconds = cli.round_seconds;
    config.duel.result_view_seconds = 1;
    config.duel.start_delay_ms = 200;
    config.matchmaking.scan_interval_ms = 250;
    config.matchmaking.widen_after_seconds = 2;
    config.matchmaking.bot_after_seconds = 4;
    config.matchmaking.enable_bot_fallback = !cli.no_bot_fallback;
    let round_ms = cli.round_seconds * 1000;
    config.bot.min_delay_ms = (round_ms / 4).max(1);
    config.bot.max_delay_ms = (round_ms * 3 / 4).max(config.bot.min_delay_ms);
    config.bot.seed = cli.seed;
    config
}

async fn play(
    context: ServiceContext,
    profile: PlayerProfile,
    script: Script,
    answers: Arc<HashMap<String, String>>,
    seed: u64,
) -> Result<(String, Option<Winner>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let player_id = profile.id.clone();
    let (connection, mut inbox) = context.router.connect(profile);

    let send = |message: ClientMessage| {
        let context = context.clone();
        async move {
            let text = serde_json::to_string(&message)?;
            context.router.handle_text(connection, &text).await;
            Ok::<_, anyhow::Error>(())
        }
    };

    send(ClientMessage::Match).await?;

    let mut result = None;
    while let Some(message) = inbox.recv().await {
        match message {
            ServerMessage::MatchSuccess(matched) => {
                debug!("{} matched against {}", player_id, matched.opponent.name);
            }
            ServerMessage::Question(question) => {
                let correct = answers
                    .get(&question.content)
                    .ok_or_else(|| anyhow!("Unknown question: {}", question.content))?;
                let answer = if rng.gen_bool(script.accuracy) {
                    correct.clone()
                } else {
                    wrong_option_labels(question.options.len(), correct)
                        .choose(&mut rng)
                        .cloned()
                        .unwrap_or_else(|| correct.clone())
                };
                let latency = rng.gen_range(script.min_latency_ms..=script.max_latency_ms);
                tokio::time::sleep(Duration::from_millis(latency)).await;
                send(ClientMessage::Answer(answer)).await?;
            }
            ServerMessage::GameOver(over) => {
                result = Some(over.result);
                break;
            }
            ServerMessage::OpponentLeft => break,
            _ => {}
        }
    }

    context.router.handle_disconnect(connection).await;
    Ok((player_id, result))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.as_str().into()),
        )
        .with_target(false)
        .init();

    let config = simulation_config(&cli);
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let bank = match cli.seed {
        Some(seed) => {
            StaticQuestionBank::with_seed(StaticQuestionBank::builtin().questions().to_vec(), seed)
        }
        None => StaticQuestionBank::builtin(),
    };
    let answers: Arc<HashMap<String, String>> = Arc::new(
        bank.questions()
            .iter()
            .map(|q| (q.content.clone(), q.answer.clone()))
            .collect(),
    );
    let supplier: Arc<dyn QuestionSupplier> = Arc::new(bank);

    let store = Arc::new(InMemoryPlayerStore::new(RatingRules::new(config.rating.clone())));
    let mut roster = Vec::with_capacity(cli.players);
    for index in 0..cli.players {
        let profile = PlayerProfile {
            id: format!("sim-{:03}", index),
            name: format!("Player {}", index + 1),
            avatar: None,
            rating_points: rng.gen_range(0..800),
        };
        store.insert_player(profile.clone(), format!("token-{}", index))?;
        roster.push(profile);
    }

    let context = ServiceContext::build(&config, supplier, store.clone(), store.clone())?;
    context.set_running(true).await;
    let scan = context.matchmaking.start_scan_task();

    println!(
        "🎮 Simulating {} players, {} rounds of {}s",
        cli.players, cli.questions, cli.round_seconds
    );

    let mut games = JoinSet::new();
    for profile in roster.iter().cloned() {
        let script = Script {
            accuracy: rng.gen_range(0.3..0.95),
            min_latency_ms: 200,
            max_latency_ms: (cli.round_seconds * 1000).saturating_sub(200).max(200),
        };
        let seed: u64 = rng.gen();
        // stagger arrivals so the scan sees players with different wait times
        let arrival = Duration::from_millis(rng.gen_range(0..1500));
        let context = context.clone();
        let answers = answers.clone();
        games.spawn(async move {
            tokio::time::sleep(arrival).await;
            play(context, profile, script, answers, seed).await
        });
    }

    let mut tally = Tally::default();
    let deadline = tokio::time::sleep(Duration::from_secs(cli.deadline));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            joined = games.join_next() => match joined {
                Some(Ok(Ok((player_id, result)))) => {
                    info!("{} finished: {:?}", player_id, result);
                    match result {
                        Some(Winner::You) => tally.wins += 1,
                        Some(Winner::Opponent) => tally.losses += 1,
                        Some(Winner::Draw) => tally.draws += 1,
                        None => tally.abandoned += 1,
                    }
                }
                Some(Ok(Err(e))) => warn!("Scripted player failed: {}", e),
                Some(Err(e)) => warn!("Scripted player panicked: {}", e),
                None => break,
            },
            _ = &mut deadline => {
                warn!("Deadline reached with {} players still playing", games.len());
                games.abort_all();
                break;
            }
        }
    }

    scan.abort();
    // let in-flight settlements land
    tokio::time::sleep(Duration::from_millis(200)).await;
    context.arena.shutdown().await;

    let stats = context.matchmaking.get_stats()?;
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Games: {} human, {} bot",
        stats.human_matches, stats.bot_matches
    );
    println!(
        "Results: {} wins, {} losses, {} draws, {} unfinished",
        tally.wins, tally.losses, tally.draws, tally.abandoned
    );
    println!("Final ratings:");
    let mut players = store.all_players()?;
    players.sort_by(|a, b| b.rating_points.cmp(&a.rating_points));
    let starting: HashMap<_, _> = roster
        .iter()
        .map(|p| (p.id.clone(), p.rating_points))
        .collect();
    for player in players {
        let before = starting.get(&player.id).copied().unwrap_or_default();
        println!(
            "   {:<10} {:>5} ({:+})",
            player.name,
            player.rating_points,
            i64::from(player.rating_points) - i64::from(before)
        );
    }

    Ok(())
}
