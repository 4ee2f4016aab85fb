use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use playforge::eval::material::MaterialNetwork;
use playforge::eval::Network;
use playforge::openings::{builtin_openings, load_openings, Opening};
use playforge::selfplay::ValueSelfPlayGames;
use playforge::tree::GameResult;

#[derive(Parser, Debug)]
#[command(name = "playforge-selfplay", about = "Generate self-play games with batched value lookahead")]
struct Args {
    #[arg(long, default_value_t = 100)]
    games: usize,
    /// Games advanced together per batched evaluation run.
    #[arg(long, default_value_t = 32)]
    batch_size: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// FEN/EPD file of starting positions; the built-in book otherwise.
    #[arg(long)]
    openings: Option<PathBuf>,
    #[arg(long, default_value = "out/selfplay")]
    out: PathBuf,
    /// Write a JSON run summary next to the game records.
    #[arg(long, default_value_t = false)]
    summary: bool,
}

#[derive(Debug, Default, Serialize)]
struct RunSummary {
    games: usize,
    white_wins: usize,
    black_wins: usize,
    draws: usize,
    undecided: usize,
}

#[derive(Debug, Serialize)]
struct GameLine {
    result: &'static str,
    moves: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let openings = match &args.openings {
        Some(path) => {
            let loaded = load_openings(path)?;
            anyhow::ensure!(!loaded.is_empty(), "no openings in {}", path.display());
            loaded
        }
        None => builtin_openings(),
    };
    info!("{} openings, {} games, batch size {}", openings.len(), args.games, args.batch_size);

    std::fs::create_dir_all(&args.out)?;
    let games_path = args.out.join("games.jsonl");
    let mut games_out = std::io::BufWriter::new(std::fs::File::create(&games_path)?);

    let white: Arc<dyn Network> = Arc::new(MaterialNetwork::default());
    let black: Arc<dyn Network> = Arc::new(MaterialNetwork::default());

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let mut summary = RunSummary::default();
    let pb = ProgressBar::new(args.games as u64);
    pb.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} games ({eta})",
    )?);

    let mut remaining = args.games;
    while remaining > 0 {
        let batch = remaining.min(args.batch_size.max(1));
        let picks: Vec<Opening> = (0..batch)
            .map(|_| openings[rng.gen_range(0..openings.len())].clone())
            .collect();
        let mut games =
            ValueSelfPlayGames::new(white.clone(), black.clone(), &picks, None)?;
        games.play();

        for (i, result) in games.results().iter().enumerate() {
            match result {
                GameResult::WhiteWon => summary.white_wins += 1,
                GameResult::BlackWon => summary.black_wins += 1,
                GameResult::Draw => summary.draws += 1,
                GameResult::Undecided => summary.undecided += 1,
            }
            let line = GameLine { result: result.as_pgn(), moves: games.game_moves(i) };
            serde_json::to_writer(&mut games_out, &line)?;
            std::io::Write::write_all(&mut games_out, b"\n")?;
        }
        summary.games += batch;
        remaining -= batch;
        pb.inc(batch as u64);
    }
    pb.finish();
    std::io::Write::flush(&mut games_out)?;

    info!(
        "done: +{} -{} ={} (undecided {})",
        summary.white_wins, summary.black_wins, summary.draws, summary.undecided
    );
    eprintln!(
        "Wrote {} games to {} (W {} / B {} / D {})",
        summary.games,
        games_path.display(),
        summary.white_wins,
        summary.black_wins,
        summary.draws
    );
    if args.summary {
        let path = args.out.join("summary.json");
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        eprintln!("Summary at {}", path.display());
    }
    Ok(())
}
