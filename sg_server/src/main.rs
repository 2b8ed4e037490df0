//! Runs a Set game in the terminal.
//!
//! Human seats take moves from stdin; computer seats play on their own.

mod config;
mod display;
mod input;

use std::{io::BufRead, sync::Arc, thread};

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use set_game::{DisplaySink, GameHandle, LogDisplay, PlayerSession, ShutdownTrigger};

use config::{Overrides, ServerConfig};
use display::JsonLinesDisplay;
use input::{Command, parse_command};

const HELP: &str = "\
Run a Set card game with human and computer seats

USAGE:
  sg_server [OPTIONS]

OPTIONS:
  --humans     N           Number of human seats      [default: env SET_HUMAN_PLAYERS or 0]
  --bots       N           Number of computer seats   [default: env SET_COMPUTER_PLAYERS or 2]
  --timeout-ms MILLIS      Turn timeout, 0 for a stopwatch  [default: env SET_TURN_TIMEOUT_MILLIS or 60000]

FLAGS:
  --json                   Print display events as JSON lines
  --hints                  Log the sets on the table after every deal
  -h, --help               Print help information

INPUT:
  <seat> <slot>            Toggle a human seat's selection of a slot
  q                        Quit

ENVIRONMENT:
  SET_FEATURE_SIZE, SET_FEATURE_COUNT, SET_ROWS, SET_COLUMNS, SET_DECK_SIZE,
  SET_POINT_FREEZE_MILLIS, SET_PENALTY_FREEZE_MILLIS, SET_TABLE_DELAY_MILLIS,
  SET_TURN_TIMEOUT_WARNING_MILLIS, SET_HINTS
  (See .env file for all configuration options)
";

fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let json = pargs.contains("--json");
    let overrides = Overrides {
        humans: pargs.opt_value_from_str("--humans")?,
        bots: pargs.opt_value_from_str("--bots")?,
        timeout_ms: pargs.opt_value_from_str("--timeout-ms")?,
        hints: pargs.contains("--hints"),
    };
    let config = ServerConfig::from_env(overrides, json)?;

    env_logger::builder().format_target(false).init();
    info!(
        "Starting a game with {} human and {} computer seat(s) on a {}x{} grid",
        config.game.human_players,
        config.game.computer_players,
        config.game.rows,
        config.game.columns
    );

    let display: Arc<dyn DisplaySink> = if config.json {
        Arc::new(JsonLinesDisplay)
    } else {
        Arc::new(LogDisplay)
    };
    let mut game = GameHandle::start(config.game.clone(), display)?;

    // Catching signals for exit.
    let trigger = game.shutdown_trigger();
    set_handler(move || trigger.trigger())?;

    if config.game.human_players > 0 {
        let sessions = game.sessions().to_vec();
        let trigger = game.shutdown_trigger();
        thread::Builder::new()
            .name("stdin".to_string())
            .spawn(move || read_moves(&sessions, &trigger))?;
    }

    let outcome = game.join()?;

    let winners: Vec<String> = outcome.winners.iter().map(ToString::to_string).collect();
    println!("Winner(s): seat {}", winners.join(", seat "));
    for (seat, score) in outcome.scores.iter().enumerate() {
        println!("  seat {seat}: {score}");
    }

    Ok(())
}

/// Forward typed moves to the sessions until stdin closes or the user quits
fn read_moves(sessions: &[Arc<PlayerSession>], trigger: &ShutdownTrigger) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Failed to read stdin: {e}");
                break;
            }
        };

        match parse_command(&line) {
            None => {}
            Some(Ok(Command::Quit)) => {
                trigger.trigger();
                return;
            }
            Some(Ok(Command::Toggle { seat, slot })) => match sessions.get(seat) {
                Some(session) if session.is_human() => {
                    if !session.toggle_move(slot) {
                        log::debug!("Seat {seat} cannot toggle slot {slot} right now");
                    }
                }
                Some(_) => log::warn!("Seat {seat} is played by the computer"),
                None => log::warn!("Unknown seat: {seat}"),
            },
            Some(Err(e)) => log::warn!("{e}"),
        }
    }
}
