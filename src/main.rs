use fog_shogi::*;
use std::error::Error;
use std::fs;
use tracing_subscriber::EnvFilter;

const MAX_PLIES: usize = 60;

fn load_config(path: &str) -> Result<SessionConfig, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Fog Shogi - self-play demo");
    println!("==========================\n");

    // Optional JSON config path as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => SessionConfig::default(),
    };

    let mut session = Session::new(config.clone());
    let human = session.human();

    // Stand-in for the human seat
    let mut driver = match config.seed {
        Some(seed) => RandomOpponent::seeded("Driver".to_string(), seed.wrapping_add(1)),
        None => RandomOpponent::new("Driver".to_string()),
    };

    println!("Human seat: {} (driven by {})", human, driver.name());
    println!("Opponent:   {}\n", session.opponent_name());

    while session.cursor() < MAX_PLIES {
        let Some(actions) = driver.choose_action(session.board(), human) else {
            println!("{} has no legal action", human);
            break;
        };
        println!("{} plays: {}", human, actions);
        match session.play(actions) {
            Ok(Outcome::Ongoing) => {}
            Ok(outcome) => {
                println!("Game over: {:?}", outcome);
                break;
            }
            Err(e) => {
                eprintln!("Rejected: {}", e);
                break;
            }
        }
    }

    println!("\nFinal board:");
    println!("{}", session.board().display_board());
    println!("As seen by {}:", human);
    println!("{}", session.board().display_for(session.fog(human)));
}
