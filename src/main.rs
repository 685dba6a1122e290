use kb_minigames::games;
use std::env;

fn main()
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String>
{
    let mut args = env::args().skip(1);
    let command = args.next();
    let rest: Vec<String> = args.collect();
    match command.as_deref() {
        None => interactive_menu(),
        Some("list") => {
            list_games();
            Ok(())
        }
        Some("simon") => run_game("simon", &rest),
        Some("trivia") => run_game("trivia", &rest),
        Some("-h") | Some("--help") => {
            print_help();
            Ok(())
        }
        Some(other) => Err(format!("Unknown command '{other}'. Run with --help.")),
    }
}

fn run_game(name: &str, args: &[String]) -> Result<(), String>
{
    log::info!("starting {name}");
    match name {
        "simon" => {
            let config = games::simon::SimonConfig::from_args(args)?;
            games::simon::run_with_config(config)
        }
        "trivia" => {
            let config = games::trivia::TriviaConfig::from_args(args)?;
            games::trivia::run_with_config(config)
        }
        _ => Err(format!("Unknown game '{name}'. Run with --help.")),
    }
}

fn interactive_menu() -> Result<(), String>
{
    let registry = games::registry();
    println!("KB Games");
    println!();
    println!("Select a game:");
    for (idx, game) in registry.iter().enumerate() {
        println!("  {}. {} - {}", idx + 1, game.name, game.description);
    }
    println!();

    let choice = games::term::prompt_line("Enter number or name (default 1, q to quit): ")?;

    if choice.is_empty() {
        return run_game(registry[0].name, &[]);
    }
    if choice.eq_ignore_ascii_case("q") {
        return Ok(());
    }
    if let Ok(index) = choice.parse::<usize>() {
        if index >= 1 && index <= registry.len() {
            return run_game(registry[index - 1].name, &[]);
        }
    }

    for game in registry {
        if game.name.eq_ignore_ascii_case(&choice) {
            return run_game(game.name, &[]);
        }
    }

    Err("Invalid selection.".to_string())
}

fn list_games()
{
    println!("Available games:");
    for game in games::registry() {
        println!("  {:<10} - {}", game.name, game.description);
    }
}

fn print_help()
{
    println!("kb-minigames");
    println!("\nUsage:");
    println!("  kb-minigames list");
    println!("  kb-minigames simon [--seed=N] [--mute]");
    println!(
        "  kb-minigames trivia [--amount=N] [--category=ID] [--difficulty=any|easy|medium|hard]"
    );
    println!("                      [--seed=N] [--no-save] [--mute]");
    println!("\nNotes:");
    println!("  Trivia questions come from https://opentdb.com (override with TRIVIA_API_URL).");
    println!("  The trivia high score is kept under the user data directory");
    println!("  (override with KB_MINIGAMES_DATA_DIR).");
    println!("  Set RUST_LOG=debug for engine traces on stderr.");
}
