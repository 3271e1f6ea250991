use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use flashcards::{
    logging::init_logging, Config, CreateFlashcardRequest, Difficulty, Filter, Flashcard,
    FlashcardApi, HttpFlashcardClient, SessionController, SessionError, Side,
    UpdateFlashcardRequest,
};

#[derive(Parser, Debug)]
#[command(name = "flashcards")]
#[command(about = "Terminal client for the flashcards server", long_about = None)]
#[command(
    after_help = "Environment: FLASHCARDS_API_URL (default http://localhost:3000), FLASHCARDS_TIMEOUT_SECS (default 10)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List flashcards, newest first
    #[command(alias = "ls")]
    List(FilterArgs),

    /// Ask the server for one category
    ByCategory { category: String },

    /// List categories in use
    Categories,

    /// Create a flashcard
    Add(CardArgs),

    /// Replace the text of a flashcard; an omitted category or difficulty is kept
    Edit {
        id: Uuid,

        #[command(flatten)]
        card: CardArgs,
    },

    /// Delete a flashcard
    #[command(alias = "rm")]
    Delete { id: Uuid },

    /// Count one review of a flashcard
    Review { id: Uuid },

    /// Walk through the filtered flashcards interactively
    Study(FilterArgs),
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Only cards in this category (exact match)
    #[arg(short, long)]
    category: Option<String>,

    /// Only cards of this difficulty (Easy, Medium, Hard)
    #[arg(short, long)]
    difficulty: Option<Difficulty>,
}

impl FilterArgs {
    fn into_filter(self) -> Filter {
        Filter::new(self.category, self.difficulty)
    }
}

/// Raw card fields; the session controller validates them before sending.
#[derive(Args, Debug)]
struct CardArgs {
    #[arg(short, long)]
    question: Option<String>,

    #[arg(short, long)]
    answer: Option<String>,

    #[arg(short, long)]
    category: Option<String>,

    #[arg(short, long)]
    difficulty: Option<String>,
}

impl From<CardArgs> for CreateFlashcardRequest {
    fn from(card: CardArgs) -> Self {
        Self {
            question: card.question,
            answer: card.answer,
            category: card.category,
            difficulty: card.difficulty,
        }
    }
}

impl From<CardArgs> for UpdateFlashcardRequest {
    fn from(card: CardArgs) -> Self {
        Self {
            question: card.question,
            answer: card.answer,
            category: card.category,
            difficulty: card.difficulty,
        }
    }
}

fn print_card(card: &Flashcard) {
    println!("{}  [{} | {} | {} reviews]", card.id, card.category, card.difficulty, card.review_count);
    println!("  Q: {}", card.question);
    println!("  A: {}", card.answer);
    println!(
        "  Created: {}  Last reviewed: {}",
        card.created_at.format("%Y-%m-%d"),
        card.last_reviewed.format("%Y-%m-%d")
    );
}

async fn study<A: FlashcardApi + 'static>(controller: &mut SessionController<A>) -> Result<(), SessionError> {
    let first = controller.start_study()?;
    println!("{}", first.question);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if let Some((position, total)) = controller.progress() {
            print!("[{}/{}] (f)lip, (n)ext, (q)uit > ", position, total);
            let _ = io::stdout().flush();
        }

        let Ok(Some(line)) = lines.next_line().await else { break };
        match line.trim() {
            "f" | "flip" => {
                controller.flip();
                if let Some(card) = controller.current_card() {
                    match controller.current_side() {
                        Some(Side::Back) => println!("{}", card.answer),
                        _ => println!("{}", card.question),
                    }
                }
            }
            "n" | "next" => {
                let Some(step) = controller.next() else { break };
                if step.completed() {
                    println!("Study session complete! Great job!");
                    break;
                }
                if let Some(card) = controller.current_card() {
                    println!("{}", card.question);
                }
            }
            "q" | "quit" => break,
            other => println!("Unknown input '{}'", other),
        }
    }

    controller.flush_reviews().await;
    Ok(())
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    let api = Arc::new(HttpFlashcardClient::new(&config.client)?);
    let mut controller = SessionController::new(Arc::clone(&api));

    match command {
        Commands::List(filter) => {
            controller.load().await?;
            controller.set_filter(filter.into_filter());
            let cards = controller.filtered();
            if cards.is_empty() {
                if controller.working_set().is_empty() {
                    println!("No flashcards found. Add your first flashcard to get started!");
                } else {
                    println!("No flashcards found. Try adjusting your filters.");
                }
            }
            for card in cards {
                print_card(card);
            }
        }
        Commands::ByCategory { category } => {
            for card in api.list_by_category(&category).await? {
                print_card(&card);
            }
        }
        Commands::Categories => {
            controller.load().await?;
            for category in controller.categories() {
                println!("{}", category);
            }
        }
        Commands::Add(card) => {
            let card = controller.create(card.into()).await?;
            println!("Flashcard created successfully!");
            print_card(&card);
        }
        Commands::Edit { id, card } => {
            let card = controller.update(id, card.into()).await?;
            println!("Flashcard updated successfully!");
            print_card(&card);
        }
        Commands::Delete { id } => {
            let message = controller.delete(id).await?;
            println!("{}", message);
        }
        Commands::Review { id } => {
            let card = api.increment_review(id).await?;
            print_card(&card);
        }
        Commands::Study(filter) => {
            controller.load().await?;
            controller.set_filter(filter.into_filter());
            study(&mut controller).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    // Terminal output belongs to the user; diagnostics go to the log file.
    config.logging.console_enabled = false;
    let _guard = init_logging(&config.logging, "flashcards-cli.log")?;
    config.validate()?;

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("flashcards").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_edit_takes_id_and_fields() {
        let id = Uuid::new_v4();
        let cli = parse(&["edit", &id.to_string(), "--question", "What?", "-d", "Hard"]).unwrap();
        let Commands::Edit { id: parsed, card } = cli.command else {
            panic!("expected edit");
        };
        assert_eq!(parsed, id);

        let request = UpdateFlashcardRequest::from(card);
        assert_eq!(request.question.as_deref(), Some("What?"));
        assert_eq!(request.difficulty.as_deref(), Some("Hard"));
        assert!(request.category.is_none());
    }

    #[test]
    fn test_rejects_bad_ids_and_dangling_options() {
        assert!(parse(&["delete", "not-a-uuid"]).is_err());
        assert!(parse(&["delete"]).is_err());
        assert!(parse(&["add", "--question"]).is_err());
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_filter_from_options() {
        let cli = parse(&["list", "--category", "Rust", "--difficulty", "Easy"]).unwrap();
        let Commands::List(filter) = cli.command else {
            panic!("expected list");
        };
        let filter = filter.into_filter();
        assert_eq!(filter.category(), Some("Rust"));
        assert_eq!(filter.difficulty(), Some(Difficulty::Easy));

        assert!(parse(&["study", "--difficulty", "Brutal"]).is_err());
        assert!(parse(&["study", "--difficulty", "easy"]).is_err());
    }
}
