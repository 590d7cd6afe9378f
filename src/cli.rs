//! Command-line front end.
//!
//! Stands in for the browser UI: an interactive chat loop plus one-shot
//! commands for points, quests, and pets.

use clap::{Parser, Subcommand};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{AppError, AppResult};
use crate::metrics::{self, PointsUpdate};
use crate::persona::Persona;
use crate::remote::catalog::{Pet, Quest, QuestProgress};
use crate::remote::{CatalogClient, ChatService, PointsService, QualityLevel};
use crate::session::ChatSession;
use crate::storage::{
    KeyValueStore, LAST_ACTIVITY_DATE_KEY, TOTAL_POINTS_KEY, TOTAL_QUESTIONS_KEY,
};
use crate::transcript::{Message, Origin};

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(name = "nandi", version, about = "Chat with Nandi companions, earn points, explore quests and wisdom pets")]
pub struct Cli {
    /// Command to run; defaults to `chat`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Chat interactively with a persona
    Chat {
        /// karma, dharma, or atma (defaults to NANDI_PERSONA)
        #[arg(long)]
        persona: Option<Persona>,
    },

    /// Show stored point totals
    Points,

    /// Clear stored point totals
    Reset,

    /// List quests, or show one quest with progress
    Quests {
        /// Quest to show
        #[arg(long)]
        id: Option<i64>,
    },

    /// Accept a quest
    AcceptQuest {
        /// Quest to accept
        id: i64,
    },

    /// Answer a quest question
    Answer {
        /// Quest the question belongs to
        quest_id: i64,
        /// Question being answered
        question_id: i64,
        /// Answer text
        answer: String,
    },

    /// List wisdom pets, or show one pet
    Pets {
        /// Pet to show
        #[arg(long)]
        id: Option<i64>,
    },

    /// Interact with a pet
    Interact {
        /// Pet to interact with
        pet_id: i64,
        /// Action name, e.g. meditate
        action: String,
    },

    /// Unlock a pet
    UnlockPet {
        /// Pet to unlock
        id: i64,
    },
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

impl From<AppResult<String>> for CliResult {
    fn from(result: AppResult<String>) -> Self {
        match result {
            Ok(message) => CliResult::success(message),
            Err(e) => CliResult::error(format!("Error: {}", e.user_message())),
        }
    }
}

/// Render one transcript line.
pub fn format_message(message: &Message, persona: Persona) -> String {
    let speaker = match message.origin() {
        Origin::User => "You",
        Origin::System => persona.display_name(),
        Origin::Error => "!",
    };
    let mut line = format!("[{}] {}: {}", message.display_time(), speaker, message.text());
    if let Some(score) = message.quality_score() {
        line.push_str(&format!("  (Quality: {})", score.badge()));
    }
    line
}

/// Render the points line shown after a scored exchange.
pub fn format_points(update: &PointsUpdate) -> String {
    let level = match update.quality_score.level() {
        QualityLevel::High => "high",
        QualityLevel::Medium => "medium",
        QualityLevel::Low => "low",
    };
    let mut line = format!(
        "{} points | Quality: {} ({})",
        update.total_points,
        update.quality_score.badge(),
        level
    );
    if update.points_earned > 0 {
        line.push_str(&format!(" | +{} pts", update.points_earned));
    }
    line
}

/// Interactive chat loop over `input`, writing to `output` until EOF or `/quit`.
///
/// `/reset` clears the points ledger without leaving the session.
pub async fn run_chat<C, P, S, R, W>(
    session: &mut ChatSession<C, P, S>,
    input: R,
    output: &mut W,
) -> AppResult<()>
where
    C: ChatService,
    P: PointsService,
    S: KeyValueStore,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let persona = session.persona();
    for message in session.transcript().snapshot() {
        emit(output, &format_message(message, persona))?;
    }
    emit(
        output,
        &format!(
            "{} points. Type /reset to clear them, /quit to leave.",
            session.metrics().total_points
        ),
    )?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.map_err(io_error)? {
        let text = line.trim();
        if text == "/quit" || text == "/exit" {
            break;
        }
        if text.is_empty() {
            continue;
        }
        if text == "/reset" {
            session.reset_points().await?;
            emit(output, "Points reset.")?;
            continue;
        }

        let seen = session.transcript().len();
        let result = session.submit(text).await;

        // The user's own line is already on screen.
        for message in &session.transcript().snapshot()[seen..] {
            if message.origin() != Origin::User {
                emit(output, &format_message(message, persona))?;
            }
        }
        match result {
            Ok(report) => {
                if let Some(update) = &report.points {
                    emit(output, &format_points(update))?;
                }
            }
            Err(AppError::Storage(e)) => return Err(e.into()),
            Err(_) => {}
        }
    }

    emit(output, &format!("Goodbye. Total: {} points.", session.metrics().total_points))?;
    Ok(())
}

/// Show the stored point counters.
pub async fn show_points<S: KeyValueStore>(store: &S) -> CliResult {
    points_summary(store).await.into()
}

async fn points_summary<S: KeyValueStore>(store: &S) -> AppResult<String> {
    let total = store.get(TOTAL_POINTS_KEY).await?;
    let questions = store.get(TOTAL_QUESTIONS_KEY).await?;
    let last = store.get(LAST_ACTIVITY_DATE_KEY).await?;
    Ok(format!(
        "Total points: {}\nQuestions asked: {}\nLast activity: {}",
        total.as_deref().unwrap_or("0"),
        questions.as_deref().unwrap_or("0"),
        last.as_deref().unwrap_or("never")
    ))
}

/// Clear the stored point counters.
pub async fn reset_points<S: KeyValueStore>(store: &S) -> CliResult {
    metrics::clear_ledger(store)
        .await
        .map(|()| "Points reset.".to_string())
        .into()
}



/// Execute a catalog command.
pub async fn execute_catalog_command(command: Commands, catalog: &CatalogClient) -> CliResult {
    run_catalog_command(command, catalog).await.into()
}

async fn run_catalog_command(command: Commands, catalog: &CatalogClient) -> AppResult<String> {
    Ok(match command {
        Commands::Quests { id: None } => format_quest_list(&catalog.quests().await?),
        Commands::Quests { id: Some(id) } => {
            let quest = catalog.quest(id).await?;
            let progress = catalog.quest_progress(id).await?;
            format_quest(&quest, &progress)
        }
        Commands::AcceptQuest { id } => {
            let progress = catalog.accept_quest(id).await?;
            format!("Quest {} accepted ({:?}).", id, progress.status)
        }
        Commands::Answer {
            quest_id,
            question_id,
            answer,
        } => {
            let progress = catalog.submit_answer(quest_id, question_id, &answer).await?;
            format!(
                "Answer recorded. {} question(s) completed ({:?}).",
                progress.completed_questions.len(),
                progress.status
            )
        }
        Commands::Pets { id: None } => format_pet_list(&catalog.pets().await?),
        Commands::Pets { id: Some(id) } => format_pet(&catalog.pet(id).await?),
        Commands::Interact { pet_id, action } => {
            let outcome = catalog.interact_with_pet(pet_id, &action).await?;
            let mut text = format!("\"{}\"", outcome.wisdom);
            if let Some(status) = outcome.status {
                text.push_str(&format!(
                    "\nhappiness {} | energy {} | wisdom {}",
                    status.happiness, status.energy, status.wisdom
                ));
            }
            text
        }
        Commands::UnlockPet { id } => {
            let pet = catalog.unlock_pet(id).await?;
            format!("{} unlocked.", pet.name)
        }
        other => {
            return Err(AppError::Internal {
                message: format!("{:?} is not a catalog command", other),
            })
        }
    })
}

fn format_quest_list(quests: &[Quest]) -> String {
    if quests.is_empty() {
        return "No quests available.".to_string();
    }
    quests
        .iter()
        .map(|q| format!("{:>4}  {} - {}", q.id, q.title, q.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_quest(quest: &Quest, progress: &QuestProgress) -> String {
    let mut lines = vec![
        format!("{} ({:?})", quest.title, progress.status),
        quest.description.clone(),
    ];
    for question in &quest.questions {
        let mark = if progress.completed_questions.contains(&question.id) {
            "x"
        } else {
            " "
        };
        lines.push(format!("[{}] {:>4}  {}", mark, question.id, question.text));
    }
    if let Some(next) = progress.next_question(quest) {
        if let Some(guidance) = &next.guidance {
            lines.push(format!("Next: {}", guidance));
        }
    }
    lines.join("\n")
}

fn format_pet_list(pets: &[Pet]) -> String {
    if pets.is_empty() {
        return "No wisdom pets available.".to_string();
    }
    pets.iter()
        .map(|p| format!("{:>4}  {} the {} - {}", p.id, p.name, p.kind, p.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_pet(pet: &Pet) -> String {
    let mut lines = vec![
        format!("{} the {}", pet.name, pet.kind),
        format!(
            "happiness {} | energy {} | wisdom {}",
            pet.status.happiness, pet.status.energy, pet.status.wisdom
        ),
    ];
    for interaction in &pet.interactions {
        lines.push(format!("{:>4}  {}", interaction.id, interaction.name));
    }
    lines.join("\n")
}

fn emit<W: Write>(output: &mut W, line: &str) -> AppResult<()> {
    writeln!(output, "{}", line).map_err(io_error)
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::Internal {
        message: format!("I/O error: {}", e),
    }
}
