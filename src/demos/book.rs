use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use phf::phf_map;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use agent_tour::agents::ChatModelAgent;
use agent_tour::checkpoint::InMemoryStore;
use agent_tour::runner::{RunOptions, Runner, RunnerConfig};
use agent_tour::tools::{FunctionTool, infer_tool};
use agent_tour::traits::{AgentAction, ChatModel, ToolError};

use super::{Demo, DemoFactory, chat_model, traced};
use crate::console::read_line_async;

inventory::submit! {
    DemoFactory(|| Box::new(Book))
}

pub const NEW_INPUT_OPTION: &str = "new_input";
const CHECKPOINT_ID: &str = "1";

static BOOKS: phf::Map<&'static str, [&'static str; 3]> = phf_map! {
    "fiction" => ["The Great Gatsby", "To Kill a Mockingbird", "1984"],
    "sci-fi" => ["Dune", "Ender's Game", "The Hitchhiker's Guide to the Galaxy"],
    "mystery" => ["The Hound of the Baskervilles", "And Then There Were None", "The Girl with the Dragon Tattoo"],
    "biography" => ["Steve Jobs by Walter Isaacson", "The Diary of a Young Girl by Anne Frank", "Becoming by Michelle Obama"],
    "business" => ["The Lean Startup by Eric Ries", "Rich Dad Poor Dad by Robert T. Kiyosaki", "Thinking, Fast and Slow by Daniel Kahneman"],
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BookSearchInput {
    /// Preferred book genre: fiction, sci-fi, mystery, biography or business
    genre: String,
    /// Maximum page length (0 for no limit)
    #[serde(default)]
    max_pages: u32,
    /// Minimum user rating (0-5 scale)
    #[serde(default)]
    min_rating: u8,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct BookSearchOutput {
    books: Vec<String>,
}

fn search_books(input: &BookSearchInput) -> BookSearchOutput {
    let books = match BOOKS.get(input.genre.as_str()) {
        Some(books) => books.iter().map(|b| b.to_string()).collect(),
        None => vec!["Sorry, no books were found for the specified genre.".to_string()],
    };
    BookSearchOutput { books }
}

pub fn search_book_tool() -> FunctionTool {
    infer_tool(
        "search_book",
        "Search books based on user preferences",
        |input: BookSearchInput, _ctx| async move {
            tracing::debug!(genre = %input.genre, max_pages = input.max_pages, min_rating = input.min_rating, "search_book");
            Ok::<_, ToolError>(search_books(&input))
        },
    )
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClarificationInput {
    /// The specific question you want to ask the user to get the missing information
    question: String,
}

/// Interrupts with the question until a resume supplies `new_input`.
pub fn ask_for_clarification_tool() -> FunctionTool {
    infer_tool(
        "ask_for_clarification",
        "Call this tool when the user's request is ambiguous or lacks the necessary information to proceed. \
         Use it to ask a follow-up question to get the details you need, such as the book's genre, \
         before you can use other tools effectively.",
        |input: ClarificationInput, ctx| async move {
            match ctx.option_str(NEW_INPUT_OPTION) {
                Some(answer) => Ok(answer.to_string()),
                None => Err(ToolError::interrupt(input.question)),
            }
        },
    )
}

pub fn book_recommender(model: Arc<dyn ChatModel>) -> ChatModelAgent {
    ChatModelAgent::new("Book Recommender", model)
        .description("An agent that can recommend books")
        .instruction(
            "You are an expert book recommender.\n\
             Based on the user's request, use the \"search_book\" tool to find relevant books. \
             Finally, present the results to the user.",
        )
        .tool(search_book_tool())
        .tool(ask_for_clarification_tool())
}

pub struct Book;

#[async_trait]
impl Demo for Book {
    fn name(&self) -> &'static str {
        "book"
    }

    fn description(&self) -> &'static str {
        "Book recommender that pauses to ask for a genre, then resumes"
    }

    fn default_query(&self) -> &'static str {
        "recommend a book to me"
    }

    async fn run(&self, query: &str) -> Result<()> {
        let runner = Runner::new(RunnerConfig {
            agent: Arc::new(book_recommender(chat_model()?)),
            enable_streaming: true,
            checkpoint_store: Some(Arc::new(InMemoryStore::new())),
        });

        let events = runner.query(query, RunOptions::new().checkpoint_id(CHECKPOINT_ID));
        let summary = traced("book", query, events).await?;
        if !matches!(summary.last_action, Some(AgentAction::Interrupted(_))) {
            return Ok(());
        }

        let answer = read_line_async("\nyour input here: ".to_string()).await?;
        println!();

        let options = RunOptions::new().tool_option(NEW_INPUT_OPTION, answer.clone());
        let events = runner.resume(CHECKPOINT_ID, options).await?;
        traced("book", &answer, events).await?;
        Ok(())
    }
}
