use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use agent_tour::agents::{
    ChatModelAgent, DEFAULT_EXECUTOR_INSTRUCTION, PlanExecute, Planner, Replanner,
};
use agent_tour::runner::{RunOptions, Runner, RunnerConfig};
use agent_tour::tools::{FunctionTool, infer_tool};
use agent_tour::traits::{ChatModel, ToolError};

use super::{Demo, DemoFactory, chat_model, traced};
use crate::console::read_line_async;

inventory::submit! {
    DemoFactory(|| Box::new(TripPlan))
}

const MAX_ITERATIONS: usize = 10;

#[derive(Debug, Deserialize, JsonSchema)]
struct FlightQuery {
    /// departure city
    from: String,
    /// arrival city
    to: String,
    /// departure date, YYYY-MM-DD
    date: String,
}

#[derive(Debug, Serialize)]
struct Flight {
    flight: &'static str,
    departure: String,
    arrival: String,
    price_cny: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct HotelQuery {
    city: String,
    check_in: String,
    nights: u32,
}

#[derive(Debug, Serialize)]
struct Hotel {
    name: &'static str,
    area: &'static str,
    price_per_night_cny: u32,
    rating: f32,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AttractionQuery {
    city: String,
}

#[derive(Debug, Serialize)]
struct Attraction {
    name: &'static str,
    suggested_hours: u8,
    tip: &'static str,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ClarificationInput {
    /// The specific question you want to ask the user to get the missing information
    question: String,
}

fn search_flights() -> FunctionTool {
    infer_tool("search_flights", "Search flights between two cities on a date", |q: FlightQuery, _ctx| async move {
        let flights = vec![
            Flight {
                flight: "CA4193",
                departure: format!("{} {} 08:30", q.from, q.date),
                arrival: format!("{} {} 11:05", q.to, q.date),
                price_cny: 1280,
            },
            Flight {
                flight: "3U8885",
                departure: format!("{} {} 14:10", q.from, q.date),
                arrival: format!("{} {} 16:50", q.to, q.date),
                price_cny: 1060,
            },
        ];
        Ok::<_, ToolError>(flights)
    })
}

fn search_hotels() -> FunctionTool {
    infer_tool("search_hotels", "Search hotels in a city", |q: HotelQuery, _ctx| async move {
        tracing::debug!(city = %q.city, check_in = %q.check_in, nights = q.nights, "search_hotels");
        Ok::<_, ToolError>(vec![
            Hotel {
                name: "Wangfujing Grand Hotel",
                area: "Dongcheng, near the Forbidden City",
                price_per_night_cny: 980,
                rating: 4.7,
            },
            Hotel {
                name: "Qianmen Courtyard Inn",
                area: "Qianmen hutongs",
                price_per_night_cny: 560,
                rating: 4.5,
            },
        ])
    })
}

fn search_attractions() -> FunctionTool {
    infer_tool("search_attractions", "Search must-see attractions in a city", |q: AttractionQuery, _ctx| async move {
        tracing::debug!(city = %q.city, "search_attractions");
        Ok::<_, ToolError>(vec![
            Attraction {
                name: "The Forbidden City",
                suggested_hours: 4,
                tip: "Book tickets online a week ahead; closed on Mondays.",
            },
            Attraction {
                name: "Mutianyu Great Wall",
                suggested_hours: 5,
                tip: "Take the cable car up and the toboggan down.",
            },
            Attraction {
                name: "Temple of Heaven",
                suggested_hours: 2,
                tip: "Go early to see locals practicing tai chi.",
            },
        ])
    })
}

/// Asks on the console and waits for the answer.
fn ask_for_clarification() -> FunctionTool {
    infer_tool(
        "ask_for_clarification",
        "Call this tool when the user's request is ambiguous or lacks the necessary information to proceed. \
         Use it to ask a follow-up question to get the details you need before you can use other tools effectively.",
        |input: ClarificationInput, _ctx| async move {
            let prompt = format!("\nQuestion: {}\n\nYour input here: ", input.question);
            read_line_async(prompt)
                .await
                .map_err(|err| ToolError::failed(err.to_string()))
        },
    )
}

pub fn trip_planner(model: Arc<dyn ChatModel>) -> PlanExecute {
    let executor = ChatModelAgent::new("executor", model.clone())
        .description("Executes one step of a travel plan with the search tools")
        .instruction(DEFAULT_EXECUTOR_INSTRUCTION)
        .tool(search_flights())
        .tool(search_hotels())
        .tool(search_attractions())
        .tool(ask_for_clarification());

    PlanExecute::new(Planner::new(model.clone()), executor, Replanner::new(model))
        .max_iterations(MAX_ITERATIONS)
}

pub struct TripPlan;

#[async_trait]
impl Demo for TripPlan {
    fn name(&self) -> &'static str {
        "plan"
    }

    fn description(&self) -> &'static str {
        "Plan, execute and replan a trip with mock travel tools"
    }

    fn default_query(&self) -> &'static str {
        "Plan a 3-day trip to Beijing next month. I need flights from Chengdu, hotel recommendations, \
         and must-see attractions. Today is 2025-09-09."
    }

    async fn run(&self, query: &str) -> Result<()> {
        let runner = Runner::new(RunnerConfig::new(Arc::new(trip_planner(chat_model()?))));
        traced("plan-execute-replan", query, runner.query(query, RunOptions::new())).await?;
        Ok(())
    }
}
