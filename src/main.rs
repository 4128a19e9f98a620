//! dayfill CLI: manage tasks and pack flexible ones into a day.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use dayfill_lib::commands::planning::{self, PlanDayPayload};
use dayfill_lib::commands::{db, settings, task, AppState, CommandError};
use dayfill_lib::models::schedule::{BreakInterval, DayPlanRequest, ProposalApplyInput};
use dayfill_lib::models::task::{TaskCreateInput, TaskUpdateInput};
use dayfill_lib::services::settings_service::SettingsUpdateInput;
use dayfill_lib::services::task_service::TaskListFilter;

#[derive(Parser, Debug)]
#[command(name = "dayfill", version, about = "Pack flexible tasks around fixed commitments")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "DAYFILL_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Task management
    Tasks {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Schedule one day
    Plan(PlanArgs),
    /// Day window and meal break preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Schema migrations
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommand {
    /// Show applied migrations
    History,
    /// Undo migrations above a version, for downgrading to an older build
    Rollback { version: i32 },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    List {
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        pending: bool,
    },
    Add(AddTaskArgs),
    /// Tasks with reminders that start soon
    Upcoming {
        /// Minutes ahead to look
        #[arg(long, default_value_t = 30)]
        within: i64,
        /// Reference time, YYYY-MM-DDTHH:MM; defaults to now
        #[arg(long, value_parser = parse_datetime)]
        at: Option<chrono::NaiveDateTime>,
    },
    /// Mark a task completed
    Done { id: String },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct AddTaskArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    date: String,
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
    /// Minutes
    #[arg(long)]
    duration: Option<i64>,
    #[arg(long)]
    priority: Option<String>,
    #[arg(long = "type")]
    task_type: Option<String>,
    #[arg(long)]
    fixed: bool,
    #[arg(long)]
    description: Option<String>,
    /// Do not remind before this task starts
    #[arg(long)]
    no_reminder: bool,
    #[arg(long)]
    weekly: bool,
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// YYYY-MM-DD
    date: String,
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
    /// HH:MM-HH:MM, repeatable
    #[arg(long = "break", value_parser = parse_break)]
    breaks: Vec<BreakInterval>,
    /// Skip the lunch and dinner breaks from settings
    #[arg(long)]
    no_meals: bool,
    /// Write new times as they are placed instead of printing proposals
    #[arg(long, conflicts_with = "confirm")]
    apply: bool,
    /// Print the proposals, then write them in one batch
    #[arg(long)]
    confirm: bool,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    Set(SetSettingsArgs),
    Reset,
}

#[derive(Args, Debug)]
struct SetSettingsArgs {
    #[arg(long, value_parser = parse_minutes)]
    day_start: Option<i64>,
    #[arg(long, value_parser = parse_minutes)]
    day_end: Option<i64>,
    #[arg(long, value_parser = parse_minutes)]
    lunch_start: Option<i64>,
    #[arg(long, value_parser = parse_minutes)]
    lunch_end: Option<i64>,
    #[arg(long, value_parser = parse_minutes)]
    dinner_start: Option<i64>,
    #[arg(long, value_parser = parse_minutes)]
    dinner_end: Option<i64>,
    #[arg(long)]
    meal_breaks: Option<bool>,
}

fn parse_break(value: &str) -> Result<BreakInterval, String> {
    let (start, end) = value
        .split_once('-')
        .ok_or_else(|| format!("expected HH:MM-HH:MM, got {value:?}"))?;
    Ok(BreakInterval::new(start.trim(), end.trim()))
}

fn parse_datetime(value: &str) -> Result<chrono::NaiveDateTime, String> {
    chrono::NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M")
        .map_err(|_| format!("expected YYYY-MM-DDTHH:MM, got {value:?}"))
}

fn parse_minutes(value: &str) -> Result<i64, String> {
    dayfill_lib::services::schedule_utils::parse_clock(value).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = execute(cli).await {
        let rendered = serde_json::to_string(&err).unwrap_or_else(|_| err.to_string());
        eprintln!("{rendered}");
        process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<(), CommandError> {
    let state = dayfill_lib::run(cli.db).map_err(CommandError::from)?;

    match cli.command {
        Command::Tasks { command } => run_task_command(&state, command).await,
        Command::Plan(args) => run_plan(&state, args).await,
        Command::Settings { command } => run_settings_command(&state, command).await,
        Command::Db { command } => match command {
            DbCommand::History => print_json(&db::db_history(&state).await?),
            DbCommand::Rollback { version } => print_json(&db::db_rollback(&state, version).await?),
        },
    }
}

async fn run_task_command(state: &AppState, command: TaskCommand) -> Result<(), CommandError> {
    match command {
        TaskCommand::List { date, pending } => {
            let date = date
                .map(|raw| parse_date(&raw))
                .transpose()?;
            let filter = TaskListFilter {
                date,
                completed: pending.then_some(false),
                is_fixed: None,
            };
            print_json(&task::tasks_list(state, Some(filter)).await?)
        }
        TaskCommand::Add(args) => {
            let input = TaskCreateInput {
                title: args.title,
                description: args.description,
                task_type: args.task_type,
                priority: args.priority,
                date: args.date,
                start_time: args.start,
                end_time: args.end,
                duration: args.duration,
                is_fixed: Some(args.fixed),
                email_reminder: Some(!args.no_reminder),
                repeat_weekly: Some(args.weekly),
                ..Default::default()
            };
            print_json(&task::tasks_create(state, input).await?)
        }
        TaskCommand::Upcoming { within, at } => {
            let now = at.unwrap_or_else(|| chrono::Local::now().naive_local());
            print_json(&task::tasks_upcoming(state, now, within).await?)
        }
        TaskCommand::Done { id } => {
            let update = TaskUpdateInput {
                completed: Some(true),
                ..Default::default()
            };
            print_json(&task::tasks_update(state, id, update).await?)
        }
        TaskCommand::Delete { id } => {
            task::tasks_delete(state, id.clone()).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

async fn run_plan(state: &AppState, args: PlanArgs) -> Result<(), CommandError> {
    let payload = PlanDayPayload {
        date: args.date,
        request: DayPlanRequest {
            day_start: args.start,
            day_end: args.end,
            breaks: args.breaks,
            include_meal_breaks: args.no_meals.then_some(false),
        },
    };

    if args.apply {
        return print_json(&planning::planning_optimize(state, payload).await?);
    }

    let preview = planning::planning_calculate(state, payload).await?;
    if !args.confirm {
        return print_json(&preview);
    }

    let inputs: Vec<ProposalApplyInput> =
        preview.proposals.iter().map(ProposalApplyInput::from).collect();
    let outcome = planning::planning_apply(state, inputs).await?;
    print_json(&serde_json::json!({ "preview": preview, "applied": outcome }))
}

async fn run_settings_command(
    state: &AppState,
    command: SettingsCommand,
) -> Result<(), CommandError> {
    match command {
        SettingsCommand::Show => print_json(&settings::settings_get(state).await?),
        SettingsCommand::Set(args) => {
            let input = SettingsUpdateInput {
                day_start_minute: args.day_start,
                day_end_minute: args.day_end,
                lunch_start_minute: args.lunch_start,
                lunch_end_minute: args.lunch_end,
                dinner_start_minute: args.dinner_start,
                dinner_end_minute: args.dinner_end,
                meal_breaks_enabled: args.meal_breaks,
            };
            print_json(&settings::settings_update(state, input).await?)
        }
        SettingsCommand::Reset => print_json(&settings::settings_reset(state).await?),
    }
}

fn parse_date(raw: &str) -> Result<chrono::NaiveDate, CommandError> {
    chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        CommandError::new(
            "VALIDATION_ERROR",
            format!("date must be YYYY-MM-DD, got {raw:?}"),
            None,
        )
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CommandError::new("UNKNOWN", err.to_string(), None))?;
    println!("{rendered}");
    Ok(())
}
