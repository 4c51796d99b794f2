use std::fmt;

use chrono::{DateTime, Utc};
use prep_core::model::{Level, Role, Subject, UserId};
use storage::repository::{ProfileRecord, Storage};
use storage::seed_builtin_questions;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: UserId,
    role: Role,
    math_level: Level,
    verbal_level: Level,
    questions: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidRole { raw: String },
    InvalidLevel { flag: &'static str, raw: String },
    InvalidQuestions { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidRole { raw } => write!(f, "invalid --role value: {raw}"),
            ArgsError::InvalidLevel { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_level(flag: &'static str, value: String) -> Result<Level, ArgsError> {
    value
        .parse::<u32>()
        .map(Level::new)
        .map_err(|_| ArgsError::InvalidLevel { flag, raw: value })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("PREP_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut user_id = std::env::var("PREP_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or_else(|| UserId::new(1));
        let mut role = Role::Student;
        let mut math_level = Level::ZERO;
        let mut verbal_level = Level::ZERO;
        let mut questions = 2;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user-id" => {
                    let value = require_value(&mut args, "--user-id")?;
                    user_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                }
                "--role" => {
                    let value = require_value(&mut args, "--role")?;
                    role = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidRole { raw: value.clone() })?;
                }
                "--math-level" => {
                    math_level = parse_level("--math-level", require_value(&mut args, "--math-level")?)?;
                }
                "--verbal-level" => {
                    verbal_level =
                        parse_level("--verbal-level", require_value(&mut args, "--verbal-level")?)?;
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            role,
            math_level,
            verbal_level,
            questions,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --user-id <id>            Profile to upsert (default: 1)");
    eprintln!("  --role <role>             student | teacher | admin (default: student)");
    eprintln!("  --math-level <n>          Baseline math level (default: 0)");
    eprintln!("  --verbal-level <n>        Baseline verbal level (default: 0)");
    eprintln!("  --questions <n>           Published questions per subtopic (default: 2)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PREP_DB_URL, PREP_USER_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let mut profile = storage
        .profiles
        .get_profile(args.user_id)
        .await?
        .unwrap_or_else(|| ProfileRecord::new(args.user_id, args.role));
    profile.role = args.role.as_str().to_owned();
    profile.is_admin = args.role == Role::Admin;
    profile.set_level(Subject::Math, args.math_level);
    profile.set_level(Subject::Verbal, args.verbal_level);
    storage.profiles.upsert_profile(&profile).await?;

    let inserted =
        seed_builtin_questions(storage.questions.as_ref(), args.user_id, args.questions, now)
            .await?;

    println!(
        "Seeded profile {} ({}) and {} questions into {}",
        args.user_id, args.role, inserted, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
