use std::fmt;

use prep_core::model::{Level, QuestionId, RequestContext, Role, Subject, UserId};
use serde_json::json;
use services::{AppServices, Clock};
use storage::seed_builtin_questions;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { flag: &'static str, raw: String },
    InvalidQuestionId { raw: String },
    InvalidRole { raw: String },
    InvalidSubject { raw: String },
    InvalidLevel { raw: String },
    InvalidQuestions { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidQuestionId { raw } => write!(f, "invalid --attempt value: {raw}"),
            ArgsError::InvalidRole { raw } => write!(f, "invalid --role value: {raw}"),
            ArgsError::InvalidSubject { raw } => write!(f, "invalid --subject value: {raw}"),
            ArgsError::InvalidLevel { raw } => write!(f, "invalid --level value: {raw}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn parse_user(flag: &'static str, value: String) -> Result<UserId, ArgsError> {
    value
        .parse()
        .map_err(|_| ArgsError::InvalidUserId { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app catalog  --subject <math|verbal>");
    eprintln!("  app progress --subject <math|verbal> [--student <id>]");
    eprintln!("  app pass     --subject <s> --topic <t> [--subtopic <s>]");
    eprintln!("  app level    --student <id> --subject <s> --level <n>   # admin");
    eprintln!("  app streak   [--attempt <question_id>] [--subject <s>]");
    eprintln!("  app seed     [--questions <n>]");
    eprintln!();
    eprintln!("Common flags:");
    eprintln!("  --db <sqlite_url>   (default sqlite:dev.sqlite3)");
    eprintln!("  --user <id>         acting user (default 1)");
    eprintln!("  --role <role>       student | teacher | admin (default student)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PREP_DB_URL, PREP_USER_ID, PREP_ROLE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Catalog,
    Progress,
    Pass,
    Level,
    Streak,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "catalog" => Some(Self::Catalog),
            "progress" => Some(Self::Progress),
            "pass" => Some(Self::Pass),
            "level" => Some(Self::Level),
            "streak" => Some(Self::Streak),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    user_id: UserId,
    role: Role,
    student: Option<UserId>,
    subject: Option<Subject>,
    topic: Option<String>,
    subtopic: Option<String>,
    level: Option<Level>,
    attempt: Option<QuestionId>,
    questions: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PREP_DB_URL")
            .ok()
            .map_or_else(
                || normalize_sqlite_url("sqlite:dev.sqlite3".into()),
                normalize_sqlite_url,
            );
        let mut parsed = Self {
            db_url: String::new(),
            user_id: std::env::var("PREP_USER_ID")
                .ok()
                .and_then(|value| value.parse::<UserId>().ok())
                .unwrap_or_else(|| UserId::new(1)),
            role: std::env::var("PREP_ROLE")
                .ok()
                .and_then(|value| value.parse::<Role>().ok())
                .unwrap_or_default(),
            student: None,
            subject: None,
            topic: None,
            subtopic: None,
            level: None,
            attempt: None,
            questions: 2,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => parsed.user_id = parse_user("--user", require_value(args, "--user")?)?,
                "--student" => {
                    let value = require_value(args, "--student")?;
                    parsed.student = Some(parse_user("--student", value)?);
                }
                "--role" => {
                    let value = require_value(args, "--role")?;
                    parsed.role = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidRole { raw: value.clone() })?;
                }
                "--subject" => {
                    let value = require_value(args, "--subject")?;
                    parsed.subject = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidSubject { raw: value.clone() })?,
                    );
                }
                "--topic" => parsed.topic = Some(require_value(args, "--topic")?),
                "--subtopic" => parsed.subtopic = Some(require_value(args, "--subtopic")?),
                "--level" => {
                    let value = require_value(args, "--level")?;
                    let raw: u32 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLevel { raw: value.clone() })?;
                    parsed.level = Some(Level::new(raw));
                }
                "--attempt" => {
                    let value = require_value(args, "--attempt")?;
                    parsed.attempt = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidQuestionId { raw: value.clone() })?,
                    );
                }
                "--questions" => {
                    let value = require_value(args, "--questions")?;
                    parsed.questions = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        parsed.db_url = db_url;
        Ok(parsed)
    }

    fn context(&self) -> RequestContext {
        RequestContext::new(self.user_id, self.role)
    }

    fn subject(&self) -> Result<Subject, ArgsError> {
        self.subject.ok_or(ArgsError::MissingFlag { flag: "--subject" })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.contains("mode=memory") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&args.db_url)?;
    let clock = Clock::default_clock();
    let app = AppServices::new_sqlite(&args.db_url, clock).await?;
    let ctx = args.context();
    tracing::debug!(?cmd, user = %ctx.user_id(), role = %ctx.role(), "running command");

    match cmd {
        Command::Catalog => {
            let subject = args.subject()?;
            let catalog = app.catalog().catalog(&ctx, subject).await;
            print_json(&json!({
                "subject": subject,
                "label": subject.label(),
                "total": catalog.total_count(),
                "topics": catalog.groups(),
            }))
        }
        Command::Progress => {
            let subject = args.subject()?;
            let state = match args.student {
                Some(student) if student != ctx.user_id() => {
                    app.progress().progress_for(&ctx, student, subject).await?
                }
                _ => app.progress().progress(&ctx, subject).await?,
            };
            print_json(&serde_json::to_value(&state)?)
        }
        Command::Pass => {
            let subject = args.subject()?;
            let topic = args
                .topic
                .as_deref()
                .ok_or(ArgsError::MissingFlag { flag: "--topic" })?;
            let outcome = match args.subtopic.as_deref() {
                Some(subtopic) => {
                    app.progress()
                        .record_subtopic_pass(&ctx, subject, topic, subtopic)
                        .await?
                }
                None => app.progress().record_topic_pass(&ctx, subject, topic).await?,
            };
            print_json(&json!({
                "recorded": outcome.recorded,
                "progress": outcome.progress,
            }))
        }
        Command::Level => {
            let subject = args.subject()?;
            let student = args
                .student
                .ok_or(ArgsError::MissingFlag { flag: "--student" })?;
            let level = args.level.ok_or(ArgsError::MissingFlag { flag: "--level" })?;
            let profile = app
                .progress()
                .set_level(&ctx, student, subject, level)
                .await?;
            print_json(&json!({
                "user_id": profile.user_id.value(),
                "subject": subject,
                "level": profile.level(subject).value(),
            }))
        }
        Command::Streak => {
            let status = match args.attempt {
                Some(question) => {
                    app.streaks()
                        .record_attempt(&ctx, question, args.subject)
                        .await?
                }
                None => app.streaks().status(&ctx).await?,
            };
            print_json(&serde_json::to_value(&status)?)
        }
        Command::Seed => {
            ctx.require_role(Role::Admin)?;
            let inserted = seed_builtin_questions(
                app.storage().questions.as_ref(),
                ctx.user_id(),
                args.questions,
                clock.now(),
            )
            .await?;
            tracing::info!(inserted, db = %args.db_url, "seeded question bank");
            print_json(&json!({ "inserted": inserted }))
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
