use std::fmt;
use std::path::PathBuf;

use course_core::model::CourseId;
use course_core::quiz::Quiz;
use course_core::sequencer::EntryStatus;
use services::{ApiConfig, AppServices, AppServicesError, Clock, Credentials};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- outline --course <id> [--db <sqlite_url>] [--base-url <url>]");
    eprintln!("  cargo run -p app -- check   --file <quiz.json>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:course.sqlite3");
    eprintln!("  --base-url http://localhost:8080");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_API_BASE_URL, COURSE_ACCESS_TOKEN, COURSE_REFRESH_TOKEN");
    eprintln!("  RUST_LOG (log filter, default info)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Outline,
    Check,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "outline" => Some(Self::Outline),
            "check" => Some(Self::Check),
            _ => None,
        }
    }
}

struct OutlineArgs {
    db_url: String,
    base_url: Option<String>,
    course_id: CourseId,
}

impl OutlineArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("COURSE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://course.sqlite3".into(), normalize_sqlite_url);
        let mut base_url = None;
        let mut course_id = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--base-url" => base_url = Some(require_value(args, "--base-url")?),
                "--course" => {
                    let value = require_value(args, "--course")?;
                    let parsed = value
                        .parse::<CourseId>()
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value.clone() })?;
                    course_id = Some(parsed);
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
            base_url,
            course_id: course_id.ok_or(ArgsError::MissingFlag { flag: "--course" })?,
        })
    }
}

struct CheckArgs {
    file: PathBuf,
}

impl CheckArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut file = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--file" => file = Some(PathBuf::from(require_value(args, "--file")?)),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Self {
            file: file.ok_or(ArgsError::MissingFlag { flag: "--file" })?,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
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
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
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

fn credentials_from_env() -> Option<Credentials> {
    let access = std::env::var("COURSE_ACCESS_TOKEN").ok()?;
    let refresh = std::env::var("COURSE_REFRESH_TOKEN").unwrap_or_default();
    Some(Credentials::new(access, refresh))
}

async fn outline(args: OutlineArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.base_url {
        Some(raw) => ApiConfig::new(raw).map_err(AppServicesError::from)?,
        None => ApiConfig::from_env().map_err(AppServicesError::from)?,
    };
    debug!(base_url = %config.base_url, "using course backend");

    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(
        &args.db_url,
        config,
        Clock::default(),
        credentials_from_env(),
    )
    .await?;

    let player = app.open_course(args.course_id.clone()).await;
    if let Some(err) = player.error() {
        return Err(err.clone().into());
    }
    debug!(phase = ?player.phase(), "course opened");

    if let Some(course) = player.course() {
        println!("{} ({})", course.title(), course.approximate_time());
    }
    for entry in player.outline() {
        let marker = match entry.status {
            EntryStatus::Current => ">",
            EntryStatus::Reached => "+",
            EntryStatus::Locked => " ",
        };
        println!("{marker} {:>3}  {:<5}  {}", entry.number, entry.kind.as_str(), entry.title);
    }
    if let Some(progress) = player.progress() {
        println!(
            "module {} of {}, reached {}",
            progress.position,
            progress.total,
            progress.frontier + 1
        );
    }
    Ok(())
}

fn check_quiz(raw: &str) -> Result<Quiz, course_core::Error> {
    Ok(Quiz::parse(raw)?)
}

fn check(args: &CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(&args.file)?;
    let quiz = check_quiz(&raw)?;
    info!(file = %args.file.display(), questions = quiz.len(), "quiz payload is valid");
    for question in quiz.questions() {
        println!(
            "#{:<3} {} ({} answers)",
            question.number(),
            question.text(),
            question.variants().len()
        );
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
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

    let report = |e: ArgsError| {
        eprintln!("{e}");
        print_usage();
        e
    };

    match cmd {
        Command::Outline => outline(OutlineArgs::parse(&mut argv).map_err(report)?).await,
        Command::Check => check(&CheckArgs::parse(&mut argv).map_err(report)?),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
