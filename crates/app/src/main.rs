use std::fmt;
use std::sync::Arc;

use exam_core::format_clock;
use exam_core::model::{Difficulty, Question, TestConfigDraft, TestMode};
use services::{Clock, SessionBuilder, SessionRunner};
use storage::repository::Storage;
use tracing_subscriber::{
    EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

mod terminal;

use terminal::TerminalHost;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidMode { raw: String },
    InvalidDifficulty { raw: String },
    MissingQuestions,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidMode { raw } => {
                write!(f, "invalid --mode value: {raw} (expected practice or exam)")
            }
            ArgsError::InvalidDifficulty { raw } => write!(f, "invalid difficulty: {raw}"),
            ArgsError::MissingQuestions => write!(f, "start requires --questions <file.json>"),
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

fn parse_number(flag: &'static str, raw: String) -> Result<u32, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn parse_difficulties(raw: &str) -> Result<Vec<Difficulty>, ArgsError> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            Difficulty::from_label(part.trim()).ok_or_else(|| ArgsError::InvalidDifficulty {
                raw: part.to_string(),
            })
        })
        .collect()
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  exam-app start   --questions <file.json> [session options] [--db <sqlite_url>]");
    eprintln!("  exam-app resume  [--db <sqlite_url>]");
    eprintln!("  exam-app discard [--db <sqlite_url>]");
    eprintln!("  exam-app status  [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Session options:");
    eprintln!("  --name <text>              test name (default: file name)");
    eprintln!("  --count <n>                questions to ask (default 20)");
    eprintln!("  --duration <minutes>       0 for untimed (default 60)");
    eprintln!("  --mode practice|exam       (default exam)");
    eprintln!("  --difficulty <list>        e.g. Easy,Hard (default all)");
    eprintln!("  --shuffle-questions  --shuffle-options  --negative-marking");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://exam.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Resume,
    Discard,
    Status,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "start" => Some(Self::Start),
            "resume" => Some(Self::Resume),
            "discard" => Some(Self::Discard),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    questions_path: Option<String>,
    draft: TestConfigDraft,
    name_given: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://exam.sqlite3".into(), normalize_sqlite_url);
        let mut questions_path = None;
        let mut draft = TestConfigDraft::with_defaults("Practice Test", TestMode::Exam);
        let mut name_given = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--questions" => questions_path = Some(require_value(args, "--questions")?),
                "--name" => {
                    draft.test_name = require_value(args, "--name")?;
                    name_given = true;
                }
                "--count" => {
                    draft.question_count =
                        parse_number("--count", require_value(args, "--count")?)?;
                }
                "--duration" => {
                    draft.duration_minutes =
                        parse_number("--duration", require_value(args, "--duration")?)?;
                }
                "--mode" => {
                    let value = require_value(args, "--mode")?;
                    draft.mode = TestMode::from_label(&value)
                        .ok_or(ArgsError::InvalidMode { raw: value })?;
                }
                "--difficulty" => {
                    draft.difficulties = parse_difficulties(&require_value(args, "--difficulty")?)?;
                }
                "--shuffle-questions" => draft.shuffle_questions = true,
                "--shuffle-options" => draft.shuffle_options = true,
                "--negative-marking" => draft.negative_marking = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            questions_path,
            draft,
            name_given,
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
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
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

/// Reads a JSON array of questions.
fn load_question_bank(path: &str) -> Result<Vec<Question>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let questions: Vec<Question> = serde_json::from_str(&raw)?;
    tracing::info!(path, count = questions.len(), "loaded question bank");
    Ok(questions)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so they never interleave with the question display.
    let stderr_layer = tracing_fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Status,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Status,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    let clock = Clock::system();
    let host = Arc::new(TerminalHost::new());
    let runner = SessionRunner::from_storage(clock, &storage, host);

    match cmd {
        Command::Start => {
            let path = parsed.questions_path.ok_or(ArgsError::MissingQuestions)?;
            let bank = load_question_bank(&path)?;
            let mut draft = parsed.draft;
            if !parsed.name_given {
                draft.test_name = std::path::Path::new(&path)
                    .file_stem()
                    .map_or_else(|| draft.test_name.clone(), |s| s.to_string_lossy().into_owned());
            }
            let config = draft.validate()?;
            let session =
                SessionBuilder::new(&config).build(bank, clock.now(), &mut rand::rng())?;

            let live = runner.start(session).await?;
            terminal::drive(live).await?;
            Ok(())
        }
        Command::Resume => {
            let Some(live) = runner.resume().await else {
                println!("No resumable session.");
                return Ok(());
            };
            terminal::drive(live).await?;
            Ok(())
        }
        Command::Discard => {
            if runner.discard().await {
                println!("Stored session discarded.");
            } else {
                println!("Could not discard the stored session; see the log.");
            }
            Ok(())
        }
        Command::Status => {
            match runner.resumable().await {
                Some(session) => {
                    let progress = session.progress.as_ref();
                    let answered = progress.map_or(0, |p| p.answers.len());
                    let elapsed = progress.map_or(0, |p| p.elapsed_seconds);
                    println!(
                        "Resumable: \"{}\" ({}), {answered}/{} answered",
                        session.config.test_name(),
                        session.config.mode(),
                        session.total_questions(),
                    );
                    match session.config.time_limit_secs() {
                        Some(limit) => println!(
                            "Time left: {}",
                            format_clock(limit.saturating_sub(elapsed))
                        ),
                        None => println!("Time spent: {}", format_clock(elapsed)),
                    }
                }
                None => println!("No resumable session."),
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
