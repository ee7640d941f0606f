use std::collections::HashMap;
use std::fmt;
use std::io::Write as _;
use std::sync::Arc;

use quiz_core::model::{QuizMode, QuizSettings, QuizSettingsDraft, SessionSummary, UserId, UserProfile};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use services::{
    Advance, AnswerOutcome, CancelReason, CancelSignal, Clock, Countdown, LevelChange, LoopStep,
    ProfileOverview, ProfileService, QuizSession, SessionLoopService, SettingsService,
};
use storage::DatabaseLocation;
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://mathquiz.sqlite3";
const DEFAULT_LOG_FILTER: &str = "app=info,services=warn,storage=warn";
const DEFAULT_TOP_LIMIT: u32 = 10;
const DEFAULT_SIM_ACCURACY: f64 = 0.75;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidMode { raw: String },
    InvalidUserId { raw: String },
    InvalidAccuracy { raw: String },
    InvalidDbUrl { raw: String },
    MissingUser { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidMode { raw } => {
                write!(f, "unknown mode {raw:?} (expected single-op or random-mix)")
            }
            ArgsError::InvalidUserId { raw } => write!(f, "invalid user id: {raw}"),
            ArgsError::InvalidAccuracy { raw } => {
                write!(f, "invalid --accuracy value: {raw} (expected 0.0 to 1.0)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingUser { flag } => write!(f, "{flag} needs --user <id>"),
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

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn parse_mode(raw: String) -> Result<QuizMode, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidMode { raw })
}

fn parse_user(raw: String) -> Result<UserId, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidUserId { raw })
}

fn parse_db(raw: String) -> Result<DatabaseLocation, ArgsError> {
    DatabaseLocation::parse(&raw).map_err(|_| ArgsError::InvalidDbUrl { raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app play     [options]                 # interactive quiz on the terminal");
    eprintln!("  app simulate [options] [--accuracy p]  # auto-answer a session");
    eprintln!("  app top      [--db <url>] [--user <id>] [--limit n]");
    eprintln!("  app profile  [--user <id>] [--list | --create <name> | --random | --rename <name> | --delete]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --mode <single-op|random-mix>   question family");
    eprintln!("  --questions <n>                 questions per session");
    eprintln!("  --timer <seconds>               session countdown, 0 disables");
    eprintln!("  --advance-ms <ms>               pause after each answer");
    eprintln!("  --seed <n>                      reproducible question sequence");
    eprintln!("  --save                          store the resolved settings for the player");
    eprintln!("  --db <sqlite_url>               defaults to {DEFAULT_DB_URL}");
    eprintln!("  --memory                        keep everything in memory");
    eprintln!("  --user <id>                     player profile, defaults to the oldest one");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MATHQUIZ_DB_URL, MATHQUIZ_USER_ID, MATHQUIZ_MODE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Simulate,
    Top,
    Profile,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "simulate" | "sim" => Some(Self::Simulate),
            "top" | "leaderboard" => Some(Self::Top),
            "profile" | "profiles" => Some(Self::Profile),
            _ => None,
        }
    }
}

/// What `app profile` does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum ProfileAction {
    #[default]
    Show,
    List,
    Create(String),
    Random,
    Rename(String),
    Delete,
}

/// Settings given on the command line or through the environment.
#[derive(Debug, Clone, Default, PartialEq)]
struct Overrides {
    mode: Option<QuizMode>,
    questions: Option<u32>,
    timer_seconds: Option<u32>,
    auto_advance_ms: Option<u32>,
}

impl Overrides {
    fn apply(&self, mut draft: QuizSettingsDraft) -> QuizSettingsDraft {
        if let Some(mode) = self.mode {
            draft.mode = mode;
        }
        if let Some(questions) = self.questions {
            draft.questions_per_session = questions;
        }
        if let Some(timer) = self.timer_seconds {
            draft.timer_seconds = timer;
        }
        if let Some(ms) = self.auto_advance_ms {
            draft.auto_advance_ms = ms;
        }
        draft
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Args {
    db: DatabaseLocation,
    in_memory: bool,
    user_id: Option<UserId>,
    overrides: Overrides,
    seed: Option<u64>,
    save: bool,
    accuracy: f64,
    limit: u32,
    profile_action: ProfileAction,
}

impl Args {
    /// Parse flags over `MATHQUIZ_*` variables read through `env`.
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db = parse_db(env("MATHQUIZ_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into()))?;
        let mut user_id = env("MATHQUIZ_USER_ID").map(parse_user).transpose()?;
        let mut overrides = Overrides {
            mode: env("MATHQUIZ_MODE").map(parse_mode).transpose()?,
            ..Overrides::default()
        };
        let mut seed = None;
        let mut save = false;
        let mut in_memory = false;
        let mut accuracy = DEFAULT_SIM_ACCURACY;
        let mut limit = DEFAULT_TOP_LIMIT;
        let mut profile_action = ProfileAction::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => db = parse_db(require_value(args, "--db")?)?,
                "--memory" => in_memory = true,
                "--user" => user_id = Some(parse_user(require_value(args, "--user")?)?),
                "--mode" => overrides.mode = Some(parse_mode(require_value(args, "--mode")?)?),
                "--questions" => {
                    overrides.questions =
                        Some(parse_number("--questions", require_value(args, "--questions")?)?);
                }
                "--timer" => {
                    overrides.timer_seconds =
                        Some(parse_number("--timer", require_value(args, "--timer")?)?);
                }
                "--advance-ms" => {
                    overrides.auto_advance_ms =
                        Some(parse_number("--advance-ms", require_value(args, "--advance-ms")?)?);
                }
                "--seed" => seed = Some(parse_number("--seed", require_value(args, "--seed")?)?),
                "--save" => save = true,
                "--accuracy" => {
                    let raw = require_value(args, "--accuracy")?;
                    accuracy = raw
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|p| (0.0..=1.0).contains(p))
                        .ok_or(ArgsError::InvalidAccuracy { raw })?;
                }
                "--limit" => limit = parse_number("--limit", require_value(args, "--limit")?)?,
                "--list" => profile_action = ProfileAction::List,
                "--create" => profile_action = ProfileAction::Create(require_value(args, "--create")?),
                "--random" => profile_action = ProfileAction::Random,
                "--rename" => profile_action = ProfileAction::Rename(require_value(args, "--rename")?),
                "--delete" => profile_action = ProfileAction::Delete,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let needs_user = match profile_action {
            ProfileAction::Rename(_) => Some("--rename"),
            ProfileAction::Delete => Some("--delete"),
            _ => None,
        };
        if let Some(flag) = needs_user
            && user_id.is_none()
        {
            return Err(ArgsError::MissingUser { flag });
        }

        Ok(Self {
            db,
            in_memory,
            user_id,
            overrides,
            seed,
            save,
            accuracy,
            limit,
            profile_action,
        })
    }

    fn rng(&self) -> StdRng {
        self.seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
    }
}

async fn open_storage(args: &Args) -> Result<Storage, Box<dyn std::error::Error>> {
    if args.in_memory {
        return Ok(Storage::in_memory());
    }
    Ok(Storage::sqlite(&args.db).await?)
}

fn profile_service(storage: &Storage) -> ProfileService {
    ProfileService::new(
        Clock::default_clock(),
        Arc::clone(&storage.users),
        Arc::clone(&storage.sessions),
    )
}

/// Stored settings (or defaults) with flags and env applied on top.
async fn resolve_settings(
    storage: &Storage,
    args: &Args,
    user_id: UserId,
) -> Result<QuizSettings, Box<dyn std::error::Error>> {
    let settings_svc = SettingsService::new(Arc::clone(&storage.settings));
    let stored = settings_svc.load(user_id).await?;
    let draft = args.overrides.apply(stored.to_draft());
    if args.save {
        let saved = settings_svc.save(user_id, draft).await?;
        info!(user = %user_id, "settings saved");
        return Ok(saved);
    }
    Ok(draft.validate()?)
}

//
// ─── OUTPUT ────────────────────────────────────────────────────────────────────
//

const OPTION_LABELS: [char; 4] = ['a', 'b', 'c', 'd'];

fn print_question(session: &QuizSession, countdown: Option<&Countdown>, expression: &str, options: &[i64; 4]) {
    let state = session.state();
    let progress = session.progress();
    let mut header = format!(
        "Q{}/{}  level {}  score {}  streak {}",
        state.question_index, progress.total, state.current_level, state.score, state.current_streak
    );
    if let Some(countdown) = countdown {
        header.push_str(&format!("  {}s left", countdown.remaining()));
    }
    println!();
    println!("{header}");
    println!("  {expression} = ?");
    for (label, value) in OPTION_LABELS.iter().zip(options) {
        println!("    {label}) {value}");
    }
}

fn print_outcome(outcome: &AnswerOutcome) {
    if outcome.correct {
        println!("  Correct!");
    } else {
        println!("  Wrong, the answer was {}.", outcome.correct_answer);
    }
    match outcome.level_change {
        Some(LevelChange::Up(level)) => println!("  Level up! Now at level {level}."),
        Some(LevelChange::Down(level)) => println!("  Back to level {level}."),
        None => {}
    }
}

fn print_summary(summary: &SessionSummary) {
    println!();
    match summary.end_reason() {
        quiz_core::model::EndReason::Completed => println!("Session complete."),
        quiz_core::model::EndReason::TimeExpired => println!("Time's up!"),
    }
    println!("  score          {}", summary.final_score());
    println!(
        "  answered       {}/{}",
        summary.correct_count() + summary.wrong_count(),
        summary.total_questions()
    );
    println!("  accuracy       {:.1}%", summary.accuracy());
    println!("  best streak    {}", summary.max_streak());
    println!("  highest level  {}", summary.highest_level());
}

fn print_profile(overview: &ProfileOverview) {
    let profile = &overview.profile;
    println!(
        "{} (#{}, since {})",
        profile.display_name(),
        profile.id(),
        profile.created_at().format("%Y-%m-%d")
    );
    let Some(stats) = &overview.stats else {
        println!("  no completed sessions yet");
        return;
    };
    println!("  games played   {}", stats.games_played);
    println!("  best score     {}", stats.best_score);
    println!("  average score  {}", stats.average_score);
    println!("  accuracy       {:.1}%", stats.average_accuracy);
    println!("  best streak    {}", stats.best_streak);
    println!("  highest level  {}", stats.highest_level);
}

/// `1`–`4` or `a`–`d`.
fn parse_choice(input: &str) -> Option<usize> {
    let input = input.trim().to_ascii_lowercase();
    let mut chars = input.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return None;
    };
    match c {
        '1'..='4' => c.to_digit(10).and_then(|d| usize::try_from(d).ok()).map(|d| d - 1),
        'a'..='d' => OPTION_LABELS.iter().position(|l| *l == c),
        _ => None,
    }
}

fn is_quit(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "q" | "quit" | "exit")
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

enum Input {
    Line(String),
    Eof,
    Cancelled,
}

async fn play(
    svc: &SessionLoopService,
    settings: &QuizSettings,
    rng: &mut StdRng,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = svc.start_session(settings).await?;
    let signal = CancelSignal::new();
    let countdown = settings
        .timer_enabled()
        .then(|| Countdown::spawn(u64::from(settings.timer_seconds()), signal.clone()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "{} quiz, {} questions. Answer with 1-4 or a-d, q to quit.",
        settings.mode(),
        settings.questions_per_session()
    );

    let mut step = svc.next_question(&mut session, rng).await?;
    loop {
        let question = match step {
            Advance::Completed(summary) => {
                print_summary(&summary);
                return Ok(());
            }
            Advance::Question(question) => question,
        };
        print_question(&session, countdown.as_ref(), question.expression(), question.options());

        let choice = loop {
            print!("> ");
            std::io::stdout().flush()?;
            let input = tokio::select! {
                biased;
                _ = signal.cancelled() => Input::Cancelled,
                line = lines.next_line() => match line? {
                    Some(line) => Input::Line(line),
                    None => Input::Eof,
                },
            };
            match input {
                Input::Cancelled => break None,
                Input::Eof => {
                    signal.cancel(CancelReason::Abandoned);
                    break None;
                }
                Input::Line(line) if is_quit(&line) => {
                    signal.cancel(CancelReason::Abandoned);
                    break None;
                }
                Input::Line(line) => match parse_choice(&line) {
                    Some(index) => break Some(index),
                    None => println!("  Pick 1-4 or a-d, q to quit."),
                },
            }
        };

        let Some(index) = choice else {
            if signal.reason() == Some(CancelReason::TimeExpired) {
                let summary = svc.expire(&mut session).await?;
                print_summary(&summary);
            } else {
                svc.abandon(&mut session)?;
                println!("\nSession abandoned.");
            }
            return Ok(());
        };

        let outcome = svc.answer_current(&mut session, index).await?;
        print_outcome(&outcome);

        step = match svc.pause_then_next(&mut session, rng, &signal).await? {
            LoopStep::Next(next) => next,
            LoopStep::Abandoned => {
                println!("\nSession abandoned.");
                return Ok(());
            }
        };
    }
}

async fn simulate(
    svc: &SessionLoopService,
    settings: &QuizSettings,
    rng: &mut StdRng,
    accuracy: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = svc.start_session(settings).await?;
    loop {
        match svc.next_question(&mut session, rng).await? {
            Advance::Question(question) => {
                let index = if rng.random_bool(accuracy) {
                    question.correct_index()
                } else {
                    (question.correct_index() + rng.random_range(1..4)) % 4
                };
                let outcome = svc.answer_current(&mut session, index).await?;
                println!(
                    "Q{:<3} L{:<2} {:<24} = {:>5}  picked {:>5}  {}",
                    outcome.state.question_index,
                    question.level().value(),
                    question.expression(),
                    question.correct_answer(),
                    question.options()[index],
                    if outcome.correct { "ok" } else { "miss" }
                );
            }
            Advance::Completed(summary) => {
                print_summary(&summary);
                return Ok(());
            }
        }
    }
}

async fn top(
    storage: &Storage,
    profiles: &ProfileService,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let rows = storage.sessions.top_sessions(args.limit, args.user_id).await?;
    if rows.is_empty() {
        println!("No completed sessions yet.");
        return Ok(());
    }
    let names: HashMap<UserId, String> = profiles
        .list()
        .await?
        .into_iter()
        .map(|p| (p.id(), p.display_name().to_string()))
        .collect();
    println!("  #  player                    score  accuracy  streak  level  mode        finished");
    for (rank, record) in rows.iter().enumerate() {
        let Some(summary) = &record.summary else {
            continue;
        };
        let player = record
            .user_id
            .and_then(|id| names.get(&id))
            .map_or("-", String::as_str);
        println!(
            "{:>3}  {:<24}  {:>5}  {:>7.1}%  {:>6}  {:>5}  {:<10}  {}",
            rank + 1,
            player,
            summary.final_score(),
            summary.accuracy(),
            summary.max_streak(),
            summary.highest_level().value(),
            record.mode.label(),
            summary.completed_at().format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn profile(
    profiles: &ProfileService,
    args: &Args,
    rng: &mut StdRng,
) -> Result<(), Box<dyn std::error::Error>> {
    let announce = |verb: &str, p: &UserProfile| println!("{verb} profile #{}: {}", p.id(), p.display_name());
    match (&args.profile_action, args.user_id) {
        (ProfileAction::List, _) => {
            let users = profiles.list().await?;
            if users.is_empty() {
                println!("No profiles yet.");
            }
            for p in &users {
                println!(
                    "{:>4}  {:<24}  since {}",
                    p.id().to_string(),
                    p.display_name(),
                    p.created_at().format("%Y-%m-%d")
                );
            }
        }
        (ProfileAction::Create(name), _) => announce("Created", &profiles.create(name).await?),
        (ProfileAction::Random, _) => announce("Created", &profiles.create_random(rng).await?),
        (ProfileAction::Rename(name), Some(id)) => {
            announce("Renamed", &profiles.rename(id, name).await?);
        }
        (ProfileAction::Delete, Some(id)) => {
            let gone = profiles.get(id).await?;
            profiles.delete(id).await?;
            announce("Deleted", &gone);
        }
        (ProfileAction::Show, requested) => {
            let current = profiles.current(requested, rng).await?;
            print_profile(&profiles.overview(current.id()).await?);
        }
        (ProfileAction::Rename(_), None) => return Err(ArgsError::MissingUser { flag: "--rename" }.into()),
        (ProfileAction::Delete, None) => return Err(ArgsError::MissingUser { flag: "--delete" }.into()),
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
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
    let args = Args::parse(&mut iter, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate storage at startup. Keep this in the binary glue so core/services stay pure.
    let storage = open_storage(&args).await?;
    let profiles = profile_service(&storage);
    let mut rng = args.rng();

    match cmd {
        Command::Top => top(&storage, &profiles, &args).await,
        Command::Profile => profile(&profiles, &args, &mut rng).await,
        Command::Play | Command::Simulate => {
            let player = profiles.current(args.user_id, &mut rng).await?;
            println!("Playing as {}.", player.display_name());
            let settings = resolve_settings(&storage, &args, player.id()).await?;
            let svc = SessionLoopService::new(
                Clock::default_clock(),
                Arc::clone(&storage.sessions),
                Arc::clone(&storage.records),
            )
            .with_user(player.id());
            if cmd == Command::Play {
                play(&svc, &settings, &mut rng).await
            } else {
                simulate(&svc, &settings, &mut rng, args.accuracy).await
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str], env: &[(&str, &str)]) -> Result<Args, ArgsError> {
        let env: Vec<(String, String)> = env
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter, |key| {
            env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
    }

    #[test]
    fn flags_override_environment() {
        let args = parse(
            &["--mode", "single-op", "--questions", "5", "--user", "7"],
            &[("MATHQUIZ_MODE", "random-mix"), ("MATHQUIZ_USER_ID", "3")],
        )
        .unwrap();
        assert_eq!(args.overrides.mode, Some(QuizMode::SingleOp));
        assert_eq!(args.overrides.questions, Some(5));
        assert_eq!(args.user_id, Some(UserId::new(7)));
    }

    #[test]
    fn environment_fills_in_missing_flags() {
        let args = parse(&[], &[("MATHQUIZ_MODE", "Random Mix"), ("MATHQUIZ_DB_URL", "sqlite://x.db")])
            .unwrap();
        assert_eq!(args.overrides.mode, Some(QuizMode::RandomMix));
        assert_eq!(args.db, DatabaseLocation::File("x.db".into()));
        assert_eq!(args.user_id, None);
        assert_eq!(args.profile_action, ProfileAction::Show);
    }

    #[test]
    fn database_flags_become_locations() {
        let args = parse(&["--db", "sqlite::memory:"], &[("MATHQUIZ_DB_URL", "sqlite://x.db")]).unwrap();
        assert_eq!(args.db, DatabaseLocation::Memory);
        let args = parse(&["--db", "data/quiz.db"], &[]).unwrap();
        assert_eq!(args.db, DatabaseLocation::File("data/quiz.db".into()));
        assert!(matches!(parse(&["--db", " "], &[]), Err(ArgsError::InvalidDbUrl { .. })));
        assert!(matches!(
            parse(&[], &[("MATHQUIZ_DB_URL", "sqlite://")]),
            Err(ArgsError::InvalidDbUrl { .. })
        ));
    }

    #[test]
    fn profile_actions_parse() {
        assert_eq!(parse(&["--list"], &[]).unwrap().profile_action, ProfileAction::List);
        assert_eq!(parse(&["--random"], &[]).unwrap().profile_action, ProfileAction::Random);
        assert_eq!(
            parse(&["--create", "Ada"], &[]).unwrap().profile_action,
            ProfileAction::Create("Ada".into())
        );
        let args = parse(&["--rename", "Grace", "--user", "2"], &[]).unwrap();
        assert_eq!(args.profile_action, ProfileAction::Rename("Grace".into()));
        assert_eq!(args.user_id, Some(UserId::new(2)));
        assert!(matches!(
            parse(&["--create"], &[]),
            Err(ArgsError::MissingValue { flag: "--create" })
        ));
    }

    #[test]
    fn rename_and_delete_need_a_user() {
        assert!(matches!(
            parse(&["--rename", "Grace"], &[]),
            Err(ArgsError::MissingUser { flag: "--rename" })
        ));
        assert!(matches!(
            parse(&["--delete"], &[]),
            Err(ArgsError::MissingUser { flag: "--delete" })
        ));
        let args = parse(&["--delete"], &[("MATHQUIZ_USER_ID", "4")]).unwrap();
        assert_eq!(args.user_id, Some(UserId::new(4)));
    }

    #[test]
    fn unknown_mode_is_a_configuration_error() {
        assert!(matches!(
            parse(&["--mode", "hard"], &[]),
            Err(ArgsError::InvalidMode { .. })
        ));
        assert!(matches!(
            parse(&[], &[("MATHQUIZ_MODE", "chaos")]),
            Err(ArgsError::InvalidMode { .. })
        ));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse(&["--questions"], &[]),
            Err(ArgsError::MissingValue { flag: "--questions" })
        ));
        assert!(matches!(
            parse(&["--timer", "soon"], &[]),
            Err(ArgsError::InvalidNumber { flag: "--timer", .. })
        ));
        assert!(matches!(
            parse(&["--accuracy", "1.5"], &[]),
            Err(ArgsError::InvalidAccuracy { .. })
        ));
        assert!(matches!(parse(&["--bogus"], &[]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(parse(&["--all"], &[]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(
            parse(&["--user", "me"], &[]),
            Err(ArgsError::InvalidUserId { .. })
        ));
    }

    #[test]
    fn overrides_apply_over_stored_settings() {
        let stored = QuizSettings::from_persisted(QuizMode::SingleOp, 20, 60, 500).unwrap();
        let overrides = Overrides {
            questions: Some(5),
            timer_seconds: Some(0),
            ..Overrides::default()
        };
        let settings = overrides.apply(stored.to_draft()).validate().unwrap();
        assert_eq!(settings.mode(), QuizMode::SingleOp);
        assert_eq!(settings.questions_per_session(), 5);
        assert!(!settings.timer_enabled());
        assert_eq!(settings.auto_advance_ms(), 500);
    }

    #[test]
    fn choices_accept_digits_and_letters() {
        assert_eq!(parse_choice("1"), Some(0));
        assert_eq!(parse_choice(" 4 "), Some(3));
        assert_eq!(parse_choice("C"), Some(2));
        assert_eq!(parse_choice("5"), None);
        assert_eq!(parse_choice("ab"), None);
        assert_eq!(parse_choice(""), None);
        assert!(is_quit("Q"));
        assert!(!is_quit("a"));
    }
}
