use std::{error::Error, io::Write, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, Finger, FprintdSensor, Sensor, SensorTimeouts, SimulatedSensor};
use migration::MigratorTrait;
use sea_orm::Database;

#[derive(Parser, Debug)]
#[command(name = "fingergate_admin")]
#[command(about = "Admin utilities for Fingergate (users, enrollment, verification)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./fingergate.db?mode=rwc"
    )]
    database_url: String,

    /// Path of the JSON label store.
    #[arg(long, default_value = "fingerprints_labels.json")]
    labels: PathBuf,

    /// Use the in-memory simulated sensor instead of fprintd.
    #[arg(long)]
    simulated: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    /// Enroll a finger for an existing user.
    Enroll(EnrollArgs),
    /// One-to-one verification of a named user.
    Verify(VerifyArgs),
    /// One-to-many identification across registered users.
    Identify(IdentifyArgs),
    /// List the enrolled fingers of a user.
    Fingers(UsernameArg),
    /// Delete a single enrolled finger.
    DeleteFinger(FingerArgs),
    /// Delete every enrolled finger of a user.
    DeleteAll(UsernameArg),
    Label(Label),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UsernameArg),
    List,
    Delete(UsernameArg),
}

#[derive(Args, Debug)]
struct UsernameArg {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct EnrollArgs {
    #[arg(long)]
    username: String,
    #[arg(long, default_value = "right-index-finger", value_parser = parse_finger)]
    finger: Finger,
    #[arg(long)]
    label: Option<String>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    #[arg(long)]
    username: String,
    /// Specific finger to match against; omit to match any enrolled finger.
    #[arg(long, value_parser = parse_finger)]
    finger: Option<Finger>,
}

#[derive(Args, Debug)]
struct IdentifyArgs {
    /// Restrict identification to these users; omit to check everyone.
    #[arg(long = "candidate")]
    candidates: Vec<String>,
}

#[derive(Args, Debug)]
struct FingerArgs {
    #[arg(long)]
    username: String,
    #[arg(long, value_parser = parse_finger)]
    finger: Finger,
}

#[derive(Args, Debug)]
struct Label {
    #[command(subcommand)]
    command: LabelCommand,
}

#[derive(Subcommand, Debug)]
enum LabelCommand {
    /// Attach or replace a label without re-enrolling.
    Set(LabelSetArgs),
    Remove(FingerArgs),
}

#[derive(Args, Debug)]
struct LabelSetArgs {
    #[arg(long)]
    username: String,
    #[arg(long, value_parser = parse_finger)]
    finger: Finger,
    #[arg(long)]
    label: String,
}

fn parse_finger(raw: &str) -> Result<Finger, String> {
    Finger::try_from(raw).map_err(|err| err.to_string())
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn build_engine(cli: &Cli) -> Result<Engine, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(&cli.database_url).await?;
    migration::Migrator::up(&db, None).await?;

    let sensor = if cli.simulated {
        Sensor::Simulated(SimulatedSensor::new())
    } else {
        match FprintdSensor::connect(SensorTimeouts::default()).await {
            Ok(sensor) => Sensor::Fprintd(sensor),
            Err(err) => {
                eprintln!("fingerprint daemon unreachable ({err}); using simulated sensor");
                Sensor::Simulated(SimulatedSensor::new())
            }
        }
    };

    Ok(Engine::builder()
        .database(db)
        .sensor(sensor)
        .labels_path(cli.labels.clone())
        .build()?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let engine = build_engine(&cli).await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let user = engine.register_user(&args.username, &password).await?;
            println!("created user: {} (id {})", user.username, user.id);
        }
        Command::User(User {
            command: UserCommand::List,
        }) => {
            for user in engine.list_users().await? {
                println!(
                    "{}\t{}\t{} fingerprint(s)",
                    user.id,
                    user.username,
                    user.fingerprints.len()
                );
            }
        }
        Command::User(User {
            command: UserCommand::Delete(args),
        }) => {
            engine.delete_user(&args.username).await?;
            println!("deleted user: {}", args.username);
        }
        Command::Enroll(args) => {
            println!("Place your finger on the sensor...");
            engine
                .enroll(&args.username, args.finger, args.label.as_deref())
                .await?;
            println!("enrolled {} for {}", args.finger, args.username);
        }
        Command::Verify(args) => {
            println!("Place your finger on the sensor...");
            if engine.verify(&args.username, args.finger).await? {
                println!("access granted: {}", args.username);
            } else {
                println!("access denied: {}", args.username);
                std::process::exit(1);
            }
        }
        Command::Identify(args) => {
            let candidates = (!args.candidates.is_empty()).then_some(args.candidates);
            println!("Place your finger on the sensor...");
            let outcome = engine.identify(candidates.as_deref()).await?;
            match outcome.user {
                Some(user) => {
                    println!("identified: {} (id {})", user.username, user.id);
                    if let Some(finger) = user.finger {
                        match user.label {
                            Some(label) => println!("matched finger: {finger} ({label})"),
                            None => println!("matched finger: {finger}"),
                        }
                    }
                }
                None => {
                    println!(
                        "no match among {} user(s), {} fingerprint(s)",
                        outcome.users_checked, outcome.total_fingerprints
                    );
                    std::process::exit(1);
                }
            }
        }
        Command::Fingers(args) => {
            let fingers = engine.enrolled_fingers(&args.username).await?;
            if fingers.is_empty() {
                println!("no enrolled fingers for {}", args.username);
            }
            for entry in fingers {
                match entry.label {
                    Some(label) => println!("{}\t{label}", entry.finger),
                    None => println!("{}", entry.finger),
                }
            }
        }
        Command::DeleteFinger(args) => {
            engine.delete_finger(&args.username, args.finger).await?;
            println!("deleted {} for {}", args.finger, args.username);
        }
        Command::DeleteAll(args) => {
            engine.delete_all_fingers(&args.username).await?;
            println!("deleted all fingerprints for {}", args.username);
        }
        Command::Label(Label {
            command: LabelCommand::Set(args),
        }) => {
            engine
                .set_label(&args.username, args.finger, &args.label)
                .await?;
            println!("labeled {} as \"{}\"", args.finger, args.label);
        }
        Command::Label(Label {
            command: LabelCommand::Remove(args),
        }) => {
            engine.remove_label(&args.username, args.finger).await?;
            println!("removed label from {}", args.finger);
        }
    }

    Ok(())
}
