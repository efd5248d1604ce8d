//! Command-line front end for the attendance core.
//!
//! # Responsibility
//! - Wire config, logging and storage the same way an embedding app would.
//! - Expose a handful of operations for local sanity checks.
//!
//! Usage: `rollcall [--config <file>] <command> [args...]`

use log::error;
use rollcall_core::db::{open_db, open_db_in_memory};
use rollcall_core::{
    init_logging_from_config, CoreConfig, IdentityService, LedgerService, ParticipationStatus,
    PersonId, SqliteEventRepository, SqliteParticipationRepository, SqlitePersonRepository,
    SqliteVenueRepository, VenueService,
};
use rusqlite::Connection;
use std::process::ExitCode;

const USAGE: &str = "usage: rollcall [--config <file>] <command>

commands:
  ping                              print core health and version
  register <full name> [DD/MM] [email]
  present <person id>               record presence at the active event
  absent <person id>                record absence at the active event
  summary <person id>               present/absent totals
  venues                            list venues
  venue-add <name>                  register a venue";

fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    match run(&mut args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &mut Vec<String>) -> Result<String, String> {
    let config = match take_config_path(args)? {
        Some(path) => CoreConfig::load(&path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    };
    init_logging_from_config(&config)?;

    let Some(command) = args.first().cloned() else {
        return Err(USAGE.to_string());
    };
    if command == "ping" {
        return Ok(format!(
            "rollcall_core ping={} version={}",
            rollcall_core::ping(),
            rollcall_core::core_version()
        ));
    }

    let conn = open_connection(&config)?;
    let result = dispatch(&conn, &config, &command, &args[1..]);
    if result.is_err() {
        error!("event=cli_command module=cli status=error command={command}");
    }
    result
}

fn dispatch(
    conn: &Connection,
    config: &CoreConfig,
    command: &str,
    rest: &[String],
) -> Result<String, String> {
    match command {
        "register" => {
            let name = rest.first().ok_or(USAGE)?;
            let identity = IdentityService::new(repo(SqlitePersonRepository::try_new(conn))?);
            let resolved = identity
                .resolve_or_create(name, arg(rest, 1), arg(rest, 2))
                .map_err(|err| err.to_string())?;
            Ok(format!("#{} {}", resolved.person.id, resolved.message))
        }
        "present" | "absent" => {
            let person_id = parse_id(rest.first())?;
            let status = if command == "present" {
                ParticipationStatus::Present
            } else {
                ParticipationStatus::Absent
            };
            let policy = config.fallback_policy().map_err(|err| err.to_string())?;
            let ledger = LedgerService::new(
                repo(SqliteEventRepository::try_new(conn))?,
                repo(SqliteParticipationRepository::try_new(conn))?,
                repo(SqlitePersonRepository::try_new(conn))?,
                policy,
            );
            let entry = ledger
                .record_participation(person_id, status)
                .map_err(|err| err.to_string())?;
            Ok(entry.message)
        }
        "summary" => {
            let person_id = parse_id(rest.first())?;
            let policy = config.fallback_policy().map_err(|err| err.to_string())?;
            let ledger = LedgerService::new(
                repo(SqliteEventRepository::try_new(conn))?,
                repo(SqliteParticipationRepository::try_new(conn))?,
                repo(SqlitePersonRepository::try_new(conn))?,
                policy,
            );
            let summary = ledger
                .attendance_summary(person_id)
                .map_err(|err| err.to_string())?;
            Ok(format!(
                "present={} absent={} total={}",
                summary.present,
                summary.absent,
                summary.total()
            ))
        }
        "venues" => {
            let venues = VenueService::new(repo(SqliteVenueRepository::try_new(conn))?)
                .list_all()
                .map_err(|err| err.to_string())?;
            Ok(venues
                .iter()
                .map(|venue| format!("#{} {}", venue.id, venue.name))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        "venue-add" => {
            let name = rest.first().ok_or(USAGE)?;
            let venue = VenueService::new(repo(SqliteVenueRepository::try_new(conn))?)
                .create(name)
                .map_err(|err| err.to_string())?;
            Ok(format!("#{} {}", venue.id, venue.name))
        }
        _ => Err(USAGE.to_string()),
    }
}

fn take_config_path(args: &mut Vec<String>) -> Result<Option<String>, String> {
    let Some(index) = args.iter().position(|arg| arg == "--config") else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        return Err("--config needs a file path".to_string());
    }
    let path = args.remove(index + 1);
    args.remove(index);
    Ok(Some(path))
}

fn open_connection(config: &CoreConfig) -> Result<Connection, String> {
    match &config.database_path {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(|err| format!("failed to open database: {err}"))
}

fn repo<T>(result: rollcall_core::RepoResult<T>) -> Result<T, String> {
    result.map_err(|err| err.to_string())
}

fn arg(rest: &[String], index: usize) -> Option<&str> {
    rest.get(index).map(String::as_str)
}

fn parse_id(value: Option<&String>) -> Result<PersonId, String> {
    let value = value.ok_or(USAGE)?;
    value
        .parse::<PersonId>()
        .map_err(|_| format!("`{value}` is not a numeric id"))
}
