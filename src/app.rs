use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::canonical;
use crate::config;
use crate::data;
use crate::hidden::HiddenRegistry;
use crate::logging;
use crate::session;
use crate::storage;

const DEFAULT_SITES_LIMIT: usize = 5;

pub const USAGE: &str = "Cellophane - canonical note sources and locally hidden notes.

Usage: cellophane [--config <path>] <command> [args]

Commands:
  canonicalize <url>...     Print the canonical form of each URL
  domain <url>              Print the site a URL belongs to
  login <user>              Use <user>'s hidden list from now on
  logout                    Go back to the guest hidden list
  whoami                    Print the active user (or guest)
  hide <id>...              Hide notes from the feed
  unhide <id>...            Show previously hidden notes again
  hidden                    List hidden note ids, oldest first
  clear-hidden              Forget every hidden note for the active user
  feed <notes.json>         Print the notes that are not hidden
  sites <notes.json> [n]    Print the n most noted sites (default 5)

Options:
  --config <path>           Read configuration from <path>
  --version, -V             Show version and exit
  --help,    -h             Show this help message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Canonicalize(Vec<String>),
    Domain(String),
    Login(String),
    Logout,
    WhoAmI,
    Hide(Vec<String>),
    Unhide(Vec<String>),
    Hidden,
    ClearHidden,
    Feed(PathBuf),
    Sites { path: PathBuf, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config_file: Option<PathBuf>,
    pub command: Command,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("missing command")]
    MissingCommand,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("{0}: missing <{1}>")]
    MissingArgument(String, &'static str),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("--config requires a path")]
    MissingConfigPath,
}

pub fn parse_args<I>(args: I) -> Result<Invocation, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let mut config_file = None;
    let mut rest = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args.next().ok_or(UsageError::MissingConfigPath)?;
            config_file = Some(PathBuf::from(path));
        } else if let Some(path) = arg.strip_prefix("--config=") {
            config_file = Some(PathBuf::from(path));
        } else {
            rest.push(arg);
        }
    }

    let mut rest = rest.into_iter();
    let name = rest.next().ok_or(UsageError::MissingCommand)?;
    let operands: Vec<String> = rest.collect();

    let first = |what: &'static str| {
        operands
            .first()
            .cloned()
            .ok_or_else(|| UsageError::MissingArgument(name.clone(), what))
    };
    let many = |what: &'static str| {
        if operands.is_empty() {
            Err(UsageError::MissingArgument(name.clone(), what))
        } else {
            Ok(operands.clone())
        }
    };

    let command = match name.as_str() {
        "canonicalize" => Command::Canonicalize(many("url")?),
        "domain" => Command::Domain(first("url")?),
        "login" => Command::Login(first("user")?),
        "logout" => Command::Logout,
        "whoami" => Command::WhoAmI,
        "hide" => Command::Hide(many("id")?),
        "unhide" => Command::Unhide(many("id")?),
        "hidden" => Command::Hidden,
        "clear-hidden" => Command::ClearHidden,
        "feed" => Command::Feed(PathBuf::from(first("notes.json")?)),
        "sites" => {
            let path = PathBuf::from(first("notes.json")?);
            let limit = match operands.get(1) {
                Some(raw) => raw
                    .parse::<usize>()
                    .map_err(|_| UsageError::InvalidLimit(raw.clone()))?,
                None => DEFAULT_SITES_LIMIT,
            };
            Command::Sites { path, limit }
        }
        _ => return Err(UsageError::UnknownCommand(name.clone())),
    };

    Ok(Invocation {
        config_file,
        command,
    })
}

pub fn run(invocation: Invocation, out: &mut dyn Write) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: invocation.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    logging::init(&cfg.log.filter);

    match invocation.command {
        Command::Canonicalize(urls) => {
            for url in urls {
                writeln!(out, "{}", canonical::canonicalize(&url))?;
            }
        }
        Command::Domain(url) => {
            writeln!(out, "{}", canonical::site_domain(&canonical::canonicalize(&url)))?;
        }
        Command::Sites { path, limit } => {
            let notes = data::load_notes(&path)?;
            for site in data::public_sites(&notes, limit) {
                writeln!(out, "{}\t{}", site.count, site.domain)?;
            }
        }
        command => run_with_store(command, &cfg, out)?,
    }
    Ok(())
}

fn run_with_store(command: Command, cfg: &config::Config, out: &mut dyn Write) -> Result<()> {
    let store = Arc::new(
        storage::Store::open(storage::Options {
            path: cfg.storage.path.clone(),
        })
        .context("open storage")?,
    );
    let sessions = session::Manager::new(store.clone());
    sessions.load_existing()?;
    let registry = HiddenRegistry::new(store.clone(), cfg.hidden.registry_options());
    let scope = sessions.scope();

    match command {
        Command::Login(user) => {
            sessions.sign_in(&user)?;
            writeln!(out, "{}", sessions.scope())?;
        }
        Command::Logout => {
            sessions.sign_out()?;
            writeln!(out, "{}", sessions.scope())?;
        }
        Command::WhoAmI => {
            writeln!(out, "{scope}")?;
        }
        Command::Hide(ids) => {
            for id in ids {
                registry.hide(&scope, &id);
            }
        }
        Command::Unhide(ids) => {
            for id in ids {
                registry.unhide(&scope, &id);
            }
        }
        Command::Hidden => {
            for id in registry.hidden_ids(&scope) {
                writeln!(out, "{id}")?;
            }
        }
        Command::ClearHidden => {
            registry.clear(&scope);
        }
        Command::Feed(path) => {
            let notes = data::load_notes(&path)?;
            for note in registry.filter_visible(&scope, notes) {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    note.id,
                    note.visibility.display_name(),
                    note.url,
                    single_line(&note.text)
                )?;
            }
        }
        Command::Canonicalize(_) | Command::Domain(_) | Command::Sites { .. } => {}
    }

    drop(registry);
    drop(sessions);
    if let Ok(store) = Arc::try_unwrap(store) {
        store.close()?;
    }
    Ok(())
}

fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_commands_and_config() {
        let inv = parse_args(args(&["--config", "/tmp/c.yaml", "hide", "a", "b"])).unwrap();
        assert_eq!(inv.config_file, Some(PathBuf::from("/tmp/c.yaml")));
        assert_eq!(inv.command, Command::Hide(args(&["a", "b"])));

        let inv = parse_args(args(&["sites", "feed.json", "3"])).unwrap();
        assert_eq!(
            inv.command,
            Command::Sites {
                path: PathBuf::from("feed.json"),
                limit: 3
            }
        );
    }

    #[test]
    fn reports_usage_errors() {
        assert_eq!(parse_args(args(&[])), Err(UsageError::MissingCommand));
        assert_eq!(
            parse_args(args(&["frobnicate"])),
            Err(UsageError::UnknownCommand("frobnicate".into()))
        );
        assert_eq!(
            parse_args(args(&["hide"])),
            Err(UsageError::MissingArgument("hide".into(), "id"))
        );
        assert_eq!(
            parse_args(args(&["sites", "f.json", "many"])),
            Err(UsageError::InvalidLimit("many".into()))
        );
        assert_eq!(
            parse_args(args(&["hidden", "--config"])),
            Err(UsageError::MissingConfigPath)
        );
    }

    #[test]
    fn feed_text_stays_on_one_column() {
        assert_eq!(single_line("a\tb\r\nc"), "a b  c");
        assert_eq!(single_line("plain text"), "plain text");
    }

    #[test]
    fn canonicalize_writes_one_line_per_url() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation {
            config_file: Some(dir.path().join("none.yaml")),
            command: Command::Canonicalize(args(&["Example.com/a/", "http://x.org:80/#f"])),
        };
        let mut out = Vec::new();
        run(inv, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "https://example.com/a\nhttp://x.org/\n"
        );
    }
}
