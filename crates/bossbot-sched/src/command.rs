//! Admin command interpreter.
//!
//! Turns one line of admin text into a structured request. Unrecognized text
//! is ignored entirely; malformed known commands come back as errors whose
//! `Display` is the user-facing usage message.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid regex"));
static CHANNEL_MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<#([0-9]+)>$").expect("valid regex"));
static ROLE_MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<@&([0-9]+)>$").expect("valid regex"));
static SNOWFLAKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{17,19}$").expect("valid regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Uso: `!agenda HH:MM #canal @role nome_do_boss [mensagem opcional]` (hora inválida)")]
    InvalidTime,
    #[error(
        "Não consegui encontrar o nome do boss. Uso: `!agenda HH:MM #canal @role nome_do_boss [mensagem opcional]`"
    )]
    MissingBossKey,
    #[error("Canal ou Role inválidos. Marque um canal e uma role ou use ids válidos.")]
    InvalidTarget,
    #[error("Coloque o ID: `!remover ID`")]
    MissingRemoveId,
    #[error("Uso: !run ID")]
    MissingRunId,
}

/// A validated schedule-creation request, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// `HH:MM`, shape-checked only.
    pub time: String,
    pub channel_id: String,
    pub role_id: String,
    /// Free-text boss key, not yet resolved against the catalog.
    pub boss_key: String,
    /// Everything after the boss key, single-spaced.
    pub extra_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(CreateRequest),
    List,
    Remove { id: String },
    Run { id: String },
    Clear,
    Debug,
}

/// Parse one message. `None` means the text is not a known command and must
/// be ignored without any reply.
pub fn parse(content: &str) -> Option<Result<Command, CommandError>> {
    let content = content.trim();

    match content {
        "!lista" | "!listaschedules" => return Some(Ok(Command::List)),
        "!limpar" => return Some(Ok(Command::Clear)),
        "!debug" | "!debugschedules" => return Some(Ok(Command::Debug)),
        _ => {}
    }

    if let Some(rest) = strip_command(content, &["!agenda"]) {
        return Some(parse_create(rest));
    }
    if let Some(rest) = strip_command(content, &["!remover", "!removeschedule"]) {
        return Some(match rest.split_whitespace().next() {
            Some(id) => Ok(Command::Remove { id: id.to_string() }),
            None => Err(CommandError::MissingRemoveId),
        });
    }
    if let Some(rest) = strip_command(content, &["!run"]) {
        return Some(match rest.split_whitespace().next() {
            Some(id) => Ok(Command::Run { id: id.to_string() }),
            None => Err(CommandError::MissingRunId),
        });
    }

    None
}

/// Match `<keyword> <rest>` for any of the given keywords. A bare keyword
/// with no space is not a command invocation.
fn strip_command<'a>(content: &'a str, keywords: &[&str]) -> Option<&'a str> {
    for keyword in keywords {
        if let Some(rest) = content.strip_prefix(keyword) {
            if rest.starts_with(' ') {
                return Some(rest);
            }
        }
    }
    None
}

fn parse_create(rest: &str) -> Result<Command, CommandError> {
    let parts: Vec<&str> = rest.split_whitespace().collect();

    let time = match parts.first() {
        Some(t) if TIME_RE.is_match(t) => (*t).to_string(),
        _ => return Err(CommandError::InvalidTime),
    };

    // Channel and role come from mention tokens when present, else from the
    // positional tokens with everything non-numeric stripped.
    let channel_id = parts
        .iter()
        .find_map(|t| CHANNEL_MENTION_RE.captures(t))
        .map(|c| c[1].to_string())
        .or_else(|| parts.get(1).and_then(|t| digits_of(t)));
    let role_id = parts
        .iter()
        .find_map(|t| ROLE_MENTION_RE.captures(t))
        .map(|c| c[1].to_string())
        .or_else(|| parts.get(2).and_then(|t| digits_of(t)));

    // Boss key: first token past the time that is not a channel mention, a
    // role mention, or a bare snowflake equal to the resolved channel/role.
    let mut boss_key = None;
    let mut boss_index = 0;
    for (i, tok) in parts.iter().enumerate().skip(1) {
        if CHANNEL_MENTION_RE.is_match(tok) || tok.starts_with('#') {
            continue;
        }
        if ROLE_MENTION_RE.is_match(tok) || tok.starts_with('@') {
            continue;
        }
        if SNOWFLAKE_RE.is_match(tok)
            && (Some(*tok) == channel_id.as_deref() || Some(*tok) == role_id.as_deref())
        {
            continue;
        }
        boss_key = Some((*tok).to_string());
        boss_index = i;
        break;
    }

    let Some(boss_key) = boss_key else {
        return Err(CommandError::MissingBossKey);
    };

    let (Some(channel_id), Some(role_id)) = (channel_id, role_id) else {
        return Err(CommandError::InvalidTarget);
    };

    let extra_text = parts[boss_index + 1..].join(" ");

    Ok(Command::Create(CreateRequest {
        time,
        channel_id,
        role_id,
        boss_key,
        extra_text,
    }))
}

/// Keep only the digits of a token; `None` if nothing numeric remains.
fn digits_of(token: &str) -> Option<String> {
    let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() { None } else { Some(digits) }
}
