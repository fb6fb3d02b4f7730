use std::fmt::Display;

use colored::{Color, Colorize};
use log::{info, Level, SetLoggerError};
use tandem_collab::events::CollabEvent;

/// External crates only need to log warnings and errors
const ALLOWED_EXTERNAL_LEVELS: [Level; 2] = [Level::Warn, Level::Error];
const ALLOWED_LEVELS: [Level; 3] = [Level::Info, Level::Warn, Level::Error];

pub type LogColor = Color;

pub fn init_logger() -> Result<(), SetLoggerError> {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = Target::from_str(record.target());
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_to_string(&record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                target,
                message
            ))
        })
        .filter(|meta| {
            let target = Target::from_str(meta.target());

            let is_allowed = ALLOWED_LEVELS.contains(&meta.level());
            let is_severe = ALLOWED_EXTERNAL_LEVELS.contains(&meta.level());

            target.is_local() && is_allowed || is_severe
        })
        .chain(std::io::stdout())
        .apply()
}

/// Writes an event from the collab system to the log
pub fn log_event(event: &CollabEvent) {
    let tag = "EVENT".color(LogColor::Cyan).bold();

    match event {
        CollabEvent::InvitationCreated {
            invitation_id,
            from_id,
            to_id,
        } => info!("{tag} invitation {invitation_id} from {from_id} to {to_id}"),
        CollabEvent::InvitationAccepted {
            invitation_id,
            session_id,
        } => info!("{tag} invitation {invitation_id} accepted, session {session_id}"),
        CollabEvent::InvitationDeclined { invitation_id } => {
            info!("{tag} invitation {invitation_id} declined")
        }
        CollabEvent::InvitationExpired { invitation_id } => {
            info!("{tag} invitation {invitation_id} expired")
        }
        CollabEvent::SessionStarted {
            session_id,
            host_id,
            participant_id,
        } => info!("{tag} session {session_id} started by {host_id} with {participant_id}"),
        CollabEvent::SessionEnded { session_id, reason } => {
            info!("{tag} session {session_id} ended ({reason:?})")
        }
        CollabEvent::UserLeft {
            session_id,
            user_id,
        } => info!("{tag} user {user_id} left session {session_id}"),
        CollabEvent::PlaybackUpdated {
            session_id,
            snapshot,
        } => info!(
            "{tag} session {session_id} {} at {:.1}s",
            if snapshot.playback.is_playing {
                "playing"
            } else {
                "paused"
            },
            snapshot.playback.position
        ),
    }
}

enum Target {
    External(String),
    Server,
    Collab,
    Tandem,
}

impl Target {
    fn from_str(str: &str) -> Self {
        let module = str.split("::").next().unwrap_or_default();

        match module {
            "tandem" => Self::Tandem,
            "tandem_server" => Self::Server,
            "tandem_collab" => Self::Collab,
            other => Target::External(other.to_string()),
        }
    }

    fn is_local(&self) -> bool {
        !matches!(self, Self::External(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Target::External(x) => x.as_str().clear(),
            Target::Server => "SERVER".bright_green(),
            Target::Collab => "COLLAB".bright_purple(),
            Target::Tandem => "TANDEM".blue(),
        };

        Display::fmt(&result, f)
    }
}

fn level_to_string(level: &Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}
