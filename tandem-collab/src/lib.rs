mod clock;
mod config;
mod db;
mod errors;
mod invitations;
mod playback;
mod sessions;
mod track;
mod util;

pub mod events;

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use crossbeam::channel::unbounded;

pub use clock::*;
pub use config::*;
pub use db::*;
pub use errors::*;
pub use invitations::*;
pub use playback::*;
pub use sessions::*;
pub use track::*;
pub use util::within;

use events::{CollabEvent, EventReceiver, EventSender};

/// The tandem collab system, facilitating invitations, sessions, and playback sync.
pub struct Collab<Db: ?Sized = dyn Database> {
    context: CollabContext<Db>,
    event_receiver: EventReceiver,

    pub invitations: InvitationLedger<Db>,
    pub sessions: SessionManager<Db>,
    pub playback: PlaybackGateway<Db>,
}

/// A type passed to various components of the collab system, to access state and emit events.
pub struct CollabContext<Db: ?Sized> {
    pub config: Config,
    pub database: Arc<Db>,
    pub clock: Arc<dyn Clock>,

    event_sender: EventSender,
}

impl<Db> Collab<Db>
where
    Db: Database + ?Sized,
{
    pub fn new(config: Config, database: Arc<Db>) -> Self {
        Self::with_clock(config, database, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, database: Arc<Db>, clock: Arc<dyn Clock>) -> Self {
        let (event_sender, event_receiver) = unbounded();

        let context = CollabContext {
            config,
            database,
            clock,
            event_sender,
        };

        let sessions = SessionManager::new(&context);

        Self {
            invitations: InvitationLedger::new(&context, &sessions),
            playback: PlaybackGateway::new(&context),
            sessions,
            event_receiver,
            context,
        }
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    pub fn database(&self) -> &Arc<Db> {
        &self.context.database
    }

    /// Runs an operation under the configured deadline
    pub async fn within<F, T>(&self, operation: F) -> CollabResult<T>
    where
        F: Future<Output = CollabResult<T>>,
    {
        within(self.context.config.deadline, operation).await
    }

    /// Purges invitations that are past their deadline. Returns how many were removed.
    pub async fn sweep_expired_invitations(&self) -> Result<u64> {
        self.context
            .database
            .clear_expired_invitations(self.context.now())
            .await
    }

    /// Receive events from the collab system.
    pub fn events(&self) -> EventReceiver {
        self.event_receiver.clone()
    }
}

impl<Db: ?Sized> CollabContext<Db> {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn emit(&self, event: CollabEvent) {
        // Nobody listening is fine, the receiver lives as long as Collab does
        let _ = self.event_sender.send(event);
    }
}

impl<Db: ?Sized> Clone for CollabContext<Db> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            database: self.database.clone(),
            clock: self.clock.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}
