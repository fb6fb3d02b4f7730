use std::{sync::Arc, thread};

use colored::Colorize;
use log::{error, info, warn};
use settings::{InvalidSetting, Settings};
use tandem_collab::{Collab, Database, DatabaseError, MemoryDatabase, PgDatabase};
use tandem_server::UserSeeding;
use thiserror::Error;
use tokio::runtime::{self, Runtime};

use crate::logging::LogColor;

mod logging;
mod settings;

pub struct Tandem {
    collab: Arc<Collab>,
    port: u16,
    seeding: UserSeeding,
    runtime: Runtime,
}

#[derive(Debug, Error)]
enum TandemError {
    #[error("Invalid configuration: {0}")]
    Settings(#[from] InvalidSetting),

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Tandem {
    fn new() -> Result<Self, TandemError> {
        let settings = Settings::from_env()?;

        info!("Building async runtime...");
        let main_runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("tandem-async")
            .build()
            .map_err(|e| TandemError::Fatal(e.to_string()))?;

        let (database, seeding): (Arc<dyn Database>, _) = match &settings.database_url {
            Some(url) => {
                info!("Connecting to database...");
                let database = main_runtime.block_on(PgDatabase::new(url))?;

                (Arc::new(database), UserSeeding::Disabled)
            }
            None => {
                warn!("TANDEM_DATABASE_URL is not set, records are kept in memory and lost on exit");
                (Arc::new(MemoryDatabase::new()), UserSeeding::Enabled)
            }
        };

        Ok(Self {
            collab: Arc::new(Collab::new(settings.config, database)),
            port: settings.port,
            seeding,
            runtime: main_runtime,
        })
    }

    fn run(&self) -> Result<(), TandemError> {
        let events = self.collab.events();
        thread::spawn(move || {
            for event in events {
                logging::log_event(&event);
            }
        });

        self.runtime.block_on(async move {
            tokio::spawn(sweep_invitations(self.collab.clone()));

            tandem_server::run_server(self.collab.clone(), self.port, self.seeding)
                .await
                .map_err(|e| TandemError::Fatal(e.to_string()))
        })
    }
}

/// Periodically purges invitations that are past their deadline
async fn sweep_invitations(collab: Arc<Collab>) {
    let mut interval = tokio::time::interval(collab.config().sweep_interval);

    loop {
        interval.tick().await;

        match collab.sweep_expired_invitations().await {
            Ok(0) => {}
            Ok(count) => info!("Purged {} expired invitation(s)", count),
            Err(e) => warn!("Could not purge expired invitations: {}", e),
        }
    }
}

impl TandemError {
    fn hint(&self) -> String {
        match self {
            TandemError::Settings(_) => "Check the TANDEM_* environment variables and try again.".to_string(),
            TandemError::Database(_) => "This is a database error. Make sure TANDEM_DATABASE_URL points at a running postgres instance, then try again.".to_string(),
            TandemError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn main() {
    if let Err(e) = logging::init_logger() {
        eprintln!("Could not initialize logging: {e}");
        return;
    }

    let result = Tandem::new().and_then(|tandem| {
        info!("Initialized successfully.");
        tandem.run()
    });

    if let Err(error) = result {
        error!("{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.", "Tandem failed to start!".bold().color(LogColor::Red));
        error!("{}", error);
        error!(
            "{}",
            format!("Hint: {}", error.hint())
                .color(LogColor::BrightBlack)
                .italic()
        );
    }
}
