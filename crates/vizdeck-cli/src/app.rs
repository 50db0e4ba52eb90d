//! Application wiring and the interactive shell
//!
//! Connects the session runtime to in-memory demo collaborators and a
//! file-backed guest store, seeds the demo catalog and user, and drives a
//! line-oriented shell over stdin.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use vizdeck_core::{
    create_file_storage, DataSourceKind, DeviceStorage, GuestToken, Identity, MemoryStorage,
    OwnershipResolver, ResolverConfig, VisualizationCatalog,
};
use vizdeck_runtime::{
    MemoryAuthProvider, MemoryCatalog, MemoryProfileRepository, MemorySettingRepository,
    SessionHandle, SessionRuntime,
};

use crate::commands::{ShellCommand, HELP_TEXT};

// ----------------------------------------------------------------------------
// Application
// ----------------------------------------------------------------------------

/// The assembled demo application
pub struct VizdeckApp {
    runtime: SessionRuntime,
    handle: SessionHandle,
    catalog: MemoryCatalog,
    settings: Arc<MemorySettingRepository>,
    ownership: OwnershipResolver,
    /// Device token of the most recent guest identity, for `claim`
    last_guest_token: Option<GuestToken>,
}

impl VizdeckApp {
    /// Wire the runtime to the demo collaborators.
    ///
    /// The guest token lives under `data_dir` unless `ephemeral` is set.
    pub fn new(data_dir: PathBuf, ephemeral: bool) -> anyhow::Result<Self> {
        let auth = Arc::new(
            MemoryAuthProvider::new().with_user(
                "demo",
                "password",
                "demo-user-1",
                Some("demo@vizdeck.example"),
            ),
        );
        let profiles = Arc::new(MemoryProfileRepository::new());
        let settings = Arc::new(MemorySettingRepository::new());

        let guest_storage: Box<dyn DeviceStorage> = if ephemeral {
            Box::new(MemoryStorage::new())
        } else {
            info!(dir = %data_dir.display(), "guest token directory");
            create_file_storage(&data_dir)
        };

        let runtime = SessionRuntime::start(
            ResolverConfig::default(),
            auth,
            profiles,
            guest_storage,
        )
        .context("failed to start session runtime")?;
        let handle = runtime.handle();

        Ok(Self {
            runtime,
            handle,
            catalog: seed_catalog(),
            settings: settings.clone(),
            ownership: OwnershipResolver::new(settings),
            last_guest_token: None,
        })
    }

    /// Run the interactive shell until `quit` or end of input
    pub async fn run_shell(mut self) -> anyhow::Result<()> {
        let identity = self.handle.wait_resolved().await?;
        self.remember_guest(&identity);
        println!("vizdeck demo shell (try 'help')");
        println!("you are: {}", describe(&identity));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            match ShellCommand::parse(&line) {
                Ok(Some(ShellCommand::Quit)) => break,
                Ok(Some(command)) => {
                    if let Err(err) = self.dispatch(command).await {
                        println!("error: {err:#}");
                    }
                }
                Ok(None) => {}
                Err(usage) => println!("{usage}"),
            }
        }

        self.runtime.stop().await?;
        Ok(())
    }

    async fn dispatch(&mut self, command: ShellCommand) -> anyhow::Result<()> {
        match command {
            ShellCommand::Whoami => {
                let identity = self.current()?;
                println!("{}", describe(&identity));
            }
            ShellCommand::SignIn { username, password } => {
                let identity = self.handle.sign_in(username, password).await?;
                // Remembered record ids belong to the previous identity
                self.ownership.reset();
                println!("signed in as {}", describe(&identity));
            }
            ShellCommand::SignOut => {
                let identity = self.handle.sign_out().await?;
                self.ownership.reset();
                self.remember_guest(&identity);
                println!("signed out; you are {}", describe(&identity));
            }
            ShellCommand::Guest => {
                let identity = self.handle.continue_as_guest().await?;
                self.ownership.reset();
                self.remember_guest(&identity);
                println!("you are {}", describe(&identity));
            }
            ShellCommand::Types => {
                for ty in self.catalog.list(None).await? {
                    println!(
                        "{:<12} {:<20} [{}] {}",
                        ty.id.as_str(),
                        ty.name,
                        ty.data_source,
                        ty.description
                    );
                }
            }
            ShellCommand::Load { type_id } => {
                let identity = self.current()?;
                match self.ownership.load(&identity, &type_id).await? {
                    Some(record) => {
                        println!("{} ({}): {}", record.name, record.id, record.config);
                    }
                    None => match self.catalog.get(&type_id).await? {
                        Some(ty) => println!("no saved setting; default: {}", ty.default_config),
                        None => println!("unknown type: {type_id}"),
                    },
                }
            }
            ShellCommand::Save {
                type_id,
                name,
                config,
            } => {
                let identity = self.current()?;
                let record = self.ownership.save(&identity, &type_id, name, config).await?;
                println!("saved {} as {}", record.name, record.id);
            }
            ShellCommand::Claim => {
                let identity = self.current()?;
                let Some(token) = self.last_guest_token.clone() else {
                    println!("no guest records on this device to claim");
                    return Ok(());
                };
                let claimed = self.ownership.claim_device_records(&identity, &token).await?;
                println!("claimed {} record(s)", claimed.len());
            }
            ShellCommand::Help => println!("{HELP_TEXT}"),
            // Handled by the shell loop
            ShellCommand::Quit => {}
        }
        Ok(())
    }

    fn current(&self) -> anyhow::Result<Identity> {
        self.handle
            .identity()
            .context("session not resolved yet")
    }

    fn remember_guest(&mut self, identity: &Identity) {
        if let Some(token) = identity.device_session_id() {
            self.last_guest_token = Some(token.clone());
        }
    }

    /// Total records stored, for the integration smoke test
    pub fn setting_count(&self) -> usize {
        self.settings.all().len()
    }
}

// ----------------------------------------------------------------------------
// Demo Data
// ----------------------------------------------------------------------------

fn seed_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_type(
            "sports",
            "Sports Scores",
            "live scores for followed teams",
            DataSourceKind::Api,
            r#"{"league":"all","refresh_seconds":30}"#,
        )
        .with_type(
            "financial",
            "Financial Ticker",
            "streaming quotes for a watchlist",
            DataSourceKind::WebSocket,
            r#"{"symbols":["SPY"],"chart":"line"}"#,
        )
        .with_type(
            "weather",
            "Weather Radar",
            "regional radar and forecast",
            DataSourceKind::Api,
            r#"{"region":"auto","zoom":3}"#,
        )
}

fn describe(identity: &Identity) -> String {
    match identity {
        Identity::Authenticated {
            subject_id,
            display_name,
            profile_ref,
            ..
        } => {
            let profile = match profile_ref {
                Some(id) => format!("profile {id}"),
                None => "no profile bound".to_string(),
            };
            format!("{display_name} ({subject_id}, {profile})")
        }
        Identity::Guest {
            device_session_id,
            persisted,
        } => {
            let durability = if *persisted { "persisted" } else { "ephemeral" };
            format!("Guest ({durability} device session {device_session_id})")
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_wires_and_resolves() {
        let mut app = VizdeckApp::new(PathBuf::from("unused"), true).unwrap();
        let identity = app.handle.wait_resolved().await.unwrap();
        assert!(identity.is_guest());
        assert_eq!(app.setting_count(), 0);
        app.runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_demo_user_can_sign_in_and_save() {
        let mut app = VizdeckApp::new(PathBuf::from("unused"), true).unwrap();
        app.handle.wait_resolved().await.unwrap();

        app.dispatch(ShellCommand::SignIn {
            username: "demo".to_string(),
            password: "password".to_string(),
        })
        .await
        .unwrap();

        app.dispatch(ShellCommand::Save {
            type_id: "sports".into(),
            name: "mine".to_string(),
            config: "{}".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(app.setting_count(), 1);

        app.runtime.stop().await.unwrap();
    }
}
