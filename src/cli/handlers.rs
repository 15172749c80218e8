//! Command handlers for the CLI
//!
//! Each subcommand is routed here. One-shot commands build an HTTP client
//! from the active configuration and print the result; `watch` runs the full
//! poller/toast pipeline until interrupted.

use super::{CliContext, Commands, ConfigAction};
use crate::api::{HttpNotificationApi, NotificationApi};
use crate::config::ConfigManager;
use crate::model::{NotificationId, NotificationItem, ToastRequest};
use crate::poller::NotificationPoller;
use crate::toast::ToastQueue;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// Routes parsed commands to their implementations.
pub struct CommandHandler {
    context: CliContext,
}

impl CommandHandler {
    pub fn new(context: CliContext) -> Self {
        Self { context }
    }

    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { global, force } => self.handle_init(global, force),
            Commands::Config { action } => self.handle_config(action),
            Commands::Unread => self.handle_unread().await,
            Commands::Recent { limit, json } => self.handle_recent(limit, json).await,
            Commands::MarkRead { id } => self.handle_mark_read(&id).await,
            Commands::MarkAllRead => self.handle_mark_all_read().await,
            Commands::Watch { interval_ms } => self.handle_watch(interval_ms).await,
        }
    }

    fn handle_init(&self, global: bool, force: bool) -> Result<()> {
        let path = if global {
            None
        } else {
            self.context
                .project_path
                .clone()
                .or_else(|| Some(PathBuf::from(".")))
        };

        let config_path = ConfigManager::config_path_for(path.clone())?;
        let config_exists = config_path.exists();

        if config_exists && !force {
            println!(
                "Configuration already initialized at: {}",
                config_path.display()
            );
            println!("Use --force to overwrite");
            return Ok(());
        }

        let config_manager = if global {
            ConfigManager::new(None)?
        } else {
            ConfigManager::new_project_config(path.unwrap_or_else(|| PathBuf::from(".")))?
        };

        config_manager.save()?;
        println!(
            "Configuration initialized at: {}",
            config_manager.config_path().display()
        );
        Ok(())
    }

    fn handle_config(&self, action: ConfigAction) -> Result<()> {
        match action {
            ConfigAction::Show => {
                let config = self.context.config_manager.config();
                let rendered = toml::to_string_pretty(config)
                    .context("failed to render configuration")?;
                println!("# {}", self.context.config_manager.config_path().display());
                println!("{rendered}");
                Ok(())
            }
            ConfigAction::Get { key } => {
                let value = self.context.config_manager.get_value(&key)?;
                println!("{value}");
                Ok(())
            }
            ConfigAction::Set { key, value } => {
                // Reload at the manager's own path so the write goes to the
                // file the context resolved, not a newly created one.
                let mut manager = ConfigManager::new(self.context.project_path.clone())?;
                manager.set_value(&key, &value)?;
                manager.save()?;
                println!("Set {key} = {value}");
                Ok(())
            }
        }
    }

    fn api(&self) -> Result<HttpNotificationApi> {
        let api = HttpNotificationApi::new(&self.context.config_manager.config().api)?;
        Ok(api)
    }

    async fn handle_unread(&self) -> Result<()> {
        let count = self.api()?.unread_count().await?;
        println!("{count}");
        Ok(())
    }

    async fn handle_recent(&self, limit: Option<usize>, json: bool) -> Result<()> {
        let config = self.context.config_manager.config();
        let limit = limit.unwrap_or(config.poller.recent_limit);
        let items = self.api()?.recent(limit).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&items)?);
            return Ok(());
        }

        if items.is_empty() {
            println!("No notifications");
            return Ok(());
        }
        for item in &items {
            print_notification(item);
        }
        Ok(())
    }

    async fn handle_mark_read(&self, raw_id: &str) -> Result<()> {
        let id = parse_notification_id(raw_id);
        let item = self.api()?.mark_read(&id).await?;
        println!("Marked notification {} as read", item.id);
        Ok(())
    }

    async fn handle_mark_all_read(&self) -> Result<()> {
        let updated = self.api()?.mark_all_read().await?;
        println!("Marked {updated} notification(s) as read");
        Ok(())
    }

    /// Run the poller until Ctrl-C, printing each broadcast summary and
    /// raising a toast for every newly seen unread notification.
    async fn handle_watch(&self, interval_ms: Option<u64>) -> Result<()> {
        let config = self.context.config_manager.config();
        let interval = interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.poller.interval());

        let poller = NotificationPoller::from_config(config)?;
        let toasts = ToastQueue::with_default_duration(config.toast.default_duration());
        let toast_stream = toasts.observe();

        let (shutdown_tx, shutdown_rx) = flume::bounded(1);
        ctrlc::set_handler(move || {
            let _ = shutdown_tx.send(());
        })
        .context("failed to install Ctrl-C handler")?;

        let seen: Arc<Mutex<HashSet<NotificationId>>> = Arc::new(Mutex::new(HashSet::new()));
        let toast_handle = toasts.clone();
        poller.subscribe(move |summary| {
            println!(
                "unread: {} | recent: {}",
                summary.unread_count,
                summary.recent.len()
            );
            let mut seen = seen.lock().unwrap_or_else(|e| e.into_inner());
            for item in &summary.recent {
                if seen.insert(item.id.clone()) && !item.read {
                    toast_handle.push(ToastRequest::info(format!(
                        "{}: {}",
                        item.title, item.message
                    )));
                }
            }
        });

        poller.start_polling(interval);
        info!("watching notifications every {interval:?} (Ctrl-C to stop)");

        loop {
            tokio::select! {
                snapshot = toast_stream.recv_async() => {
                    match snapshot {
                        Ok(snapshot) if !snapshot.is_empty() => {
                            for entry in &snapshot {
                                println!("  [{}] {}", entry.kind, entry.message);
                            }
                        }
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }
                _ = shutdown_rx.recv_async() => {
                    info!("received shutdown signal, stopping watch");
                    break;
                }
            }
        }

        poller.stop_polling();
        Ok(())
    }
}

fn parse_notification_id(raw: &str) -> NotificationId {
    raw.parse::<i64>()
        .map(NotificationId::Int)
        .unwrap_or_else(|_| NotificationId::Text(raw.to_string()))
}

fn print_notification(item: &NotificationItem) {
    let marker = if item.read { " " } else { "*" };
    let when = item.created_at.as_deref().unwrap_or("-");
    println!("{marker} [{}] {}: {} ({when})", item.id, item.title, item.message);
}
