//! Command execution and trigger firing.
//!
//! The engine owns the store, the catalog, and the scheduler, and is the
//! only place that mutates the store. Every mutation is followed by a
//! trigger rebuild (or a targeted disarm) so the armed set always matches
//! the stored records.
//!
//! All user-facing strings are Portuguese, matching the guild this bot
//! serves; log lines are English.

use chrono::Utc;
use tracing::{error, info, warn};

use bossbot_config::FirePolicy;
use bossbot_types::{CatalogEntry, Notification, ScheduleRecord};

use crate::catalog::Catalog;
use crate::command::{Command, CreateRequest};
use crate::notify::Notifier;
use crate::scheduler::Scheduler;
use crate::store::ScheduleStore;

/// Lines per outgoing message when listing schedules.
const LIST_BATCH: usize = 10;

pub struct Engine<N> {
    store: ScheduleStore,
    catalog: Catalog,
    scheduler: Scheduler,
    notifier: N,
    fire_policy: FirePolicy,
}

impl<N: Notifier> Engine<N> {
    pub fn new(
        store: ScheduleStore,
        catalog: Catalog,
        scheduler: Scheduler,
        notifier: N,
        fire_policy: FirePolicy,
    ) -> Self {
        Self {
            store,
            catalog,
            scheduler,
            notifier,
            fire_policy,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Rebuild the armed trigger set from the store. Called once when the
    /// gateway session becomes ready.
    pub async fn resync(&self) -> anyhow::Result<usize> {
        let records = self.store.load_all().await?;
        self.scheduler.rebuild(&records).await;
        Ok(records.len())
    }

    /// Execute one admin command. Each returned string is sent as its own
    /// reply message.
    pub async fn handle_command(&self, command: Command) -> anyhow::Result<Vec<String>> {
        match command {
            Command::Create(req) => self.create(req).await,
            Command::List => self.list().await,
            Command::Remove { id } => self.remove(&id).await,
            Command::Run { id } => self.run(&id).await,
            Command::Clear => self.clear().await,
            Command::Debug => self.debug().await,
        }
    }

    async fn create(&self, req: CreateRequest) -> anyhow::Result<Vec<String>> {
        let entry = self.catalog.find(&req.boss_key);
        let (boss, message, image) = render(entry.as_ref(), &req.boss_key, &req.extra_text);

        let id = Utc::now().timestamp_millis().to_string();
        let record = ScheduleRecord {
            id: id.clone(),
            time: req.time.clone(),
            channel_id: req.channel_id.clone(),
            role_id: req.role_id.clone(),
            boss: Some(boss),
            message,
            image,
        };

        let records = self
            .store
            .update(|mut records| {
                records.push(record);
                records
            })
            .await?;
        self.scheduler.rebuild(&records).await;

        info!(schedule_id = %id, time = %req.time, "Schedule created");
        Ok(vec![format!(
            "Agenda criada: {} -> <#{}> <@&{}> (id: {})",
            req.time, req.channel_id, req.role_id, id
        )])
    }

    async fn list(&self) -> anyhow::Result<Vec<String>> {
        let records = self.store.load_all().await?;
        if records.is_empty() {
            return Ok(vec!["Nenhuma agenda cadastrada.".into()]);
        }
        let lines: Vec<String> = records.iter().map(list_line).collect();
        Ok(lines
            .chunks(LIST_BATCH)
            .map(|chunk| chunk.join("\n"))
            .collect())
    }

    async fn remove(&self, id: &str) -> anyhow::Result<Vec<String>> {
        let records = self.store.load_all().await?;
        if !records.iter().any(|r| r.id == id) {
            return Ok(vec!["ID não encontrado.".into()]);
        }
        let records = self
            .store
            .update(|records| records.into_iter().filter(|r| r.id != id).collect())
            .await?;
        self.scheduler.rebuild(&records).await;
        info!(schedule_id = %id, "Schedule removed");
        Ok(vec![format!("Agenda removida: {id}")])
    }

    async fn clear(&self) -> anyhow::Result<Vec<String>> {
        let records = self.store.load_all().await?;
        if records.is_empty() {
            return Ok(vec!["Nenhum alarme existente para apagar.".into()]);
        }
        let count = records.len();
        self.store.save_all(&[]).await?;
        self.scheduler.disarm_all().await;
        info!(count, "All schedules cleared");
        Ok(vec![format!(
            "🧹 Todos os {count} alarmes foram apagados com sucesso!"
        )])
    }

    async fn run(&self, id: &str) -> anyhow::Result<Vec<String>> {
        let records = self.store.load_all().await?;
        let Some(record) = records.iter().find(|r| r.id == id) else {
            return Ok(vec!["ID não encontrado".into()]);
        };
        let notification = self.notification_for(record);
        match self.notifier.send(&notification).await {
            Ok(()) => Ok(vec!["Mensagem enviada.".into()]),
            Err(e) => {
                warn!(schedule_id = %id, "Manual run failed: {e:#}");
                Ok(vec!["Erro ao enviar, veja logs.".into()])
            }
        }
    }

    async fn debug(&self) -> anyhow::Result<Vec<String>> {
        let records = self.store.load_all().await?;
        tracing::debug!("Schedules: {records:?}");
        Ok(vec![format!(
            "TIMEZONE={}\nSchedules carregados: {}",
            self.scheduler.timezone(),
            records.len()
        )])
    }

    /// Handle one trigger firing. Never propagates: scheduled-path failures
    /// are logged and resolved according to the fire policy.
    pub async fn handle_fire(&self, schedule_id: &str) {
        let records = match self.store.load_all().await {
            Ok(records) => records,
            Err(e) => {
                error!(schedule_id, "Store read failed during firing: {e}");
                return;
            }
        };
        let Some(record) = records.iter().find(|r| r.id == schedule_id) else {
            // Stale trigger: its record was removed by a concurrent command.
            warn!(schedule_id, "Fired trigger has no record, disarming");
            self.scheduler.disarm(schedule_id).await;
            return;
        };

        info!(schedule_id, time = %record.time, "Firing scheduled announcement");
        let notification = self.notification_for(record);
        match self.notifier.send(&notification).await {
            Ok(()) => {
                self.consume(schedule_id).await;
                info!(schedule_id, "Schedule removed after delivery");
            }
            Err(e) => {
                warn!(schedule_id, "Scheduled delivery failed: {e:#}");
                if self.fire_policy == FirePolicy::Consume {
                    self.consume(schedule_id).await;
                    info!(schedule_id, "Schedule consumed despite failed delivery");
                }
            }
        }
    }

    /// One-shot semantics: drop the record and its trigger.
    async fn consume(&self, schedule_id: &str) {
        if let Err(e) = self
            .store
            .update(|records| records.into_iter().filter(|r| r.id != schedule_id).collect())
            .await
        {
            error!(schedule_id, "Failed to remove fired schedule: {e}");
        }
        self.scheduler.disarm(schedule_id).await;
    }

    /// Build the delivery payload, re-resolving a missing image from the
    /// catalog so a catalog edit after creation still attaches one.
    fn notification_for(&self, record: &ScheduleRecord) -> Notification {
        let image = record.image.clone().or_else(|| {
            record
                .boss
                .as_ref()
                .and_then(|boss| self.catalog.find(boss))
                .and_then(|entry| entry.imagem)
        });
        Notification {
            channel_id: record.channel_id.clone(),
            role_mention: record.role_mention(),
            body: record.message.clone(),
            image,
        }
    }
}

/// Rendering rule for a new schedule: returns (stored boss name, message
/// body, image URL).
fn render(
    entry: Option<&CatalogEntry>,
    boss_key: &str,
    extra_text: &str,
) -> (String, String, Option<String>) {
    match entry {
        Some(entry) => {
            let title = entry.display_title();
            let prefix = if extra_text.is_empty() {
                String::new()
            } else {
                format!("{extra_text}\n")
            };
            let message = format!(
                "{prefix}A preparação para o boss **{title}** vai terminar em 10 minutos!"
            );
            (title.to_string(), message, entry.imagem.clone())
        }
        None => {
            let message = if extra_text.is_empty() {
                format!("Mensagem agendada ({boss_key})")
            } else {
                extra_text.to_string()
            };
            (boss_key.to_string(), message, None)
        }
    }
}

fn list_line(record: &ScheduleRecord) -> String {
    let boss = match &record.boss {
        Some(b) => format!("Boss: {b}"),
        None => "Boss: (não informado)".into(),
    };
    let message = if record.message.is_empty() {
        "Mensagem: (vazia)".into()
    } else {
        format!("Mensagem: {}", record.message)
    };
    format!(
        "ID:{} - {} - {} - {} - Canal: <#{}> - Role: <@&{}>",
        record.id, record.time, boss, message, record.channel_id, record.role_id
    )
}
