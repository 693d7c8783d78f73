//! Alarm planning and the session registry of armed alarms

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, TimeZone, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::Routine;
use crate::reminders::ReminderError;

const ALARM_PREFIX: &str = "aeryth-";

/// Which end of a routine an alarm marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmEdge {
    Start,
    End,
}

impl AlarmEdge {
    fn as_str(&self) -> &'static str {
        match self {
            AlarmEdge::Start => "start",
            AlarmEdge::End => "end",
        }
    }
}

pub fn alarm_name(routine_id: &str, edge: AlarmEdge) -> String {
    format!("{}{}-{}", ALARM_PREFIX, routine_id, edge.as_str())
}

/// Reverse of [`alarm_name`]. Routine ids may themselves contain dashes.
pub fn parse_alarm_name(name: &str) -> Option<(String, AlarmEdge)> {
    let rest = name.strip_prefix(ALARM_PREFIX)?;
    let (id, edge) = rest.rsplit_once('-')?;
    let edge = match edge {
        "start" => AlarmEdge::Start,
        "end" => AlarmEdge::End,
        _ => return None,
    };
    if id.is_empty() {
        return None;
    }
    Some((id.to_string(), edge))
}

/// Next local wall-clock time strictly after `now` at which `edge` of the
/// routine falls on one of its days.
pub fn next_occurrence(
    routine: &Routine,
    edge: AlarmEdge,
    now: NaiveDateTime,
) -> Result<NaiveDateTime, ReminderError> {
    let time = match edge {
        AlarmEdge::Start => routine.start(),
        AlarmEdge::End => routine.end(),
    }
    .ok_or_else(|| ReminderError::InvalidTime(routine.id.clone()))?;

    // A week plus one day covers "later today" through "same weekday next week".
    (0..=7)
        .map(|offset| now.date() + Duration::days(offset))
        .filter(|date| routine.runs_on(date.weekday()))
        .map(|date| date.and_time(time))
        .find(|candidate| *candidate > now)
        .ok_or_else(|| ReminderError::NoOccurrence(routine.id.clone()))
}

/// Resolve a local wall-clock time to UTC. Times skipped by a DST jump fall
/// back to one hour later.
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Local
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc()),
    }
}

/// Seam to the platform alarm API
#[async_trait]
pub trait AlarmSink: Send + Sync {
    async fn arm(&self, name: &str, at: DateTime<Utc>) -> Result<(), ReminderError>;
    async fn disarm(&self, name: &str);
}

/// Event emitted when an in-process alarm goes off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmFired {
    pub name: String,
    pub at: DateTime<Utc>,
}

/// One-shot alarms backed by tokio timers, delivered on a channel.
///
/// Timers only live as long as the runtime; nothing is kept once the process
/// exits.
pub struct TokioAlarmSink {
    /// Name to (generation, timer). A timer removes its own entry on firing.
    timers: Arc<DashMap<String, (u64, JoinHandle<()>)>>,
    generation: AtomicU64,
    fired: mpsc::UnboundedSender<AlarmFired>,
}

impl TokioAlarmSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AlarmFired>) {
        let (fired, rx) = mpsc::unbounded_channel();
        (
            Self {
                timers: Arc::new(DashMap::new()),
                generation: AtomicU64::new(0),
                fired,
            },
            rx,
        )
    }

    pub fn armed_count(&self) -> usize {
        self.timers.iter().filter(|t| !t.value().1.is_finished()).count()
    }
}

#[async_trait]
impl AlarmSink for TokioAlarmSink {
    async fn arm(&self, name: &str, at: DateTime<Utc>) -> Result<(), ReminderError> {
        let delay = (at - Utc::now()).to_std().unwrap_or_default();
        let fired = self.fired.clone();
        let timers = self.timers.clone();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let alarm = AlarmFired {
            name: name.to_string(),
            at,
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            timers.remove_if(&alarm.name, |_, (g, _)| *g == generation);
            tracing::debug!("Alarm {} fired", alarm.name);
            let _ = fired.send(alarm);
        });

        // Re-arming replaces the previous timer with the same name.
        if let Some((_, previous)) = self.timers.insert(name.to_string(), (generation, handle)) {
            previous.abort();
        }
        Ok(())
    }

    async fn disarm(&self, name: &str) {
        if let Some((_, (_, handle))) = self.timers.remove(name) {
            handle.abort();
        }
    }
}

/// Tracks which alarms this session armed and when they fire
pub struct ReminderScheduler {
    sink: Arc<dyn AlarmSink>,
    armed: DashMap<String, DateTime<Utc>>,
}

impl ReminderScheduler {
    pub fn new(sink: Arc<dyn AlarmSink>) -> Self {
        Self {
            sink,
            armed: DashMap::new(),
        }
    }

    async fn arm(
        &self,
        name: String,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ReminderError> {
        self.sink.arm(&name, at).await?;
        tracing::info!("Armed {} for {}", name, at);
        self.armed.insert(name, at);
        Ok(at)
    }

    /// Arm the next start and end alarm of `routine`.
    pub async fn schedule_routine(
        &self,
        routine: &Routine,
        now: NaiveDateTime,
    ) -> Result<Vec<(String, DateTime<Utc>)>, ReminderError> {
        let mut armed = Vec::with_capacity(2);
        for edge in [AlarmEdge::Start, AlarmEdge::End] {
            let at = local_to_utc(next_occurrence(routine, edge, now)?);
            let name = alarm_name(&routine.id, edge);
            self.arm(name.clone(), at).await?;
            armed.push((name, at));
        }
        Ok(armed)
    }

    /// Schedule every routine, logging the ones that cannot be armed.
    pub async fn schedule_all(&self, routines: &[Routine], now: NaiveDateTime) -> usize {
        let mut count = 0;
        for routine in routines {
            match self.schedule_routine(routine, now).await {
                Ok(armed) => count += armed.len(),
                Err(e) => tracing::warn!("Skipping reminders for {}: {}", routine.id, e),
            }
        }
        count
    }

    pub async fn cancel_routine(&self, routine_id: &str) {
        for edge in [AlarmEdge::Start, AlarmEdge::End] {
            let name = alarm_name(routine_id, edge);
            self.sink.disarm(&name).await;
            self.armed.remove(&name);
        }
    }

    /// Re-arm an alarm `minutes` after `now`.
    pub async fn snooze(
        &self,
        routine_id: &str,
        edge: AlarmEdge,
        minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ReminderError> {
        let at = now + Duration::minutes(i64::from(minutes));
        self.arm(alarm_name(routine_id, edge), at).await
    }

    pub fn armed_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.armed.get(name).map(|at| *at.value())
    }

    /// Forget a fired alarm, unless it was re-armed for a later time since.
    pub fn mark_fired(&self, alarm: &AlarmFired) {
        self.armed.remove_if(&alarm.name, |_, at| *at <= alarm.at);
    }

    /// Drop every entry whose time has passed.
    pub fn prune_fired(&self, now: DateTime<Utc>) {
        self.armed.retain(|_, at| *at > now);
    }

    /// Alarm names still due, sorted
    pub fn armed(&self) -> Vec<String> {
        self.prune_fired(Utc::now());
        let mut names: Vec<String> = self.armed.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
