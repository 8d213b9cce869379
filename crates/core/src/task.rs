use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task.
pub type TaskId = Uuid;

/// Task priority. Higher numeric value = more urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
    Critical = 4,
    Emergency = 5,
}

impl Priority {
    /// Numeric level (1 = low .. 5 = emergency).
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
            Priority::Emergency => "emergency",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            "emergency" => Ok(Priority::Emergency),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

/// A unit of work submitted to the orchestrator.
///
/// Tasks are immutable once submitted; the builder methods below are meant to
/// be chained right after [`Task::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    /// Opaque payload handed to the worker.
    pub input: serde_json::Value,
    /// Capability names, in declaration order, without duplicates.
    pub required_capabilities: Vec<String>,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub context: HashMap<String, serde_json::Value>,
    /// Declared prerequisite tasks. Carried for callers; the orchestrator
    /// does not enforce them.
    pub dependencies: Vec<TaskId>,
    pub created_at: DateTime<Utc>,
    /// Owning principal.
    pub user_id: String,
}

impl Task {
    /// Create a medium-priority task with no deadline.
    pub fn new<I, S>(description: impl Into<String>, required_capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut caps: Vec<String> = Vec::new();
        for cap in required_capabilities {
            let cap = cap.into();
            if !caps.contains(&cap) {
                caps.push(cap);
            }
        }

        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            input: serde_json::Value::Null,
            required_capabilities: caps,
            priority: Priority::default(),
            deadline: None,
            context: HashMap::new(),
            dependencies: Vec::new(),
            created_at: Utc::now(),
            user_id: "default".to_string(),
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the deadline relative to now.
    pub fn with_deadline_in(self, within: Duration) -> Self {
        let within = chrono::Duration::from_std(within).unwrap_or(chrono::Duration::MAX);
        let deadline = Utc::now()
            .checked_add_signed(within)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.with_deadline(deadline)
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_dependency(mut self, task_id: TaskId) -> Self {
        self.dependencies.push(task_id);
        self
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Whether the task lists `capability` among its requirements.
    pub fn requires(&self, capability: &str) -> bool {
        self.required_capabilities.iter().any(|c| c == capability)
    }

    /// Whether the deadline, if any, lies strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| deadline < now)
    }
}
