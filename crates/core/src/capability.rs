use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Coarse resource tier used to describe what a capability costs to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTier {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ResourceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceTier::Low => write!(f, "low"),
            ResourceTier::Medium => write!(f, "medium"),
            ResourceTier::High => write!(f, "high"),
        }
    }
}

/// Memory and CPU tiers a capability needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub memory: ResourceTier,
    pub cpu: ResourceTier,
}

impl ResourceRequirements {
    pub fn new(memory: ResourceTier, cpu: ResourceTier) -> Self {
        Self { memory, cpu }
    }
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self::new(ResourceTier::Low, ResourceTier::Low)
    }
}

/// A named skill declared by a worker.
///
/// Capabilities are declared once when a worker is constructed and never
/// change afterwards. The confidence score is static; per-task suitability is
/// the worker's job (see [`Worker::fitness`](crate::Worker::fitness)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Capability name matched against [`Task::required_capabilities`].
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Kinds of input accepted (e.g. `audio`, `text`).
    pub input_types: Vec<String>,
    /// Kinds of output produced.
    pub output_types: Vec<String>,
    /// Static confidence in [0, 1].
    pub confidence_score: f64,
    /// Rough expected execution time.
    pub execution_time_estimate: Duration,
    /// Resource profile.
    pub resource_requirements: ResourceRequirements,
}

impl Capability {
    /// Declare a capability with the given name and static confidence.
    ///
    /// Confidence is clamped to [0, 1].
    pub fn new(name: impl Into<String>, confidence_score: f64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_types: Vec::new(),
            output_types: Vec::new(),
            confidence_score: clamp_unit(confidence_score),
            execution_time_estimate: Duration::ZERO,
            resource_requirements: ResourceRequirements::default(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn inputs(mut self, kinds: &[&str]) -> Self {
        self.input_types = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn outputs(mut self, kinds: &[&str]) -> Self {
        self.output_types = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn estimate(mut self, estimate: Duration) -> Self {
        self.execution_time_estimate = estimate;
        self
    }

    pub fn resources(mut self, memory: ResourceTier, cpu: ResourceTier) -> Self {
        self.resource_requirements = ResourceRequirements::new(memory, cpu);
        self
    }
}

/// Highest declared confidence among the capabilities a task asks for.
///
/// Returns 0.0 when none of the task's required capabilities is declared,
/// which workers use as "cannot handle".
pub fn matching_confidence(capabilities: &[Capability], task: &Task) -> f64 {
    capabilities
        .iter()
        .filter(|cap| task.requires(&cap.name))
        .map(|cap| cap.confidence_score)
        .fold(0.0, f64::max)
}

/// Clamp a score into [0, 1]; NaN becomes 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
