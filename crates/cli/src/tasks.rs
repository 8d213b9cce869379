use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use matrix_core::{Priority, Task};
use matrix_workers::{IMAGE_ANALYSIS, OCR, SPEECH_TO_TEXT, TEXT_TO_SPEECH, VOICE_ANALYSIS};

/// A task as written in a `--tasks` file.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    pub description: String,
    pub required_capabilities: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub input: serde_json::Value,
    /// Deadline relative to submission, in seconds.
    #[serde(default)]
    pub deadline_secs: Option<f64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

impl TaskSpec {
    pub fn into_task(self) -> Result<Task> {
        if self.required_capabilities.is_empty() {
            bail!("task {:?} requires no capabilities", self.description);
        }

        let mut task = Task::new(self.description, self.required_capabilities)
            .with_priority(self.priority)
            .with_input(self.input);
        if let Some(secs) = self.deadline_secs {
            let within = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid deadline_secs {secs}"))?;
            task = task.with_deadline_in(within);
        }
        if let Some(user) = self.user_id {
            task = task.for_user(user);
        }
        for (key, value) in self.context {
            task = task.with_context(key, value);
        }
        Ok(task)
    }
}

/// Read an array of task specs from a JSON file.
pub fn load_specs(path: &Path) -> Result<Vec<TaskSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tasks file {}", path.display()))?;
    parse_specs(&content).with_context(|| format!("failed to parse tasks file {}", path.display()))
}

pub fn parse_specs(json: &str) -> Result<Vec<TaskSpec>> {
    Ok(serde_json::from_str(json)?)
}

/// A mixed batch touching every built-in worker.
pub fn demo_specs() -> Vec<TaskSpec> {
    let spec = |description: &str, cap: &str, priority: Priority, input: serde_json::Value| TaskSpec {
        description: description.to_string(),
        required_capabilities: vec![cap.to_string()],
        priority,
        input,
        deadline_secs: None,
        user_id: Some("demo_user".to_string()),
        context: HashMap::new(),
    };

    vec![
        spec(
            "Transcribe voicemail",
            SPEECH_TO_TEXT,
            Priority::High,
            serde_json::json!({"audio_file": "/demo/voicemail.wav"}),
        ),
        spec(
            "Read greeting aloud",
            TEXT_TO_SPEECH,
            Priority::Low,
            serde_json::json!({"text": "Welcome back, your agents are ready"}),
        ),
        spec(
            "Detect caller mood",
            VOICE_ANALYSIS,
            Priority::Medium,
            serde_json::json!({"audio_file": "/demo/voicemail.wav"}),
        ),
        spec(
            "Describe uploaded photo",
            IMAGE_ANALYSIS,
            Priority::Critical,
            serde_json::json!({"image": "/demo/photo.jpg"}),
        ),
        spec(
            "Extract receipt text",
            OCR,
            Priority::Medium,
            serde_json::json!({"image": "/demo/receipt.png"}),
        ),
    ]
}
