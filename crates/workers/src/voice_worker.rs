use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use matrix_core::{Capability, ResourceTier, Task, WorkOutput, Worker, WorkerError, WorkerKind};

pub const SPEECH_TO_TEXT: &str = "speech_to_text";
pub const TEXT_TO_SPEECH: &str = "text_to_speech";
pub const VOICE_ANALYSIS: &str = "voice_analysis";

const FITNESS: f64 = 0.9;
const CONFIDENCE: f64 = 0.85;
/// Seconds of synthesized audio per word of input text.
const SECONDS_PER_WORD: f64 = 0.4;

/// Speech and voice processing worker.
///
/// Processing is simulated: each task waits `processing_delay` and returns a
/// canned result shaped like the real service's response.
pub struct VoiceWorker {
    id: String,
    capabilities: Vec<Capability>,
    processing_delay: Duration,
}

impl VoiceWorker {
    pub fn new(processing_delay: Duration) -> Self {
        Self::with_id("voice_worker_001", processing_delay)
    }

    pub fn with_id(id: impl Into<String>, processing_delay: Duration) -> Self {
        let capabilities = vec![
            Capability::new(SPEECH_TO_TEXT, 0.9)
                .describe("Convert speech to text")
                .inputs(&["audio"])
                .outputs(&["text"])
                .estimate(Duration::from_secs_f64(2.0))
                .resources(ResourceTier::Low, ResourceTier::Medium),
            Capability::new(TEXT_TO_SPEECH, 0.85)
                .describe("Convert text to speech")
                .inputs(&["text"])
                .outputs(&["audio"])
                .estimate(Duration::from_secs_f64(1.5))
                .resources(ResourceTier::Low, ResourceTier::Medium),
            Capability::new(VOICE_ANALYSIS, 0.75)
                .describe("Analyze voice for emotion and intent")
                .inputs(&["audio"])
                .outputs(&["analysis"])
                .estimate(Duration::from_secs_f64(3.0))
                .resources(ResourceTier::Medium, ResourceTier::High),
        ];
        Self {
            id: id.into(),
            capabilities,
            processing_delay,
        }
    }
}

impl Default for VoiceWorker {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Worker for VoiceWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> WorkerKind {
        WorkerKind::Voice
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn fitness(&self, task: &Task) -> f64 {
        if self.capabilities.iter().any(|c| task.requires(&c.name)) {
            FITNESS
        } else {
            0.0
        }
    }

    async fn execute(&self, task: &Task) -> Result<WorkOutput, WorkerError> {
        debug!(worker = %self.id, task_id = %task.id, "Processing voice task");
        tokio::time::sleep(self.processing_delay).await;

        let output = if task.requires(SPEECH_TO_TEXT) {
            json!({
                "text": "Transcribed speech content",
                "confidence": 0.92,
                "source": task.input.get("audio_file").cloned().unwrap_or_default(),
            })
        } else if task.requires(TEXT_TO_SPEECH) {
            let text = task
                .input
                .get("text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| WorkerError::InvalidInput("text_to_speech needs a \"text\" field".into()))?;
            let words = text.split_whitespace().count() as f64;
            json!({
                "audio_url": format!("/generated/{}.wav", task.id),
                "duration": (words * SECONDS_PER_WORD * 10.0).round() / 10.0,
            })
        } else if task.requires(VOICE_ANALYSIS) {
            json!({
                "emotion": "neutral",
                "intent": "question",
                "confidence": 0.78,
                "speaker_id": task.user_id,
            })
        } else {
            return Err(WorkerError::Unsupported(task.required_capabilities.join(", ")));
        };

        Ok(WorkOutput::new(output, CONFIDENCE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker() -> VoiceWorker {
        VoiceWorker::new(Duration::ZERO)
    }

    #[test]
    fn declares_three_capabilities() {
        let w = worker();
        let names: Vec<_> = w.capabilities().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec![SPEECH_TO_TEXT, TEXT_TO_SPEECH, VOICE_ANALYSIS]);
        assert_eq!(w.id(), "voice_worker_001");
        assert_eq!(w.kind(), WorkerKind::Voice);
        assert_eq!(w.capabilities()[2].resource_requirements.cpu, ResourceTier::High);
    }

    #[test]
    fn fitness_on_any_overlap() {
        let w = worker();
        assert_eq!(w.fitness(&Task::new("t", [SPEECH_TO_TEXT])), 0.9);
        assert_eq!(w.fitness(&Task::new("t", ["image_analysis", VOICE_ANALYSIS])), 0.9);
        assert_eq!(w.fitness(&Task::new("t", ["image_analysis"])), 0.0);
    }

    #[tokio::test]
    async fn transcribes() {
        let task = Task::new("transcribe", [SPEECH_TO_TEXT])
            .with_input(json!({"audio_file": "/tmp/a.wav"}));
        let out = worker().execute(&task).await.unwrap();
        assert_eq!(out.output["text"], "Transcribed speech content");
        assert_eq!(out.output["source"], "/tmp/a.wav");
        assert_eq!(out.confidence, 0.85);
    }

    #[tokio::test]
    async fn synthesizes_with_length_from_text() {
        let task = Task::new("speak", [TEXT_TO_SPEECH])
            .with_input(json!({"text": "hello there general kenobi"}));
        let out = worker().execute(&task).await.unwrap();
        assert!((out.output["duration"].as_f64().unwrap() - 1.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn synthesis_without_text_is_invalid_input() {
        let task = Task::new("speak", [TEXT_TO_SPEECH]);
        let err = worker().execute(&task).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn analysis_reports_speaker() {
        let task = Task::new("analyze", [VOICE_ANALYSIS]).for_user("user_001");
        let out = worker().execute(&task).await.unwrap();
        assert_eq!(out.output["speaker_id"], "user_001");
        assert_eq!(out.output["emotion"], "neutral");
    }

    #[tokio::test]
    async fn unrelated_task_is_unsupported() {
        let task = Task::new("paint", ["image_generation"]);
        let err = worker().execute(&task).await.unwrap_err();
        assert!(matches!(err, WorkerError::Unsupported(caps) if caps == "image_generation"));
    }
}
