use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use matrix_core::{
    Capability, ResourceTier, Task, WorkOutput, Worker, WorkerError, WorkerKind,
    matching_confidence,
};

pub const IMAGE_ANALYSIS: &str = "image_analysis";
pub const OBJECT_DETECTION: &str = "object_detection";
pub const OCR: &str = "ocr";

/// Image understanding worker.
///
/// Fitness follows the declared confidence of the best matching capability.
/// Reports its in-progress count as the load factor, which shows up in
/// worker status while an execution is running.
pub struct VisionWorker {
    id: String,
    capabilities: Vec<Capability>,
    processing_delay: Duration,
    /// Executions in progress, against a nominal capacity of one.
    in_progress: AtomicUsize,
}

impl VisionWorker {
    pub fn new(processing_delay: Duration) -> Self {
        Self::with_id("vision_worker_001", processing_delay)
    }

    pub fn with_id(id: impl Into<String>, processing_delay: Duration) -> Self {
        let capabilities = vec![
            Capability::new(IMAGE_ANALYSIS, 0.88)
                .describe("Describe the contents of an image")
                .inputs(&["image"])
                .outputs(&["analysis"])
                .estimate(Duration::from_secs_f64(2.5))
                .resources(ResourceTier::Medium, ResourceTier::High),
            Capability::new(OBJECT_DETECTION, 0.82)
                .describe("Locate and label objects in an image")
                .inputs(&["image"])
                .outputs(&["objects"])
                .estimate(Duration::from_secs_f64(2.0))
                .resources(ResourceTier::Medium, ResourceTier::High),
            Capability::new(OCR, 0.9)
                .describe("Extract printed text from an image")
                .inputs(&["image"])
                .outputs(&["text"])
                .estimate(Duration::from_secs_f64(1.5))
                .resources(ResourceTier::Low, ResourceTier::Medium),
        ];
        Self {
            id: id.into(),
            capabilities,
            processing_delay,
            in_progress: AtomicUsize::new(0),
        }
    }
}

impl Default for VisionWorker {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

#[async_trait]
impl Worker for VisionWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> WorkerKind {
        WorkerKind::Vision
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn fitness(&self, task: &Task) -> f64 {
        matching_confidence(&self.capabilities, task)
    }

    async fn execute(&self, task: &Task) -> Result<WorkOutput, WorkerError> {
        let image = task
            .input
            .get("image")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WorkerError::InvalidInput("missing \"image\" reference".into()))?
            .to_string();

        debug!(worker = %self.id, task_id = %task.id, image = %image, "Processing vision task");
        {
            let _busy = InProgress::enter(&self.in_progress);
            tokio::time::sleep(self.processing_delay).await;
        }

        let (output, confidence) = if task.requires(OCR) {
            (json!({"image": image, "text": "Recognized text content", "lines": 1}), 0.9)
        } else if task.requires(OBJECT_DETECTION) {
            (
                json!({
                    "image": image,
                    "objects": [
                        {"label": "person", "score": 0.91, "bbox": [12, 40, 180, 320]},
                        {"label": "chair", "score": 0.74, "bbox": [200, 150, 310, 330]},
                    ],
                }),
                0.82,
            )
        } else if task.requires(IMAGE_ANALYSIS) {
            (
                json!({
                    "image": image,
                    "caption": "An indoor scene with a person seated near a window",
                    "tags": ["indoor", "person", "window"],
                }),
                0.88,
            )
        } else {
            return Err(WorkerError::Unsupported(task.required_capabilities.join(", ")));
        };

        Ok(WorkOutput::new(output, confidence))
    }

    fn load_factor(&self) -> f64 {
        self.in_progress.load(Ordering::Relaxed) as f64
    }
}

/// Counts one execution for as long as it is alive.
struct InProgress<'a>(&'a AtomicUsize);

impl<'a> InProgress<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
