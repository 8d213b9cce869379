//! Built-in workers.
//!
//! Both workers simulate their domain processing; they exist to exercise the
//! orchestrator end to end and as templates for real implementations.

mod vision_worker;
mod voice_worker;

use std::sync::Arc;
use std::time::Duration;

use matrix_core::Worker;

pub use vision_worker::{IMAGE_ANALYSIS, OBJECT_DETECTION, OCR, VisionWorker};
pub use voice_worker::{SPEECH_TO_TEXT, TEXT_TO_SPEECH, VOICE_ANALYSIS, VoiceWorker};

/// One of each built-in worker, all using the same simulated delay.
pub fn builtin_workers(processing_delay: Duration) -> Vec<Arc<dyn Worker>> {
    vec![
        Arc::new(VoiceWorker::new(processing_delay)),
        Arc::new(VisionWorker::new(processing_delay)),
    ]
}
