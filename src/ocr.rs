// ============================================================================
// Background text extraction — fire-and-forget, joined once at shutdown
// ============================================================================
//
// The capture is handed to a background thread as an immutable copy right
// after startup; the frame loop never touches it. The thread shells out to a
// `tesseract` binary when one is installed and yields the recognized text.
// No tesseract, or any failure along the way, yields `None` — text
// extraction is strictly best-effort and the session never depends on it.

use std::path::PathBuf;
use std::process::Command;
use std::thread::{self, JoinHandle};

use image::RgbaImage;

pub struct OcrTask {
    handle: JoinHandle<Option<String>>,
}

/// Spawn the extraction thread with its own copy of the captured pixels.
pub fn spawn(capture: RgbaImage) -> OcrTask {
    OcrTask {
        handle: thread::spawn(move || extract(&capture)),
    }
}

impl OcrTask {
    /// Wait for the extraction result. Called exactly once, after the frame
    /// loop has exited.
    pub fn join(self) -> Option<String> {
        self.handle.join().ok().flatten()
    }
}

fn extract(capture: &RgbaImage) -> Option<String> {
    // tesseract reads from a file; park the capture in the temp dir.
    let png_path = scratch_png_path();
    capture.save(&png_path).ok()?;

    let output = Command::new("tesseract")
        .arg(&png_path)
        .arg("stdout")
        .output();
    let _ = std::fs::remove_file(&png_path);

    let output = output.ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn scratch_png_path() -> PathBuf {
    std::env::temp_dir().join(format!("snapbrush-ocr-{}.png", std::process::id()))
}
