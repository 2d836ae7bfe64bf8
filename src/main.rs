mod annotate;
mod app;
mod capture;
mod cli;
mod export;
pub mod logger;
mod ocr;
mod picker;
mod selection;
mod viewport;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use annotate::{AnnotationCanvas, DEFAULT_BRUSH_RADIUS};
use app::SnapbrushApp;
use eframe::egui;

fn main() {
    // -- CLI flags (parsed only when any argument is present) ------------
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = if args.is_empty() {
        cli::CliOptions::default()
    } else {
        match cli::parse(&args) {
            Ok(opts) => opts,
            Err(e) => {
                eprintln!("error: {e}\n\n{}", cli::usage());
                std::process::exit(1);
            }
        }
    };

    // -- Immediate capture mode: no window, write and exit ---------------
    if opts.screenshot {
        let result = capture::capture_primary()
            .and_then(|frame| export::export_full(&frame, std::path::Path::new(".")));
        match result {
            Ok(path) => {
                println!("saved {}", path.display());
                return;
            }
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
    }

    // -- Interactive session ---------------------------------------------
    logger::init();

    let frame = match capture::capture_primary() {
        Ok(frame) => frame,
        Err(e) => {
            crate::log_err!("startup capture failed: {e}");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    crate::log_info!("captured {}x{} frame", frame.width, frame.height);

    // Background text extraction gets its own immutable copy of the capture
    // and is joined exactly once, after the frame loop.
    let ocr_task = ocr::spawn(frame.original.clone());

    let brush_color = opts
        .brush_color
        .unwrap_or_else(|| picker::color_by_name("red").unwrap_or([230, 41, 55, 255]));
    let brush_radius = opts.brush_radius.unwrap_or(DEFAULT_BRUSH_RADIUS);
    let brush = AnnotationCanvas::new(brush_color, brush_radius);

    let output_dir = PathBuf::from(".");
    let fatal = Arc::new(AtomicBool::new(false));
    let app = SnapbrushApp::new(frame, brush, output_dir, Arc::clone(&fatal));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_decorations(false)
            .with_title("snapbrush"),
        ..Default::default()
    };

    let run_result = eframe::run_native("snapbrush", options, Box::new(move |_cc| Box::new(app)));

    // Graphics resources are released by eframe on every exit path; the
    // OCR collaborator is always drained before deciding the exit code.
    if let Some(text) = ocr_task.join() {
        println!("extracted text:\n{text}");
    }

    if let Err(e) = run_result {
        crate::log_err!("display init failed: {e}");
        eprintln!("error: could not open the display window: {e}");
        std::process::exit(1);
    }
    if fatal.load(Ordering::Relaxed) {
        std::process::exit(1);
    }
}
