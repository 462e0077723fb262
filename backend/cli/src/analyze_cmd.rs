//! `meterlens analyze <path>`

use std::path::Path;

use anyhow::Result;
use meterlens_media::image_from_path;
use meterlens_understanding::MeterAnalyzer;

use crate::terminal_output::{note_error, note_success, render_result_card};

/// Analyze one image and print the outcome. Returns `false` when the
/// analysis failed; the user-facing message has already been printed.
pub async fn run(analyzer: &MeterAnalyzer, path: &Path, json: bool) -> Result<bool> {
    let outcome = match image_from_path(path) {
        Ok(image) => analyzer.analyze(&image).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                note_success(&format!("Analyzed {}", path.display()));
                print!("{}", render_result_card(&result, analyzer.output_shape()));
            }
            Ok(true)
        }
        Err(err) => {
            note_error(&err.user_message());
            Ok(false)
        }
    }
}
