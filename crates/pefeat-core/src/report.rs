//! Output formatting for vectors, dataset builds and predictions.

use serde::Serialize;

use crate::dataset::BuildSummary;
use crate::features::FeatureVector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub filename: String,
    pub sha256: String,
    pub prediction_class: u8,
    pub prediction_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {s}. Use 'text' or 'json'.")),
        }
    }
}

/// `[1, 0, 1]` style rendering.
pub fn format_vector(vector: &FeatureVector) -> String {
    let bits: Vec<String> = vector.as_slice().iter().map(|b| b.to_string()).collect();
    format!("[{}]", bits.join(", "))
}

pub fn print_vector(vector: &FeatureVector, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", format_vector(vector)),
        OutputFormat::Json => println!("{}", serde_json::to_string(vector).unwrap_or_default()),
    }
}

pub fn print_summary(summary: &BuildSummary, format: OutputFormat) {
    match format {
        OutputFormat::Text => print_summary_text(summary),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(summary).unwrap_or_default()
        ),
    }
}

fn print_summary_text(summary: &BuildSummary) {
    println!("\n{}", "=".repeat(70));
    println!(
        "DATASET BUILD: {} (class {})",
        summary.directory.display(),
        summary.label
    );
    println!("{}", "=".repeat(70));

    if !summary.failures.is_empty() {
        println!("\nFAILED FILES ({}):", summary.failures.len());
        for f in &summary.failures {
            println!("  [ERR ] {} -- {}", f.filename, f.reason);
        }
    }

    println!("\nSUMMARY:");
    println!("  Processed: {}", summary.processed);
    println!("  Failed:    {}", summary.failed);
    println!("{}", "=".repeat(70));
}

pub fn print_prediction(prediction: &Prediction, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("File:       {}", prediction.filename);
            println!("SHA-256:    {}", prediction.sha256);
            println!(
                "Prediction: {} (class {})",
                prediction.prediction_label, prediction.prediction_class
            );
        }
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(prediction).unwrap_or_default()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::FeatureDictionary;
    use crate::features::{encode, ExtractedFileFacts};

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn vector_renders_as_list_and_json_array() {
        let dict = FeatureDictionary::from_sources("a\nb\n", "c\n");
        let vector = encode(
            ExtractedFileFacts {
                imported_functions: Ok(["a".to_string()].into()),
                extracted_strings: Ok(["c".to_string()].into()),
            },
            &dict,
        )
        .unwrap();

        assert_eq!(format_vector(&vector), "[1, 0, 1]");
        assert_eq!(serde_json::to_value(&vector).unwrap(), serde_json::json!([1, 0, 1]));
    }

    #[test]
    fn prediction_serializes_expected_fields() {
        let prediction = Prediction {
            filename: "sample.exe".into(),
            sha256: "abc123".into(),
            prediction_class: 1,
            prediction_label: "Ransomware (Malicious)".into(),
        };

        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["filename"], "sample.exe");
        assert_eq!(json["prediction_class"], 1);
        assert_eq!(json["prediction_label"], "Ransomware (Malicious)");
    }
}
