//! Scraping of the engine's human readable output.
//!
//! Nothing here fails: text that does not match the expected layout
//! degrades to placeholder values.

use crate::model::{ModelDetails, ModelRecord};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static ARCHITECTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"architecture\s+(\S+)").expect("hard-coded regex should always compile")
});

static QUANTIZATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"quantization\s+(\S+)").expect("hard-coded regex should always compile")
});

static PULLED_LAYER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"pulling ([a-f0-9]+)(?:\.\.\.|:)\s+100%\s+▕[^▏]*▏\s+(\d+(?:\.\d+)?)\s+([KMG]B)")
        .expect("hard-coded regex should always compile")
});

static ENGINE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"version is (\S+)").expect("hard-coded regex should always compile")
});

/// Parses `ollama list`. The first line is the header.
pub fn parse_model_list(output: &str) -> Vec<ModelRecord> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }
            Some(ModelRecord {
                name: fields[0].to_string(),
                id: fields[1].to_string(),
                size: fields[2].to_string(),
                size_unit: fields[3].to_string(),
                created: fields[4..].join(" "),
            })
        })
        .collect()
}

/// Parses `ollama show <model>`.
pub fn parse_model_details(output: &str) -> ModelDetails {
    ModelDetails {
        architecture: first_capture(&ARCHITECTURE, output),
        quantization: first_capture(&QUANTIZATION, output),
    }
}

fn first_capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| ModelDetails::UNKNOWN.to_string())
}

/// Parses `ollama --version`, keeping the raw text if the layout is unexpected.
pub fn parse_engine_version(output: &str) -> String {
    ENGINE_VERSION
        .captures(output)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| output.trim().to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PulledLayer {
    pub digest: String,
    pub size: f64,
    pub unit: String,
}

impl PulledLayer {
    pub fn size_kb(&self) -> f64 {
        match self.unit.as_str() {
            "MB" => self.size * 1_000.0,
            "GB" => self.size * 1_000_000.0,
            _ => self.size,
        }
    }
}

/// Finds every completed layer on a line of `ollama pull` output. A single
/// line can hold several progress redraws.
pub fn parse_pulled_layers(line: &str) -> Vec<PulledLayer> {
    PULLED_LAYER
        .captures_iter(line)
        .filter_map(|caps| {
            let size = caps[2].parse::<f64>().ok()?;
            Some(PulledLayer {
                digest: caps[1].to_string(),
                size,
                unit: caps[3].to_string(),
            })
        })
        .collect()
}

/// Download size accumulated over a pull, counted once per layer.
#[derive(Debug, Default)]
pub struct PullProgress {
    layers_kb: HashMap<String, f64>,
}

impl PullProgress {
    pub fn observe(&mut self, line: &str) {
        for layer in parse_pulled_layers(line) {
            self.layers_kb.insert(layer.digest.clone(), layer.size_kb());
        }
    }

    pub fn total_kb(&self) -> f64 {
        self.layers_kb.values().sum()
    }

    pub fn summary(&self) -> String {
        let total_kb = self.total_kb();
        if total_kb > 1_000.0 {
            format!("Downloaded: {:.2} MB", total_kb / 1_000.0)
        } else {
            format!("Downloaded: {:.2} KB", total_kb)
        }
    }
}

/// Rough parameter count derived from the file size, assuming one byte per
/// parameter. Display only.
pub fn estimate_parameters(size: &str, unit: &str) -> String {
    let size = size.parse::<f64>().unwrap_or(0.0);
    if unit.eq_ignore_ascii_case("GB") {
        format!("{:.2} B", size)
    } else {
        format!("{:.2} M", size)
    }
}

fn table_row(columns: [&str; 7]) -> String {
    let [model, parameters, quantization, architecture, id, created, size] = columns;
    format!(
        "{:<12} {:<11} {:<15} {:<13} {:<13} {:<15} {}",
        model, parameters, quantization, architecture, id, created, size
    )
}

pub fn table_header() -> String {
    table_row([
        "MODEL",
        "PARAMETERS",
        "QUANTIZATION",
        "ARCHITECTURE",
        "MODEL ID",
        "CREATED",
        "SIZE",
    ])
}

pub fn format_model_row(record: &ModelRecord, details: &ModelDetails) -> String {
    let parameters = estimate_parameters(&record.size, &record.size_unit);
    let size = format!("{} {}", record.size, record.size_unit);
    table_row([
        &record.name,
        &parameters,
        &details.quantization,
        &details.architecture,
        &record.id,
        &record.created,
        &size,
    ])
}
