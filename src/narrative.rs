//! Narrative reports from a remote text-generation service.
//!
//! The service is reached through [`NarrativeService`] so the dashboard can
//! run without network access; [`GeminiClient`] is the production
//! implementation. Failures never propagate past [`diagnose_record`] and
//! [`executive_summary`]: they come back as a [`Narrative`] with an error
//! message and no text.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{NarrativeConfig, Thresholds};
use crate::data::model::RecordTable;
use crate::data::model::TestRecord;
use crate::metrics::statistical_summary;

/// Shown instead of a summary when the filtered table is empty.
pub const NO_DATA_SUMMARY: &str = "No data available to summarize.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrativeError {
    #[error("narrative service not configured: set the {0} environment variable")]
    NotConfigured(String),
    #[error("could not reach narrative service: {0}")]
    Transport(String),
    #[error("narrative service answered with HTTP {0}")]
    Status(u16),
    #[error("narrative service returned no text")]
    EmptyResponse,
    #[error("could not decode narrative response: {0}")]
    Decode(String),
}

pub trait NarrativeService {
    /// Send `prompt` and return the generated Markdown.
    fn complete(&self, prompt: &str) -> Result<String, NarrativeError>;
}

// ---------------------------------------------------------------------------
// Gemini client
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Blocking client for the `generateContent` endpoint.
pub struct GeminiClient {
    agent: ureq::Agent,
    url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &NarrativeConfig, api_key: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        let url = format!(
            "{}/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        Self { agent, url, api_key }
    }

    /// Read the key from the configured environment variable.
    pub fn from_config(config: &NarrativeConfig) -> Result<Self, NarrativeError> {
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(config, key)),
            _ => Err(NarrativeError::NotConfigured(config.api_key_env.clone())),
        }
    }
}

impl NarrativeService for GeminiClient {
    fn complete(&self, prompt: &str) -> Result<String, NarrativeError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };
        let response = self
            .agent
            .post(&self.url)
            .set("x-goog-api-key", &self.api_key)
            .send_json(&body)
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => NarrativeError::Status(code),
                ureq::Error::Transport(t) => NarrativeError::Transport(t.to_string()),
            })?;
        let parsed: GenerateResponse = response
            .into_json()
            .map_err(|e| NarrativeError::Decode(e.to_string()))?;
        parsed.into_text().ok_or(NarrativeError::EmptyResponse)
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

pub fn record_prompt(record: &TestRecord, thresholds: &Thresholds) -> String {
    let power = record
        .rated_power_mva
        .map(|p| format!("\n- **Rated power:** {p} MVA"))
        .unwrap_or_default();
    format!(
        "You are a senior power-transformer diagnostics engineer with thirty years of \
field experience. Analyse the test below and write a detailed, actionable technical report.

**Test data:**
- **ID:** {id}
- **Model:** {model}
- **Test date:** {date}
- **Test type:** {test_type}
- **Final status:** {status}
- **Efficiency:** {eff:.2}% (minimum acceptable: {eff_min}%)
- **Temperature rise:** {temp:.1}°C (maximum acceptable: {temp_max}°C)
- **Total losses:** {losses:.2} kW (maximum acceptable: {losses_max} kW){power}

**Instructions:** write the report in Markdown with these sections:

**1. General diagnosis:** is the unit safe to operate, and is the result a concern?

**2. Root-cause hypotheses:** if the status is Rejected or a metric is out of range, \
list specific technical causes. If it is Approved but close to a limit, flag it.

**3. Potential risks:** what happens if the unit operates without correction.

**4. Recommended actions:** a prioritised list for engineering or maintenance.

Be technical and precise.",
        id = record.id,
        model = record.model,
        date = record.test_date.format("%Y-%m-%d"),
        test_type = record.test_type,
        status = record.status,
        eff = record.efficiency_pct,
        eff_min = thresholds.efficiency_min,
        temp = record.temperature_rise_c,
        temp_max = thresholds.temperature_max,
        losses = record.total_losses_kw,
        losses_max = thresholds.losses_max,
    )
}

pub fn summary_prompt(statistics: &str) -> String {
    format!(
        "You are a senior data analyst. Using the statistical description of transformer \
test results below, write an executive summary for management.

**Statistical description:**
```
{statistics}
```

**Instructions:** write 3 to 5 bullet points covering the overall trend, the models or \
metrics that stand out, notable anomalies in the minimum and maximum values, and a \
recommended direction for investigation. Be concise and decision-oriented."
    )
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Outcome of one narrative request. Exactly one of the two is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Narrative {
    pub text: String,
    pub error: Option<String>,
}

impl Narrative {
    fn from_result(result: Result<String, NarrativeError>) -> Self {
        match result {
            Ok(text) => Self { text, error: None },
            Err(err) => {
                log::error!("Narrative request failed: {err}");
                Self {
                    text: String::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

/// Engineering diagnosis of a single record.
pub fn diagnose_record(
    service: Result<&dyn NarrativeService, &NarrativeError>,
    record: &TestRecord,
    thresholds: &Thresholds,
) -> Narrative {
    log::info!("Requesting diagnosis for {}", record.id);
    let result = match service {
        Ok(service) => service.complete(&record_prompt(record, thresholds)),
        Err(err) => Err(err.clone()),
    };
    Narrative::from_result(result)
}

/// Management summary of the whole table. An empty table is answered
/// locally.
pub fn executive_summary(
    service: Result<&dyn NarrativeService, &NarrativeError>,
    table: &RecordTable,
) -> Narrative {
    if table.is_empty() {
        return Narrative {
            text: NO_DATA_SUMMARY.to_string(),
            error: None,
        };
    }
    log::info!("Requesting executive summary for {} records", table.len());
    let result = match service {
        Ok(service) => service.complete(&summary_prompt(&statistical_summary(table))),
        Err(err) => Err(err.clone()),
    };
    Narrative::from_result(result)
}
