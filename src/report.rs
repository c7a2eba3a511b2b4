//! Batch AMR to DAIDE runs and what they write out.
//!
//! Each AMR of a batch becomes one text block (echoed AMR, diagnostics and
//! DAIDE) and optionally one JSON line. A failure in one item is logged and
//! the batch moves on; only a stretch of input that is not an AMR at all
//! ends the run early.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::amr::{AmrError, ParsedAmr, read_amrs};
use crate::rules::{DaideTranslator, is_empty_amr};

/// Non-DAIDE AMR concepts that are known to have no rule yet.
pub const EXTENDED_CONCEPTS: &[&str] = &[
    "attack-01",
    "betray-01",
    "defend-01",
    "dislodge-01",
    "expect-01",
    "fear-01",
    "gain-02",
    "lie-08",
    "lose-02",
    "possible-01",
    "prevent-01",
    "threaten-01",
    "trust-01",
    "warn-01",
];

static DAIDE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]{3}").unwrap());
static LOWERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]").unwrap());
static AMR_CONCEPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z]\S*-\d\d\b)").unwrap());
static UNDERSPECIFIED_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((?:army|fleet) :(?:mod|location) [A-Z]{3}\)").unwrap());

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to write JSON record: {0}")]
    Json(#[from] serde_json::Error),
}

// ----------------- Coverage -----------------

/// How much of an AMR made it into DAIDE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Coverage {
    #[serde(rename = "No-DAIDE")]
    None,
    #[serde(rename = "Partial-DAIDE")]
    Partial,
    #[serde(rename = "Full-DAIDE")]
    Full,
}

impl Coverage {
    /// Full when there are DAIDE codes and no leftover AMR (lowercase) text.
    pub fn classify(daide: &str) -> Self {
        if !DAIDE_CODE.is_match(daide) {
            Coverage::None
        } else if LOWERCASE.is_match(daide) {
            Coverage::Partial
        } else {
            Coverage::Full
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Coverage::None => "No-DAIDE",
            Coverage::Partial => "Partial-DAIDE",
            Coverage::Full => "Full-DAIDE",
        }
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ----------------- Per-item Output -----------------

#[derive(Debug, Serialize)]
pub struct ItemRecord<'a> {
    pub id: Option<&'a str>,
    pub snt: Option<&'a str>,
    pub amr: &'a str,
    #[serde(rename = "daide-status")]
    pub daide_status: Coverage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daide: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ItemReport {
    pub id: Option<String>,
    pub sentence: Option<String>,
    pub amr: String,
    pub diagnostics: Vec<String>,
    pub daide: String,
    pub coverage: Coverage,
}

impl ItemReport {
    pub fn new(parsed: &ParsedAmr, daide: String) -> Self {
        let amr = &parsed.amr;
        Self {
            id: amr.id.clone(),
            sentence: amr.sentence.clone(),
            amr: amr.source.trim().to_string(),
            diagnostics: parsed.diagnostics.iter().map(ToString::to_string).collect(),
            coverage: Coverage::classify(&daide),
            daide,
        }
    }

    pub fn write_block<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "# ::id {}", self.id.as_deref().unwrap_or_default())?;
        writeln!(out, "# ::snt {}", self.sentence.as_deref().unwrap_or_default())?;
        for diagnostic in &self.diagnostics {
            writeln!(out, "# ::error {diagnostic}")?;
        }
        writeln!(out, "AMR:\n{}", self.amr)?;
        match self.coverage {
            Coverage::Full => writeln!(out, "DAIDE: {}", self.daide)?,
            Coverage::Partial => writeln!(out, "PARTIAL-DAIDE: {}", self.daide)?,
            Coverage::None => writeln!(out, "NO-DAIDE")?,
        }
        writeln!(out)
    }

    pub fn record(&self) -> ItemRecord<'_> {
        ItemRecord {
            id: self.id.as_deref(),
            snt: self.sentence.as_deref(),
            amr: &self.amr,
            daide_status: self.coverage,
            daide: Some(self.daide.as_str()).filter(|d| !d.is_empty()),
        }
    }

    pub fn write_json_line<W: Write>(&self, out: &mut W) -> Result<(), ReportError> {
        serde_json::to_writer(&mut *out, &self.record())?;
        writeln!(out)?;
        Ok(())
    }
}

// ----------------- Developer Summary -----------------

/// Developer-mode verdict on one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub problematic: bool,
    /// False for items not worth echoing while working on the rules.
    pub show: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub amrs: usize,
    pub empty_amrs: usize,
    pub unproblematic: usize,
    pub underspecified_units: usize,
    pub with_known_extended: usize,
    pub with_other_extended: usize,
    pub known_extended: BTreeMap<String, usize>,
    pub other_extended: BTreeMap<String, usize>,
    pub failed_ids: Vec<String>,
    pub last_id: Option<String>,
}

impl Summary {
    /// Counts one translated item; `daide` is `None` for the empty AMR.
    pub fn record(&mut self, id: Option<&str>, daide: Option<&str>) -> Assessment {
        self.amrs += 1;
        self.last_id = id.map(str::to_string);

        let Some(daide) = daide else {
            self.empty_amrs += 1;
            self.unproblematic += 1;
            return Assessment {
                problematic: false,
                show: false,
            };
        };

        let mut assessment = Assessment {
            problematic: false,
            show: true,
        };
        let concepts: Vec<&str> = AMR_CONCEPT
            .find_iter(daide)
            .map(|m| m.as_str())
            .collect();
        if !concepts.is_empty() {
            let known: Vec<&str> = concepts
                .iter()
                .copied()
                .filter(|c| EXTENDED_CONCEPTS.iter().any(|known| known == c))
                .collect();
            if known.is_empty() {
                self.with_other_extended += 1;
                for concept in concepts {
                    *self.other_extended.entry(concept.to_string()).or_default() += 1;
                }
            } else {
                self.with_known_extended += 1;
                for concept in known {
                    *self.known_extended.entry(concept.to_string()).or_default() += 1;
                }
                assessment.show = false;
            }
            assessment.problematic = true;
        }
        if daide.contains("(unit ") || UNDERSPECIFIED_UNIT.is_match(daide) {
            self.underspecified_units += 1;
            assessment.problematic = true;
            assessment.show = false;
        }
        if LOWERCASE.is_match(daide) {
            assessment.problematic = true;
        }
        if !assessment.problematic {
            self.unproblematic += 1;
        }
        assessment
    }

    /// Counts an item that could not be printed or translated.
    pub fn record_failure(&mut self, id: Option<&str>) {
        self.amrs += 1;
        self.last_id = id.map(str::to_string);
        self.failed_ids.push(id.unwrap_or_default().to_string());
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "Summary: {} AMRs; {} empty AMRs; {} unproblematic; {} underspecified units; {}/{} AMRs with extended concept",
            self.amrs,
            self.empty_amrs,
            self.unproblematic,
            self.underspecified_units,
            self.with_known_extended,
            self.with_other_extended
        )?;
        writeln!(out, "Last snt-id: {}", self.last_id.as_deref().unwrap_or_default())
    }

    pub fn log_counters(&self) {
        if !self.failed_ids.is_empty() {
            warn!(ids = ?self.failed_ids, "items that failed");
        }
        for (concept, count) in &self.known_extended {
            info!(concept = %concept, count, "known extended concept");
        }
        for (concept, count) in &self.other_extended {
            info!(concept = %concept, count, "other extended concept");
        }
    }
}

// ----------------- Batch -----------------

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub max: Option<usize>,
    pub developer_mode: bool,
    /// Write the per-item text blocks.
    pub echo_blocks: bool,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub summary: Summary,
    /// Set when the input stopped being AMR before its end.
    pub stream_error: Option<AmrError>,
}

/// Translates every AMR in `text`, writing blocks to `out` and records to
/// `json`.
pub fn run_batch<W: Write, J: Write>(
    text: &str,
    translator: &DaideTranslator<'_>,
    options: BatchOptions,
    out: &mut W,
    mut json: Option<&mut J>,
) -> Result<BatchOutcome, ReportError> {
    let mut summary = Summary::default();
    let mut stream_error = None;

    for item in read_amrs(text).take(options.max.unwrap_or(usize::MAX)) {
        let parsed = match item {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stopped reading AMRs");
                stream_error = Some(e);
                break;
            }
        };
        let id = parsed.amr.id.as_deref();

        if let Err(e) = parsed.amr.to_text() {
            warn!(id = ?id, error = %e, "could not print AMR");
            summary.record_failure(id);
            continue;
        }
        let empty = is_empty_amr(&parsed.amr);
        let daide = match translator.translate(&parsed.amr) {
            Ok(daide) => daide,
            Err(e) => {
                warn!(id = ?id, error = %e, "could not translate AMR");
                summary.record_failure(id);
                continue;
            }
        };

        let assessment = summary.record(id, (!empty).then_some(daide.as_str()));
        let report = ItemReport::new(&parsed, daide);
        if options.echo_blocks && (!options.developer_mode || assessment.show) {
            report.write_block(out)?;
        }
        if let Some(json) = json.as_deref_mut() {
            report.write_json_line(json)?;
        }
    }

    if options.developer_mode {
        summary.write(out)?;
        summary.log_counters();
    }
    Ok(BatchOutcome {
        summary,
        stream_error,
    })
}
