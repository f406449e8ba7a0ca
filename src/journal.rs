//! Injected logging capability
//!
//! Every statistical step emits one `LogRecord` through an `AnalysisLog`.
//! The binary forwards records to `tracing`; tests collect them in memory.

use crate::stats::Significance;
use serde::Serialize;

/// One statistical step: which test ran, its numbers and the interpretation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Step name (e.g. "levene", "tukey_hsd")
    pub step: String,
    /// Variable under evaluation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pvalue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Significance>,
    /// Interpretation sentence
    pub message: String,
}

impl LogRecord {
    pub fn new(step: &str, message: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            variable: None,
            statistic: None,
            pvalue: None,
            verdict: None,
            message: message.into(),
        }
    }

    pub fn variable(mut self, variable: &str) -> Self {
        self.variable = Some(variable.to_string());
        self
    }

    pub fn test(mut self, statistic: f64, pvalue: f64) -> Self {
        self.statistic = Some(statistic);
        self.pvalue = Some(pvalue);
        self
    }

    pub fn verdict(mut self, verdict: Significance) -> Self {
        self.verdict = Some(verdict);
        self
    }
}

/// Sink for analysis records (append-only)
pub trait AnalysisLog {
    fn record(&mut self, record: LogRecord);
}

/// Forwards records to `tracing` at INFO level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl AnalysisLog for TracingLog {
    fn record(&mut self, record: LogRecord) {
        tracing::info!(
            step = %record.step,
            variable = record.variable.as_deref().unwrap_or("-"),
            statistic = record.statistic,
            pvalue = record.pvalue,
            verdict = record.verdict.map(|v| v.as_str()),
            "{}",
            record.message
        );
    }
}

/// Collects records in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    records: Vec<LogRecord>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Records emitted by a given step
    pub fn steps(&self, step: &str) -> Vec<&LogRecord> {
        self.records.iter().filter(|r| r.step == step).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.records.iter().any(|r| r.message.contains(needle))
    }
}

impl AnalysisLog for MemoryLog {
    fn record(&mut self, record: LogRecord) {
        self.records.push(record);
    }
}

/// Fan out to two sinks (e.g. tracing plus an in-memory transcript)
pub struct Tee<'a, A: AnalysisLog, B: AnalysisLog> {
    pub first: &'a mut A,
    pub second: &'a mut B,
}

impl<A: AnalysisLog, B: AnalysisLog> AnalysisLog for Tee<'_, A, B> {
    fn record(&mut self, record: LogRecord) {
        self.first.record(record.clone());
        self.second.record(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_collects_in_order() {
        let mut log = MemoryLog::new();
        log.record(LogRecord::new("levene", "variances roughly equal").test(0.4, 0.67));
        log.record(LogRecord::new("anova", "no evidence of group differences"));

        assert_eq!(log.records().len(), 2);
        assert_eq!(log.records()[0].step, "levene");
        assert_eq!(log.records()[0].pvalue, Some(0.67));
        assert_eq!(log.steps("anova").len(), 1);
        assert!(log.contains("no evidence"));
    }

    #[test]
    fn test_tee_duplicates_records() {
        let mut a = MemoryLog::new();
        let mut b = MemoryLog::new();
        {
            let mut tee = Tee {
                first: &mut a,
                second: &mut b,
            };
            tee.record(LogRecord::new("chi_square", "counts roughly even").variable("R jacket"));
        }
        assert_eq!(a.records(), b.records());
        assert_eq!(a.records()[0].variable.as_deref(), Some("R jacket"));
    }

    #[test]
    fn test_record_serializes_without_empty_fields() {
        let json = serde_json::to_string(&LogRecord::new("describe", "Red: n=5")).unwrap();
        assert!(!json.contains("pvalue"));
        assert!(json.contains("\"step\":\"describe\""));
    }
}
