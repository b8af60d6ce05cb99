use super::types::{ReportSummary, TestReport};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument<'a> {
    #[serde(flatten)]
    report: &'a TestReport,
    summary: ReportSummary,
}

/// Pretty JSON of the report with its derived summary
pub fn to_json(report: &TestReport) -> Result<String> {
    let doc = ReportDocument {
        report,
        summary: report.summary(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Write to `output`, or print to stdout when no path is given
pub fn generate(report: &TestReport, output: Option<&Path>) -> Result<()> {
    let json = to_json(report)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}
