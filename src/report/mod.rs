pub mod json;
pub mod junit;
pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::{ReportSummary, TestReport};

/// Re-export a saved `report.json` in another format
pub async fn generate_report(
    report_path: &Path,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(report_path).await?;
    let report: TestReport = serde_json::from_str(&raw)?;

    match format {
        "json" => json::generate(&report, output),
        "junit" => {
            let xml = junit::generate_junit_xml(&report)?;
            match output {
                Some(path) => {
                    std::fs::write(path, xml)?;
                    println!("JUnit report saved to: {}", path.display());
                }
                None => println!("{}", xml),
            }
            Ok(())
        }
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}

/// Write `report.json` and `junit.xml` into `output_dir`
pub fn write_all(report: &TestReport, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    json::generate(report, Some(&output_dir.join("report.json")))?;
    junit::write_report(report, output_dir)
}
