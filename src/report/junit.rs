use super::types::TestReport;
use crate::model::{ExecutionResult, Verdict};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

/// Generate JUnit XML report string from a suite report
pub fn generate_junit_xml(report: &TestReport) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let summary = report.summary();
    let total_tests = report.executed_tests.to_string();
    let failures = summary.failed.to_string();
    let errors = summary.errored.to_string();
    let time = seconds(summary.total_duration_ms);
    let timestamp = report.completed_at.to_rfc3339();

    // <testsuites>
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "lumi-suite-run"));
    suites_start.push_attribute(("tests", total_tests.as_str()));
    suites_start.push_attribute(("failures", failures.as_str()));
    suites_start.push_attribute(("errors", errors.as_str()));
    suites_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    // One <testsuite> per suite run
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", report.target.as_str()));
    suite_start.push_attribute(("id", report.task_id.as_str()));
    suite_start.push_attribute(("tests", total_tests.as_str()));
    suite_start.push_attribute(("failures", failures.as_str()));
    suite_start.push_attribute(("errors", errors.as_str()));
    suite_start.push_attribute(("time", time.as_str()));
    suite_start.push_attribute(("timestamp", timestamp.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for result in &report.execution_results {
        write_test_case(&mut writer, &report.task_id, result)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    task_id: &str,
    result: &ExecutionResult,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", result.test_case_id.as_str()));
    case_start.push_attribute(("classname", task_id));
    case_start.push_attribute(("time", seconds(result.duration_ms).as_str()));
    writer.write_event(Event::Start(case_start))?;

    match result.verdict {
        Verdict::Fail => {
            let message = result.unmet_criteria.join("; ");
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", message.as_str()));
            fail_start.push_attribute(("type", "ValidationFailure"));
            writer.write_event(Event::Start(fail_start))?;
            for missed in &result.unmet_criteria {
                writer.write_event(Event::Text(BytesText::new(&format!("{}\n", missed))))?;
            }
            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        Verdict::Error => {
            let message = result.error_message.as_deref().unwrap_or("Unknown error");
            let mut err_start = BytesStart::new("error");
            err_start.push_attribute(("message", message));
            err_start.push_attribute(("type", "ExecutionError"));
            writer.write_event(Event::Start(err_start))?;
            writer.write_event(Event::Text(BytesText::new(message)))?;
            writer.write_event(Event::End(BytesEnd::new("error")))?;
        }
        Verdict::Pass => {}
    }

    if !result.artifacts.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        writer.write_event(Event::Text(BytesText::new(&result.artifacts.join("\n"))))?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write report to file
pub fn write_report(report: &TestReport, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(report)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_generate_junit_xml() {
        let t = Utc::now();
        let report = TestReport::assemble(
            "suite_1",
            "https://game.test",
            5,
            vec![
                ExecutionResult::passed("test_001", t, 1500, vec!["a.png".into()]),
                ExecutionResult::failed("test_002", t, 2000, vec!["Score shown".into()], vec![]),
                ExecutionResult::errored("test_003", t, 10, "Step 2 failed: gone".into(), vec![]),
            ],
            t,
        );

        let xml = generate_junit_xml(&report).expect("Failed to generate XML");

        assert!(xml.contains(r#"<testsuites name="lumi-suite-run""#));
        assert!(xml.contains(r#"tests="3""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"errors="1""#));
        assert!(xml.contains(r#"<testcase name="test_001""#));
        assert!(xml.contains(r#"message="Score shown""#));
        assert!(xml.contains(r#"message="Step 2 failed: gone""#));
        assert!(xml.contains("<system-out>a.png</system-out>"));
    }

    #[test]
    fn test_write_report_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let report = TestReport::assemble("suite_1", "https://t", 0, vec![], Utc::now());
        write_report(&report, dir.path()).unwrap();
        assert!(dir.path().join("junit.xml").exists());
    }
}
