use std::fmt::Write as _;

use tabled::settings::Style;
use tabled::{Table, Tabled};
use termtree::Tree;

use crate::runner::ScenarioReport;

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Scenario")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Result")]
    result: &'static str,
    #[tabled(rename = "Failures")]
    failures: usize,
    #[tabled(rename = "Teardown")]
    teardown: String,
    #[tabled(rename = "Duration")]
    duration: String,
}

impl From<&ScenarioReport> for SummaryRow {
    fn from(report: &ScenarioReport) -> Self {
        Self {
            name: report.name.clone(),
            kind: report.kind.to_string(),
            result: if report.passed() { "PASS" } else { "FAIL" },
            failures: report.failures.len(),
            teardown: report.teardown.to_string(),
            duration: format!("{:.1}s", report.duration.as_secs_f64()),
        }
    }
}

pub fn render_table(reports: &[ScenarioReport]) -> String {
    let rows: Vec<SummaryRow> = reports.iter().map(SummaryRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// Step-by-step view of one scenario, failures listed under the root.
pub fn render_tree(report: &ScenarioReport) -> Tree<String> {
    let verdict = if report.passed() { "PASS" } else { "FAIL" };
    let mut tree = Tree::new(format!("{} [{}] {}", report.name, report.kind, verdict));

    for record in &report.steps {
        let mark = if record.passed { "ok" } else { "FAILED" };
        tree.push(format!("{} ... {}", record.step, mark));
    }

    if !report.failures.is_empty() {
        let failures = report.failures.iter().map(|f| first_line(&f.to_string()));
        tree.push(Tree::new("failures".to_string()).with_leaves(failures));
    }
    tree
}

pub fn render_trees(reports: &[ScenarioReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(out, "{}", render_tree(report));
    }
    out
}

/// Full failure text, including captured tool output, for failed scenarios.
pub fn render_failure_details(reports: &[ScenarioReport]) -> String {
    let mut out = String::new();
    for report in reports.iter().filter(|r| !r.passed()) {
        for failure in &report.failures {
            let _ = writeln!(out, "--- {}: {}\n", report.name, failure);
        }
    }
    out
}

pub fn to_json(reports: &[ScenarioReport]) -> serde_json::Value {
    let scenarios: Vec<serde_json::Value> = reports
        .iter()
        .map(|report| {
            let steps: Vec<serde_json::Value> = report
                .steps
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "step": s.step.to_string(),
                        "passed": s.passed,
                        "duration_ms": s.duration.as_millis() as u64,
                    })
                })
                .collect();
            let failures: Vec<String> = report.failures.iter().map(|f| f.to_string()).collect();
            let outputs: serde_json::Map<String, serde_json::Value> = report
                .outputs
                .names()
                .filter_map(|name| {
                    report
                        .outputs
                        .get(name)
                        .map(|v| (name.to_string(), serde_json::Value::String(v.to_string())))
                })
                .collect();

            serde_json::json!({
                "name": report.name,
                "kind": report.kind.as_str(),
                "passed": report.passed(),
                "teardown": report.teardown.to_string(),
                "duration_ms": report.duration.as_millis() as u64,
                "steps": steps,
                "failures": failures,
                "outputs": outputs,
            })
        })
        .collect();

    let failed = reports.iter().filter(|r| !r.passed()).count();
    serde_json::json!({
        "total": reports.len(),
        "failed": failed,
        "scenarios": scenarios,
    })
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().to_string()
}
