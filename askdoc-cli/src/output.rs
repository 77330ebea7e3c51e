//! Human-readable rendering of answers and health reports.

use askdoc_rag::{Answer, ComponentStatus, HealthReport};

/// Render an answer followed by its sources, if any.
pub fn render_answer(answer: &Answer) -> String {
    let mut out = answer.text.trim_end().to_string();
    if !answer.sources.is_empty() {
        out.push_str(&format!("\n\nSources: {}", answer.sources.join(", ")));
    }
    out
}

fn status_line(out: &mut String, name: &str, status: &ComponentStatus) {
    let line = match status {
        ComponentStatus::Reachable => format!("  {name:<24} ok\n"),
        ComponentStatus::Unreachable(reason) => format!("  {name:<24} FAILED  {reason}\n"),
    };
    out.push_str(&line);
}

/// Render one line per collaborator.
pub fn render_health(report: &HealthReport) -> String {
    let mut out = String::from("Collaborators:\n");
    status_line(&mut out, "embedding", &report.embedder);
    status_line(&mut out, "vector store", &report.vector_store);
    for (name, status) in &report.generation {
        status_line(&mut out, &format!("generation ({name})"), status);
    }
    out
}
