use crate::errors::Result;
use crate::improve::ImproveOutcome;
use crate::summary::ScanSummary;
use serde::Serialize;
use std::io::Write;

/// Defines the possible output formats for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A simple, human-readable text format.
    Text,
    /// Pretty-printed JSON, suitable for machine processing.
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json { OutputFormat::Json } else { OutputFormat::Text }
    }
}

/// Renders scan summaries and improve outcomes for stdout.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Writes a scan summary to a given writer.
    pub fn write_scan<W: Write>(&self, writer: &mut W, summary: &ScanSummary) -> Result<()> {
        let output = match self.format {
            OutputFormat::Text => format_scan_text(summary),
            OutputFormat::Json => format_json(summary)?,
        };
        writer.write_all(output.as_bytes())?;
        Ok(())
    }

    /// Writes the outcome of an improve run to a given writer.
    pub fn write_improve<W: Write>(&self, writer: &mut W, outcome: &ImproveOutcome) -> Result<()> {
        let output = match self.format {
            OutputFormat::Text => format_improve_text(outcome),
            OutputFormat::Json => format_json(outcome)?,
        };
        writer.write_all(output.as_bytes())?;
        Ok(())
    }
}

fn format_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

fn format_scan_text(summary: &ScanSummary) -> String {
    let mut lines = vec![
        "DesignV1 scan".to_string(),
        format!("Root: {}", summary.root),
        format!("Files scanned: {}", summary.files.scanned),
        format!("UI files: {}", summary.files.ui),
        String::new(),
        "Detected stack".to_string(),
    ];
    lines.extend(summary.stack.iter().map(|item| format!("- {item}")));
    lines.push(String::new());
    lines.push("Findings".to_string());
    lines.extend(summary.findings.iter().map(|finding| format!("- {finding}")));
    lines.push(String::new());
    format!("{}\n", lines.join("\n"))
}

fn format_improve_text(outcome: &ImproveOutcome) -> String {
    let mut lines = vec![
        "DesignV1 improve".to_string(),
        format!("Root: {}", outcome.root),
        format!("Mode: {}", outcome.mode),
        format!("Files changed: {}", outcome.changed_files.len()),
    ];
    for file in &outcome.changed_files {
        lines.push(format!("  {file}"));
    }
    if let Some(patch_path) = &outcome.patch_path {
        lines.push(format!("Patch: {}", patch_path.display()));
    }
    lines.push(format!("Report: {}", outcome.report_path.display()));
    if !outcome.notes.is_empty() {
        lines.push(String::new());
        lines.push("Notes".to_string());
        lines.extend(outcome.notes.iter().map(|note| format!("- {note}")));
    }
    lines.push(String::new());
    format!("{}\n", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output_writer::Mode;
    use crate::summary::FileCounts;
    use std::path::PathBuf;

    fn summary() -> ScanSummary {
        ScanSummary {
            root: "/work/web".into(),
            stack: vec!["Next.js".into(), "Tailwind CSS".into()],
            files: FileCounts { scanned: 12, ui: 7 },
            findings: vec!["Uses zinc color tokens".into()],
        }
    }

    fn outcome() -> ImproveOutcome {
        ImproveOutcome {
            root: "/work/web".into(),
            mode: Mode::Patch,
            changed_files: vec!["src/app/page.tsx".into()],
            patch_path: Some(PathBuf::from("/work/web/.designv1/patches/improve-S.patch")),
            report_path: PathBuf::from("/work/web/.designv1/reports/improve-S.json"),
            notes: vec!["External proposals disabled (set OPENAI_API_KEY to enable).".into()],
        }
    }

    fn render<F: Fn(&OutputFormatter, &mut Vec<u8>) -> Result<()>>(format: OutputFormat, f: F) -> String {
        let mut buffer = Vec::new();
        f(&OutputFormatter::new(format), &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_scan_text_format() {
        let output = render(OutputFormat::Text, |fmt, out| fmt.write_scan(out, &summary()));
        assert!(output.starts_with("DesignV1 scan\nRoot: /work/web\n"));
        assert!(output.contains("Files scanned: 12\nUI files: 7\n"));
        assert!(output.contains("Detected stack\n- Next.js\n- Tailwind CSS\n"));
        assert!(output.contains("Findings\n- Uses zinc color tokens\n"));
    }

    #[test]
    fn test_scan_json_format() {
        let output = render(OutputFormat::Json, |fmt, out| fmt.write_scan(out, &summary()));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["files"]["ui"], 7);
        assert_eq!(value["stack"][1], "Tailwind CSS");
    }

    #[test]
    fn test_improve_text_format() {
        let output = render(OutputFormat::Text, |fmt, out| fmt.write_improve(out, &outcome()));
        assert!(output.contains("Mode: patch\n"));
        assert!(output.contains("Files changed: 1\n  src/app/page.tsx\n"));
        assert!(output.contains("Patch: /work/web/.designv1/patches/improve-S.patch\n"));
        assert!(output.contains("Notes\n- External proposals disabled"));
    }

    #[test]
    fn test_improve_json_format() {
        let output = render(OutputFormat::Json, |fmt, out| fmt.write_improve(out, &outcome()));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["mode"], "patch");
        assert_eq!(value["changedFiles"][0], "src/app/page.tsx");
        assert!(value["reportPath"].is_string());
    }
}
