// Data-quality diagnostics.
//
// Stages return a [`Diagnostics`] next to their primary output instead of
// printing as they go. None of these stop the run.

use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Resolved country is not in the valid set.
    InvalidCountry { project: String, country: String },
    /// Project has no Report rows in the primary area indicator.
    MissingReport { project: String },
    /// Target was copied from the project's latest report.
    SynthesizedTarget { indicator: String, project: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticKind {
    InvalidCountry,
    MissingReport,
    SynthesizedTarget,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::InvalidCountry { .. } => DiagnosticKind::InvalidCountry,
            Diagnostic::MissingReport { .. } => DiagnosticKind::MissingReport,
            Diagnostic::SynthesizedTarget { .. } => DiagnosticKind::SynthesizedTarget,
        }
    }

    pub fn project(&self) -> &str {
        match self {
            Diagnostic::InvalidCountry { project, .. }
            | Diagnostic::MissingReport { project }
            | Diagnostic::SynthesizedTarget { project, .. } => project,
        }
    }

    fn detail(&self) -> String {
        match self {
            Diagnostic::InvalidCountry { project, country } => format!("{project} ({country})"),
            Diagnostic::MissingReport { project } => project.clone(),
            Diagnostic::SynthesizedTarget { indicator, project } => {
                format!("{project} [{indicator}]")
            }
        }
    }
}

/// Flat row for the console listing.
#[derive(Debug, Clone, Tabled)]
pub struct DiagnosticRow {
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Project")]
    pub project: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, d: Diagnostic) {
        self.items.push(d);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.kind() == kind)
    }

    /// One formatted message per category, in a stable order.
    pub fn summaries(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (kind, heading) in [
            (
                DiagnosticKind::InvalidCountry,
                "Projects whose country is not a valid platform region",
            ),
            (
                DiagnosticKind::MissingReport,
                "Projects without any F1 report; excluded and data re-pulled",
            ),
            (
                DiagnosticKind::SynthesizedTarget,
                "Projects without a target; target copied from latest report",
            ),
        ] {
            let details: Vec<String> = self.of_kind(kind).map(Diagnostic::detail).collect();
            if !details.is_empty() {
                out.push(format!("{} ({}): {}", heading, details.len(), details.join("; ")));
            }
        }
        out
    }

    pub fn log(&self) {
        for line in self.summaries() {
            warn!("{}", line);
        }
    }

    pub fn rows(&self) -> Vec<DiagnosticRow> {
        self.items
            .iter()
            .map(|d| DiagnosticRow {
                kind: format!("{:?}", d.kind()),
                project: d.project().to_string(),
                detail: d.detail(),
            })
            .collect()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_group_by_category() {
        let diags: Diagnostics = vec![
            Diagnostic::SynthesizedTarget {
                indicator: "F1".into(),
                project: "Alpha".into(),
            },
            Diagnostic::InvalidCountry {
                project: "Gamma".into(),
                country: "Atlantis".into(),
            },
            Diagnostic::SynthesizedTarget {
                indicator: "F2.1b".into(),
                project: "Beta".into(),
            },
        ]
        .into_iter()
        .collect();

        let lines = diags.summaries();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Gamma (Atlantis)"));
        assert!(lines[1].starts_with("Projects without a target"));
        assert!(lines[1].contains("(2)"));
        assert!(lines[1].contains("Alpha [F1]; Beta [F2.1b]"));
    }

    #[test]
    fn serializes_with_kind_tag() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::MissingReport {
            project: "Delta".into(),
        });
        let json = serde_json::to_string(&diags).unwrap();
        assert_eq!(json, r#"[{"kind":"missing_report","project":"Delta"}]"#);
    }
}
