use crate::{DiagnosticKind, JavaLanguageLevel, Severity};

/// Priority attached to a recognized task tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TaskPriority {
    High,
    Normal,
    Low,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Normal
    }
}

/// The configuration record handed to the front-end alongside the source
/// buffer. One instance is shared by the scanner, parser, javadoc parser and
/// binding layer of a compilation unit.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompilerOptions {
    pub source_level: JavaLanguageLevel,
    pub target_level: JavaLanguageLevel,
    pub compliance_level: JavaLanguageLevel,
    pub doc_comment_support: bool,
    pub task_tags: Vec<String>,
    /// Zipped positionally with `task_tags`; missing entries default to
    /// [`TaskPriority::Normal`].
    pub task_priorities: Vec<TaskPriority>,
    pub task_case_sensitive: bool,
    pub store_annotations: bool,
    pub annotation_based_null_analysis: bool,
    /// Per-kind severity overrides, applied over the kind defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub severity_overrides: Vec<(DiagnosticKind, Severity)>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            source_level: JavaLanguageLevel::default(),
            target_level: JavaLanguageLevel::default(),
            compliance_level: JavaLanguageLevel::default(),
            doc_comment_support: true,
            task_tags: vec!["TODO".to_string(), "FIXME".to_string(), "XXX".to_string()],
            task_priorities: vec![
                TaskPriority::Normal,
                TaskPriority::High,
                TaskPriority::Normal,
            ],
            task_case_sensitive: true,
            store_annotations: false,
            annotation_based_null_analysis: false,
            severity_overrides: Vec::new(),
        }
    }
}

impl CompilerOptions {
    /// Options pinned to a single source/target/compliance level.
    pub fn at_level(level: JavaLanguageLevel) -> Self {
        Self {
            source_level: level,
            target_level: level,
            compliance_level: level,
            ..Self::default()
        }
    }

    /// Effective severity for a diagnostic kind, after overrides.
    pub fn severity(&self, kind: DiagnosticKind) -> Severity {
        self.severity_overrides
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, s)| *s)
            .unwrap_or_else(|| kind.default_severity())
    }

    /// Priority for the task tag at `index`, defaulting when the priorities
    /// list is shorter than the tag list.
    pub fn task_priority(&self, index: usize) -> TaskPriority {
        self.task_priorities.get(index).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_overrides_win_and_latest_wins() {
        let mut options = CompilerOptions::default();
        options
            .severity_overrides
            .push((DiagnosticKind::DuplicateMethod, Severity::Warning));
        options
            .severity_overrides
            .push((DiagnosticKind::DuplicateMethod, Severity::Ignore));
        assert_eq!(
            options.severity(DiagnosticKind::DuplicateMethod),
            Severity::Ignore
        );
        assert_eq!(
            options.severity(DiagnosticKind::UnterminatedString),
            Severity::Error
        );
    }

    #[test]
    fn task_priorities_default_when_short() {
        let options = CompilerOptions {
            task_tags: vec!["TODO".into(), "HACK".into()],
            task_priorities: vec![TaskPriority::High],
            ..CompilerOptions::default()
        };
        assert_eq!(options.task_priority(0), TaskPriority::High);
        assert_eq!(options.task_priority(1), TaskPriority::Normal);
    }
}
