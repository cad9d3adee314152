//! Diagnostics collected while building the automaton.

use crate::automaton::StateID;
use std::fmt;

/// Severity of a diagnostic, ordered from the least to the most severe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrammarErrorLevel {
    Info,
    Warning,
    Conflict,
    Error,
    InternalError,
}

impl fmt::Display for GrammarErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Conflict => "conflict",
            Self::Error => "error",
            Self::InternalError => "internal error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Diagnostic {
    pub level: GrammarErrorLevel,
    pub state: Option<StateID>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.level)?;
        if let Some(state) = self.state {
            write!(f, " {}:", state)?;
        }
        write!(f, " {}", self.message)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn add(
        &mut self,
        level: GrammarErrorLevel,
        state: Option<StateID>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            level,
            state,
            message: message.into(),
        };
        match level {
            GrammarErrorLevel::Info => tracing::debug!("{}", diagnostic),
            GrammarErrorLevel::Warning | GrammarErrorLevel::Conflict => {
                tracing::warn!("{}", diagnostic)
            }
            GrammarErrorLevel::Error | GrammarErrorLevel::InternalError => {
                tracing::error!("{}", diagnostic)
            }
        }
        self.entries.push(diagnostic);
    }

    /// The highest severity recorded so far.
    pub fn max_level(&self) -> Option<GrammarErrorLevel> {
        self.entries.iter().map(|d| d.level).max()
    }

    pub fn has_errors(&self) -> bool {
        self.max_level() >= Some(GrammarErrorLevel::Error)
    }

    pub fn with_level(&self, level: GrammarErrorLevel) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.entries.iter().filter(move |d| d.level == level)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.entries {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("the grammar has structural errors:\n{0}")]
    Structural(Diagnostics),
}

impl BuildError {
    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            Self::Structural(diagnostics) => diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_level_follows_severity_order() {
        let mut diagnostics = Diagnostics::default();
        assert_eq!(diagnostics.max_level(), None);

        diagnostics.add(GrammarErrorLevel::Conflict, Some(StateID::from_raw(3)), "c");
        diagnostics.add(GrammarErrorLevel::Warning, None, "w");
        assert_eq!(diagnostics.max_level(), Some(GrammarErrorLevel::Conflict));
        assert!(!diagnostics.has_errors());

        diagnostics.add(GrammarErrorLevel::InternalError, None, "i");
        assert!(diagnostics.has_errors());
        assert_eq!(
            diagnostics.with_level(GrammarErrorLevel::Warning).count(),
            1
        );
        assert_eq!(
            diagnostics.iter().next().unwrap().to_string(),
            "[conflict] S3: c"
        );
    }
}
