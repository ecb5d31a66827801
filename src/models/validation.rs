use serde::{Deserialize, Serialize};

/// Outcome of validating one TimeframeAnalysis.
/// Findings are data: validation never fails, it reports.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Mutable collector used while rules run; frozen into a ValidationResult.
#[derive(Debug, Default)]
pub struct ValidationReport {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn finish(self) -> ValidationResult {
        ValidationResult {
            valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_alone_keep_result_valid() {
        let mut report = ValidationReport::new();
        report.warn("confidence 0.40 below 0.60");
        let result = report.finish();
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);
        assert!(result.errors().is_empty());
    }

    #[test]
    fn test_any_error_invalidates() {
        let mut report = ValidationReport::new();
        report.warn("w");
        report.error("e");
        assert!(report.has_errors());
        assert!(!report.finish().is_valid());
    }
}
