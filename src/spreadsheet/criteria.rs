use glob::Pattern;

/// Criteria for selecting the sheets of a workbook.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    /// Sheet name patterns for filtering which sheets to process.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Maximum number of sheets to read.
    pub sheet_limit: Option<usize>,
}

impl Criteria {
    /// Builds criteria from glob expressions such as `Bilan*` or `Tableau ?`.
    pub fn with_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, glob::PatternError> {
        if patterns.is_empty() {
            return Ok(Criteria::default());
        }
        let patterns = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Criteria {
            sheet_name_patterns: Some(patterns),
            sheet_limit: None,
        })
    }

    /// Checks if a sheet name matches the criteria patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }
}
