use crate::strategies::{Strategy, output_contract};

/// The violation category is supplied with the source; the model only refactors.
pub struct KnownViolationStrategy;

impl Strategy for KnownViolationStrategy {
    fn id(&self) -> &'static str {
        "KNOWN"
    }

    fn description(&self) -> &'static str {
        "Refactor code whose violation type is given at the end of the prompt"
    }

    fn render(&self, source: &str, language: &str) -> String {
        format!(
            "Refactor the following {language} code that has a SOLID violation. \
             The type of violation will be given to you at the end of the prompt. \
             Repeat that violation type as the marker in your answer.\n\n\
             {contract}\n\
             {source}",
            contract = output_contract(language),
        )
    }
}
