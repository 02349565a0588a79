use crate::strategies::{Strategy, output_contract};

/// Self-assessment: score every principle before committing to one.
pub struct EnsembleStrategy;

impl Strategy for EnsembleStrategy {
    fn id(&self) -> &'static str {
        "ENSEMBLE"
    }

    fn description(&self) -> &'static str {
        "Score each SOLID principle 0-5, then fix the most violated one"
    }

    fn render(&self, source: &str, language: &str) -> String {
        format!(
            "Rate the following {language} code on a scale from 0 (severe violation) to 5 (perfect compliance) \
             for each SOLID principle:\n\n\
             SRP:\n\
             OCP:\n\
             LSP:\n\
             ISP:\n\
             DIP:\n\n\
             Reason about each score internally. Then pick the most violated principle and refactor the code \
             so that it no longer violates it. Report only the chosen principle in the answer.\n\n\
             {contract}\n\
             {source}",
            contract = output_contract(language),
        )
    }
}
