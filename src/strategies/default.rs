use crate::strategies::{Strategy, output_contract};

/// Baseline: a bare instruction followed by the output contract.
pub struct DefaultStrategy;

impl Strategy for DefaultStrategy {
    fn id(&self) -> &'static str {
        "DEFAULT"
    }

    fn description(&self) -> &'static str {
        "Instruction only: name the SOLID violation and refactor it"
    }

    fn render(&self, source: &str, language: &str) -> String {
        format!(
            "Identify the type of SOLID violation (Single Responsibility Principle, Open-Closed Principle, \
             Liskov Substitution Principle, Interface Segregation Principle, Dependency Inversion Principle) \
             in the following {language} code and refactor it to comply with that principle. \
             If you cannot find a violation, return NONE.\n\n\
             {contract}\n\
             {source}",
            contract = output_contract(language),
        )
    }
}
