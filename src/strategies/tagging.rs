use crate::strategies::{Strategy, output_contract};

/// Function tagging: summarize each method's responsibility before judging.
pub struct TaggingStrategy;

impl Strategy for TaggingStrategy {
    fn id(&self) -> &'static str {
        "TAGGING"
    }

    fn description(&self) -> &'static str {
        "Tag each method with its responsibility, then judge and refactor"
    }

    fn render(&self, source: &str, language: &str) -> String {
        format!(
            "You are a software design assistant reviewing {language} code.\n\n\
             Your task is to:\n\
             1. Summarize the responsibility of each method in the code below.\n\
             2. Decide whether any method, or the class as a whole, violates a SOLID principle.\n\
             3. Pick the most prominent violated principle (SRP, OCP, LSP, ISP, DIP), or NONE.\n\
             4. Refactor the code so the violation is removed.\n\n\
             Keep the method summaries to yourself; the answer contains only the final result.\n\n\
             {contract}\n\
             {source}",
            contract = output_contract(language),
        )
    }
}
