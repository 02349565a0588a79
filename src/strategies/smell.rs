use crate::strategies::{Strategy, output_contract};

/// Known smell: enumerate code smells first, then map them to principles.
pub struct SmellStrategy;

impl Strategy for SmellStrategy {
    fn id(&self) -> &'static str {
        "SMELL"
    }

    fn description(&self) -> &'static str {
        "List code smells, map them to SOLID principles, fix the worst one"
    }

    fn render(&self, source: &str, language: &str) -> String {
        format!(
            "You are a code quality assistant trained to detect design problems in object-oriented {language} code.\n\n\
             Your task has two steps.\n\n\
             Step 1: Identify the code smells present in the code below. Consider common smells such as:\n\
             - God Object (does too many things)\n\
             - Feature Envy (a method uses another class's data more than its own)\n\
             - Shotgun Surgery (a small change touches many places)\n\
             - Concrete Dependency (relies on specific implementations)\n\
             - Large Interface (methods unused by client classes)\n\
             - Others you observe\n\n\
             Step 2: Map each smell to the SOLID principle (SRP, OCP, LSP, ISP, DIP) it most likely violates. \
             Pick the single most violated principle and refactor the code to fix it. \
             If there is no violation, answer NONE.\n\n\
             Work through both steps before answering, but output only the final result.\n\n\
             {contract}\n\
             {source}",
            contract = output_contract(language),
        )
    }
}
