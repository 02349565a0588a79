use crate::strategies::{Strategy, output_contract};

/// Rubric-guided: detection criteria plus a worked example before the task.
pub struct ExampleStrategy;

impl Strategy for ExampleStrategy {
    fn id(&self) -> &'static str {
        "EXAMPLE"
    }

    fn description(&self) -> &'static str {
        "Detection rubric with positive and negative examples before the task"
    }

    fn render(&self, source: &str, language: &str) -> String {
        let fence = language.trim().to_lowercase();
        format!(
            "You are going to find SOLID principle violations in the following {language} code. \
             You will provide the following three answers:\n\
             1. The SOLID violation (SRP, OCP, LSP, ISP or DIP). If there is no violation, give NONE.\n\
             2. The code refactored so it no longer has the violation.\n\
             3. A brief explanation of the violation.\n\n\
             Use these criteria:\n\
             - ISP: long interfaces that force implementers to provide methods they do not use. \
             A short, cohesive interface is NOT an ISP violation.\n\
             - LSP: derived classes throwing exceptions or weakening guarantees in base class methods. \
             An override that only extends behavior is NOT an LSP violation.\n\
             - OCP: chains of if-else or switch statements on a type code, especially nested. \
             A single guard clause is NOT an OCP violation.\n\
             - SRP: a class that does too many unrelated things at once. Do not answer SRP too quickly; \
             if one of the others is present, answer with it.\n\
             - DIP: high-level modules constructing or depending on low-level modules directly instead of \
             through abstractions.\n\
             If there are multiple violations, give only the most prominent one.\n\n\
             {contract}\n\
             Example:\n\
             **SRP**\n\
             ```{fence}\n\
             class ReportPrinter {{\n    void print(Report report) {{ }}\n}}\n\
             class ReportRepository {{\n    void save(Report report) {{ }}\n}}\n\
             ```\n\
             The original class both printed and persisted reports, so it had two reasons to change.\n\n\
             Here is the code:\n\
             {source}",
            contract = output_contract(language),
        )
    }
}
