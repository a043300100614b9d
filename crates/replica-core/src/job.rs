//! One external download task.

/// Placeholder in an output template that the runner replaces with the job's stamp.
pub const STAMP_PLACEHOLDER: &str = "{timestamp}";

/// A single invocation of the external tool.
///
/// The runner never mutates a job: it reads `arguments`, stamps a copy of
/// `output_template` and passes `target` through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// URL (or any identifier the tool understands).
    pub target: String,
    /// Tokens placed before `-o <path> <target>`.
    pub arguments: Vec<String>,
    /// Destination template, e.g. `/home/u/Downloads/Replica/%(title)s.%(ext)s`.
    pub output_template: String,
}

impl Job {
    pub fn new(
        target: impl Into<String>,
        arguments: Vec<String>,
        output_template: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            arguments,
            output_template: output_template.into(),
        }
    }

    /// Full argument vector for one invocation with an already stamped output path.
    pub fn command_args(&self, output_path: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(self.arguments.len() + 3);
        args.extend(self.arguments.iter().cloned());
        args.push("-o".to_string());
        args.push(output_path.to_string());
        args.push(self.target.clone());
        args
    }
}
