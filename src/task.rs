//! Per-context command construction.

/// Wrapped kubectl args plus the rule for inserting a context name.
#[derive(Debug, Clone)]
pub struct ArgTemplate {
    args: Vec<String>,
    replace: Option<String>,
}

/// One concrete kubectl invocation bound to one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub target: String,
    pub argv: Vec<String>,
}

impl ArgTemplate {
    /// Without `replace`, `--context=<name>` is prepended to `args`.
    /// With it, every occurrence of the token in every arg is substituted.
    pub fn new(args: Vec<String>, replace: Option<String>) -> Self {
        Self {
            args,
            replace: replace.filter(|r| !r.is_empty()),
        }
    }

    pub fn build(&self, target: &str) -> Task {
        let argv = match &self.replace {
            None => std::iter::once(format!("--context={}", target))
                .chain(self.args.iter().cloned())
                .collect(),
            Some(token) => self.args.iter().map(|a| a.replace(token, target)).collect(),
        };
        Task {
            target: target.to_string(),
            argv,
        }
    }
}
