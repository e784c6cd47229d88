use crate::errors::AllctxError;

/// Any non-empty value disables the interactive confirmation prompt.
pub const ENV_DISABLE_PROMPTS: &str = "ALLCTX_DISABLE_PROMPTS";
/// Overrides the kubectl executable used for listing and running.
pub const ENV_KUBECTL: &str = "ALLCTX_KUBECTL";

/// Whether the confirmation gate asks before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// Print the contexts and wait for `[Y/n]`.
    #[default]
    Interactive,
    /// Print the contexts and continue.
    Skip,
}

/// Runtime configuration for a single invocation.
///
/// Built once in `main` from command-line flags and the environment, then
/// passed down to the orchestrator and the worker pool.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum parallel commands; 0 means one per matched context.
    pub concurrency: usize,
    /// Token replaced by the context name in the wrapped args.
    pub replace: Option<String>,
    pub prompt_mode: PromptMode,
    pub kubectl_cmd: String,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 0,
            replace: None,
            prompt_mode: PromptMode::Interactive,
            kubectl_cmd: "kubectl".to_string(),
            verbose: false,
        }
    }
}

impl Config {
    /// Create a Config from parsed flags, applying environment overrides.
    pub fn from_env(
        concurrency: i64,
        replace: Option<String>,
        quiet: bool,
        verbose: bool,
    ) -> Result<Self, AllctxError> {
        let prompts_disabled = std::env::var(ENV_DISABLE_PROMPTS)
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        let kubectl_cmd = std::env::var(ENV_KUBECTL)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "kubectl".to_string());

        Self::new(concurrency, replace, quiet || prompts_disabled, verbose)
            .map(|c| c.with_kubectl_cmd(kubectl_cmd))
    }

    /// Create a Config without consulting the environment.
    pub fn new(
        concurrency: i64,
        replace: Option<String>,
        quiet: bool,
        verbose: bool,
    ) -> Result<Self, AllctxError> {
        if concurrency < 0 {
            return Err(AllctxError::Argument("-c < 0".to_string()));
        }
        let concurrency = usize::try_from(concurrency)
            .map_err(|_| AllctxError::Argument(format!("-c={} is too large", concurrency)))?;

        Ok(Self {
            concurrency,
            // `-I ""` behaves as if -I was not given
            replace: replace.filter(|r| !r.is_empty()),
            prompt_mode: if quiet {
                PromptMode::Skip
            } else {
                PromptMode::Interactive
            },
            verbose,
            ..Self::default()
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_replace(mut self, replace: impl Into<String>) -> Self {
        self.replace = Some(replace.into());
        self
    }

    pub fn with_prompt_mode(mut self, mode: PromptMode) -> Self {
        self.prompt_mode = mode;
        self
    }

    pub fn with_kubectl_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.kubectl_cmd = cmd.into();
        self
    }
}
