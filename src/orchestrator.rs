//! End-to-end sequencing of one run.
//!
//! patterns → contexts → match set → confirmation → worker pool → result.
//! Every step before the pool either succeeds or ends the run without
//! dispatching anything.

use crate::config::Config;
use crate::errors::AllctxError;
use crate::exec::CommandExecutor;
use crate::filter::{Filter, match_targets};
use crate::gate::{self, GateDecision};
use crate::output::{Palette, SharedSink, Sinks};
use crate::pool::{RunSummary, WorkerPool};
use crate::provider::TargetProvider;
use crate::task::ArgTemplate;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct Orchestrator<P> {
    config: Config,
    provider: P,
    executor: Arc<dyn CommandExecutor>,
    palette: Palette,
}

impl<P: TargetProvider> Orchestrator<P> {
    pub fn new(config: Config, provider: P, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            config,
            provider,
            executor,
            palette: Palette::default(),
        }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Run `kubectl_args` against every context selected by `patterns`.
    ///
    /// `input` is only read when the confirmation prompt is interactive.
    /// The prompt and target list go to `sinks.err`.
    pub async fn run<R>(
        &self,
        patterns: &[String],
        kubectl_args: Vec<String>,
        input: R,
        sinks: &Sinks,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, AllctxError>
    where
        R: AsyncBufRead + Unpin,
    {
        let filters = Filter::parse_all(patterns)?;
        let contexts = self.provider.targets(cancel).await?;
        let matched = match_targets(&contexts, &filters);
        debug!(
            contexts = contexts.len(),
            filters = filters.len(),
            matched = matched.len(),
            "filtered contexts"
        );
        if matched.is_empty() {
            return Err(AllctxError::NoMatch);
        }

        let mut diag: &SharedSink = &sinks.err;
        match gate::confirm(&matched, self.config.prompt_mode, input, &mut diag, cancel).await? {
            GateDecision::Approved => {}
            GateDecision::Refused => return Err(AllctxError::PromptRefused),
            GateDecision::Cancelled => return Err(AllctxError::PromptCancelled),
        }

        let template = ArgTemplate::new(kubectl_args, self.config.replace.clone());
        let pool = WorkerPool::new(self.executor.clone(), sinks.clone())
            .with_limit(self.config.concurrency)
            .with_palette(self.palette.clone());

        let summary = pool.run_all(&matched, &template, cancel).await?;
        info!(dispatched = summary.dispatched(), "all commands succeeded");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromptMode;
    use crate::errors::TaskError;
    use crate::output::{Capture, PrefixingWriter};
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{BufReader, duplex};

    struct FakeProvider {
        names: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(names: &[&'static str]) -> Self {
            Self {
                names: names.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TargetProvider for FakeProvider {
        async fn targets(&self, _cancel: &CancellationToken) -> Result<Vec<String>, AllctxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.names.iter().map(|s| s.to_string()).collect())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl TargetProvider for FailingProvider {
        async fn targets(&self, _cancel: &CancellationToken) -> Result<Vec<String>, AllctxError> {
            Err(AllctxError::Provider("exit status 1".to_string()))
        }
    }

    /// Echoes argv to stdout; exits non-zero for contexts named `bad`.
    #[derive(Default)]
    struct EchoExecutor {
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl CommandExecutor for EchoExecutor {
        async fn execute(
            &self,
            argv: &[String],
            mut stdout: PrefixingWriter,
            _stderr: PrefixingWriter,
            _cancel: &CancellationToken,
        ) -> Result<(), TaskError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            stdout.write_all(format!("{}\n", argv.join(" ")).as_bytes())?;
            if argv.iter().any(|a| a.contains("bad")) {
                return Err(TaskError::Exit(2));
            }
            Ok(())
        }
    }

    struct Harness {
        out: Capture,
        err: Capture,
        sinks: Sinks,
        executor: Arc<EchoExecutor>,
    }

    impl Harness {
        fn new() -> Self {
            let out = Capture::default();
            let err = Capture::default();
            let sinks = Sinks::new(SharedSink::new(out.clone()), SharedSink::new(err.clone()));
            Self {
                out,
                err,
                sinks,
                executor: Arc::new(EchoExecutor::default()),
            }
        }

        fn orchestrator<P: TargetProvider>(&self, config: Config, provider: P) -> Orchestrator<P> {
            Orchestrator::new(config, provider, self.executor.clone()).with_palette(Palette::plain())
        }

        fn calls(&self) -> usize {
            self.executor.calls.lock().unwrap().len()
        }
    }

    fn strings(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    fn quiet() -> Config {
        Config::default().with_prompt_mode(PromptMode::Skip)
    }

    #[tokio::test]
    async fn test_runs_selected_contexts() {
        let h = Harness::new();
        let orch = h.orchestrator(quiet(), FakeProvider::new(&["dev", "prod-east", "prod-west"]));

        let summary = orch
            .run(
                &strings(&["/prod-.*/", "^prod-west"]),
                strings(&["get", "ns"]),
                &b""[..],
                &h.sinks,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(summary.dispatched(), 1);
        assert_eq!(h.out.contents(), "prod-east | --context=prod-east get ns\n");
        assert!(h.err.contents().contains("  - prod-east\n"));
    }

    #[tokio::test]
    async fn test_replace_token_and_alignment() {
        let h = Harness::new();
        let config = quiet().with_replace("@");
        let orch = h.orchestrator(config, FakeProvider::new(&["a", "bbb"]));

        orch.run(
            &[],
            strings(&["--context", "@", "get", "pods"]),
            &b""[..],
            &h.sinks,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let out = h.out.contents();
        assert!(out.contains("  a | --context a get pods\n"));
        assert!(out.contains("bbb | --context bbb get pods\n"));
    }

    #[tokio::test]
    async fn test_invalid_pattern_stops_before_listing() {
        let h = Harness::new();
        let provider = FakeProvider::new(&["a"]);
        let orch = h.orchestrator(quiet(), provider);

        let err = orch
            .run(&strings(&["/bad[/"]), Vec::new(), &b""[..], &h.sinks, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AllctxError::InvalidPattern { .. }));
        assert_eq!(orch.provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_fatal() {
        let h = Harness::new();
        let orch = h.orchestrator(quiet(), FailingProvider);

        let err = orch
            .run(&[], Vec::new(), &b""[..], &h.sinks, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AllctxError::Provider(_)));
        assert_eq!(h.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_match_is_fatal() {
        let h = Harness::new();
        let orch = h.orchestrator(quiet(), FakeProvider::new(&["a", "b"]));

        let err = orch
            .run(&strings(&["c"]), Vec::new(), &b""[..], &h.sinks, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AllctxError::NoMatch));
        assert_eq!(h.calls(), 0);
    }

    #[tokio::test]
    async fn test_refused_prompt_dispatches_nothing() {
        let h = Harness::new();
        let orch = h.orchestrator(Config::default(), FakeProvider::new(&["a", "b"]));

        let err = orch
            .run(&[], Vec::new(), &b"n\n"[..], &h.sinks, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AllctxError::PromptRefused));
        assert_eq!(h.calls(), 0);
        assert!(h.err.contents().contains("Continue? [Y/n]: "));
    }

    #[tokio::test]
    async fn test_accepted_prompt_runs() {
        let h = Harness::new();
        let orch = h.orchestrator(Config::default(), FakeProvider::new(&["a", "b"]));

        orch.run(&[], Vec::new(), &b"\n"[..], &h.sinks, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(h.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_prompt_dispatches_nothing() {
        let h = Harness::new();
        let orch = h.orchestrator(Config::default(), FakeProvider::new(&["a"]));
        let (_writer, reader) = duplex(16);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orch
            .run(&[], Vec::new(), BufReader::new(reader), &h.sinks, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AllctxError::PromptCancelled));
        assert_eq!(h.calls(), 0);
    }

    #[tokio::test]
    async fn test_task_failure_fails_run_after_all_ran() {
        let h = Harness::new();
        let orch = h.orchestrator(
            quiet().with_concurrency(1),
            FakeProvider::new(&["good", "bad", "fine"]),
        );

        let err = orch
            .run(&[], strings(&["version"]), &b""[..], &h.sinks, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AllctxError::TasksFailed {
                failed: 1,
                dispatched: 3
            }
        ));
        assert_eq!(h.calls(), 3);
        assert!(h.err.contents().contains(" bad | error: exit status 2\n"));
    }
}
