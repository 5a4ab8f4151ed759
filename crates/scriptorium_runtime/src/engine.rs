//! The sequential pipeline executor.
//!
//! Stage states: `Pending -> Running -> {Succeeded, Failed, Skipped}`.
//! Pipeline states: `Idle -> Running -> {Completed, Aborted}`. One stage
//! runs at a time, strictly in declared order; no stage begins before the
//! previous one reaches a terminal state.

use crate::pacer::{PacerConfig, RatePacer};
use crate::report::{RunError, RunFailure, RunReport};
use scriptorium_core::{Context, RunId, StageId};
use scriptorium_log::{ExecutionLog, Outcome};
use scriptorium_plan::{Plan, Stage};
use scriptorium_store::ArtifactStore;
use scriptorium_worker::{Payload, ResolvedInput};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Name of the designated final artifact; defaults to the last
    /// stage's output
    pub final_artifact: Option<String>,
    /// Global invocation pacing
    pub pacer: PacerConfig,
}

/// Sequential executor for one pipeline run
///
/// Constructed once per run and consumed by [`PipelineEngine::run`]. The
/// artifact store and the pacer are owned and exclusively mutated here,
/// on a single control thread, so neither needs locking.
pub struct PipelineEngine {
    run_id: RunId,
    plan: Plan,
    store: ArtifactStore,
    log: ExecutionLog,
    pacer: RatePacer,
    cancel: CancellationToken,
    config: EngineConfig,
}

impl PipelineEngine {
    /// Create an engine for one run
    ///
    /// The execution log determines the run's identity; store and log
    /// are injected so callers choose durability (mirror directory,
    /// log sink) up front.
    #[must_use]
    pub fn new(plan: Plan, store: ArtifactStore, log: ExecutionLog, config: EngineConfig) -> Self {
        let pacer = RatePacer::new(config.pacer.clone());
        Self {
            run_id: log.run_id(),
            plan,
            store,
            log,
            pacer,
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token observers may use to request cooperative cancellation
    ///
    /// Cancellation is checked at stage boundaries: before a permit is
    /// acquired and again before the worker is invoked. No new stage
    /// starts once cancellation is observed.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The run's identity
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Run the pipeline to completion or abort
    ///
    /// Validates the plan against the context before the first
    /// invocation, then drives each stage in declared order.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] carrying the terminating error and every
    /// log entry accumulated before the abort.
    pub async fn run(mut self, context: &Context) -> Result<RunReport, RunFailure> {
        tracing::info!(
            run_id = %self.run_id,
            stages = self.plan.len(),
            "pipeline run starting"
        );

        if let Err(err) = self.plan.validate_against(context) {
            return Err(self.abort(None, err.into()));
        }

        let stages = self.plan.stages().to_vec();
        for stage in &stages {
            if let Err(error) = self.run_stage(stage, context).await {
                tracing::error!(stage = %stage.id(), %error, "pipeline aborted");
                return Err(self.abort(Some(stage.id().clone()), error));
            }
        }

        let final_name = self
            .config
            .final_artifact
            .clone()
            .unwrap_or_else(|| self.plan.final_output().to_string());
        let Ok(final_artifact) = self.store.get(&final_name).cloned() else {
            return Err(self.abort(None, RunError::FinalArtifactMissing { name: final_name }));
        };

        tracing::info!(
            run_id = %self.run_id,
            final_artifact = %final_name,
            "pipeline run completed"
        );
        Ok(RunReport {
            run_id: self.run_id,
            final_artifact,
            entries: self.log.into_entries(),
            store: self.store,
        })
    }

    fn abort(self, stage_id: Option<StageId>, error: RunError) -> RunFailure {
        RunFailure {
            stage_id,
            error,
            entries: self.log.into_entries(),
        }
    }

    /// Drive one stage to its terminal state
    ///
    /// `Ok(())` covers both `Succeeded` and `Skipped`; any `Err` is a
    /// fatal abort of the remainder of the pipeline.
    async fn run_stage(&mut self, stage: &Stage, context: &Context) -> Result<(), RunError> {
        let stage_id = stage.id().clone();

        if self.cancel.is_cancelled() {
            tracing::warn!(stage = %stage_id, "cancellation observed, stage will not start");
            return Err(RunError::Cancelled { stage: stage_id });
        }

        tracing::info!(
            stage = %stage_id,
            worker = stage.worker().name(),
            "stage running"
        );
        let started_at = self.log.stage_started(&stage_id)?;

        let permit = match self.pacer.acquire().await {
            Ok(permit) => permit,
            Err(err) => {
                self.log.stage_finished(
                    &stage_id,
                    started_at,
                    Outcome::Failed {
                        reason: err.to_string(),
                    },
                )?;
                return Err(err.into());
            }
        };
        if permit.waited > Duration::ZERO {
            tracing::debug!(stage = %stage_id, waited = ?permit.waited, "rate pacing delayed stage");
        }

        if self.cancel.is_cancelled() {
            self.log.stage_finished(
                &stage_id,
                started_at,
                Outcome::Failed {
                    reason: "cancelled".to_string(),
                },
            )?;
            return Err(RunError::Cancelled { stage: stage_id });
        }

        let payload = match self.resolve_inputs(stage, context) {
            Ok(payload) => payload,
            Err(err) => {
                self.log.stage_finished(
                    &stage_id,
                    started_at,
                    Outcome::Failed {
                        reason: err.to_string(),
                    },
                )?;
                return Err(err);
            }
        };

        match stage.worker().invoke(&payload).await {
            Ok(content) => {
                if let Err(err) = self.store.put(stage.output(), content, &stage_id) {
                    self.log.stage_finished(
                        &stage_id,
                        started_at,
                        Outcome::Failed {
                            reason: err.to_string(),
                        },
                    )?;
                    return Err(err.into());
                }
                self.log.stage_finished(
                    &stage_id,
                    started_at,
                    Outcome::Succeeded {
                        output: stage.output().to_string(),
                    },
                )?;
                tracing::info!(stage = %stage_id, output = stage.output(), "stage succeeded");
                Ok(())
            }
            Err(err) if stage.required() => {
                self.log.stage_finished(
                    &stage_id,
                    started_at,
                    Outcome::Failed {
                        reason: err.to_string(),
                    },
                )?;
                Err(RunError::StageFailed {
                    stage: stage_id,
                    source: err,
                })
            }
            Err(err) => {
                tracing::warn!(stage = %stage_id, error = %err, "optional stage failed, skipping");
                self.log.stage_finished(
                    &stage_id,
                    started_at,
                    Outcome::Skipped {
                        reason: err.to_string(),
                    },
                )?;
                Ok(())
            }
        }
    }

    /// Resolve a stage's declared inputs: context keys first, then
    /// earlier artifacts
    fn resolve_inputs(&self, stage: &Stage, context: &Context) -> Result<Payload, RunError> {
        let mut inputs = Vec::with_capacity(stage.inputs().len());
        for name in stage.inputs() {
            if let Some(value) = context.get(name) {
                inputs.push(ResolvedInput {
                    name: name.clone(),
                    content: value.to_string(),
                });
                continue;
            }
            match self.store.get(name) {
                Ok(artifact) => inputs.push(ResolvedInput {
                    name: name.clone(),
                    content: artifact.content.clone(),
                }),
                Err(_) => {
                    return Err(RunError::MissingDependency {
                        stage: stage.id().clone(),
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(Payload::new(context.clone(), inputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scriptorium_worker::{FixedWorker, TemplateWorker, Worker, WorkerError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn sid(id: &str) -> StageId {
        StageId::new(id).unwrap()
    }

    fn engine(plan: Plan) -> PipelineEngine {
        let config = EngineConfig {
            final_artifact: None,
            pacer: PacerConfig::unbounded(),
        };
        PipelineEngine::new(plan, ArtifactStore::new(), ExecutionLog::new(RunId::new()), config)
    }

    /// Always fails with a provider error
    struct FailingWorker;

    #[async_trait]
    impl Worker for FailingWorker {
        fn name(&self) -> &str {
            "failing"
        }

        async fn invoke(&self, _payload: &Payload) -> Result<String, WorkerError> {
            Err(WorkerError::Provider {
                message: "provider unavailable".to_string(),
            })
        }
    }

    /// Counts invocations, then succeeds
    struct CountingWorker {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Worker for CountingWorker {
        fn name(&self) -> &str {
            "counting"
        }

        async fn invoke(&self, _payload: &Payload) -> Result<String, WorkerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("content".to_string())
        }
    }

    /// Cancels the run's token, then succeeds
    struct CancellingWorker {
        token: CancellationToken,
    }

    #[async_trait]
    impl Worker for CancellingWorker {
        fn name(&self) -> &str {
            "cancelling"
        }

        async fn invoke(&self, _payload: &Payload) -> Result<String, WorkerError> {
            self.token.cancel();
            Ok("content".to_string())
        }
    }

    #[tokio::test]
    async fn test_chess_scenario() {
        let plan = Plan::new(vec![
            Stage::new(
                sid("mechanics_design"),
                Arc::new(FixedWorker::new("designer", "rules text")),
                "mechanics",
            ),
            Stage::new(
                sid("compile"),
                Arc::new(TemplateWorker::new("documentarian", "{mechanics} + narrative")),
                "final",
            )
            .with_input("mechanics"),
        ])
        .unwrap();

        let context = Context::builder().value("subject", "Chess").build();
        let report = engine(plan).run(&context).await.unwrap();

        assert!(report.final_content().contains("rules text"));
        assert!(report.final_content().contains("narrative"));
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].stage_id, sid("mechanics_design"));
        assert_eq!(report.entries[1].stage_id, sid("compile"));
        assert!(report.entries.iter().all(|e| e.outcome.is_success()));
        assert_eq!(report.succeeded(), 2);
    }

    #[tokio::test]
    async fn test_earlier_artifacts_visible_and_unchanged() {
        let plan = Plan::new(vec![
            Stage::new(sid("a"), Arc::new(FixedWorker::new("a", "alpha")), "first"),
            Stage::new(
                sid("b"),
                Arc::new(TemplateWorker::new("b", "saw: {first}")),
                "second",
            )
            .with_input("first"),
            Stage::new(
                sid("c"),
                Arc::new(TemplateWorker::new("c", "saw: {first} and {second}")),
                "third",
            )
            .with_inputs(["first", "second"]),
        ])
        .unwrap();

        let report = engine(plan).run(&Context::new()).await.unwrap();
        assert_eq!(report.store.get("first").unwrap().content, "alpha");
        assert_eq!(report.store.get("second").unwrap().content, "saw: alpha");
        assert_eq!(
            report.store.get("third").unwrap().content,
            "saw: alpha and saw: alpha"
        );
    }

    #[tokio::test]
    async fn test_required_failure_aborts_and_later_stage_never_runs() {
        let calls = Arc::new(AtomicU32::new(0));
        let plan = Plan::new(vec![
            Stage::new(sid("one"), Arc::new(FixedWorker::new("one", "x")), "a"),
            Stage::new(sid("two"), Arc::new(FailingWorker), "b"),
            Stage::new(
                sid("three"),
                Arc::new(CountingWorker { calls: calls.clone() }),
                "c",
            ),
        ])
        .unwrap();

        let failure = engine(plan).run(&Context::new()).await.unwrap_err();
        assert_eq!(failure.stage_id, Some(sid("two")));
        assert!(matches!(
            failure.error,
            RunError::StageFailed { ref stage, .. } if stage == &sid("two")
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // The log is never lost on abort
        assert_eq!(failure.entries.len(), 2);
        assert!(failure.entries[0].outcome.is_success());
        assert!(failure.entries[1].outcome.is_failure());
    }

    #[tokio::test]
    async fn test_optional_failure_skips_and_run_completes() {
        let plan = Plan::new(vec![
            Stage::new(sid("one"), Arc::new(FixedWorker::new("one", "x")), "a"),
            Stage::new(sid("two"), Arc::new(FailingWorker), "b").optional(),
            Stage::new(sid("three"), Arc::new(FixedWorker::new("three", "z")), "c"),
        ])
        .unwrap();

        let report = engine(plan).run(&Context::new()).await.unwrap();
        assert_eq!(report.final_content(), "z");
        assert_eq!(report.entries.len(), 3);
        assert!(report.entries[1].outcome.is_skipped());
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.skipped(), 1);
        assert!(!report.store.has("b"));
    }

    #[tokio::test]
    async fn test_dependent_of_skipped_stage_aborts() {
        let plan = Plan::new(vec![
            Stage::new(sid("one"), Arc::new(FixedWorker::new("one", "x")), "a"),
            Stage::new(sid("two"), Arc::new(FailingWorker), "b").optional(),
            Stage::new(sid("three"), Arc::new(FixedWorker::new("three", "z")), "c")
                .with_input("b"),
        ])
        .unwrap();

        let failure = engine(plan).run(&Context::new()).await.unwrap_err();
        assert_eq!(failure.stage_id, Some(sid("three")));
        assert_eq!(
            failure.error,
            RunError::MissingDependency {
                stage: sid("three"),
                name: "b".to_string(),
            }
        );
        assert_eq!(failure.entries.len(), 3);
        assert!(failure.entries[2].outcome.is_failure());
    }

    #[tokio::test]
    async fn test_unknown_input_fails_before_any_stage() {
        let plan = Plan::new(vec![
            Stage::new(sid("one"), Arc::new(FixedWorker::new("one", "x")), "a")
                .with_input("subject"),
        ])
        .unwrap();

        let failure = engine(plan).run(&Context::new()).await.unwrap_err();
        assert_eq!(failure.stage_id, None);
        assert!(matches!(failure.error, RunError::Plan(_)));
        assert!(failure.entries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_ceiling_paces_the_whole_pipeline() {
        let window = Duration::from_secs(1);
        let stages: Vec<Stage> = (0..5)
            .map(|i| {
                Stage::new(
                    sid(&format!("stage{i}")),
                    Arc::new(FixedWorker::new("instant", "x")),
                    format!("artifact{i}"),
                )
            })
            .collect();
        let plan = Plan::new(stages).unwrap();

        let config = EngineConfig {
            final_artifact: None,
            pacer: PacerConfig::per_window(2, window),
        };
        let engine = PipelineEngine::new(
            plan,
            ArtifactStore::new(),
            ExecutionLog::new(RunId::new()),
            config,
        );

        let begin = Instant::now();
        let report = engine.run(&Context::new()).await.unwrap();
        assert_eq!(report.succeeded(), 5);
        // Invocations 3-4 wait for the first window reset, invocation 5
        // for the second
        assert!(begin.elapsed() >= 2 * window);
    }

    #[tokio::test]
    async fn test_identical_reruns_are_byte_identical() {
        let build = || {
            Plan::new(vec![
                Stage::new(
                    sid("design"),
                    Arc::new(FixedWorker::new("designer", "rules text")),
                    "mechanics",
                ),
                Stage::new(
                    sid("compile"),
                    Arc::new(TemplateWorker::new("documentarian", "# {subject}\n{mechanics}")),
                    "final",
                )
                .with_inputs(["mechanics"]),
            ])
            .unwrap()
        };
        let context = Context::builder().value("subject", "Chess").build();

        let first = engine(build()).run(&context).await.unwrap();
        let second = engine(build()).run(&context).await.unwrap();

        assert_eq!(first.final_content(), second.final_content());
        let outcomes = |r: &RunReport| {
            r.entries
                .iter()
                .map(|e| (e.stage_id.clone(), e.outcome.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(outcomes(&first), outcomes(&second));
    }

    #[tokio::test]
    async fn test_cancellation_stops_new_stages() {
        let token = CancellationToken::new();
        let plan = Plan::new(vec![
            Stage::new(
                sid("one"),
                Arc::new(CancellingWorker { token: token.clone() }),
                "a",
            ),
            Stage::new(sid("two"), Arc::new(FixedWorker::new("two", "y")), "b"),
        ])
        .unwrap();

        let engine = engine(plan).with_cancellation(token);
        let failure = engine.run(&Context::new()).await.unwrap_err();

        assert_eq!(failure.stage_id, Some(sid("two")));
        assert_eq!(failure.error, RunError::Cancelled { stage: sid("two") });
        // Stage one completed and is faithfully recorded
        assert_eq!(failure.entries.len(), 1);
        assert!(failure.entries[0].outcome.is_success());
    }

    #[tokio::test]
    async fn test_foreign_artifact_owner_is_fatal() {
        let mut store = ArtifactStore::new();
        store.put("a", "prior content", &sid("someone_else")).unwrap();

        let plan = Plan::new(vec![Stage::new(
            sid("one"),
            Arc::new(FixedWorker::new("one", "x")),
            "a",
        )])
        .unwrap();

        let config = EngineConfig {
            final_artifact: None,
            pacer: PacerConfig::unbounded(),
        };
        let engine =
            PipelineEngine::new(plan, store, ExecutionLog::new(RunId::new()), config);
        let failure = engine.run(&Context::new()).await.unwrap_err();

        assert_eq!(failure.stage_id, Some(sid("one")));
        assert!(matches!(failure.error, RunError::Store(_)));
    }

    #[tokio::test]
    async fn test_designated_final_artifact_overrides_last_output() {
        let plan = Plan::new(vec![
            Stage::new(sid("one"), Arc::new(FixedWorker::new("one", "keep me")), "a"),
            Stage::new(sid("two"), Arc::new(FixedWorker::new("two", "not me")), "b"),
        ])
        .unwrap();

        let config = EngineConfig {
            final_artifact: Some("a".to_string()),
            pacer: PacerConfig::unbounded(),
        };
        let engine = PipelineEngine::new(
            plan,
            ArtifactStore::new(),
            ExecutionLog::new(RunId::new()),
            config,
        );
        let report = engine.run(&Context::new()).await.unwrap();
        assert_eq!(report.final_content(), "keep me");
    }

    #[tokio::test]
    async fn test_skipped_final_stage_aborts_with_missing_final() {
        let plan = Plan::new(vec![
            Stage::new(sid("one"), Arc::new(FixedWorker::new("one", "x")), "a"),
            Stage::new(sid("two"), Arc::new(FailingWorker), "b").optional(),
        ])
        .unwrap();

        let failure = engine(plan).run(&Context::new()).await.unwrap_err();
        assert_eq!(failure.stage_id, None);
        assert_eq!(
            failure.error,
            RunError::FinalArtifactMissing {
                name: "b".to_string()
            }
        );
        assert_eq!(failure.entries.len(), 2);
    }

    #[tokio::test]
    async fn test_durable_log_and_mirror_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("execution.log");
        let mirror_dir = dir.path().join("artifacts");

        let plan = Plan::new(vec![
            Stage::new(
                sid("design"),
                Arc::new(FixedWorker::new("designer", "rules text")),
                "mechanics",
            ),
            Stage::new(
                sid("compile"),
                Arc::new(TemplateWorker::new("documentarian", "{mechanics} compiled")),
                "final",
            )
            .with_input("mechanics"),
        ])
        .unwrap();

        let run_id = RunId::new();
        let store = ArtifactStore::with_mirror(&mirror_dir).unwrap();
        let log = ExecutionLog::with_sink(run_id, &log_path).unwrap();
        let config = EngineConfig {
            final_artifact: None,
            pacer: PacerConfig::unbounded(),
        };
        let report = PipelineEngine::new(plan, store, log, config)
            .run(&Context::new())
            .await
            .unwrap();
        assert_eq!(report.run_id, run_id);

        // Artifacts are mirrored under their names
        let mirrored = std::fs::read_to_string(mirror_dir.join("final")).unwrap();
        assert_eq!(mirrored, "rules text compiled");

        // The sink holds a started and a finished record per stage
        let records = scriptorium_log::read_records(&log_path).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().step_by(2).all(|r| !r.is_terminal()));
        assert!(records.iter().skip(1).step_by(2).all(|r| r.is_terminal()));
    }
}
