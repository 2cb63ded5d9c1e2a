//! Runtime: reconcile, spawn the chain, dispatch one record per input row,
//! wait for the sink to finish every record, and hand back the output table.
//!
//! Behavior:
//! - Everything batch-fatal (config, plan, unknown stage, table shape) is
//!   checked before any thread starts.
//! - Per-record errors never fail the batch; they end up in the output rows.
//! - The deadline covers dispatch and the final wait. On expiry every pool is
//!   cancelled, workers stuck inside a stage are left behind rather than
//!   joined, and no output is produced.

use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use eodflow_core::config::EngineConfig;
use eodflow_core::hash::hash_rows;
use eodflow_core::manifest::{RunManifest, RunStats};
use eodflow_core::record::Record;
use eodflow_core::schema::InputColumn;
use eodflow_core::table::Row;

use eodflow_operators::registry::Registry;
use eodflow_planner::{reconcile, StagePlan};

use crate::chain::{Chain, ChainStage};
use crate::error::ExecError;
use crate::metrics;
use crate::pool::{CancelToken, Deadline, SendError};
use crate::sink::{Completion, SlotArena, TerminalSink, WaitOutcome};

/// Result of one batch: the full output table (header first) and counters.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub table: Vec<Row>,
    pub stats: RunStats,
}

/// Engine owns the config, the stage plan, and the operator registry.
pub struct Engine {
    cfg: EngineConfig,
    plan: StagePlan,
    registry: Registry,
}

impl Engine {
    /// Standard chain with the built-in stages.
    pub fn new(cfg: EngineConfig) -> Self {
        Self::with_plan(cfg, StagePlan::standard(), Registry::new())
    }

    pub fn with_plan(cfg: EngineConfig, plan: StagePlan, registry: Registry) -> Self {
        Self {
            cfg,
            plan,
            registry,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Resolve every plan entry to a stage and a worker count.
    pub fn resolve(&self) -> Result<Vec<ChainStage>, ExecError> {
        self.cfg.validate()?;
        self.plan.validate()?;
        self.plan
            .stages
            .iter()
            .map(|spec| {
                let stage = self
                    .registry
                    .make(&spec.op)
                    .ok_or_else(|| ExecError::Registry(format!("unknown stage '{}'", spec.op)))?;
                Ok(ChainStage::new(stage, self.cfg.workers_for(spec.parallelism)))
            })
            .collect()
    }

    pub fn sink_workers(&self) -> usize {
        self.cfg.workers_for(self.plan.sink_parallelism)
    }

    pub fn run(&self, input: Vec<Row>, template: Vec<Row>) -> Result<RunOutput, ExecError> {
        self.run_with_cancel(input, template, &CancelToken::new())
    }

    /// Like `run`, but `cancel` can stop the batch from another thread.
    pub fn run_with_cancel(
        &self,
        input: Vec<Row>,
        template: Vec<Row>,
        cancel: &CancelToken,
    ) -> Result<RunOutput, ExecError> {
        let stages = self.resolve()?;
        let reconciled = reconcile(input, template)?;
        let started = Instant::now();
        let deadline = Deadline::after(self.cfg.deadline());

        let slot_of = |row: &Row| {
            reconciled.slot_for(row).ok_or_else(|| {
                ExecError::Invariant(format!(
                    "no output slot for identity {:?}",
                    row.get(InputColumn::Id.index())
                ))
            })
        };
        let slots = reconciled
            .input
            .rows
            .iter()
            .map(slot_of)
            .collect::<Result<Vec<_>, _>>()?;

        let synthesized = reconciled.synthesized;
        let input = reconciled.input;
        let mut output = reconciled.output;
        let records = input.num_rows();

        let arena = Arc::new(SlotArena::new(output.num_rows()));
        let completion = Arc::new(Completion::new(records));
        let sink = Arc::new(TerminalSink::new(
            Arc::clone(&arena),
            Arc::clone(&completion),
        ));

        #[cfg(feature = "tracing")]
        tracing::info!(
            records,
            output_rows = output.num_rows(),
            synthesized,
            "starting batch"
        );

        let chain = Chain::build(
            stages,
            Arc::clone(&sink),
            self.sink_workers(),
            self.cfg.queue_factor,
            cancel,
            deadline,
        )?;

        #[cfg(feature = "tracing")]
        for (pool, workers) in chain.layout() {
            tracing::debug!(%pool, workers, "stage pool");
        }

        for (index, (row, slot)) in input.rows.into_iter().zip(slots).enumerate() {
            let out_row = std::mem::take(&mut output.rows[slot.get()]);
            let record = Record::new(index, row, slot, out_row);
            if let Err(reason) = chain.dispatch(record) {
                let pending = completion.pending();
                return Err(abort(chain, cancel, reason, pending, started));
            }
        }

        match completion.wait(cancel, deadline) {
            WaitOutcome::Done => {}
            WaitOutcome::Cancelled { pending } => {
                return Err(abort(chain, cancel, SendError::Cancelled, pending, started));
            }
            WaitOutcome::DeadlineExceeded { pending } => {
                return Err(abort(
                    chain,
                    cancel,
                    SendError::DeadlineExceeded,
                    pending,
                    started,
                ));
            }
        }
        chain.shutdown()?;

        let failed = sink.failed();
        let rejected = sink.rejected();
        drop(sink);
        if rejected > 0 {
            return Err(ExecError::Invariant(format!(
                "{rejected} record(s) finalized more than once"
            )));
        }

        let arena = Arc::try_unwrap(arena)
            .map_err(|_| ExecError::Invariant("slot arena still shared after shutdown".into()))?;
        for (row, cell) in output.rows.iter_mut().zip(arena.into_rows()) {
            if let Some(done) = cell {
                *row = done;
            }
        }

        let stats = RunStats {
            records,
            failed,
            synthesized,
            output_rows: output.num_rows(),
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            records,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        metrics::emit_span("batch_finished", &metrics::stats_kv(&stats));

        Ok(RunOutput {
            table: output.into_raw(),
            stats,
        })
    }

    /// Read both tables, run, and atomically replace `output_path`.
    ///
    /// A missing output file is treated as an empty template.
    pub fn run_files(&self, input_path: &Path, output_path: &Path) -> Result<RunManifest, ExecError> {
        let started_ms = now_ms();
        let plan_hash = self.plan.hash()?;

        let input = eodflow_io::read_table(input_path)?;
        let template = eodflow_io::read_template(output_path)?;
        let manifest = RunManifest::new(plan_hash, started_ms).with_inputs(hash_rows(&input));

        let out = self.run(input, template)?;
        eodflow_io::write_table(output_path, &out.table)?;

        #[cfg(feature = "tracing")]
        tracing::info!(path = %output_path.display(), rows = out.table.len(), "output written");

        Ok(manifest.finish(now_ms(), out.stats, Some(hash_rows(&out.table))))
    }
}

/// Persist a manifest as pretty JSON.
pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<(), ExecError> {
    let json = serde_json::to_vec_pretty(manifest)?;
    std::fs::write(path, json).map_err(|e| ExecError::Io(eodflow_io::Error::Persist {
        path: path.to_path_buf(),
        source: e,
    }))
}

fn abort(
    chain: Chain,
    cancel: &CancelToken,
    reason: SendError,
    pending: usize,
    started: Instant,
) -> ExecError {
    let externally_cancelled = cancel.is_cancelled();
    cancel.cancel();
    let _detached = chain.abort();
    let waited_ms = started.elapsed().as_millis() as u64;

    #[cfg(feature = "tracing")]
    tracing::warn!(?reason, pending, waited_ms, detached = _detached, "batch aborted");

    match reason {
        SendError::Cancelled if externally_cancelled => ExecError::Cancelled,
        SendError::Disconnected => {
            ExecError::Invariant("first stage stopped accepting records".into())
        }
        _ => ExecError::DeadlineExceeded { pending, waited_ms },
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
