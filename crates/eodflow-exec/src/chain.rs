//! Linear stage chain.
//!
//! Each stage gets its own `WorkerPool<Record>`; the handler runs the stage
//! and forwards the record to the next pool, or to the sink pool after the
//! last stage. A failed record jumps straight to the sink.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use eodflow_core::id::WorkerId;
use eodflow_core::record::Record;
use eodflow_operators::Stage;

use crate::error::ExecError;
use crate::pool::{CancelToken, Deadline, SendError, StageSender, WorkerPool};
use crate::sink::TerminalSink;

/// How long an aborted chain waits for busy workers before detaching them.
pub const ABORT_GRACE: Duration = Duration::from_millis(100);

/// A resolved stage with its worker count.
#[derive(Clone)]
pub struct ChainStage {
    pub stage: Arc<dyn Stage>,
    pub workers: usize,
}

impl ChainStage {
    pub fn new(stage: Arc<dyn Stage>, workers: usize) -> Self {
        Self { stage, workers }
    }
}

pub struct Chain {
    /// Stage pools in chain order.
    stages: Vec<WorkerPool<Record>>,
    sink: WorkerPool<Record>,
    entry: StageSender<Record>,
}

impl Chain {
    /// Spawn the sink pool and one pool per stage, wired back to front.
    pub fn build(
        stages: Vec<ChainStage>,
        sink: Arc<TerminalSink>,
        sink_workers: usize,
        queue_factor: usize,
        cancel: &CancelToken,
        deadline: Deadline,
    ) -> Result<Self, ExecError> {
        if stages.is_empty() {
            return Err(ExecError::Invariant("chain has no stages".into()));
        }

        let sink_pool = WorkerPool::spawn(
            "sink",
            sink_workers,
            queue_factor,
            cancel.clone(),
            deadline,
            move |_, record: Record| sink.finalize(record),
        )?;
        let to_sink = sink_pool.sender();

        let mut pools: Vec<WorkerPool<Record>> = Vec::with_capacity(stages.len());
        let mut next = to_sink.clone();
        for cs in stages.into_iter().rev() {
            let handler = forwarder(cs.stage.clone(), next, to_sink.clone());
            let spawned = WorkerPool::spawn(
                cs.stage.name(),
                cs.workers,
                queue_factor,
                cancel.clone(),
                deadline,
                handler,
            );
            let pool = match spawned {
                Ok(p) => p,
                Err(e) => {
                    let until = Instant::now() + ABORT_GRACE;
                    for p in pools {
                        p.abort(until);
                    }
                    sink_pool.abort(until);
                    return Err(e);
                }
            };
            next = pool.sender();
            pools.push(pool);
        }
        pools.reverse();

        Ok(Self {
            stages: pools,
            sink: sink_pool,
            entry: next,
        })
    }

    /// Enqueue a record into the first stage.
    pub fn dispatch(&self, record: Record) -> Result<(), SendError> {
        self.entry.send(record)
    }

    /// `(pool name, workers)` in chain order, sink last.
    pub fn layout(&self) -> Vec<(String, usize)> {
        self.stages
            .iter()
            .chain(std::iter::once(&self.sink))
            .map(|p| (p.name().to_string(), p.workers()))
            .collect()
    }

    /// Stop every pool with sentinels, upstream first.
    pub fn shutdown(self) -> Result<(), ExecError> {
        let mut first_err = None;
        for pool in self.stages {
            if let Err(e) = pool.shutdown() {
                first_err.get_or_insert(e);
            }
        }
        if let Err(e) = self.sink.shutdown() {
            first_err.get_or_insert(e);
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Cancel every pool and return within `ABORT_GRACE`. Records still
    /// queued are dropped; workers stuck in a stage are detached. Returns the
    /// number of detached workers.
    pub fn abort(self) -> usize {
        let until = Instant::now() + ABORT_GRACE;
        let mut detached = 0;
        for pool in self.stages {
            detached += pool.abort(until);
        }
        detached + self.sink.abort(until)
    }
}

fn forwarder(
    stage: Arc<dyn Stage>,
    next: StageSender<Record>,
    to_sink: StageSender<Record>,
) -> impl Fn(WorkerId, Record) + Send + Sync + 'static {
    move |worker, mut record| {
        let outcome = catch_unwind(AssertUnwindSafe(|| stage.transform(worker, &mut record)));
        let target = match outcome {
            Ok(Ok(())) => &next,
            Ok(Err(e)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(stage = stage.name(), id = %record.id, error = %e, "record failed");
                record.fail(stage.name(), e.to_string());
                &to_sink
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(stage = stage.name(), id = %record.id, "stage panicked");
                record.fail(stage.name(), format!("stage '{}' panicked", stage.name()));
                &to_sink
            }
        };

        // Only fails once the run is being torn down.
        if let Err(_reason) = target.send(record) {
            #[cfg(feature = "tracing")]
            tracing::trace!(stage = stage.name(), to = target.pool(), reason = ?_reason, "record dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{Completion, SlotArena, WaitOutcome};
    use eodflow_core::id::SlotId;
    use eodflow_core::record::AuditSlot;
    use eodflow_core::schema::{OutputColumn, OUTPUT_WIDTH};
    use eodflow_core::table::Row;
    use eodflow_operators::StageError;

    struct AddOne;

    impl Stage for AddOne {
        fn name(&self) -> &'static str {
            "add_one"
        }
        fn transform(&self, worker: WorkerId, r: &mut Record) -> Result<(), StageError> {
            r.balance += 1;
            r.mark(AuditSlot::Stage1, worker);
            Ok(())
        }
    }

    struct FailOdd;

    impl Stage for FailOdd {
        fn name(&self) -> &'static str {
            "fail_odd"
        }
        fn transform(&self, _: WorkerId, r: &mut Record) -> Result<(), StageError> {
            if r.index % 2 == 1 {
                return Err(StageError::Overflow("fail_odd"));
            }
            Ok(())
        }
    }

    struct Panics;

    impl Stage for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }
        fn transform(&self, _: WorkerId, _: &mut Record) -> Result<(), StageError> {
            panic!("boom");
        }
    }

    fn run(stages: Vec<ChainStage>, n: usize) -> (Vec<Row>, usize) {
        let arena = Arc::new(SlotArena::new(n));
        let completion = Arc::new(Completion::new(n));
        let sink = Arc::new(TerminalSink::new(Arc::clone(&arena), Arc::clone(&completion)));
        let cancel = CancelToken::new();
        let chain = Chain::build(stages, Arc::clone(&sink), 2, 3, &cancel, Deadline::none())
            .unwrap();
        for i in 0..n {
            let input = vec![i.to_string()];
            let output = vec![String::new(); OUTPUT_WIDTH];
            chain
                .dispatch(Record::new(i, input, SlotId::new(i), output))
                .unwrap();
        }
        assert_eq!(completion.wait(&cancel, Deadline::none()), WaitOutcome::Done);
        chain.shutdown().unwrap();
        let failed = sink.failed();
        drop(sink);
        let arena = Arc::try_unwrap(arena).ok().unwrap();
        (arena.into_rows().map(Option::unwrap).collect(), failed)
    }

    #[test]
    fn records_flow_through_every_stage() {
        let stages = vec![
            ChainStage::new(Arc::new(AddOne), 3),
            ChainStage::new(Arc::new(AddOne), 2),
        ];
        let (rows, failed) = run(stages, 50);
        assert_eq!(failed, 0);
        for row in rows {
            assert_eq!(row[OutputColumn::Balance.index()], "2");
        }
    }

    #[test]
    fn failed_records_skip_remaining_stages() {
        let stages = vec![
            ChainStage::new(Arc::new(FailOdd), 2),
            ChainStage::new(Arc::new(AddOne), 2),
        ];
        let (rows, failed) = run(stages, 10);
        assert_eq!(failed, 5);
        for (i, row) in rows.iter().enumerate() {
            if i % 2 == 1 {
                assert_eq!(
                    row[OutputColumn::Stage1Worker.index()],
                    "arithmetic overflow in fail_odd"
                );
                assert_eq!(row[OutputColumn::Balance.index()], "");
            } else {
                assert_eq!(row[OutputColumn::Balance.index()], "1");
            }
        }
    }

    #[test]
    fn panicking_stage_fails_the_record() {
        let (rows, failed) = run(vec![ChainStage::new(Arc::new(Panics), 1)], 3);
        assert_eq!(failed, 3);
        assert_eq!(
            rows[0][OutputColumn::Stage1Worker.index()],
            "stage 'panics' panicked"
        );
    }

    #[test]
    fn layout_lists_pools_in_order() {
        let arena = Arc::new(SlotArena::new(0));
        let completion = Arc::new(Completion::new(0));
        let sink = Arc::new(TerminalSink::new(arena, completion));
        let cancel = CancelToken::new();
        let chain = Chain::build(
            vec![
                ChainStage::new(Arc::new(AddOne), 3),
                ChainStage::new(Arc::new(FailOdd), 1),
            ],
            sink,
            2,
            3,
            &cancel,
            Deadline::none(),
        )
        .unwrap();
        assert_eq!(
            chain.layout(),
            vec![
                ("add_one".to_string(), 3),
                ("fail_odd".to_string(), 1),
                ("sink".to_string(), 2),
            ]
        );
        chain.shutdown().unwrap();
    }
}
