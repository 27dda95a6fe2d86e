use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use lumen_chunk::Chunk;
use lumen_lighting::LightEngine;
use lumen_world::{ChunkCoord, GenerateError, TerrainGenerator, WorldDims};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::scheduler::Ticket;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GenerateJob {
    pub coord: ChunkCoord,
    pub ticket: Ticket,
}

/// Result of one generation job, handed back to the owning thread.
#[derive(Debug)]
pub enum JobOut {
    /// Generated and light-seeded in isolation; state is `Generated`.
    Ready {
        coord: ChunkCoord,
        ticket: Ticket,
        chunk: Box<Chunk>,
        t_gen_ms: u32,
        t_light_ms: u32,
    },
    Failed {
        coord: ChunkCoord,
        ticket: Ticket,
        error: GenerateError,
    },
}

impl JobOut {
    pub fn coord(&self) -> ChunkCoord {
        match self {
            JobOut::Ready { coord, .. } | JobOut::Failed { coord, .. } => *coord,
        }
    }

    pub fn ticket(&self) -> Ticket {
        match self {
            JobOut::Ready { ticket, .. } | JobOut::Failed { ticket, .. } => *ticket,
        }
    }
}

fn elapsed_ms(t0: Instant) -> u32 {
    t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Generates and seeds one chunk. Errors and panics from the generator or
/// the seeding pass come back as `JobOut::Failed`; nothing escapes the job.
pub fn process_generate_job(
    job: GenerateJob,
    dims: WorldDims,
    generator: &dyn TerrainGenerator,
    engine: &LightEngine,
) -> JobOut {
    let GenerateJob { coord, ticket } = job;
    let run = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut chunk = Chunk::new(coord, dims);
        chunk
            .begin_generation()
            .map_err(|e| GenerateError::Failed(e.to_string()))?;
        let t0 = Instant::now();
        chunk.populate_with(generator)?;
        let t_gen_ms = elapsed_ms(t0);
        let t0 = Instant::now();
        engine.seed_chunk(&mut chunk);
        let t_light_ms = elapsed_ms(t0);
        Ok::<_, GenerateError>((chunk, t_gen_ms, t_light_ms))
    }));
    match run {
        Ok(Ok((chunk, t_gen_ms, t_light_ms))) => JobOut::Ready {
            coord,
            ticket,
            chunk: Box::new(chunk),
            t_gen_ms,
            t_light_ms,
        },
        Ok(Err(error)) => JobOut::Failed {
            coord,
            ticket,
            error,
        },
        Err(payload) => JobOut::Failed {
            coord,
            ticket,
            error: GenerateError::Panicked(panic_message(payload.as_ref())),
        },
    }
}

/// Fixed rayon pool that turns `GenerateJob`s into `JobOut`s.
///
/// Workers only touch the chunk they are building. Results queue up in a
/// channel until the owner drains them.
pub struct ChunkWorkers {
    job_tx: Sender<GenerateJob>,
    res_rx: Receiver<JobOut>,
    _pool: Arc<ThreadPool>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
}

impl ChunkWorkers {
    pub fn new(
        workers: usize,
        dims: WorldDims,
        generator: Arc<dyn TerrainGenerator>,
        engine: Arc<LightEngine>,
    ) -> Result<Self, ThreadPoolBuildError> {
        let workers = workers.max(1);
        let (job_tx, job_rx) = unbounded::<GenerateJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("lumen-gen-{i}"))
                .build()?,
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let generator = generator.clone();
            let engine = engine.clone();
            let queued = queued.clone();
            let inflight = inflight.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    let out = process_generate_job(job, dims, generator.as_ref(), engine.as_ref());
                    inflight.fetch_sub(1, Ordering::Relaxed);
                    if tx.send(out).is_err() {
                        break;
                    }
                }
            });
        }
        log::info!(target: "stream", "started {workers} generation workers");

        Ok(Self {
            job_tx,
            res_rx,
            _pool: pool,
            queued,
            inflight,
        })
    }

    /// Queues a job. Returns false if the pool has shut down.
    pub fn submit(&self, job: GenerateJob) -> bool {
        self.queued.fetch_add(1, Ordering::Relaxed);
        if self.job_tx.send(job).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Takes at most `max` finished jobs without blocking.
    pub fn drain(&self, max: usize) -> Vec<JobOut> {
        self.res_rx.try_iter().take(max).collect()
    }

    /// (queued, running) job counts.
    pub fn queue_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }
}
