//! # Pool de Workers
//! src/server/pool.rs
//!
//! Pool acotado de threads que ejecuta jobs (una conexión por job).
//!
//! ## Dimensionamiento
//!
//! - `core_size` workers arrancan con el pool y viven hasta el shutdown
//! - Los jobs se encolan en un canal acotado de `queue_capacity`
//! - Con la cola llena se crean workers extra hasta `max_size`; cada extra
//!   termina después de `keep_alive` sin trabajo
//! - Con la cola llena y `max_size` workers vivos, el job pasa a la
//!   `SaturationPolicy` configurada
//!
//! ## Políticas de saturación
//!
//! - `CallerRuns`: el thread que hace `execute` corre el job él mismo. En el
//!   servidor ese thread es el del accept, así que dejan de aceptarse
//!   conexiones mientras dura el job: más latencia, ninguna conexión perdida.
//! - `RejectWithUnavailable`: el job se rechaza (`Job::reject`); una conexión rechazada
//!   responde `503 Service Unavailable`.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, error, info, warn};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Trabajo ejecutable por el pool
pub trait Job: Send + 'static {
    /// Ejecuta el trabajo
    fn run(self: Box<Self>);

    /// Se llama en lugar de `run` cuando el pool no va a ejecutarlo
    fn reject(self: Box<Self>) {}
}

impl<F> Job for F
where
    F: FnOnce() + Send + 'static,
{
    fn run(self: Box<Self>) {
        (*self)()
    }
}

pub type BoxedJob = Box<dyn Job>;

/// Estrategia invocada cuando la cola está llena y no se pueden crear más workers
pub trait SaturationPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_saturated(&self, job: BoxedJob);
}

/// Corre el job en el thread que lo envió
#[derive(Debug, Default, Clone, Copy)]
pub struct CallerRuns;

impl SaturationPolicy for CallerRuns {
    fn name(&self) -> &'static str {
        "caller-runs"
    }

    fn on_saturated(&self, job: BoxedJob) {
        debug!("Pool saturated, running job on the submitting thread");
        job.run();
    }
}

/// Rechaza el job
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectWithUnavailable;

impl SaturationPolicy for RejectWithUnavailable {
    fn name(&self) -> &'static str {
        "reject"
    }

    fn on_saturated(&self, job: BoxedJob) {
        warn!("Pool saturated, rejecting job");
        job.reject();
    }
}

/// Selección de política desde configuración
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backpressure {
    /// El thread del accept corre la conexión
    CallerRuns,

    /// Responder 503 Service Unavailable
    Reject,
}

impl Backpressure {
    pub fn policy(self) -> Arc<dyn SaturationPolicy> {
        match self {
            Backpressure::CallerRuns => Arc::new(CallerRuns),
            Backpressure::Reject => Arc::new(RejectWithUnavailable),
        }
    }
}

/// Tamaños del pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub core_size: usize,
    pub max_size: usize,
    pub queue_capacity: usize,
    pub keep_alive: Duration,
}

/// Estado compartido entre el pool y sus workers
struct Shared {
    /// Workers vivos
    live: Mutex<usize>,

    /// Se notifica cada vez que un worker termina
    exited: Condvar,

    /// Tras un shutdown que no terminó a tiempo: los jobs pendientes se rechazan
    aborted: AtomicBool,

    next_id: AtomicUsize,
}

impl Shared {
    fn live(&self) -> MutexGuard<'_, usize> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrementa el contador de workers vivos al salir (incluso con panic)
struct LiveGuard(Arc<Shared>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        let mut live = self.0.live();
        *live = live.saturating_sub(1);
        self.0.exited.notify_all();
    }
}

/// Pool acotado de workers
pub struct WorkerPool {
    config: PoolConfig,
    sender: Mutex<Option<Sender<BoxedJob>>>,
    receiver: Receiver<BoxedJob>,
    policy: Arc<dyn SaturationPolicy>,
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Crea el pool y arranca los workers core
    pub fn new(config: PoolConfig, policy: Arc<dyn SaturationPolicy>) -> io::Result<Self> {
        let (sender, receiver) = channel::bounded(config.queue_capacity);

        let pool = Self {
            config,
            sender: Mutex::new(Some(sender)),
            receiver,
            policy,
            shared: Arc::new(Shared {
                live: Mutex::new(0),
                exited: Condvar::new(),
                aborted: AtomicBool::new(false),
                next_id: AtomicUsize::new(0),
            }),
        };

        for _ in 0..pool.config.core_size {
            *pool.shared.live() += 1;
            if let Err(e) = pool.spawn_worker(None, None) {
                pool.shutdown(Duration::ZERO);
                return Err(e);
            }
        }

        info!(
            "Worker pool ready: core={} max={} queue={} policy={}",
            pool.config.core_size,
            pool.config.max_size,
            pool.config.queue_capacity,
            pool.policy.name()
        );

        Ok(pool)
    }

    /// Envía un job al pool
    ///
    /// Orden de intentos: cola, worker extra, política de saturación.
    /// Después del shutdown todo job se rechaza.
    pub fn execute(&self, job: BoxedJob) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let Some(sender) = sender else {
            debug!("Pool is shut down, rejecting job");
            job.reject();
            return;
        };

        match sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                if let Some(job) = self.try_spawn_extra(job) {
                    self.policy.on_saturated(job);
                }
            }
            Err(TrySendError::Disconnected(job)) => job.reject(),
        }
    }

    /// Workers vivos en este momento
    pub fn live_workers(&self) -> usize {
        *self.shared.live()
    }

    /// Jobs esperando en la cola
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Cierra la cola y espera a que los workers terminen
    ///
    /// Los workers vacían la cola antes de salir. Si no terminan dentro de
    /// `grace`, los jobs que sigan encolados se rechazan, los workers pasan
    /// a rechazar lo que tomen y sus threads quedan desacoplados. Retorna
    /// `true` si el pool terminó a tiempo.
    pub fn shutdown(&self, grace: Duration) -> bool {
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let deadline = Instant::now() + grace;
        let mut live = self.shared.live();
        while *live > 0 {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            live = self
                .shared
                .exited
                .wait_timeout(live, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        let remaining = *live;
        drop(live);

        if remaining == 0 {
            debug!("Worker pool drained");
            return true;
        }

        self.shared.aborted.store(true, Ordering::SeqCst);
        let mut rejected = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job.reject();
            rejected += 1;
        }
        warn!(
            "{} workers still busy after {:?}; rejected {} queued jobs",
            remaining, grace, rejected
        );
        false
    }

    /// Crea un worker extra sembrado con `job` si hay lugar
    ///
    /// Devuelve el job si no se pudo crear el worker.
    fn try_spawn_extra(&self, job: BoxedJob) -> Option<BoxedJob> {
        {
            let mut live = self.shared.live();
            if *live >= self.config.max_size {
                return Some(job);
            }
            *live += 1;
        }

        let job = Arc::new(Mutex::new(Some(job)));
        match self.spawn_worker(Some(Arc::clone(&job)), Some(self.config.keep_alive)) {
            Ok(()) => None,
            Err(e) => {
                error!("Failed to spawn extra worker: {}", e);
                let job = job.lock().unwrap_or_else(PoisonError::into_inner).take();
                job
            }
        }
    }

    /// Lanza un worker; el llamador ya contó el worker en `live`
    ///
    /// `keep_alive = None` para workers core.
    fn spawn_worker(
        &self,
        first: Option<Arc<Mutex<Option<BoxedJob>>>>,
        keep_alive: Option<Duration>,
    ) -> io::Result<()> {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let receiver = self.receiver.clone();
        let shared = Arc::clone(&self.shared);
        let guard = LiveGuard(Arc::clone(&self.shared));

        let spawned = thread::Builder::new()
            .name(format!("http-worker-{}", id))
            .spawn(move || {
                let _guard = guard;
                let first = first.and_then(|slot| {
                    let job = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                    job
                });
                worker_loop(first, receiver, shared, keep_alive)
            });

        // Si el spawn falla la closure se descarta y el guard descuenta al worker
        spawned.map(|_| ())
    }
}

fn worker_loop(
    first: Option<BoxedJob>,
    receiver: Receiver<BoxedJob>,
    shared: Arc<Shared>,
    keep_alive: Option<Duration>,
) {
    if let Some(job) = first {
        run_job(&shared, job);
    }

    loop {
        let next = match keep_alive {
            None => receiver.recv().ok(),
            Some(idle) => match receiver.recv_timeout(idle) {
                Ok(job) => Some(job),
                Err(RecvTimeoutError::Timeout) => {
                    debug!("{} idle, exiting", thread_name());
                    None
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
        };

        match next {
            Some(job) => run_job(&shared, job),
            None => break,
        }
    }
}

fn run_job(shared: &Shared, job: BoxedJob) {
    if shared.aborted.load(Ordering::SeqCst) {
        job.reject();
        return;
    }

    if panic::catch_unwind(AssertUnwindSafe(move || job.run())).is_err() {
        error!("Job panicked on {}", thread_name());
    }
}

fn thread_name() -> String {
    thread::current().name().unwrap_or("worker").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread::ThreadId;

    fn pool(core: usize, max: usize, queue: usize, policy: Arc<dyn SaturationPolicy>) -> WorkerPool {
        WorkerPool::new(
            PoolConfig {
                core_size: core,
                max_size: max,
                queue_capacity: queue,
                keep_alive: Duration::from_millis(50),
            },
            policy,
        )
        .unwrap()
    }

    /// Job que avisa cuando arranca y se bloquea hasta que lo liberen
    fn blocker() -> (BoxedJob, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let job: BoxedJob = Box::new(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
        });
        (job, started_rx, release_tx)
    }

    fn record_thread(tx: mpsc::Sender<ThreadId>) -> BoxedJob {
        Box::new(move || tx.send(thread::current().id()).unwrap())
    }

    struct Flagged {
        ran: Arc<AtomicBool>,
        rejected: Arc<AtomicBool>,
    }

    impl Job for Flagged {
        fn run(self: Box<Self>) {
            self.ran.store(true, Ordering::SeqCst);
        }

        fn reject(self: Box<Self>) {
            self.rejected.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_runs_all_jobs() {
        let pool = pool(2, 4, 16, Arc::new(CallerRuns));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            pool.execute(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert!(pool.shutdown(Duration::from_secs(5)));
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(pool.live_workers(), 0);
    }

    #[test]
    fn test_core_workers_start_immediately() {
        let pool = pool(3, 6, 4, Arc::new(CallerRuns));
        assert_eq!(pool.live_workers(), 3);
        assert!(pool.shutdown(Duration::from_secs(5)));
    }

    #[test]
    fn test_caller_runs_when_saturated() {
        let pool = pool(1, 1, 1, Arc::new(CallerRuns));
        let (job, started, release) = blocker();

        pool.execute(job);
        started.recv().unwrap();

        // Ocupa la única posición de la cola
        let (queued_tx, queued_rx) = mpsc::channel();
        pool.execute(record_thread(queued_tx));
        assert_eq!(pool.queued(), 1);

        // Sin lugar: corre en este mismo thread
        let (tx, rx) = mpsc::channel();
        pool.execute(record_thread(tx));
        assert_eq!(rx.try_recv().unwrap(), thread::current().id());

        release.send(()).unwrap();
        assert_ne!(queued_rx.recv().unwrap(), thread::current().id());
        assert!(pool.shutdown(Duration::from_secs(5)));
    }

    #[test]
    fn test_reject_when_saturated() {
        let pool = pool(1, 1, 1, Arc::new(RejectWithUnavailable));
        let (job, started, release) = blocker();

        pool.execute(job);
        started.recv().unwrap();
        pool.execute(Box::new(|| {}));

        let ran = Arc::new(AtomicBool::new(false));
        let rejected = Arc::new(AtomicBool::new(false));
        pool.execute(Box::new(Flagged {
            ran: Arc::clone(&ran),
            rejected: Arc::clone(&rejected),
        }));

        assert!(rejected.load(Ordering::SeqCst));
        assert!(!ran.load(Ordering::SeqCst));

        release.send(()).unwrap();
        assert!(pool.shutdown(Duration::from_secs(5)));
    }

    #[test]
    fn test_spawns_extra_worker_before_saturating() {
        let pool = pool(1, 2, 1, Arc::new(CallerRuns));
        let (job, started, release) = blocker();

        pool.execute(job);
        started.recv().unwrap();
        pool.execute(Box::new(|| {}));

        let (tx, rx) = mpsc::channel();
        pool.execute(record_thread(tx));

        assert_ne!(rx.recv().unwrap(), thread::current().id());

        release.send(()).unwrap();
        assert!(pool.shutdown(Duration::from_secs(5)));
    }

    #[test]
    fn test_extra_worker_exits_when_idle() {
        let pool = pool(1, 2, 1, Arc::new(CallerRuns));
        let (job, started, release) = blocker();

        pool.execute(job);
        started.recv().unwrap();
        pool.execute(Box::new(|| {}));
        pool.execute(Box::new(|| {}));
        assert_eq!(pool.live_workers(), 2);

        release.send(()).unwrap();
        thread::sleep(Duration::from_millis(500));
        assert_eq!(pool.live_workers(), 1);
        assert!(pool.shutdown(Duration::from_secs(5)));
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let pool = pool(1, 1, 8, Arc::new(CallerRuns));
        pool.execute(Box::new(|| panic!("job failure")));

        let (tx, rx) = mpsc::channel();
        pool.execute(record_thread(tx));

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert_eq!(pool.live_workers(), 1);
        assert!(pool.shutdown(Duration::from_secs(5)));
    }

    #[test]
    fn test_execute_after_shutdown_rejects() {
        let pool = pool(1, 1, 1, Arc::new(CallerRuns));
        assert!(pool.shutdown(Duration::from_secs(5)));

        let ran = Arc::new(AtomicBool::new(false));
        let rejected = Arc::new(AtomicBool::new(false));
        pool.execute(Box::new(Flagged {
            ran: Arc::clone(&ran),
            rejected: Arc::clone(&rejected),
        }));

        assert!(rejected.load(Ordering::SeqCst));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_shutdown_times_out_and_rejects_queued_jobs() {
        let pool = pool(1, 1, 4, Arc::new(CallerRuns));
        let (job, started, release) = blocker();

        pool.execute(job);
        started.recv().unwrap();

        let ran = Arc::new(AtomicBool::new(false));
        let rejected = Arc::new(AtomicBool::new(false));
        pool.execute(Box::new(Flagged {
            ran: Arc::clone(&ran),
            rejected: Arc::clone(&rejected),
        }));

        assert!(!pool.shutdown(Duration::from_millis(50)));
        assert!(rejected.load(Ordering::SeqCst));
        assert!(!ran.load(Ordering::SeqCst));

        release.send(()).unwrap();
    }

    #[test]
    fn test_backpressure_policy_names() {
        assert_eq!(Backpressure::CallerRuns.policy().name(), "caller-runs");
        assert_eq!(Backpressure::Reject.policy().name(), "reject");
    }
}
