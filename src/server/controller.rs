//! # Controlador del Servidor
//! src/server/controller.rs
//!
//! Ciclo de vida del servidor: bind, thread de accept, pool de workers y
//! apagado ordenado.
//!
//! ```text
//! Stopped --start--> Starting --> Running --stop--> Stopping --> Stopped
//!                       |
//!                       +--(error de bind)--> Stopped
//! ```

use crate::error::ServerError;
use crate::router::Router;
use crate::server::connection::ConnectionJob;
use crate::server::pool::{Backpressure, PoolConfig, WorkerPool};
use log::{debug, error, info, warn};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Estado del servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Configuración del núcleo del servidor
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Dirección donde escuchar
    pub host: String,

    /// Timeout de lectura por conexión
    pub read_timeout: Duration,

    /// Workers permanentes
    pub core_workers: usize,

    /// Tope de workers (core + extra)
    pub max_workers: usize,

    /// Capacidad de la cola de conexiones
    pub queue_capacity: usize,

    /// Tiempo ocioso tras el cual termina un worker extra
    pub keep_alive: Duration,

    /// Qué hacer con el pool saturado
    pub backpressure: Backpressure,

    /// Espera máxima por el thread de accept en `stop`
    pub accept_join_timeout: Duration,

    /// Tiempo que se le da al pool para vaciarse en `stop`
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    /// Workers core por defecto: max(2, 2 × CPUs)
    pub fn default_core_workers() -> usize {
        (num_cpus::get() * 2).max(2)
    }

    fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            core_size: self.core_workers,
            max_size: self.max_workers,
            queue_capacity: self.queue_capacity,
            keep_alive: self.keep_alive,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core_workers = Self::default_core_workers();
        Self {
            host: "127.0.0.1".to_string(),
            read_timeout: Duration::from_secs(5),
            core_workers,
            max_workers: core_workers * 2,
            queue_capacity: 200,
            keep_alive: Duration::from_secs(60),
            backpressure: Backpressure::CallerRuns,
            accept_join_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Partes vivas mientras el servidor corre
struct Inner {
    state: ServerState,
    local_addr: Option<SocketAddr>,
    acceptor: Option<JoinHandle<()>>,
    pool: Option<Arc<WorkerPool>>,
}

/// Arranca y detiene el servidor
///
/// Todos los métodos toman `&self`: el controlador puede compartirse entre
/// threads (por ejemplo, uno que espera con `wait` y otro que llama `stop`).
pub struct ServerController {
    router: Arc<Router>,
    config: ServerConfig,
    running: Arc<AtomicBool>,
    inner: Mutex<Inner>,
    stopped: Condvar,
}

impl ServerController {
    pub fn new(router: impl Into<Arc<Router>>, config: ServerConfig) -> Self {
        Self {
            router: router.into(),
            config,
            running: Arc::new(AtomicBool::new(false)),
            inner: Mutex::new(Inner {
                state: ServerState::Stopped,
                local_addr: None,
                acceptor: None,
                pool: None,
            }),
            stopped: Condvar::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        self.lock().state
    }

    /// Dirección efectiva mientras el servidor corre
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock().local_addr
    }

    /// Abre el puerto y empieza a aceptar conexiones
    ///
    /// Con `port = 0` el sistema elige un puerto libre; la dirección real se
    /// devuelve y queda disponible en `local_addr`.
    pub fn start(&self, port: u16) -> Result<SocketAddr, ServerError> {
        {
            let mut inner = self.lock();
            if inner.state != ServerState::Stopped {
                return Err(ServerError::AlreadyRunning);
            }
            inner.state = ServerState::Starting;
        }

        match self.launch(port) {
            Ok((addr, acceptor, pool)) => {
                let mut inner = self.lock();
                inner.state = ServerState::Running;
                inner.local_addr = Some(addr);
                inner.acceptor = Some(acceptor);
                inner.pool = Some(pool);
                info!("Server listening on http://{}/", addr);
                Ok(addr)
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.lock().state = ServerState::Stopped;
                self.stopped.notify_all();
                Err(e)
            }
        }
    }

    /// Detiene el servidor
    ///
    /// No hace nada si no está en `Running`. Desbloquea el accept, espera al
    /// thread de accept un tiempo acotado y luego apaga el pool.
    pub fn stop(&self) {
        let (addr, acceptor, pool) = {
            let mut inner = self.lock();
            if inner.state != ServerState::Running {
                return;
            }
            inner.state = ServerState::Stopping;
            (inner.local_addr, inner.acceptor.take(), inner.pool.take())
        };

        info!("Stopping server...");
        self.running.store(false, Ordering::SeqCst);

        if let Some(addr) = addr {
            wake_acceptor(addr);
        }
        if let Some(acceptor) = acceptor {
            join_with_timeout(acceptor, self.config.accept_join_timeout);
        }
        if let Some(pool) = pool {
            pool.shutdown(self.config.shutdown_grace);
        }

        {
            let mut inner = self.lock();
            inner.state = ServerState::Stopped;
            inner.local_addr = None;
        }
        self.stopped.notify_all();
        info!("Server stopped");
    }

    /// Bloquea hasta que el servidor vuelva a `Stopped`
    pub fn wait(&self) {
        let mut inner = self.lock();
        while inner.state != ServerState::Stopped {
            inner = self
                .stopped
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn launch(&self, port: u16) -> Result<(SocketAddr, JoinHandle<()>, Arc<WorkerPool>), ServerError> {
        let addr = format!("{}:{}", self.config.host, port);
        let listener = TcpListener::bind(&addr).map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let pool = Arc::new(WorkerPool::new(
            self.config.pool_config(),
            self.config.backpressure.policy(),
        )?);

        self.running.store(true, Ordering::SeqCst);

        let acceptor = {
            let router = Arc::clone(&self.router);
            let pool = Arc::clone(&pool);
            let running = Arc::clone(&self.running);
            let read_timeout = self.config.read_timeout;

            thread::Builder::new()
                .name("http-acceptor".to_string())
                .spawn(move || accept_loop(listener, router, pool, running, read_timeout))
        };

        match acceptor {
            Ok(acceptor) => Ok((local_addr, acceptor, pool)),
            Err(e) => {
                pool.shutdown(Duration::ZERO);
                Err(e.into())
            }
        }
    }
}

impl Drop for ServerController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    router: Arc<Router>,
    pool: Arc<WorkerPool>,
    running: Arc<AtomicBool>,
    read_timeout: Duration,
) {
    for stream in listener.incoming() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        match stream {
            Ok(stream) => {
                debug!(
                    "Accepted connection from {}",
                    stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "unknown".to_string())
                );
                pool.execute(Box::new(ConnectionJob::new(
                    stream,
                    Arc::clone(&router),
                    read_timeout,
                )));
            }
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    error!("Failed to accept connection: {}", e);
                    thread::sleep(Duration::from_millis(10));
                }
            }
        }
    }

    debug!("Accept loop finished");
}

/// Conecta al propio listener para destrabar un `accept` bloqueado
fn wake_acceptor(mut addr: SocketAddr) {
    if addr.ip().is_unspecified() {
        let loopback = match addr.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
        };
        addr.set_ip(loopback);
    }

    if let Err(e) = TcpStream::connect_timeout(&addr, Duration::from_millis(500)) {
        debug!("Wake-up connection to {} failed: {}", addr, e);
    }
}

fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("Accept thread did not finish within {:?}, detaching it", timeout);
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }

    if handle.join().is_err() {
        error!("Accept thread panicked");
    }
}
