//! Listener lifecycle: serve until told to stop, then drain within a deadline.
//!
//! ```text
//!  signal task ──exit──► supervisor ──► stop accepting, drain connections
//!                            │          (abort the rest at the deadline)
//!                            └──done──► ServerHandle::wait
//! ```
//!
//! Only the first exit event is acted upon. Shutdown always starts after the
//! exit event and finishes before the done channel fires. Every connection
//! runs in a task owned by the supervisor, so none outlives shutdown.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::ServerError;

/// Time in-flight requests get to finish once shutdown starts.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a running server.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    exit: Option<oneshot::Sender<()>>,
    done: oneshot::Receiver<Result<(), ServerError>>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts shutdown now. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if let Some(exit) = self.exit.take() {
            let _ = exit.send(());
        }
    }

    /// Starts shutdown once `signal` completes.
    ///
    /// Does nothing if a trigger was already installed or fired.
    pub fn shutdown_on<F>(&mut self, signal: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(exit) = self.exit.take() {
            tokio::spawn(async move {
                signal.await;
                let _ = exit.send(());
            });
        }
    }

    /// Waits until the server has stopped.
    ///
    /// Returns an error if serving failed or shutdown missed its deadline.
    pub async fn wait(self) -> Result<(), ServerError> {
        // An untaken exit sender closes here; that never starts shutdown.
        drop(self.exit);
        self.done.await.unwrap_or_else(|_| {
            Err(ServerError::Runtime(
                "lifecycle task ended without reporting".to_string(),
            ))
        })
    }
}

/// Serves `router` on `listener` under a supervisor task.
pub(crate) fn spawn(
    listener: TcpListener,
    addr: SocketAddr,
    router: Router,
    shutdown_timeout: Duration,
) -> ServerHandle {
    let (exit_tx, exit_rx) = oneshot::channel();
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let result = supervise(listener, router, exit_rx, shutdown_timeout).await;
        if let Err(ref e) = result {
            error!("Server stopped with error: {}", e);
        }
        let _ = done_tx.send(result);
    });

    ServerHandle {
        addr,
        exit: Some(exit_tx),
        done: done_rx,
    }
}

async fn supervise(
    listener: TcpListener,
    router: Router,
    mut exit: oneshot::Receiver<()>,
    shutdown_timeout: Duration,
) -> Result<(), ServerError> {
    let builder = Builder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();
    // A dropped exit sender disables its branch; only a real exit event
    // starts shutdown.
    let mut exit_open = true;

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        accept_failed(e).await;
                        continue;
                    }
                };
                let service = TowerToHyperService::new(router.clone());
                let conn = builder
                    .serve_connection_with_upgrades(TokioIo::new(stream), service)
                    .into_owned();
                let conn = graceful.watch(conn);
                connections.spawn(async move {
                    if let Err(e) = conn.await {
                        debug!(%peer, "Connection closed with error: {}", e);
                    }
                });
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            received = &mut exit, if exit_open => match received {
                Ok(()) => break,
                Err(_) => exit_open = false,
            },
        }
    }

    info!("Starting server shutdown...");
    drop(listener);

    // Watched connections stop taking new requests and close when idle.
    if tokio::time::timeout(shutdown_timeout, graceful.shutdown())
        .await
        .is_err()
    {
        warn!(
            remaining = connections.len(),
            "Shutdown deadline passed, closing connections"
        );
        connections.shutdown().await;
        return Err(ServerError::ShutdownTimeout(shutdown_timeout));
    }
    while connections.join_next().await.is_some() {}

    info!("Server shutdown completed.");
    Ok(())
}

/// Backs off after a failed accept, unless only that one connection failed.
async fn accept_failed(e: io::Error) {
    if matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    ) {
        return;
    }
    error!("Accept error: {}", e);
    tokio::time::sleep(Duration::from_secs(1)).await;
}

/// Subscription to the process termination signals.
///
/// Subscribe at startup so signals arriving before anyone waits are kept.
#[derive(Debug)]
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    quit: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    /// Subscribes to SIGINT, SIGTERM and SIGQUIT (Ctrl-C elsewhere).
    #[cfg(unix)]
    pub fn subscribe() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    /// Subscribes to Ctrl-C.
    #[cfg(not(unix))]
    pub fn subscribe() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Waits for the first signal and returns its name.
    #[cfg(unix)]
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }

    /// Waits for Ctrl-C.
    #[cfg(not(unix))]
    pub async fn recv(self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "ctrl-c"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::task::JoinHandle;
    use tokio_test::assert_ok;
    use webrisk_core::{EngineError, Stats, ThreatEngine, ThreatMatch};

    use crate::{AppState, Server, ServerConfig};

    /// Engine that takes its time answering.
    struct SlowEngine(Duration);

    #[async_trait]
    impl ThreatEngine for SlowEngine {
        async fn lookup_urls(
            &self,
            urls: &[String],
        ) -> Result<Vec<Vec<ThreatMatch>>, EngineError> {
            tokio::time::sleep(self.0).await;
            Ok(vec![Vec::new(); urls.len()])
        }

        fn status(&self) -> (Stats, Option<EngineError>) {
            (Stats::default(), None)
        }
    }

    fn start(delay: Duration, shutdown_timeout: Duration) -> ServerHandle {
        let config = ServerConfig::new(([127, 0, 0, 1], 0).into())
            .with_shutdown_timeout(shutdown_timeout);
        let state = AppState::new(Arc::new(SlowEngine(delay)));
        Server::new(config, state).start().unwrap()
    }

    fn lookup_request(addr: SocketAddr) -> JoinHandle<reqwest::Result<reqwest::Response>> {
        tokio::spawn(async move {
            reqwest::Client::new()
                .post(format!("http://{}/v1/uris:search", addr))
                .header("content-type", "application/json")
                .body(r#"{"uri":"http://a.example/"}"#)
                .send()
                .await
        })
    }

    #[tokio::test]
    async fn in_flight_request_completes_before_shutdown_finishes() {
        let mut handle = start(Duration::from_millis(400), SHUTDOWN_TIMEOUT);
        let request = lookup_request(handle.addr());

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown();

        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_ok!(handle.wait().await);
    }

    #[tokio::test]
    async fn shutdown_past_deadline_is_an_error() {
        let mut handle = start(Duration::from_secs(30), Duration::from_millis(200));
        let request = lookup_request(handle.addr());

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown();

        let result = handle.wait().await;
        assert!(matches!(result, Err(ServerError::ShutdownTimeout(_))));

        // The connection was closed before the engine could answer.
        let response = tokio::time::timeout(Duration::from_secs(5), request)
            .await
            .unwrap()
            .unwrap();
        assert!(response.is_err());
    }

    #[tokio::test]
    async fn idle_server_stops_and_refuses_connections() {
        let mut handle = start(Duration::ZERO, SHUTDOWN_TIMEOUT);
        let addr = handle.addr();

        handle.shutdown();
        assert_ok!(handle.wait().await);

        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn shutdown_is_triggered_by_signal_future() {
        let mut handle = start(Duration::ZERO, SHUTDOWN_TIMEOUT);
        let (tx, rx) = oneshot::channel::<()>();

        handle.shutdown_on(async move {
            let _ = rx.await;
        });
        let _ = tx.send(());

        let result = tokio::time::timeout(Duration::from_secs(5), handle.wait()).await;
        assert_ok!(result.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_drains_and_stops_the_server() {
        let signals = TerminationSignals::subscribe().unwrap();
        let mut handle = start(Duration::from_millis(200), SHUTDOWN_TIMEOUT);
        let request = lookup_request(handle.addr());

        let (received_tx, received_rx) = oneshot::channel();
        handle.shutdown_on(async move {
            let _ = received_tx.send(signals.recv().await);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(unsafe { libc::raise(libc::SIGTERM) }, 0);

        assert_eq!(received_rx.await.unwrap(), "SIGTERM");
        let result = tokio::time::timeout(Duration::from_secs(5), handle.wait()).await;
        assert_ok!(result.unwrap());

        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn closed_exit_channel_never_shuts_down() {
        let handle = start(Duration::ZERO, SHUTDOWN_TIMEOUT);
        let addr = handle.addr();

        let waited = tokio::time::timeout(Duration::from_millis(200), handle.wait()).await;
        assert!(waited.is_err());
        assert!(tokio::net::TcpStream::connect(addr).await.is_ok());
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let state = AppState::new(Arc::new(SlowEngine(Duration::ZERO)));
        let result = Server::new(ServerConfig::new(addr), state).start();

        assert!(matches!(result, Err(ServerError::Bind(a, _)) if a == addr));
    }
}
