use crate::types::ScanResult;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Default per-attempt connect deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
/// Default number of simultaneous connect attempts.
pub const DEFAULT_CONCURRENCY: usize = 100;
/// Default deadline for the single banner read after a successful connect.
pub const BANNER_TIMEOUT: Duration = Duration::from_secs(1);
/// Upper bound on the bytes captured as a banner.
pub const BANNER_MAX_BYTES: usize = 1024;

/// A host plus the knobs that govern one scan of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// Literal IP or resolvable host name.
    pub host: String,
    /// Connect deadline per attempt.
    pub timeout: Duration,
    /// Maximum number of attempts in flight at once. `0` is treated as `1`.
    pub concurrency: usize,
    /// Deadline for the banner read, independent of `timeout`.
    pub banner_timeout: Duration,
}

impl ScanTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            banner_timeout: BANNER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_banner_timeout(mut self, banner_timeout: Duration) -> Self {
        self.banner_timeout = banner_timeout;
        self
    }
}

/// Live counters shared between a running scan and its observers.
#[derive(Clone, Debug)]
pub struct ScanProgress {
    pub scanned_done: Arc<AtomicU64>,
    pub open_count: Arc<AtomicU64>,
    pub in_flight: Arc<AtomicU64>,
    pub peak_in_flight: Arc<AtomicU64>,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            scanned_done: Arc::new(AtomicU64::new(0)),
            open_count: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicU64::new(0)),
            peak_in_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn scanned(&self) -> u64 {
        self.scanned_done.load(Ordering::Relaxed)
    }

    pub fn open(&self) -> u64 {
        self.open_count.load(Ordering::Relaxed)
    }

    /// Highest number of attempts observed in flight at the same time.
    pub fn peak(&self) -> u64 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

// Counts an attempt as in flight for as long as the guard lives.
struct InFlight<'a>(&'a ScanProgress);

impl<'a> InFlight<'a> {
    fn enter(progress: &'a ScanProgress) -> Self {
        let now = progress.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        progress.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(progress)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Resolve the target host to socket addresses, failing if it yields none.
pub async fn resolve_target(host: &str) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0)).await?.collect();
    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses found for {host}"),
        ));
    }
    Ok(addrs)
}

/// Scan every port of `ports` against the target and return one result per port.
///
/// - Limits concurrent attempts using a `Semaphore` of `target.concurrency` permits.
/// - Bounds each connect with `target.timeout`.
/// - On a successful connect, reads up to 1024 bytes of banner within
///   `target.banner_timeout`, then closes the socket.
///
/// Connection failures become `closed` results. Result order is unspecified.
pub async fn scan(target: &ScanTarget, ports: &[u16]) -> Vec<ScanResult> {
    scan_internal(target, ports, CancellationToken::new(), ScanProgress::new()).await
}

/// Variant that accepts a `CancellationToken` to allow external cancellation.
///
/// Once cancelled no new attempt is admitted and attempts still in flight are
/// abandoned; their ports are missing from the returned results.
pub async fn scan_with_cancel(
    target: &ScanTarget,
    ports: &[u16],
    cancel: CancellationToken,
) -> Vec<ScanResult> {
    scan_internal(target, ports, cancel, ScanProgress::new()).await
}

/// Variant that also publishes live counters into `progress`.
pub async fn scan_with_progress(
    target: &ScanTarget,
    ports: &[u16],
    cancel: CancellationToken,
    progress: ScanProgress,
) -> Vec<ScanResult> {
    scan_internal(target, ports, cancel, progress).await
}

async fn scan_internal(
    target: &ScanTarget,
    ports: &[u16],
    cancel: CancellationToken,
    progress: ScanProgress,
) -> Vec<ScanResult> {
    let concurrency = target.concurrency.clamp(1, Semaphore::MAX_PERMITS);
    let sem = Arc::new(Semaphore::new(concurrency));
    let shared_target = Arc::new(target.clone());
    let mut set = JoinSet::new();
    let start = Instant::now();

    info!(
        host = %target.host,
        ports = ports.len(),
        concurrency,
        timeout_ms = target.timeout.as_millis() as u64,
        "scan started"
    );

    for &port in ports {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = sem.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };
        let target = shared_target.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();

        set.spawn(async move {
            let _permit = permit; // keep permit until task completes
            let _in_flight = InFlight::enter(&progress);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                r = scan_port(&target, port) => r,
            };

            progress.scanned_done.fetch_add(1, Ordering::Relaxed);
            if result.is_open() {
                progress.open_count.fetch_add(1, Ordering::Relaxed);
            }
            Some(result)
        });
    }

    let mut results = Vec::with_capacity(ports.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Some(result)) => results.push(result),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "scan task failed"),
        }
    }

    info!(
        host = %target.host,
        scanned = results.len(),
        open = results.iter().filter(|r| r.is_open()).count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        cancelled = cancel.is_cancelled(),
        "scan finished"
    );
    results
}

/// Probe a single port: connect, try to read a banner, close.
pub async fn scan_port(target: &ScanTarget, port: u16) -> ScanResult {
    let connect = TcpStream::connect((target.host.as_str(), port));
    let mut stream = match time::timeout(target.timeout, connect).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            trace!(host = %target.host, port, error = %e, "connect failed");
            return ScanResult::closed(port);
        }
        Err(_) => {
            trace!(host = %target.host, port, "connect timed out");
            return ScanResult::closed(port);
        }
    };

    let service = read_banner(&mut stream, target.banner_timeout)
        .await
        .unwrap_or_default();
    drop(stream);

    debug!(host = %target.host, port, banner_len = service.len(), "port open");
    ScanResult::open(port, service)
}

/// Try a single read of up to 1024 bytes and convert it to a lossy UTF-8 string.
async fn read_banner(stream: &mut TcpStream, deadline: Duration) -> Option<String> {
    let mut buf = vec![0u8; BANNER_MAX_BYTES];
    match time::timeout(deadline, stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => {
            buf.truncate(n);
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_defaults() {
        let t = ScanTarget::new("127.0.0.1");
        assert_eq!(t.timeout, Duration::from_secs(2));
        assert_eq!(t.concurrency, 100);
        assert_eq!(t.banner_timeout, Duration::from_secs(1));
    }

    #[test]
    fn in_flight_guard_tracks_peak() {
        let progress = ScanProgress::new();
        {
            let _a = InFlight::enter(&progress);
            let _b = InFlight::enter(&progress);
            assert_eq!(progress.in_flight.load(Ordering::SeqCst), 2);
        }
        let _c = InFlight::enter(&progress);
        assert_eq!(progress.in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(progress.peak(), 2);
    }

    #[tokio::test]
    async fn empty_port_list_returns_immediately() {
        let results = scan(&ScanTarget::new("127.0.0.1"), &[]).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn resolves_loopback_literal() {
        let addrs = resolve_target("127.0.0.1").await.unwrap();
        assert!(addrs.iter().all(|a| a.ip().is_loopback()));
    }
}
