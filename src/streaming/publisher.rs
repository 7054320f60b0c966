//! Telemetry publisher
//!
//! A dedicated thread owns the TCP listener; the control loop pushes
//! samples onto a bounded lock-free queue with `try_push` and never
//! blocks, whatever the state of the network or its consumers. When the
//! queue is full the sample is dropped and counted.

use crate::error::Result;
use crate::streaming::messages::TelemetrySample;
use crate::streaming::wire;
use crate::streaming::TelemetrySink;
use crossbeam_queue::ArrayQueue;
use log::{debug, error, info, warn};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Queue depth: a few seconds of samples at the default 100 Hz loop rate
const QUEUE_CAPACITY: usize = 1024;
/// Max samples broadcast per thread iteration, keeps accept() responsive
const BATCH_LIMIT: usize = 50;

/// Non-blocking telemetry fan-out over TCP
pub struct TelemetryPublisher {
    queue: Arc<ArrayQueue<TelemetrySample>>,
    publisher_thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl TelemetryPublisher {
    /// Bind the listener and spawn the publisher thread
    pub fn new(bind_address: String) -> Result<Self> {
        let queue = Arc::new(ArrayQueue::new(QUEUE_CAPACITY));
        let shutdown = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));

        // Bind here so an unusable address fails construction, not the thread
        let listener = TcpListener::bind(&bind_address)?;
        listener.set_nonblocking(true)?;

        let queue_clone = Arc::clone(&queue);
        let shutdown_clone = Arc::clone(&shutdown);
        let publisher_thread = thread::Builder::new()
            .name("telemetry-publisher".to_string())
            .spawn(move || {
                Self::publisher_thread_loop(listener, queue_clone, shutdown_clone);
            })?;

        info!("Telemetry publisher listening on {}", bind_address);

        Ok(Self {
            queue,
            publisher_thread: Some(publisher_thread),
            shutdown,
            dropped,
        })
    }

    /// Queue one sample without blocking. Full queue drops the sample.
    pub fn try_publish(&self, sample: TelemetrySample) {
        if self.queue.push(sample).is_err() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if total % 1000 == 1 {
                warn!("Telemetry queue full, {} samples dropped so far", total);
            }
        }
    }

    /// Samples dropped because the queue was full
    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn publisher_thread_loop(
        listener: TcpListener,
        queue: Arc<ArrayQueue<TelemetrySample>>,
        shutdown: Arc<AtomicBool>,
    ) {
        let mut clients: Vec<TcpStream> = Vec::new();
        let mut published = 0u64;
        let mut last_stats_log = Instant::now();

        while !shutdown.load(Ordering::Relaxed) {
            // Accept new subscribers (non-blocking)
            match listener.accept() {
                Ok((stream, addr)) => {
                    info!("Telemetry client connected: {}", addr);
                    clients.push(stream);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    error!("Telemetry accept failed: {}", e);
                }
            }

            // Drain a bounded batch so accepts are never starved
            let mut drained = 0;
            while let Some(sample) = queue.pop() {
                Self::broadcast(&mut clients, &sample);
                published += 1;
                drained += 1;
                if drained >= BATCH_LIMIT {
                    break;
                }
            }

            if drained == 0 {
                thread::sleep(Duration::from_millis(1));
            }

            if last_stats_log.elapsed() >= Duration::from_secs(30) {
                debug!(
                    "Telemetry publisher: {} samples published, {} clients",
                    published,
                    clients.len()
                );
                last_stats_log = Instant::now();
            }
        }

        debug!("Telemetry publisher thread exiting");
    }

    /// Write one sample to every client, pruning the ones that fail
    fn broadcast(clients: &mut Vec<TcpStream>, sample: &TelemetrySample) {
        clients.retain_mut(|stream| match wire::write_frame(stream, sample) {
            Ok(()) => true,
            Err(e) => {
                debug!("Telemetry client dropped: {}", e);
                false
            }
        });
    }

    /// Signal the publisher thread to exit and join it
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.publisher_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TelemetryPublisher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl TelemetrySink for TelemetryPublisher {
    fn publish(&self, sample: &TelemetrySample) {
        self.try_publish(sample.clone());
    }
}
