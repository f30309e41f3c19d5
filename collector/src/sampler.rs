//! # Sampling loop
//!
//! Every `interval` the sampler fetches a status report, decodes it and publishes it to the
//! [`MetricSet`]. A cycle that fails at any stage is logged and skipped, leaving the previously
//! published values in place; the next tick fires on schedule regardless.

use crate::{
    metrics::MetricSet,
    source::{
        FetchError,
        StatusSource,
    },
    status::{
        DecodeError,
        TirexStatus,
    },
};
use std::time::{
    Duration,
    Instant,
};
use tokio::{
    sync::watch,
    time::MissedTickBehavior,
};
use tracing::{
    debug,
    info,
    warn,
};

#[derive(thiserror::Error, Debug)]
pub enum SampleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

pub struct Sampler<S> {
    source: S,
    metrics: MetricSet,
    interval: Duration,
}

impl<S: StatusSource> Sampler<S> {
    pub fn new(source: S, metrics: MetricSet, interval: Duration) -> Self {
        Self {
            source,
            metrics,
            interval,
        }
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    /// One fetch, decode, publish cycle. On error nothing is published.
    pub async fn sample_once(&self) -> Result<TirexStatus, SampleError> {
        let started = Instant::now();
        let bytes = self.source.fetch().await?;
        let status = TirexStatus::decode(&bytes)?;
        self.metrics.publish(&status);

        let stats = status.stats();
        debug!(
            source = self.source.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            queue_size = status.queue_size(),
            prio_queues = status.prio_queues().len(),
            rendering = status.num_rendering(),
            count_error = stats.count_error,
            count_timeouted = stats.count_timeouted,
            count_requested = stats.count_requested,
            count_expired = stats.count_expired,
            "published tirex status"
        );
        Ok(status)
    }

    /// Samples immediately, then once per interval, until `shutdown` changes or its sender is
    /// dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            source = self.source.name(),
            interval_secs = self.interval.as_secs_f64(),
            "sampler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sample_once().await {
                        Ok(_) => {}
                        Err(SampleError::Fetch(e)) => {
                            warn!(
                                source = self.source.name(),
                                error = %e,
                                "crawling tirex status failed, keeping previous values"
                            );
                        }
                        Err(SampleError::Decode(e)) => {
                            warn!(
                                source = self.source.name(),
                                error = %e,
                                "tirex status report is malformed, keeping previous values"
                            );
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("sampler shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{
        collections::VecDeque,
        future::Future,
        io,
        pin::Pin,
        sync::{
            atomic::{
                AtomicUsize,
                Ordering,
            },
            Arc,
            Mutex,
        },
    };

    const FIRST: &str =
        r#"{"queue":{"size":5,"prioqueues":[{"prio":1,"size":2},{"prio":3,"size":0}]},"rm":{"num_rendering":4}}"#;
    const SECOND: &str = r#"{"queue":{"size":9,"prioqueues":[{"prio":3,"size":9}]},"rm":{"num_rendering":1}}"#;

    enum Response {
        Report(&'static str),
        Unavailable,
    }

    /// Replays canned responses, then keeps failing.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Response>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Response>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Self {
                responses: Mutex::new(responses.into()),
                calls: calls.clone(),
            };
            (source, calls)
        }
    }

    impl StatusSource for ScriptedSource {
        fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchError>> + Send + '_>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self.responses.lock().unwrap().pop_front();
            Box::pin(async move {
                match response {
                    Some(Response::Report(report)) => Ok(report.as_bytes().to_vec()),
                    Some(Response::Unavailable) | None => Err(FetchError::Spawn {
                        command: "tirex-status -r".to_string(),
                        source: io::Error::new(io::ErrorKind::NotFound, "not installed"),
                    }),
                }
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn sampler(responses: Vec<Response>) -> (Sampler<ScriptedSource>, Arc<AtomicUsize>) {
        let (source, calls) = ScriptedSource::new(responses);
        let sampler = Sampler::new(source, MetricSet::new().unwrap(), Duration::from_secs(10));
        (sampler, calls)
    }

    #[tokio::test]
    async fn successful_cycle_publishes_report() {
        let (sampler, _) = sampler(vec![Response::Report(FIRST)]);
        let status = sampler.sample_once().await.unwrap();

        assert_eq!(status.queue_size(), 5);
        let metrics = sampler.metrics();
        assert_eq!(metrics.queue_size(), 5);
        assert_eq!(metrics.prio_queue_size("1"), Some(2));
        assert_eq!(metrics.prio_queue_size("3"), Some(0));
        assert_eq!(metrics.rendering(), 4);
    }

    #[tokio::test]
    async fn absent_priority_stays_at_last_value() {
        let (sampler, _) = sampler(vec![Response::Report(FIRST), Response::Report(SECOND)]);
        sampler.sample_once().await.unwrap();
        sampler.sample_once().await.unwrap();

        let metrics = sampler.metrics();
        assert_eq!(metrics.queue_size(), 9);
        assert_eq!(metrics.prio_queue_size("1"), Some(2));
        assert_eq!(metrics.prio_queue_size("3"), Some(9));
        assert_eq!(metrics.rendering(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_metrics_untouched() {
        let (sampler, _) = sampler(vec![Response::Report(FIRST), Response::Unavailable]);
        sampler.sample_once().await.unwrap();

        assert!(matches!(sampler.sample_once().await, Err(SampleError::Fetch(_))));
        let metrics = sampler.metrics();
        assert_eq!(metrics.queue_size(), 5);
        assert_eq!(metrics.prio_queue_size("1"), Some(2));
        assert_eq!(metrics.rendering(), 4);
    }

    #[tokio::test]
    async fn decode_failure_skips_publication() {
        let (sampler, _) = sampler(vec![
            Response::Report(FIRST),
            Response::Report(r#"{"queue":{"size":7,"prioqueues":[{"prio":1,"size":"#),
            Response::Report(r#"{"queue":{"size":"seven"}}"#),
        ]);
        sampler.sample_once().await.unwrap();

        assert!(matches!(sampler.sample_once().await, Err(SampleError::Decode(_))));
        assert!(matches!(sampler.sample_once().await, Err(SampleError::Decode(_))));
        let metrics = sampler.metrics();
        assert_eq!(metrics.queue_size(), 5);
        assert_eq!(metrics.prio_queue_size("1"), Some(2));
        assert_eq!(metrics.rendering(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_keeps_its_period_across_failures() {
        let (sampler, calls) = sampler(vec![
            Response::Report(FIRST),
            Response::Unavailable,
            Response::Report("not json"),
            Response::Report(SECOND),
        ]);
        let sampler = Arc::new(sampler);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn({
            let sampler = sampler.clone();
            async move { sampler.run(shutdown_rx).await }
        });

        // First sample happens right away.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sampler.metrics().queue_size(), 5);

        // Fetch failure.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sampler.metrics().queue_size(), 5);

        // Decode failure.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sampler.metrics().queue_size(), 5);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(sampler.metrics().queue_size(), 9);
        assert_eq!(sampler.metrics().prio_queue_size("1"), Some(2));
        assert_eq!(sampler.metrics().prio_queue_size("3"), Some(9));

        // Nothing left to replay: the loop keeps ticking on failures.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(sampler.metrics().queue_size(), 9);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_shutdown_sender_stops_the_loop() {
        let (sampler, calls) = sampler(vec![]);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { sampler.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(1)).await;
        drop(shutdown_tx);
        handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
