use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use roundtrip_core::{BoxFuture, ClientError, Request, Response, SharedTransport, Transport};
use tokio::time::Instant;

use super::Interceptor;
use crate::config::saturating_millis;

/// Outcome of a request as recorded in metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricStatus {
    /// A response arrived with this status code.
    Code(u16),
    /// No response: the transport failed or the call was canceled.
    Error,
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricStatus::Code(code) => write!(f, "{code}"),
            MetricStatus::Error => f.write_str("error"),
        }
    }
}

/// One measured request.
#[derive(Clone, Debug)]
pub struct RequestMetric {
    pub service: Arc<str>,
    pub method: Method,
    pub status: MetricStatus,
    pub elapsed: Duration,
}

/// Destination for request metrics.
pub trait MetricsSink: Send + Sync {
    fn record(&self, metric: &RequestMetric);
}

/// Emits each metric as a `tracing` event under the `roundtrip::metrics` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record(&self, metric: &RequestMetric) {
        tracing::info!(
            target: "roundtrip::metrics",
            service = %metric.service,
            method = %metric.method,
            status = %metric.status,
            elapsed_ms = saturating_millis(metric.elapsed),
            "http client request"
        );
    }
}

/// Records through the `metrics` facade.
///
/// - `http_client_requests_total` (counter)
/// - `http_client_request_duration_seconds` (histogram)
///
/// Both carry `service`, `method` and `status` labels.
#[cfg(feature = "metrics")]
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsRecorderSink;

#[cfg(feature = "metrics")]
impl MetricsSink for MetricsRecorderSink {
    fn record(&self, metric: &RequestMetric) {
        let service = metric.service.to_string();
        let method = metric.method.to_string();
        let status = metric.status.to_string();
        ::metrics::counter!(
            "http_client_requests_total",
            "service" => service.clone(),
            "method" => method.clone(),
            "status" => status.clone()
        )
        .increment(1);
        ::metrics::histogram!(
            "http_client_request_duration_seconds",
            "service" => service,
            "method" => method,
            "status" => status
        )
        .record(metric.elapsed.as_secs_f64());
    }
}

/// Measures each request and hands a [`RequestMetric`] to a [`MetricsSink`].
#[derive(Clone)]
pub struct MetricsInterceptor {
    service: Arc<str>,
    sink: Arc<dyn MetricsSink>,
}

impl fmt::Debug for MetricsInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsInterceptor")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl MetricsInterceptor {
    /// Create an interceptor tagged with `service`, reporting to [`TracingSink`].
    pub fn new(service: impl Into<Arc<str>>) -> Self {
        Self {
            service: service.into(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Report to a different sink.
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl Interceptor for MetricsInterceptor {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(MetricsTransport {
            service: self.service.clone(),
            sink: self.sink.clone(),
            next,
        })
    }
}

struct MetricsTransport {
    service: Arc<str>,
    sink: Arc<dyn MetricsSink>,
    next: SharedTransport,
}

impl Transport for MetricsTransport {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin(async move {
            let method = request.method().clone();
            let start = Instant::now();
            let outcome = self.next.round_trip(request).await;

            let status = match &outcome {
                Ok(response) => MetricStatus::Code(response.status().as_u16()),
                Err(_) => MetricStatus::Error,
            };
            self.sink.record(&RequestMetric {
                service: self.service.clone(),
                method,
                status,
                elapsed: start.elapsed(),
            });

            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtrip_core::{StatusCode, TransportFn};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        metrics: Mutex<Vec<RequestMetric>>,
    }

    impl MetricsSink for RecordingSink {
        fn record(&self, metric: &RequestMetric) {
            self.metrics.lock().unwrap().push(metric.clone());
        }
    }

    #[test]
    fn test_metric_status_display() {
        assert_eq!(MetricStatus::Code(503).to_string(), "503");
        assert_eq!(MetricStatus::Error.to_string(), "error");
    }

    #[tokio::test]
    async fn test_records_status_and_error() {
        let sink = Arc::new(RecordingSink::default());
        let interceptor = MetricsInterceptor::new("billing").with_sink(sink.clone());

        let ok = interceptor.wrap(TransportFn::shared(|_request: Request| async {
            Ok(Response::new(StatusCode::SERVICE_UNAVAILABLE))
        }));
        let failing = interceptor.wrap(TransportFn::shared(|_request: Request| async {
            Err::<Response, _>(ClientError::transport("reset"))
        }));

        let request = Request::try_new(Method::PUT, "http://localhost/invoices/1").unwrap();
        ok.round_trip(request.clone()).await.unwrap();
        failing.round_trip(request).await.unwrap_err();

        let recorded = sink.metrics.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(&*recorded[0].service, "billing");
        assert_eq!(recorded[0].method, Method::PUT);
        assert_eq!(recorded[0].status, MetricStatus::Code(503));
        assert_eq!(recorded[1].status, MetricStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_elapsed_time() {
        let sink = Arc::new(RecordingSink::default());
        let wrapped = MetricsInterceptor::new("search")
            .with_sink(sink.clone())
            .wrap(TransportFn::shared(|_request: Request| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(Response::new(StatusCode::OK))
            }));

        let request = Request::try_new(Method::GET, "http://localhost/q").unwrap();
        wrapped.round_trip(request).await.unwrap();

        let recorded = sink.metrics.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].elapsed >= Duration::from_millis(300));
        assert!(recorded[0].elapsed < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_default_sink_does_not_alter_outcome() {
        let wrapped = MetricsInterceptor::new("search").wrap(TransportFn::shared(
            |_request: Request| async { Ok(Response::new(StatusCode::OK)) },
        ));
        let request = Request::try_new(Method::GET, "http://localhost/q").unwrap();
        assert_eq!(wrapped.round_trip(request).await.unwrap().status(), StatusCode::OK);
    }

    #[cfg(feature = "metrics")]
    mod recorder {
        use super::*;
        use ::metrics::{
            Counter, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder,
            SharedString, Unit,
        };
        use std::sync::atomic::{AtomicU64, Ordering};

        type Labels = Vec<(String, String)>;

        #[derive(Default)]
        struct Samples(Mutex<Vec<f64>>);

        impl Samples {
            fn values(&self) -> Vec<f64> {
                self.0.lock().unwrap().clone()
            }
        }

        impl HistogramFn for Samples {
            fn record(&self, value: f64) {
                self.0.lock().unwrap().push(value);
            }
        }

        /// Keeps one handle per registered key.
        #[derive(Default)]
        struct CapturingRecorder {
            counters: Mutex<Vec<(String, Labels, Arc<AtomicU64>)>>,
            histograms: Mutex<Vec<(String, Labels, Arc<Samples>)>>,
        }

        fn labels(key: &Key) -> Labels {
            key.labels()
                .map(|label| (label.key().to_string(), label.value().to_string()))
                .collect()
        }

        impl Recorder for CapturingRecorder {
            fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
            fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
            fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

            fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
                let value = Arc::new(AtomicU64::new(0));
                self.counters.lock().unwrap().push((
                    key.name().to_string(),
                    labels(key),
                    value.clone(),
                ));
                Counter::from_arc(value)
            }

            fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
                Gauge::noop()
            }

            fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
                let samples = Arc::new(Samples::default());
                self.histograms.lock().unwrap().push((
                    key.name().to_string(),
                    labels(key),
                    samples.clone(),
                ));
                Histogram::from_arc(samples)
            }
        }

        #[test]
        fn test_recorder_sink_emits_counter_and_histogram() {
            let recorder = CapturingRecorder::default();
            let metric = RequestMetric {
                service: Arc::from("billing"),
                method: Method::POST,
                status: MetricStatus::Code(502),
                elapsed: Duration::from_millis(1500),
            };

            ::metrics::with_local_recorder(&recorder, || MetricsRecorderSink.record(&metric));

            let expected: Labels = vec![
                ("service".to_string(), "billing".to_string()),
                ("method".to_string(), "POST".to_string()),
                ("status".to_string(), "502".to_string()),
            ];

            let counters = recorder.counters.lock().unwrap();
            assert_eq!(counters.len(), 1);
            assert_eq!(counters[0].0, "http_client_requests_total");
            assert_eq!(counters[0].1, expected);
            assert_eq!(counters[0].2.load(Ordering::SeqCst), 1);

            let histograms = recorder.histograms.lock().unwrap();
            assert_eq!(histograms.len(), 1);
            assert_eq!(histograms[0].0, "http_client_request_duration_seconds");
            assert_eq!(histograms[0].1, expected);
            assert_eq!(histograms[0].2.values(), vec![1.5]);
        }

        #[test]
        fn test_recorder_sink_labels_errors() {
            let recorder = CapturingRecorder::default();
            let metric = RequestMetric {
                service: Arc::from("billing"),
                method: Method::GET,
                status: MetricStatus::Error,
                elapsed: Duration::ZERO,
            };

            ::metrics::with_local_recorder(&recorder, || MetricsRecorderSink.record(&metric));

            let counters = recorder.counters.lock().unwrap();
            assert!(
                counters[0]
                    .1
                    .contains(&("status".to_string(), "error".to_string()))
            );
        }
    }
}
