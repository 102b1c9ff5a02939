use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

/// Process-wide metrics for one observatory-cli run. Constructed once at
/// startup and cloned into every worker / committer task.
#[derive(Clone)]
pub struct ObservatoryMetrics {
    pub registry: Registry,
    pub probe_outcomes_total: IntCounterVec,
    pub http_retries_total: IntCounterVec,
    pub sweep_duration_seconds: Histogram,
    pub batch_flush_rows: Histogram,
    pub work_queue_depth: IntGauge,
}

impl ObservatoryMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let probe_outcomes_total = IntCounterVec::new(
            Opts::new("probe_outcomes_total", "Availability probe results by outcome"),
            &["outcome"],
        ).unwrap();
        let http_retries_total = IntCounterVec::new(
            Opts::new("http_retries_total", "HTTP retry attempts issued by the session layer"),
            &["host", "reason"],
        ).unwrap();
        let sweep_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "sweep_duration_seconds",
                "Wall-clock duration of a catalog/targeted/probe sweep",
            ).buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0, 10800.0])
        ).unwrap();
        let batch_flush_rows = Histogram::with_opts(
            HistogramOpts::new("batch_flush_rows", "Rows written per committer flush")
                .buckets(vec![1.0, 10.0, 50.0, 100.0, 200.0, 500.0, 1000.0])
        ).unwrap();
        let work_queue_depth =
            IntGauge::new("work_queue_depth", "Work units currently queued for a worker pool").unwrap();

        let _ = registry.register(Box::new(probe_outcomes_total.clone()));
        let _ = registry.register(Box::new(http_retries_total.clone()));
        let _ = registry.register(Box::new(sweep_duration_seconds.clone()));
        let _ = registry.register(Box::new(batch_flush_rows.clone()));
        let _ = registry.register(Box::new(work_queue_depth.clone()));

        ObservatoryMetrics {
            registry,
            probe_outcomes_total,
            http_retries_total,
            sweep_duration_seconds,
            batch_flush_rows,
            work_queue_depth,
        }
    }

    pub fn record_probe_outcome(&self, outcome: &str) {
        self.probe_outcomes_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_http_retry(&self, host: &str, reason: &str) {
        self.http_retries_total.with_label_values(&[host, reason]).inc();
    }

    /// Renders the registry as Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::{Encoder, TextEncoder};
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Default for ObservatoryMetrics {
    fn default() -> Self { Self::new() }
}
