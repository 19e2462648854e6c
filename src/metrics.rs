//! Metrics and tracing hooks.
//!
//! Search deliberately degrades instead of failing on bad pagination input,
//! unknown filter keys and cache trouble. These counters keep that degradation
//! visible. Everything here is behind the `metrics` and `tracing` features.

#[cfg(feature = "metrics")]
pub use self::prometheus_metrics::{SearchMetrics, METRICS};

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};

    pub static METRICS: Lazy<SearchMetrics> = Lazy::new(SearchMetrics::init);

    pub struct SearchMetrics {
        registry: Registry,
        _provider: SdkMeterProvider,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub cache_hits_total: Counter<u64>,
        pub cache_misses_total: Counter<u64>,
        pub cache_read_failures_total: Counter<u64>,
        pub cache_write_failures_total: Counter<u64>,
        pub pagination_fallbacks_total: Counter<u64>,
        pub skipped_parameters_total: Counter<u64>,
        pub page_size_clamps_total: Counter<u64>,
    }

    impl SearchMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let exporter = opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
                .expect("failed to build prometheus exporter");
            let provider = SdkMeterProvider::builder().with_reader(exporter).build();
            let meter = provider.meter("lifeguard_search");

            let counter = |name: &'static str, description: &'static str| {
                meter.u64_counter(name).with_description(description).build()
            };

            Self {
                queries_total: counter("lifeguard_search_queries_total", "Total statements executed"),
                query_errors_total: counter(
                    "lifeguard_search_query_errors_total",
                    "Statements that failed in the database",
                ),
                query_duration: meter
                    .f64_histogram("lifeguard_search_query_duration_seconds")
                    .with_description("Duration of statements")
                    .build(),
                cache_hits_total: counter(
                    "lifeguard_search_cache_hits_total",
                    "Single-record lookups served from cache",
                ),
                cache_misses_total: counter(
                    "lifeguard_search_cache_misses_total",
                    "Single-record lookups not found in cache",
                ),
                cache_read_failures_total: counter(
                    "lifeguard_search_cache_read_failures_total",
                    "Cache reads or decodes that failed and fell through to the database",
                ),
                cache_write_failures_total: counter(
                    "lifeguard_search_cache_write_failures_total",
                    "Cache writes that failed and were skipped",
                ),
                pagination_fallbacks_total: counter(
                    "lifeguard_search_pagination_fallbacks_total",
                    "Requests whose page/size input fell back to the defaults",
                ),
                skipped_parameters_total: counter(
                    "lifeguard_search_skipped_parameters_total",
                    "Parameter keys ignored as unknown or malformed filters",
                ),
                page_size_clamps_total: counter(
                    "lifeguard_search_page_size_clamps_total",
                    "Requested page sizes clamped to the configured maximum",
                ),
                registry,
                _provider: provider,
            }
        }

        pub fn record_query(&self, elapsed: std::time::Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_cache_hit(&self) {
            self.cache_hits_total.add(1, &[]);
        }

        pub fn record_cache_miss(&self) {
            self.cache_misses_total.add(1, &[]);
        }

        pub fn record_cache_read_failure(&self) {
            self.cache_read_failures_total.add(1, &[]);
        }

        pub fn record_cache_write_failure(&self) {
            self.cache_write_failures_total.add(1, &[]);
        }

        pub fn record_pagination_fallback(&self) {
            self.pagination_fallbacks_total.add(1, &[]);
        }

        pub fn record_skipped_parameter(&self) {
            self.skipped_parameters_total.add(1, &[]);
        }

        pub fn record_page_size_clamp(&self) {
            self.page_size_clamps_total.add(1, &[]);
        }

        /// Render the registry in the Prometheus text exposition format
        pub fn prometheus_text(&self) -> String {
            let mut buffer = Vec::new();
            if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
                log::warn!("failed to encode search metrics: {e}");
                return String::new();
            }
            String::from_utf8(buffer).unwrap_or_default()
        }
    }
}

/// Span constructors shared by the executor, transaction, cache and lookup code
#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn execute_query_span(sql: &str) -> Span {
        info_span!("lifeguard_search.execute_query", db.statement = %sql)
    }

    pub fn begin_transaction_span() -> Span {
        info_span!("lifeguard_search.begin_transaction")
    }

    pub fn finish_transaction_span(statement: &str) -> Span {
        info_span!("lifeguard_search.finish_transaction", db.statement = %statement)
    }

    pub fn find_one_span(table: &str) -> Span {
        info_span!("lifeguard_search.find_one", db.table = %table)
    }

    pub fn find_many_span(table: &str, counted: bool) -> Span {
        info_span!("lifeguard_search.find_many", db.table = %table, counted)
    }

    pub fn cache_span(operation: &'static str, key: &str) -> Span {
        info_span!("lifeguard_search.cache", operation, cache.key = %key)
    }
}
