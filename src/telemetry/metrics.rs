//! Prometheus metrics
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! these calls are no-ops.

use crate::feed::Symbol;

/// Per-symbol counters
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Ticks applied to history and tracker
    TicksProcessed,
    /// Payloads dropped because they could not be decoded
    MalformedTicks,
    /// Transport errors reported by stream connections
    StreamErrors,
    /// Replacement connections opened after a close
    Reconnects,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Registered symbols
    RegisteredSymbols,
    /// Connections currently in the Open state
    OpenConnections,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::TicksProcessed => "tickwatch_ticks_processed_total",
            CounterMetric::MalformedTicks => "tickwatch_malformed_ticks_total",
            CounterMetric::StreamErrors => "tickwatch_stream_errors_total",
            CounterMetric::Reconnects => "tickwatch_reconnects_total",
        }
    }
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::RegisteredSymbols => "tickwatch_registered_symbols",
            GaugeMetric::OpenConnections => "tickwatch_open_connections",
        }
    }
}

/// Increment a counter labelled with the symbol
pub fn increment_counter(metric: CounterMetric, symbol: &Symbol) {
    ::metrics::counter!(metric.name(), "symbol" => symbol.to_string()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}
