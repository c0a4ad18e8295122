use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_gauge, Encoder, IntCounter, IntGauge, TextEncoder};

lazy_static! {
    pub(crate) static ref RECORDS_EXTRACTED: IntCounter = register_int_counter!(
        "bookflow_records_extracted_total",
        "Total number of records extracted from upstream text"
    ).expect("metric can be registered");
    pub(crate) static ref MALFORMED_FRAMES: IntCounter = register_int_counter!(
        "bookflow_malformed_frames_total",
        "Total number of object spans that failed to decode"
    ).expect("metric can be registered");
    pub(crate) static ref BUFFER_SIZE_GAUGE: IntGauge = register_int_gauge!(
        "bookflow_buffer_size_bytes",
        "Bytes currently buffered across all live producers"
    ).expect("metric can be registered");
}

/// Renders all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
