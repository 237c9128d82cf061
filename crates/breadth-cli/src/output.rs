use breadth_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Number of trailing market points shown by the table renderer.
const TABLE_TAIL: usize = 10;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => render_table(envelope)?,
    }

    Ok(())
}

fn render_table(envelope: &Envelope<Value>) -> Result<(), CliError> {
    println!("request_id  : {}", envelope.meta.request_id);
    println!("schema      : {}", envelope.meta.schema_version);
    println!("generated_at: {}", envelope.meta.generated_at);
    if let Some(source) = envelope.meta.source {
        println!("source      : {source}");
    }
    println!("latency_ms  : {}", envelope.meta.latency_ms);

    if !envelope.meta.warnings.is_empty() {
        println!("warnings:");
        for warning in &envelope.meta.warnings {
            println!("  - {warning}");
        }
    }

    match market_points(&envelope.data) {
        Some(points) => render_market_tail(points),
        None => {
            println!("data:");
            let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
            for line in pretty_data.lines() {
                println!("  {line}");
            }
        }
    }

    if !envelope.errors.is_empty() {
        println!("errors:");
        for error in &envelope.errors {
            println!("  - {}: {}", error.code, error.message);
        }
    }

    Ok(())
}

/// Market points of a `run` (`report.points`) or `history` (`market`) payload.
fn market_points(data: &Value) -> Option<&Vec<Value>> {
    data.pointer("/report/points")
        .or_else(|| data.get("market"))
        .and_then(Value::as_array)
}

fn render_market_tail(points: &[Value]) {
    println!("market breadth (last {}):", TABLE_TAIL.min(points.len()));
    println!("  {:<10}  {:>8}  {}", "date", "score", "zone");
    let skip = points.len().saturating_sub(TABLE_TAIL);
    for point in &points[skip..] {
        let date = point.get("date").and_then(Value::as_str).unwrap_or("-");
        let score = point.get("score").and_then(Value::as_f64).unwrap_or(f64::NAN);
        let zone = point.get("zone").and_then(Value::as_str).unwrap_or("-");
        println!("  {date:<10}  {score:>8.1}  {zone}");
    }
}
