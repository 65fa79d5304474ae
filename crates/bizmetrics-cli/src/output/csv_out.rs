use serde_json::{Map, Value};
use std::io;

/// Write output as CSV to stdout.
///
/// Record lists become one row per record. For object results the first
/// field holding a record list is written (e.g. the funnel stages or the
/// per-customer rows); results without one fall back to field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let payload = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let written = match payload {
        Value::Array(rows) => write_records(&mut wtr, rows),
        Value::Object(map) => match first_record_list(map) {
            Some(rows) => write_records(&mut wtr, rows),
            None => write_pairs(&mut wtr, map),
        },
        other => wtr.write_record([&format_csv_value(other)]),
    };

    // Stop at the first failed write (e.g. a closed pipe)
    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        log::error!("failed to write CSV output: {e}");
    }
}

fn first_record_list(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    map.values().find_map(|v| match v {
        Value::Array(rows) if rows.first().map_or(false, Value::is_object) => Some(rows),
        _ => None,
    })
}

fn write_pairs<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    map: &Map<String, Value>,
) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &format_csv_value(val)])?;
    }
    Ok(())
}

fn write_records<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    if arr.is_empty() {
        return Ok(());
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        wtr.write_record(&headers)?;

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                wtr.write_record(&row)?;
            }
        }
    } else {
        for item in arr {
            wtr.write_record([&format_csv_value(item)])?;
        }
    }
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct ClosedPipe;

    impl io::Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_records_written_with_header() {
        let rows = vec![json!({"gap": "10", "org": "A"}), json!({"gap": "-5", "org": "B"})];
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_records(&mut wtr, &rows).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(text, "gap,org\n10,A\n-5,B\n");
    }

    #[test]
    fn test_write_failure_is_reported() {
        // csv buffers internally, so the error surfaces by flush at the latest
        let rows = vec![json!({"org": "A"})];
        let mut wtr = csv::Writer::from_writer(ClosedPipe);
        let written =
            write_records(&mut wtr, &rows).and_then(|_| wtr.flush().map_err(csv::Error::from));
        assert!(written.is_err());
    }
}
