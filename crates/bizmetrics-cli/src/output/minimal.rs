use serde_json::Value;

/// Headline figures in priority order, searched in the result object and
/// then in its `summary` / `portfolio` sub-objects.
const PRIORITY_KEYS: [&str; 10] = [
    "outstanding",
    "weighted_days",
    "prepayment_to_sales_ratio",
    "total_variance",
    "total_clv",
    "operating_profit_change",
    "seasonal_strength",
    "base_operating_profit",
    "risk_score",
    "analysis_rate",
];

const SUMMARY_KEYS: [&str; 2] = ["summary", "portfolio"];

/// Print just the headline value from the output.
///
/// List results print their row count.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result_obj {
        Value::Object(map) => {
            let scopes = std::iter::once(map).chain(
                SUMMARY_KEYS
                    .iter()
                    .filter_map(|k| map.get(*k).and_then(Value::as_object)),
            );
            for scope in scopes {
                for key in &PRIORITY_KEYS {
                    if let Some(val) = scope.get(*key) {
                        if !val.is_null() {
                            println!("{}", format_minimal(val));
                            return;
                        }
                    }
                }
            }

            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, format_minimal(val));
                return;
            }
            println!("{{}}");
        }
        Value::Array(rows) => println!("{} rows", rows.len()),
        other => println!("{}", format_minimal(other)),
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
