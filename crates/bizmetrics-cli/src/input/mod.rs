pub mod file;
pub mod stdin;

use bizmetrics_core::{AnalyticsConfig, Dataset};

use crate::commands::DataArgs;

/// Load the dataset (file or stdin), the config (file or defaults) and apply
/// the organization filter.
pub fn load(args: &DataArgs) -> Result<(Dataset, AnalyticsConfig), Box<dyn std::error::Error>> {
    let dataset: Dataset = if let Some(ref path) = args.input {
        file::read_structured(path)?
    } else if let Some(data) = stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <dataset.{json,yaml}> or piped stdin required".into());
    };

    let config = load_config(args.config.as_deref())?;

    let dataset = if args.org.is_empty() {
        dataset
    } else {
        let filtered = dataset.filter_orgs(&args.org);
        log::info!(
            "org filter {:?}: {} of {} rows kept",
            args.org,
            filtered.row_count(),
            dataset.row_count()
        );
        filtered
    };

    Ok((dataset, config))
}

/// Config from `--config`, or the defaults. Always validated.
pub fn load_config(path: Option<&str>) -> Result<AnalyticsConfig, Box<dyn std::error::Error>> {
    let config: AnalyticsConfig = match path {
        Some(p) => file::read_structured(p)?,
        None => AnalyticsConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
