use crate::cli::args::CliArgs;
use crate::engine::SortKey;
use crate::output::OutputFormat;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(per_page) = args.per_page {
        if per_page == 0 {
            return Err("invalid per-page, expected positive integer".to_string());
        }
    }
    if let Some(page) = args.page {
        if page == 0 {
            return Err("invalid page, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive number of seconds".to_string());
        }
    }
    for raw in args.sort.iter() {
        if SortKey::parse(raw).is_none() {
            return Err(format!("invalid --sort '{raw}', expected title or price"));
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected table, json or csv"
            ));
        }
    }
    if let Some(raw) = args.api_url.as_deref() {
        reqwest::Url::parse(raw.trim()).map_err(|e| format!("invalid --api-url '{raw}': {e}"))?;
    }
    Ok(())
}
