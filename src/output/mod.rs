use colored::{ColoredString, Colorize};
use itertools::Itertools;

use crate::catalog::Product;
use crate::engine::{PageLink, SortDirection, SortKey, ViewState};
use crate::utils::truncate_chars;

pub const EXPORT_FILE_NAME: &str = "products_export.csv";
pub const EMPTY_MESSAGE: &str = "No products found";
pub const LOAD_ERROR_MESSAGE: &str = "Error loading products. Check API or Network.";

const CSV_HEADER: [&str; 6] = ["ID", "Title", "Price", "Category", "Description", "Image"];

const ID_WIDTH: usize = 7;
const TITLE_WIDTH: usize = 34;
const PRICE_WIDTH: usize = 11;
const CATEGORY_WIDTH: usize = 18;
const IMAGE_WIDTH: usize = 48;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "table" | "text" | "txt" => Some(Self::Table),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

// text columns are always quoted, with embedded quotes doubled
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Serializes a page of products as CSV: a header row plus one row per
/// record, rows separated by CRLF. Title, category and description are
/// always quoted; ID, price and image are written bare.
pub fn render_csv(products: &[&Product]) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)?;
    for p in products {
        wtr.write_record([
            p.id.to_string(),
            quoted(&p.title),
            p.price.to_string(),
            quoted(p.category_name().unwrap_or("")),
            quoted(p.description.as_deref().unwrap_or("")),
            p.images.first().cloned().unwrap_or_default(),
        ])?;
    }
    let mut bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    if bytes.ends_with(b"\r\n") {
        bytes.truncate(bytes.len() - 2);
    }
    Ok(bytes)
}

pub fn render_json(products: &[&Product]) -> Vec<u8> {
    serde_json::to_vec_pretty(products).unwrap_or_else(|_| b"[]\n".to_vec())
}

fn sort_marker(key: SortKey, sort: Option<(SortKey, SortDirection)>) -> ColoredString {
    match sort {
        Some((active, SortDirection::Ascending)) if active == key => "↑".bold().cyan(),
        Some((active, SortDirection::Descending)) if active == key => "↓".bold().cyan(),
        _ => "↕".dimmed(),
    }
}

fn pad(value: &str, width: usize) -> String {
    format!("{:<width$}", truncate_chars(value, width - 1))
}

/// Renders the current page of `state` as a table followed by the pager.
///
/// With `load_failed` set and nothing loaded, the table body is replaced by
/// the load error row.
pub fn render_table(state: &ViewState, load_failed: bool) -> String {
    let sort = state.sort_state();
    let mut out = String::new();

    // sortable labels are followed by a one-char marker
    out.push_str(&format!(
        "{}{} {}{}{} {}{}{}{}\n",
        pad("ID", ID_WIDTH).bold().white(),
        "Title".bold().white(),
        sort_marker(SortKey::Title, sort),
        " ".repeat(TITLE_WIDTH - "Title ?".len()),
        "Price".bold().white(),
        sort_marker(SortKey::Price, sort),
        " ".repeat(PRICE_WIDTH - "Price ?".len()),
        pad("Category", CATEGORY_WIDTH).bold().white(),
        "Image".bold().white(),
    ));

    if load_failed && state.dataset().is_empty() {
        out.push_str(&format!("{}\n", LOAD_ERROR_MESSAGE.red()));
        out.push_str(&render_pager(state));
        return out;
    }
    if load_failed {
        out.push_str(&format!(
            "{}\n",
            "Reload failed, showing previously loaded products.".yellow()
        ));
    }

    let rows = state.visible_slice();
    if rows.is_empty() {
        out.push_str(&format!("{}\n", EMPTY_MESSAGE.dimmed()));
    }
    for p in rows {
        let price = format!("${}", p.price);
        out.push_str(&format!(
            "{}{}{}{}{}\n",
            pad(&format!("#{}", p.id), ID_WIDTH).dimmed(),
            pad(&p.title, TITLE_WIDTH).bold(),
            pad(&price, PRICE_WIDTH).green().bold(),
            pad(p.category_name().unwrap_or("Uncategorized"), CATEGORY_WIDTH),
            truncate_chars(&p.primary_image(), IMAGE_WIDTH).dimmed(),
        ));
    }

    out.push_str(&render_pager(state));
    out
}

pub fn render_pager(state: &ViewState) -> String {
    let links = state
        .page_links()
        .into_iter()
        .map(|link| match link {
            PageLink::Previous { enabled, .. } if enabled => "«".white(),
            PageLink::Previous { .. } => "«".dimmed(),
            PageLink::Page { number, active } if active => format!("[{number}]").bold().cyan(),
            PageLink::Page { number, .. } => number.to_string().white(),
            PageLink::Gap => "…".dimmed(),
            PageLink::Next { enabled, .. } if enabled => "»".white(),
            PageLink::Next { .. } => "»".dimmed(),
        })
        .join(" ");
    format!(
        "\n{}   {}\n",
        links,
        format!(
            "page {}/{} · {} of {} products · {} per page",
            state.current_page(),
            state.total_pages(),
            state.view_len(),
            state.dataset().len(),
            state.page_size()
        )
        .dimmed()
    )
}

fn kv_line(label: &str, value: &str) -> String {
    format!(":: {:<12}: {}\n", label, value)
}

/// Full view of a single product, the terminal counterpart of the edit dialog.
pub fn render_detail(product: &Product) -> String {
    let mut out = String::new();
    out.push_str(&kv_line("ID", &format!("#{}", product.id)));
    out.push_str(&kv_line("Title", &product.title));
    out.push_str(&kv_line("Price", &format!("${}", product.price)));
    out.push_str(&kv_line(
        "Category",
        product.category_name().unwrap_or("N/A"),
    ));
    out.push_str(&kv_line(
        "Description",
        product
            .description_text()
            .unwrap_or("No description available"),
    ));
    out.push_str(&kv_line("Image", &product.primary_image()));
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    Info,
    Success,
    Warning,
    Error,
}

pub fn notice(kind: Notice, message: &str) -> String {
    let label = match kind {
        Notice::Info => "INF".bold().blue(),
        Notice::Success => "OK".bold().green(),
        Notice::Warning => "WRN".bold().yellow(),
        Notice::Error => "ERR".bold().red(),
    };
    format!(
        "{}{}{} {}",
        "[".bold().white(),
        label,
        "]".bold().white(),
        message.bold().white()
    )
}
