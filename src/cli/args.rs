use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "prodtable",
    version,
    about = "terminal admin table for a remote product catalog",
    long_about = "prodtable loads products from a REST catalog and lets you search, sort, page through, create, edit and export them.\n\nExamples:\n  prodtable\n  prodtable --search shirt --sort price --per-page 20\n  prodtable --sort price --sort price --export ./cheapest-last.csv\n  prodtable -i --api-url http://localhost:3000/api/v1/products\n\nTip: Use --config to persist catalog settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "How to print the current page (table, json or csv)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'o',
        long = "exp",
        visible_alias = "export",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        help_heading = "Output",
        help = "Export the visible page as CSV (defaults to products_export.csv)."
    )]
    pub export: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.prodtable/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Input",
        help = "Write a default config file if none exists, then exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'u',
        long = "api",
        visible_alias = "api-url",
        value_name = "URL",
        help_heading = "Catalog",
        help = "Products endpoint of the catalog API."
    )]
    pub api_url: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "Catalog",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "Catalog",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 's',
        long = "q",
        visible_alias = "search",
        value_name = "TEXT",
        help_heading = "Table",
        help = "Only show products whose title contains TEXT (case-insensitive)."
    )]
    pub search: Option<String>,

    #[arg(
        short = 'S',
        long = "srt",
        visible_alias = "sort",
        value_name = "KEY",
        action = ArgAction::Append,
        help_heading = "Table",
        help = "Sort by title or price (repeatable; each repeat flips the direction)."
    )]
    pub sort: Vec<String>,

    #[arg(
        short = 'l',
        long = "pp",
        visible_alias = "per-page",
        value_name = "N",
        help_heading = "Table",
        help = "Rows per page."
    )]
    pub per_page: Option<usize>,

    #[arg(
        short = 'P',
        long = "pg",
        visible_alias = "page",
        value_name = "N",
        help_heading = "Table",
        help = "Page to show (ignored when out of range)."
    )]
    pub page: Option<usize>,

    #[arg(
        short = 'i',
        long = "it",
        visible_alias = "interactive",
        help_heading = "Mode",
        help = "Start the interactive shell after loading."
    )]
    pub interactive: bool,
}
