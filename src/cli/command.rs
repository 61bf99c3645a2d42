//! Grammar of the interactive shell.
//!
//! One command per line: a verb, then arguments. `create` and `edit` take
//! `key=value` assignments; values with spaces go in double quotes
//! (`title="Desk Lamp"`, `\"` for a literal quote).

use std::num::NonZeroUsize;
use std::sync::OnceLock;

use regex::Regex;

use crate::engine::SortKey;
use crate::utils;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageTarget {
    Number(usize),
    Next,
    Previous,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShellCommand {
    List,
    Search(String),
    Sort(SortKey),
    Page(PageTarget),
    PerPage(NonZeroUsize),
    Show(i64),
    Create(Vec<(String, String)>),
    Edit {
        id: i64,
        assignments: Vec<(String, String)>,
    },
    Export(Option<String>),
    Reload,
    Help,
    Quit,
}

pub const SHELL_HELP: &str = "Commands:
  list                          show the current page again
  search [TEXT]                 filter by title (no TEXT clears the filter)
  sort title|price              sort by a column; repeat to flip direction
  page N|next|prev              jump to a page
  per-page N                    rows per page
  show ID                       full details of one product
  create key=value ...          new product (title, price, category, image, description)
  edit ID key=value ...         change a product (title, price, image, description)
  export [FILE]                 save the visible page as CSV
  reload                        fetch all products again
  help                          this text
  quit                          leave
";

fn assignment_re() -> &'static Regex {
    static ASSIGNMENT: OnceLock<Regex> = OnceLock::new();
    ASSIGNMENT.get_or_init(|| {
        Regex::new(r#"(?P<key>[A-Za-z_]+)=(?:"(?P<quoted>(?:[^"\\]|\\.)*)"|(?P<bare>[^\s"]*))"#)
            .unwrap()
    })
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

pub fn parse_assignments(input: &str) -> Result<Vec<(String, String)>, String> {
    let re = assignment_re();
    let leftover = re.replace_all(input, "");
    if let Some(stray) = leftover.split_whitespace().next() {
        return Err(format!("unexpected input '{stray}', expected key=value"));
    }
    let mut out = Vec::new();
    for cap in re.captures_iter(input) {
        let value = match (cap.name("quoted"), cap.name("bare")) {
            (Some(quoted), _) => unescape(quoted.as_str()),
            (None, Some(bare)) => bare.as_str().to_string(),
            (None, None) => String::new(),
        };
        out.push((cap["key"].to_string(), value));
    }
    Ok(out)
}

fn split_verb(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    }
}

/// Parses one shell line; blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = split_verb(line);
    let command = match verb.to_lowercase().as_str() {
        "list" | "ls" => ShellCommand::List,
        "search" | "find" => ShellCommand::Search(utils::unquote(rest).to_string()),
        "sort" => {
            let key = SortKey::parse(rest)
                .ok_or_else(|| format!("invalid sort key '{rest}', expected title or price"))?;
            ShellCommand::Sort(key)
        }
        "page" | "p" => {
            let target = match rest.to_lowercase().as_str() {
                "next" | "n" | ">" => PageTarget::Next,
                "prev" | "previous" | "<" => PageTarget::Previous,
                other => PageTarget::Number(utils::parse_page_number(other)?),
            };
            ShellCommand::Page(target)
        }
        "next" => ShellCommand::Page(PageTarget::Next),
        "prev" => ShellCommand::Page(PageTarget::Previous),
        "per-page" | "perpage" | "size" => ShellCommand::PerPage(utils::parse_page_size(rest)?),
        "show" | "view" => ShellCommand::Show(utils::parse_product_id(rest)?),
        "create" | "new" => ShellCommand::Create(parse_assignments(rest)?),
        "edit" | "update" => {
            let (id, assignments) = split_verb(rest);
            if id.is_empty() {
                return Err("edit needs a product id".to_string());
            }
            ShellCommand::Edit {
                id: utils::parse_product_id(id)?,
                assignments: parse_assignments(assignments)?,
            }
        }
        "export" => {
            let path = utils::unquote(rest);
            ShellCommand::Export(if path.is_empty() {
                None
            } else {
                Some(path.to_string())
            })
        }
        "reload" | "refresh" => ShellCommand::Reload,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}
