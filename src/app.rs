use std::io::Write;
use std::num::NonZeroUsize;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::catalog::{Catalog, ClientOptions, CreateForm, HttpCatalog, DEFAULT_API_URL};
use crate::cli::args::CliArgs;
use crate::cli::command::{self, PageTarget, ShellCommand, SHELL_HELP};
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::engine::{SortKey, DEFAULT_PAGE_SIZE};
use crate::output::{self, notice, Notice, OutputFormat};
use crate::session::Session;

fn print_banner() {
    const BANNER: &str = r#"
                     _ _        _     _
  _ __  _ __ ___   __| | |_ __ _| |__ | | ___
 | '_ \| '__/ _ \ / _` | __/ _` | '_ \| |/ _ \
 | |_) | | | (_) | (_| | || (_| | |_) | |  __/
 | .__/|_|  \___/ \__,_|\__\__,_|_.__/|_|\___|
 |_|        product catalog admin table
    "#;
    println!("{}", BANNER);
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = format!(
        "{} {}\n{}\n",
        cmd.get_name(),
        cmd.get_version().unwrap_or_default(),
        cmd.get_about().map(|a| a.to_string()).unwrap_or_default()
    );
    if let Some(long_about) = cmd.get_long_about() {
        out.push_str(&format!("\n{long_about}\n"));
    }
    out.push_str(&format!("\nUsage: {} [OPTIONS]\n\n", cmd.get_name()));

    let groups = cmd
        .get_arguments()
        .filter(|arg| !arg.is_hide_set())
        .map(|arg| (arg.get_help_heading().unwrap_or("Options").to_string(), arg))
        .into_group_map();
    let headings = cmd
        .get_arguments()
        .filter(|arg| !arg.is_hide_set())
        .map(|arg| arg.get_help_heading().unwrap_or("Options"))
        .unique()
        .collect::<Vec<_>>();

    for heading in headings {
        let Some(args) = groups.get(heading) else {
            continue;
        };
        out.push_str(&format!("{heading}:\n"));
        for arg in args {
            let mut flags = arg
                .get_short()
                .map(|s| format!("-{s}"))
                .into_iter()
                .chain(arg.get_long().map(|l| format!("--{l}")))
                .chain(
                    arg.get_visible_aliases()
                        .unwrap_or_default()
                        .into_iter()
                        .map(|a| format!("--{a}")),
                )
                .unique()
                .join(", ");
            if arg.get_action().takes_values() {
                let value_name = arg
                    .get_value_names()
                    .and_then(|names| names.first())
                    .map(|name| name.as_str())
                    .unwrap_or("VALUE");
                let optional = arg.get_num_args().map(|r| r.min_values()).unwrap_or(1) == 0;
                if optional {
                    flags.push_str(&format!(" [<{value_name}>]"));
                } else {
                    flags.push_str(&format!(" <{value_name}>"));
                }
            }
            out.push_str(&format!("  {flags}\n"));
            if let Some(help) = arg.get_help() {
                out.push_str(&format!("          {}\n", help.to_string().trim()));
            }
            out.push('\n');
        }
    }
    out
}

#[derive(Clone, Debug)]
struct RunConfig {
    api_url: String,
    timeout: u64,
    proxy: Option<String>,
    per_page: NonZeroUsize,
    search: Option<String>,
    sorts: Vec<SortKey>,
    page: Option<usize>,
    output_format: OutputFormat,
    export: Option<String>,
    export_path: String,
    interactive: bool,
    no_color: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let api_url = args
        .api_url
        .or(cfg.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
        .trim()
        .to_string();
    reqwest::Url::parse(&api_url).map_err(|e| format!("invalid api url '{api_url}': {e}"))?;

    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout == 0 {
        return Err("invalid timeout, expected positive number of seconds".to_string());
    }
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());

    let per_page = match args.per_page.or(cfg.per_page) {
        Some(n) => NonZeroUsize::new(n)
            .ok_or_else(|| "invalid per-page, expected positive integer".to_string())?,
        None => DEFAULT_PAGE_SIZE,
    };

    let sorts = args
        .sort
        .iter()
        .map(|raw| {
            SortKey::parse(raw).ok_or_else(|| format!("invalid --sort '{raw}'"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected table, json or csv"))?,
        None => OutputFormat::Table,
    };

    let export_path = config::expand_tilde_string(
        cfg.export_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(output::EXPORT_FILE_NAME),
    );
    let export = args.export.map(|p| {
        if p.trim().is_empty() {
            export_path.clone()
        } else {
            config::expand_tilde_string(p.trim())
        }
    });

    Ok(RunConfig {
        api_url,
        timeout,
        proxy,
        per_page,
        search: args.search,
        sorts,
        page: args.page,
        output_format,
        export,
        export_path,
        interactive: args.interactive,
        no_color,
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb
}

async fn load_products<C: Catalog>(session: &mut Session<C>) -> Result<usize, String> {
    let pb = spinner("Loading products...");
    let result = session.load().await;
    pb.finish_and_clear();
    result.map_err(|e| {
        error!(error = %e, "load failed");
        e.to_string()
    })
}

async fn export_page<C: Catalog>(session: &Session<C>, path: &str) -> Result<usize, String> {
    let rows = session.state().visible_slice();
    if rows.is_empty() {
        return Ok(0);
    }
    let bytes = output::render_csv(&rows).map_err(|e| format!("failed to render CSV: {e}"))?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| format!("failed to write export file '{path}': {e}"))?;
    Ok(rows.len())
}

async fn report_export<C: Catalog>(session: &Session<C>, path: &str) -> Result<(), String> {
    match export_page(session, path).await? {
        0 => eprintln!("{}", notice(Notice::Warning, "nothing to export, the view is empty")),
        n => eprintln!(
            "{}",
            notice(Notice::Success, &format!("exported {n} products to {path}"))
        ),
    }
    Ok(())
}

fn print_page<C: Catalog>(session: &Session<C>, format: OutputFormat) -> Result<(), String> {
    let rows = session.state().visible_slice();
    let rendered = match format {
        OutputFormat::Table => {
            output::render_table(session.state(), session.load_failed()).into_bytes()
        }
        OutputFormat::Json => {
            let mut out = output::render_json(&rows);
            out.push(b'\n');
            out
        }
        OutputFormat::Csv => {
            let mut out =
                output::render_csv(&rows).map_err(|e| format!("failed to render CSV: {e}"))?;
            out.extend_from_slice(b"\r\n");
            out
        }
    };
    let mut stdout = std::io::stdout();
    stdout
        .write_all(&rendered)
        .and_then(|_| stdout.flush())
        .map_err(|e| format!("failed to write output: {e}"))
}

enum Step {
    Continue,
    Quit,
}

fn show_table<C: Catalog>(session: &Session<C>) {
    print!(
        "{}",
        output::render_table(session.state(), session.load_failed())
    );
}

async fn execute<C: Catalog>(
    session: &mut Session<C>,
    command: ShellCommand,
    run: &RunConfig,
) -> Step {
    match command {
        ShellCommand::List => show_table(session),
        ShellCommand::Search(query) => {
            session.search(&query);
            show_table(session);
        }
        ShellCommand::Sort(key) => {
            session.sort(key);
            show_table(session);
        }
        ShellCommand::Page(target) => {
            let moved = match target {
                PageTarget::Number(n) => session.go_to_page(n),
                PageTarget::Next => session.next_page(),
                PageTarget::Previous => session.previous_page(),
            };
            if !moved {
                eprintln!("{}", notice(Notice::Warning, "no such page"));
            }
            show_table(session);
        }
        ShellCommand::PerPage(n) => {
            session.set_page_size(n);
            show_table(session);
        }
        ShellCommand::Show(id) => match session.state().find(id) {
            Some(product) => print!("{}", output::render_detail(product)),
            None => eprintln!(
                "{}",
                notice(Notice::Error, &format!("product #{id} is not loaded"))
            ),
        },
        ShellCommand::Create(assignments) => {
            let mut form = CreateForm::default();
            for (key, value) in assignments.iter() {
                if let Err(e) = form.set(key, value) {
                    eprintln!("{}", notice(Notice::Error, &e.to_string()));
                    return Step::Continue;
                }
            }
            let pb = spinner("Saving...");
            let result = session.create(&form).await;
            pb.finish_and_clear();
            match result {
                Ok(created) => {
                    show_table(session);
                    eprintln!(
                        "{}",
                        notice(
                            Notice::Success,
                            &format!("Product #{} created successfully!", created.id)
                        )
                    );
                }
                Err(e) => {
                    error!(error = %e, "create failed");
                    eprintln!("{}", notice(Notice::Error, &format!("Error: {e}")));
                }
            }
        }
        ShellCommand::Edit { id, assignments } => {
            let mut form = match session.edit_form(id) {
                Ok(form) => form,
                Err(e) => {
                    eprintln!("{}", notice(Notice::Error, &e.to_string()));
                    return Step::Continue;
                }
            };
            for (key, value) in assignments.iter() {
                if let Err(e) = form.set(key, value) {
                    eprintln!("{}", notice(Notice::Error, &e.to_string()));
                    return Step::Continue;
                }
            }
            let pb = spinner("Saving...");
            let result = session.update(id, &form).await;
            pb.finish_and_clear();
            match result {
                Ok(_) => {
                    show_table(session);
                    eprintln!(
                        "{}",
                        notice(Notice::Success, "Product updated successfully!")
                    );
                }
                Err(e) => {
                    error!(error = %e, id, "update failed");
                    eprintln!("{}", notice(Notice::Error, &format!("Update failed: {e}")));
                }
            }
        }
        ShellCommand::Export(path) => {
            let path = path
                .map(|p| config::expand_tilde_string(&p))
                .unwrap_or_else(|| run.export_path.clone());
            if let Err(e) = report_export(session, &path).await {
                eprintln!("{}", notice(Notice::Error, &e));
            }
        }
        ShellCommand::Reload => {
            if let Err(e) = load_products(session).await {
                eprintln!("{}", notice(Notice::Error, &e));
            }
            show_table(session);
        }
        ShellCommand::Help => print!("{}", SHELL_HELP),
        ShellCommand::Quit => return Step::Quit,
    }
    Step::Continue
}

async fn run_shell<C: Catalog>(session: &mut Session<C>, run: &RunConfig) -> Result<(), String> {
    show_table(session);
    println!("{}", "type 'help' for commands".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "prodtable>".bold().cyan());
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return Err(format!("failed to read input: {e}")),
        };
        let command = match command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", notice(Notice::Warning, &e));
                continue;
            }
        };
        if let Step::Quit = execute(session, command, run).await {
            break;
        }
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    let catalog = HttpCatalog::new(&ClientOptions {
        api_url: run.api_url.clone(),
        timeout_seconds: run.timeout,
        proxy: run.proxy.clone(),
    })
    .map_err(|e| e.to_string())?;
    let mut session = Session::new(catalog, run.per_page);

    if run.interactive {
        print_banner();
        format_kv_line("Catalog", &run.api_url);
        format_kv_line("Per page", &run.per_page.to_string());
        println!();
        if let Err(e) = load_products(&mut session).await {
            eprintln!("{}", notice(Notice::Error, &e));
        }
        return run_shell(&mut session, &run).await;
    }

    let loaded = load_products(&mut session).await;

    if let Some(query) = run.search.as_deref() {
        session.search(query);
    }
    for key in run.sorts.iter() {
        session.sort(*key);
    }
    if let Some(page) = run.page {
        if !session.go_to_page(page) {
            eprintln!(
                "{}",
                notice(
                    Notice::Warning,
                    &format!(
                        "page {page} does not exist (1-{}), showing page {}",
                        session.state().total_pages(),
                        session.state().current_page()
                    )
                )
            );
        }
    }

    print_page(&session, run.output_format)?;

    if let Some(path) = run.export.as_deref() {
        report_export(&session, path).await?;
    }

    loaded.map(|_| ())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_logging(args.verbose);

    let (config_path, allow_missing) = match args.config.as_deref() {
        Some(path) => (Some(config::expand_tilde(path)), false),
        None => (config::default_config_path(), true),
    };

    if args.init_config {
        let path = config_path.ok_or_else(|| "could not determine config path".to_string())?;
        if config::ensure_default_config_file(&path)? {
            println!("{}", notice(Notice::Success, &format!("wrote {}", path.display())));
        } else {
            println!(
                "{}",
                notice(Notice::Info, &format!("{} already exists", path.display()))
            );
        }
        return Ok(());
    }

    let cfg = match config_path.as_ref() {
        Some(path) => config::load_config(path, allow_missing)?,
        None => ConfigFile::default(),
    };

    let run = build_run_config(args, cfg)?;
    if run.no_color {
        colored::control::set_override(false);
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
