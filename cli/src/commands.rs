//! Command handlers.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use catprinter::Model;
use image_processor::{Algorithm, Controller, PackedBitmap, Parameters, Preview};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::Foundation;
use crate::cli::{ConvertArgs, SettingsAction, TextArgs, WatchArgs, toggle};
use crate::services::font::FontService;
use crate::services::preview_worker::{Change, PreviewWorker, Published};
use crate::services::spool::Spooler;

/// Rows added by a bare `expand` line.
pub const DEFAULT_EXPAND_ROWS: u32 = 384;

/// `catprint convert`
pub fn convert(f: &Foundation, args: &ConvertArgs) -> Result<(), anyhow::Error> {
    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let params = args.tuning.apply(f.config.parameters());

    let mut ctl = Controller::new(f.config.printer_model.paper_width, params)?;
    let preview = ctl.load_image(&bytes)?;
    report_warnings(preview);
    if let Some(path) = &args.preview {
        save_preview(preview, path)?;
    }

    let bitmap = ctl.commit()?;
    let name = args.input.display().to_string();
    deliver(f, &bitmap, ctl.params(), args.output.as_deref(), &name)
}

/// `catprint text`
pub fn text(f: &Foundation, args: &TextArgs) -> Result<(), anyhow::Error> {
    let text = if args.text == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read text from stdin")?;
        buf
    } else {
        args.text.clone()
    };

    let font_path = match &args.font {
        Some(path) => path.display().to_string(),
        None => f.config.font_path.clone(),
    };
    let font = FontService::new(f.data_dir.clone()).load(&font_path)?;

    let mut style = f.config.text_style();
    if let Some(size) = args.size {
        style.font_size = size;
    }
    if let Some(align) = args.align {
        style.align = align;
    }
    if args.no_wrap_by_space {
        style.wrap_by_spaces = false;
    }

    let mut ctl = Controller::new(f.config.printer_model.paper_width, f.config.parameters())?;
    ctl.insert_text(&text, &font, &style)?;
    if let Some(flip) = toggle(args.flip, args.no_flip) {
        ctl.set_params(ctl.params().with_flip(flip))?;
    }
    if let (Some(path), Some(preview)) = (&args.preview, ctl.preview()) {
        save_preview(preview, path)?;
    }

    let bitmap = ctl.commit()?;
    deliver(f, &bitmap, ctl.params(), args.output.as_deref(), "text")
}

/// One parsed line of the `watch` control protocol.
#[derive(Debug, Clone)]
pub enum WatchLine {
    Change(Change),
    Commit,
    Quit,
    Blank,
}

/// Parse a `key=value` control line.
pub fn parse_watch_line(line: &str) -> Result<WatchLine, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(WatchLine::Blank);
    }
    let (key, value) = match line.split_once('=') {
        Some((k, v)) => (k.trim(), Some(v.trim())),
        None => (line, None),
    };

    let change = match (key, value) {
        ("commit", None) => return Ok(WatchLine::Commit),
        ("quit" | "exit", None) => return Ok(WatchLine::Quit),
        ("reset", None) => Change::Reset,
        ("expand", None) => Change::Expand(DEFAULT_EXPAND_ROWS),
        ("expand", Some(v)) => Change::Expand(v.parse().map_err(|_| format!("invalid row count '{v}'"))?),
        ("algorithm", Some(v)) => Change::Algorithm(v.parse::<Algorithm>().map_err(|e| e.to_string())?),
        ("threshold", Some(v)) => Change::Threshold(parse_int(v)?),
        ("energy", Some(v)) => Change::Energy(parse_int(v)?),
        ("rotate", Some(v)) => Change::Rotate(parse_bool(v)?),
        ("transparent", Some(v)) => Change::TransparentAsWhite(parse_bool(v)?),
        ("flip", Some(v)) => Change::Flip(parse_bool(v)?),
        _ => return Err(format!("unrecognized command '{line}'")),
    };
    Ok(WatchLine::Change(change))
}

fn parse_int(v: &str) -> Result<i64, String> {
    v.parse().map_err(|_| format!("'{v}' is not an integer"))
}

fn parse_bool(v: &str) -> Result<bool, String> {
    match v.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "white" => Ok(true),
        "false" | "off" | "0" | "black" => Ok(false),
        _ => Err(format!("'{v}' is not a boolean")),
    }
}

/// `catprint watch`
pub async fn watch(f: &Foundation, args: &WatchArgs) -> Result<(), anyhow::Error> {
    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let ctl = Controller::new(f.config.printer_model.paper_width, f.config.parameters())?;
    let worker = PreviewWorker::spawn(ctl);
    worker.send(Change::LoadImage(Arc::new(bytes))).await?;

    if let Some(path) = args.preview.clone() {
        tokio::spawn(keep_preview_updated(worker.subscribe(), path));
    }

    eprintln!("Reading commands (algorithm=, threshold=, energy=, rotate=, transparent=, flip=, expand, reset, commit, quit)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_watch_line(&line) {
            Ok(WatchLine::Change(change)) => worker.send(change).await?,
            Ok(WatchLine::Commit) => match worker.commit().await {
                Ok(committed) => {
                    let name = args.input.display().to_string();
                    deliver(f, &committed.bitmap, &committed.params, args.output.as_deref(), &name)?;
                }
                Err(e) => eprintln!("Commit failed: {e}"),
            },
            Ok(WatchLine::Quit) => break,
            Ok(WatchLine::Blank) => {}
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

async fn keep_preview_updated(mut rx: tokio::sync::watch::Receiver<Published>, path: PathBuf) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        match state {
            Published::Ready {
                generation,
                preview,
            } => {
                report_warnings(&preview);
                let path = path.clone();
                let saved =
                    tokio::task::spawn_blocking(move || save_preview(&preview, &path)).await;
                match saved {
                    Ok(Ok(())) => tracing::debug!(generation, "Preview saved"),
                    Ok(Err(e)) => tracing::warn!("Failed to save preview: {e}"),
                    Err(e) => tracing::warn!("Preview task failed: {e}"),
                }
            }
            Published::Failed { message, .. } => eprintln!("Conversion failed: {message}"),
            Published::Empty { .. } => {}
        }
    }
}

/// `catprint models`
pub fn models() {
    println!("{:<6} {:>6}  notes", "model", "width");
    for m in Model::all() {
        let mut notes = Vec::new();
        if m.is_new_kind {
            notes.push("compressed data");
        }
        if m.problem_feeding {
            notes.push("extra feeding");
        }
        println!("{:<6} {:>6}  {}", m.name, m.paper_width, notes.join(", "));
    }
}

/// `catprint settings`
pub fn settings(f: &Foundation, action: &SettingsAction) -> Result<(), anyhow::Error> {
    match action {
        SettingsAction::Get { key } => println!("{}", f.settings.get_setting(key)?),
        SettingsAction::Set { key, value } => {
            f.settings.set_setting(key, value)?;
            println!("{key}={value}");
        }
        SettingsAction::List => {
            let all = f.settings.get_all_settings()?;
            let mut keys: Vec<&String> = all.keys().collect();
            keys.sort();
            for key in keys {
                let info = &all[key];
                let marker = if info.customized { "*" } else { " " };
                println!("{marker} {key}={:<12} {}", info.value, info.description);
            }
        }
    }
    Ok(())
}

/// Write a bitmap to `output`, or spool it with the configured options.
fn deliver(
    f: &Foundation,
    bitmap: &PackedBitmap,
    params: &Parameters,
    output: Option<&Path>,
    description: &str,
) -> Result<(), anyhow::Error> {
    if let Some(path) = output {
        std::fs::write(path, bitmap.to_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!(
            "Wrote {}x{} bitmap to {}",
            bitmap.width(),
            bitmap.height(),
            path.display()
        );
        return Ok(());
    }

    let options = f.config.printer_options(params)?;
    let spooler = Spooler::new(f.config.spool_dir_or(&f.data_dir));
    match spooler.submit(bitmap, &options, description)? {
        Some(path) => println!("Spooled {}", path.display()),
        None => println!("Dry run: job logged, nothing spooled"),
    }
    Ok(())
}

fn report_warnings(preview: &Preview) {
    for warning in &preview.warnings {
        eprintln!("Warning: {warning}");
    }
}

fn save_preview(preview: &Preview, path: &Path) -> Result<(), anyhow::Error> {
    preview
        .to_rgba_filtered()
        .save(path)
        .with_context(|| format!("failed to save preview {}", path.display()))
}
