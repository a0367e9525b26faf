//! `fnote`: check, normalize and preview footnote markup

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use doc_model::{check_invariants, footnote_items, references, DocumentTree};
use edit_engine::{EditingEngine, FootnoteConfig};
use render_model::LiveView;
use std::collections::HashSet;
use std::path::Path;
use store::{load_document, save_document, write_markup, SettingsManager};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.settings.as_deref())?;

    match cli.command {
        Command::Check { file } => {
            let problems = check(&read(&file)?)?;
            for problem in &problems {
                println!("{}: {}", file.display(), problem);
            }
            if !problems.is_empty() {
                bail!("{} problem(s) found", problems.len());
            }
            println!("{}: ok", file.display());
        }
        Command::Normalize {
            file,
            output,
            renumber,
        } => {
            let markup = normalize(&read(&file)?, renumber, &config)?;
            match output {
                Some(path) => std::fs::write(&path, markup)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{}", markup),
            }
        }
        Command::Live { file } => {
            println!("{}", live(&read(&file)?)?);
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FootnoteConfig> {
    let Some(path) = path else {
        return Ok(FootnoteConfig::default());
    };
    let mut manager = SettingsManager::with_path(path.to_path_buf());
    let settings = manager
        .load_sync()
        .with_context(|| format!("reading settings {}", path.display()))?;
    Ok(settings.footnotes.clone())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Everything wrong with a document's footnotes, one line each
fn check(markup: &str) -> Result<Vec<String>> {
    let loaded = load_document(markup)?;
    let mut problems: Vec<String> = loaded
        .skipped
        .iter()
        .map(|s| format!("skipped <{}>: {}", s.name, s.reason))
        .collect();

    let tree = &loaded.tree;
    if let Err(breach) = check_invariants(tree) {
        problems.push(breach.to_string());
    }
    problems.extend(orphans(tree));
    Ok(problems)
}

fn orphans(tree: &DocumentTree) -> Vec<String> {
    let known: HashSet<u32> = footnote_items(tree)
        .into_iter()
        .filter_map(|item| tree.get(item)?.footnote_id())
        .collect();
    references(tree)
        .into_iter()
        .filter_map(|r| tree.get(r))
        .filter(|r| r.footnote_id().map_or(true, |id| !known.contains(&id)))
        .map(|r| {
            format!(
                "reference to missing footnote {}",
                r.attribute(doc_model::FOOTNOTE_ID_ATTR).unwrap_or("?")
            )
        })
        .collect()
}

fn normalize(markup: &str, renumber: bool, config: &FootnoteConfig) -> Result<String> {
    let loaded = load_document(markup)?;
    if !renumber {
        return Ok(save_document(&loaded.tree)?);
    }
    let mut engine = EditingEngine::with_config(loaded.tree, config.clone());
    let repaired = engine.renumber_from(0)?;
    tracing::info!(repaired, "renumbered footnotes");
    Ok(save_document(engine.tree()?)?)
}

fn live(markup: &str) -> Result<String> {
    let loaded = load_document(markup)?;
    let view = LiveView::build(&loaded.tree)?;
    Ok(write_markup(view.view())?)
}
