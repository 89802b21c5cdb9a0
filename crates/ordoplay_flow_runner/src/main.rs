// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line runner for `OrdoPlay` flow assets.
//!
//! Loads a RON flow asset, starts it at an entry node and reports the
//! traversal. Active nodes can be written to a save file before the flow is
//! finished, and a later run can resume from that file.

use anyhow::Context;
use clap::Parser;
use ordoplay_flow::{
    FinishPolicy, FlowAsset, FlowGraph, FlowSaveData, FlowSettings, NodeId, NodeRegistry,
    TraversalEvent, TraversalLog,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ordoplay_flow",
    about = "Run an OrdoPlay flow asset",
    version
)]
struct Opts {
    /// Flow asset to run (RON)
    asset: PathBuf,

    /// Entry node ID (defaults to the first node of the asset)
    #[arg(long)]
    entry: Option<NodeId>,

    /// Settings file (RON)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write save data of nodes still active after the run
    #[arg(long)]
    save: Option<PathBuf>,

    /// Resume from a save file instead of starting at the entry node
    #[arg(long, conflicts_with = "entry")]
    load: Option<PathBuf>,

    /// Finish remaining nodes as aborted instead of completed
    #[arg(long)]
    abort: bool,

    /// Print every pin traversal
    #[arg(long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    init_tracing();

    let settings = match &opts.settings {
        Some(path) => FlowSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => FlowSettings::default(),
    };

    let asset = FlowAsset::load(&opts.asset)
        .with_context(|| format!("loading flow asset {}", opts.asset.display()))?;
    let registry = NodeRegistry::with_builtin_nodes();
    let log = TraversalLog::new();
    let mut graph = FlowGraph::from_asset(&asset, &registry)
        .context("instantiating flow asset")?
        .with_settings(settings)
        .with_observer(log.clone());

    match &opts.load {
        Some(path) => {
            let data = FlowSaveData::load(path)
                .with_context(|| format!("loading save data from {}", path.display()))?;
            graph.load_instance(&data).context("restoring save data")?;
        }
        None => {
            let Some(entry) = opts.entry.or_else(|| asset.nodes.first().map(|node| node.id)) else {
                anyhow::bail!("flow asset {} has no nodes", opts.asset.display());
            };
            graph.start_flow(entry).context("starting flow")?;
        }
    }

    info!(
        graph = %graph.name,
        events = log.len(),
        active = graph.active_node_ids().count(),
        "Flow ran"
    );

    if opts.trace {
        for event in log.events() {
            print_event(&graph, event);
        }
    }

    if let Some(path) = &opts.save {
        let data = graph.save_instance().context("saving flow")?;
        data.save(path)
            .with_context(|| format!("writing save data to {}", path.display()))?;
        info!(path = %path.display(), nodes = data.nodes.len(), "Wrote save data");
    }

    if !graph.is_finished() {
        let policy = if opts.abort {
            FinishPolicy::Abort
        } else {
            FinishPolicy::Complete
        };
        warn!(active = graph.active_node_ids().count(), ?policy, "Finishing nodes left active");
        graph.finish_flow(policy);
    }

    for node in graph.nodes() {
        println!(
            "{} {:<12} {:?}",
            node.base().id(),
            node.class_name(),
            node.base().activation_state()
        );
    }
    Ok(())
}

fn print_event(graph: &FlowGraph, event: TraversalEvent) {
    let Some(node) = graph.node(event.node_id()) else {
        return;
    };
    let (arrow, pin) = match event {
        TraversalEvent::Input { pin_index, .. } => ("->", node.base().input_pins().get(pin_index)),
        TraversalEvent::Output { pin_index, .. } => {
            ("<-", node.base().output_pins().get(pin_index))
        }
    };
    let pin_name = pin.map_or("?", |pin| pin.name.as_str());
    println!("{arrow} {} {}.{}", event.node_id(), node.class_name(), pin_name);
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
