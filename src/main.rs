// SPDX-License-Identifier: BSD-3-Clause
use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use regex::Regex;

use tracing_flame::FlameLayer;
use tracing_subscriber::{fmt, prelude::*};

use relprop::{facts, layers::SpanTimes, oracle, Domain, Options};

mod cli;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn setup_global_subscriber(times: SpanTimes) -> Result<impl Drop> {
    let filter_layer = tracing::level_filters::LevelFilter::TRACE;
    let fmt_layer = fmt::Layer::default().with_writer(io::stderr);
    let (flame_layer, guard) =
        FlameLayer::with_file("./tracing.folded").context("Couldn't create tracing.folded")?;
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(flame_layer)
        .with(times)
        .init();
    Ok(guard)
}

fn main() -> Result<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let args = cli::Args::parse();

    let times = SpanTimes::new();
    let _guard = if args.tracing {
        Some(setup_global_subscriber(times.clone())?)
    } else {
        if args.verbose {
            tracing_subscriber::registry()
                .with(tracing::level_filters::LevelFilter::INFO)
                .with(fmt::Layer::default().with_writer(io::stderr))
                .init();
        }
        None
    };

    let filter = args
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid --filter regex")?;

    let facts_string = std::fs::read_to_string(&args.facts).with_context(|| {
        format!("Couldn't read facts file at {}", args.facts.display())
    })?;
    let facts = facts::Facts::from_json(&facts_string).context("Couldn't deserialize facts")?;

    let opts = Options {
        max_steps: args.max_steps,
        saturation_limit: None,
        verbose: args.verbose,
    };
    let analysis = facts::analyze(&facts, &opts).context("Propagation failed")?;
    let symbols = &analysis.symbols;

    if !args.quiet {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "var_points_to")?;
        writeln!(stdout, "-------------")?;
        for pt in analysis.state.points_to() {
            if let Some(re) = &filter {
                let name = symbols.name(Domain::Variable, pt.var.0).unwrap_or_default();
                if !re.is_match(name) {
                    continue;
                }
            }
            writeln!(stdout, "{}", symbols.show_points_to(&pt))?;
        }
        writeln!(stdout)?;
        writeln!(stdout, "field_points_to")?;
        writeln!(stdout, "---------------")?;
        for fpt in analysis.state.field_points_to_facts() {
            writeln!(stdout, "{}", symbols.show_field_points_to(&fpt))?;
        }
    }

    if args.debug {
        eprintln!("batches: {}", facts.batches().len());
        eprintln!("steps: {}", analysis.steps);
        eprintln!("alloc edges: {}", analysis.pag.alloc().len());
        eprintln!("simple edges: {}", analysis.pag.simple().len());
        eprintln!("store edges: {}", analysis.pag.store().len());
        eprintln!("load edges: {}", analysis.pag.load().len());
        eprintln!("var_points_to: {}", analysis.state.var_points_to().len());
        eprintln!("field_points_to: {}", analysis.state.field_points_to().len());
        eprintln!("emitted batches: {}", analysis.queue.batches().len());
        for (name, time) in times.report() {
            eprintln!("{name}: {} x, {:?}", time.count, time.total);
        }
    }

    if args.check {
        let expected = oracle::analysis(&analysis.pag, &analysis.transitions())
            .context("Reference evaluation failed")?;
        if &expected.var_points_to != analysis.state.var_points_to() {
            return Err(anyhow!(
                "var_points_to differs from the reference evaluation ({} vs. {} tuples)",
                analysis.state.var_points_to().len(),
                expected.var_points_to.len()
            ));
        }
        if &expected.field_points_to != analysis.state.field_points_to() {
            return Err(anyhow!(
                "field_points_to differs from the reference evaluation ({} vs. {} tuples)",
                analysis.state.field_points_to().len(),
                expected.field_points_to.len()
            ));
        }
    }

    Ok(())
}
