use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use macroscope::{
    deobfuscate,
    deobfuscation::{DeobfuscationResult, DeobfuscatorConfig, Passes},
};
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{file_display_name, load_streams},
};

#[derive(Debug, Serialize)]
struct DeobfuscationReport {
    file: String,
    source: String,
    iterations: usize,
    time_ms: u128,
    translated: Vec<String>,
    removed: Vec<String>,
    unresolved: Vec<UnresolvedReport>,
    stats: StatsReport,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct UnresolvedReport {
    procedure: String,
    dependencies: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    attributes_removed: usize,
    constants_folded: usize,
    identifiers_renamed: usize,
    statements_removed: usize,
    procedures_translated: usize,
    calls_resolved: usize,
    procedures_inlined: usize,
    procedures_removed: usize,
    failures: usize,
    transformations: usize,
    diagnostics: usize,
}

pub struct DeobfuscateOptions<'a> {
    pub minimal: bool,
    pub skip: &'a [String],
    pub max_iterations: Option<usize>,
    pub max_steps: Option<u64>,
    pub detailed: bool,
    pub global: &'a GlobalOptions,
}

pub fn run(paths: &[PathBuf], opts: &DeobfuscateOptions) -> anyhow::Result<()> {
    let config = build_config(opts)?;

    let outcomes: Vec<anyhow::Result<DeobfuscationReport>> = paths
        .par_iter()
        .map(|path| process_file(path, &config))
        .collect();

    let mut reports = Vec::new();
    let mut fail_count = 0;
    for (path, outcome) in paths.iter().zip(outcomes) {
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                fail_count += 1;
                eprintln!("{}: {e:#}", file_display_name(path));
            }
        }
    }

    if opts.global.json {
        let json = serde_json::to_string_pretty(&reports)?;
        println!("{json}");
    } else {
        for report in &reports {
            if paths.len() > 1 {
                println!("' ==== {} ====", report.file);
            }
            print!("{}", report.source);
            if !report.source.ends_with('\n') {
                println!();
            }
            display_outcome(report, opts.detailed);
        }
    }

    if fail_count > 0 {
        bail!("{fail_count} of {} files failed", paths.len());
    }
    Ok(())
}

fn process_file(path: &Path, config: &DeobfuscatorConfig) -> anyhow::Result<DeobfuscationReport> {
    let streams = load_streams(path)?;
    let (source, result) = deobfuscate(&streams, config)
        .with_context(|| format!("deobfuscation failed: {}", path.display()))?;
    Ok(build_report(path, source, &result))
}

fn build_config(opts: &DeobfuscateOptions) -> anyhow::Result<DeobfuscatorConfig> {
    let mut config = if opts.minimal {
        DeobfuscatorConfig::minimal()
    } else {
        DeobfuscatorConfig::default()
    };

    for name in opts.skip {
        let Some(pass) = pass_by_name(name) else {
            bail!("unknown pass '{name}'; expected attributes, arithmetic, whitespace, identifiers, dead-code, resolve or inline");
        };
        config = config.without(pass);
    }
    if let Some(iters) = opts.max_iterations {
        config = config.with_max_iterations(iters);
    }
    if let Some(steps) = opts.max_steps {
        config.limits.max_steps = steps;
    }

    Ok(config)
}

fn pass_by_name(name: &str) -> Option<Passes> {
    let pass = match name.trim().to_ascii_lowercase().as_str() {
        "attributes" => Passes::ATTRIBUTES,
        "arithmetic" => Passes::ARITHMETIC,
        "whitespace" => Passes::WHITESPACE,
        "identifiers" => Passes::IDENTIFIERS,
        "dead-code" => Passes::DEAD_CODE,
        "resolve" => Passes::RESOLVE,
        "inline" => Passes::INLINE,
        _ => return None,
    };
    Some(pass)
}

fn build_report(input: &Path, source: String, result: &DeobfuscationResult) -> DeobfuscationReport {
    let derived = result.stats();
    let warnings: Vec<String> = result
        .events
        .warnings()
        .map(|ev| ev.message.clone())
        .collect();

    DeobfuscationReport {
        file: file_display_name(input),
        source,
        iterations: result.iterations,
        time_ms: result.total_time.as_millis(),
        translated: result.translated.clone(),
        removed: result.removed.clone(),
        unresolved: result
            .unresolved
            .iter()
            .map(|(procedure, deps)| UnresolvedReport {
                procedure: procedure.clone(),
                dependencies: deps.iter().cloned().collect(),
            })
            .collect(),
        stats: StatsReport {
            attributes_removed: derived.attributes_removed,
            constants_folded: derived.constants_folded,
            identifiers_renamed: derived.identifiers_renamed,
            statements_removed: derived.statements_removed,
            procedures_translated: derived.procedures_translated,
            calls_resolved: derived.calls_resolved,
            procedures_inlined: derived.procedures_inlined,
            procedures_removed: derived.procedures_removed,
            failures: derived.failures,
            transformations: result.events.transformation_count(),
            diagnostics: result.events.diagnostics().count(),
        },
        warnings,
    }
}

fn display_outcome(report: &DeobfuscationReport, detailed: bool) {
    let s = &report.stats;
    #[allow(clippy::cast_precision_loss)]
    let time_secs = report.time_ms as f64 / 1000.0;
    eprintln!(
        "Deobfuscation complete: {} ({time_secs:.2}s, {} transformations, {} diagnostics)",
        report.file, s.transformations, s.diagnostics
    );

    if s.attributes_removed > 0 || s.identifiers_renamed > 0 {
        eprintln!(
            "  Cosmetic:    {} attributes removed, {} identifiers renamed",
            s.attributes_removed, s.identifiers_renamed
        );
    }
    if s.constants_folded > 0 || s.calls_resolved > 0 {
        eprintln!(
            "  Folded:      {} constants, {} calls",
            s.constants_folded, s.calls_resolved
        );
    }
    if s.statements_removed > 0 || s.procedures_removed > 0 {
        eprintln!(
            "  Dead code:   {} statements, {} procedures removed",
            s.statements_removed, s.procedures_removed
        );
    }
    if s.procedures_inlined > 0 {
        eprintln!("  Inlined:     {} procedures", s.procedures_inlined);
    }

    if detailed {
        if !report.translated.is_empty() {
            eprintln!("  Translated:  {}", report.translated.join(", "));
        }
        for entry in &report.unresolved {
            eprintln!("  Unresolved:  {} -> {}", entry.procedure, entry.dependencies.join(", "));
        }
    }

    if !report.warnings.is_empty() {
        eprintln!("  Warnings:    {}", report.warnings.len());
        for w in &report.warnings {
            eprintln!("    - {w}");
        }
    }
}
