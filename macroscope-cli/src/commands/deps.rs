use std::path::Path;

use macroscope::analysis::DependencyAnalyzer;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_module,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct ProcedureOutput {
    name: String,
    calls: Vec<String>,
    globals: Vec<String>,
    unexplained: Vec<String>,
    callers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DepsOutput {
    procedure_count: usize,
    global_count: usize,
    unreferenced: Vec<String>,
    procedures: Vec<ProcedureOutput>,
}

pub fn run(path: &Path, unresolved: bool, global: &GlobalOptions) -> anyhow::Result<()> {
    let module = load_module(path)?;
    let graph = DependencyAnalyzer::new(&module).build_graph();

    let mut procedures = Vec::new();
    for (name, deps) in graph.procedures() {
        let (calls, globals): (Vec<String>, Vec<String>) = deps
            .classified
            .iter()
            .cloned()
            .partition(|dep| module.procedures().contains(dep));
        let callers = graph
            .callers(name)
            .map(|callers| callers.iter().cloned().collect())
            .unwrap_or_default();

        procedures.push(ProcedureOutput {
            name: name.to_string(),
            calls,
            globals,
            unexplained: deps.unexplained().map(str::to_string).collect(),
            callers,
        });
    }

    let output = DepsOutput {
        procedure_count: module.procedures().len(),
        global_count: module.variables().len(),
        unreferenced: graph
            .procedures()
            .map(|(name, _)| name)
            .filter(|name| !graph.is_referenced(name))
            .map(str::to_string)
            .collect(),
        procedures,
    };

    print_output(&output, global, |output| {
        if unresolved {
            display_unresolved(output);
        } else {
            display_graph(output);
        }
    })
}

fn display_graph(output: &DepsOutput) {
    println!(
        "{} procedures, {} globals",
        output.procedure_count, output.global_count
    );
    println!();

    let mut tw = TabWriter::new(vec![
        ("Procedure", Align::Left),
        ("Calls", Align::Left),
        ("Globals", Align::Left),
        ("Callers", Align::Right),
    ]);
    for procedure in &output.procedures {
        tw.row(vec![
            procedure.name.clone(),
            join_or_dash(&procedure.calls),
            join_or_dash(&procedure.globals),
            procedure.callers.len().to_string(),
        ]);
    }
    tw.print();

    if !output.unreferenced.is_empty() {
        println!();
        println!("Entry points: {}", output.unreferenced.join(", "));
    }
}

fn display_unresolved(output: &DepsOutput) {
    let mut tw = TabWriter::new(vec![("Procedure", Align::Left), ("Unexplained", Align::Left)]);
    for procedure in output.procedures.iter().filter(|p| !p.unexplained.is_empty()) {
        tw.row(vec![procedure.name.clone(), procedure.unexplained.join(", ")]);
    }
    tw.print();
}

fn join_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}
