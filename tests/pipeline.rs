//! End-to-end tests of the deobfuscation pipeline.
//!
//! Every test builds parser records with the factories in `common`, imports them through
//! the public API and checks the rendered source plus the reported outcome.

mod common;

use std::collections::BTreeSet;

use common::*;
use macroscope::{
    deobfuscate,
    deobfuscation::{Deobfuscator, DeobfuscatorConfig, EventKind, Passes, Translator},
    emulation::{Evaluator, Interpreter, Value},
    module::Module,
    tree::{NodeKind, RawNode},
    Result,
};
use proptest::prelude::*;
use rustc_hash::FxHashMap;

fn only(passes: Passes) -> DeobfuscatorConfig {
    DeobfuscatorConfig::default().with_passes(passes)
}

/// `Function F(): F = 2 + 3 * (1 - 4): End Function`
fn constant_function(name: &str) -> RawNode {
    let difference = paren(binary(num(1), "'-'", num(4)));
    let product = binary(num(3), "'*'", difference);
    function(name, &[], vec![assign(name, binary(num(2), "'+'", product))])
}

#[test]
fn test_constant_folding_scenario() -> Result<()> {
    let streams = vec![stream(
        vec![],
        vec![],
        vec![
            constant_function("F"),
            sub("Main", &[], vec![call_stmt("MsgBox", vec![call("F", vec![])])]),
        ],
    )];

    let (source, result) = deobfuscate(&streams, &DeobfuscatorConfig::default())?;

    assert_eq!(source, "Sub Main()\nMsgBox -7\nEnd Sub\n");
    assert_eq!(result.removed.len(), 1);
    assert_eq!(result.translated, result.removed);
    assert_eq!(result.stats().calls_resolved, 1);
    assert!(result.events.has(EventKind::TranslationFailed));
    Ok(())
}

#[test]
fn test_constant_folding_from_json() -> Result<()> {
    let document = stream(
        vec![attribute("VB_Name", "Module1")],
        vec![],
        vec![
            constant_function("Key"),
            sub("AutoOpen", &[], vec![call_stmt("Shell", vec![call("Key", vec![])])]),
        ],
    );
    let json = serde_json::to_string(&document)?;

    let streams = RawNode::streams_from_json(&json)?;
    let (source, _) = deobfuscate(&streams, &DeobfuscatorConfig::default())?;

    assert_eq!(source, "Sub AutoOpen()\nShell -7\nEnd Sub\n");
    Ok(())
}

#[test]
fn test_inlining_scenario() -> Result<()> {
    let streams = vec![stream(
        vec![],
        vec![],
        vec![
            sub("Helper", &[], vec![assign("x", num(1))]),
            sub("Main", &[], vec![call_stmt("Helper", vec![])]),
        ],
    )];

    let (source, result) = deobfuscate(&streams, &only(Passes::INLINE))?;

    assert_eq!(source, "Sub Main()\nx = 1\nEnd Sub\n");
    assert_eq!(result.removed, vec!["Helper".to_string()]);
    assert_eq!(result.stats().procedures_inlined, 1);
    Ok(())
}

#[test]
fn test_array_literal_round_trip() -> Result<()> {
    let streams = vec![stream(
        vec![],
        vec![],
        vec![
            function("G", &[], vec![assign("G", call("Array", vec![num(1), num(2)]))]),
            sub(
                "Main",
                &[],
                vec![assign("x", call("G", vec![])), call_stmt("MsgBox", vec![var("x")])],
            ),
        ],
    )];

    let mut deobfuscator = Deobfuscator::new(Module::from_streams(&streams)?, only(Passes::RESOLVE));
    deobfuscator.run()?;

    let module = deobfuscator.module();
    let tree = module.tree();
    let main = module.procedure("Main").expect("Main is kept");
    let assignment = tree.find_all(main, NodeKind::LetStmt)[0];
    let value = tree
        .child_of_kind(assignment, NodeKind::ValueStmt)
        .expect("assignment has a value");
    assert_eq!(tree.render_text(value), "Array(1, 2)");
    assert!(!module.procedures().contains("G"));

    let code = Translator::new(tree).expression(value).expect("array literal lowers");
    let mut interpreter = Interpreter::default();
    let folded = interpreter.evaluate(&code, &FxHashMap::default())?;
    assert_eq!(folded, Value::List(vec![Value::Int(1), Value::Int(2)]));
    Ok(())
}

#[test]
fn test_select_case_fails_closed() -> Result<()> {
    let select = select_case(var("v"), vec![case(num(1), vec![assign("S", num(2))])]);
    let streams = vec![stream(
        vec![],
        vec![],
        vec![
            function("S", &["v"], vec![select]),
            sub(
                "Main",
                &[],
                vec![assign("x", call("S", vec![num(1)])), call_stmt("MsgBox", vec![var("x")])],
            ),
        ],
    )];

    let module = Module::from_streams(&streams)?;
    let node = module.procedure("S").expect("S is registered");
    assert!(Translator::new(module.tree()).procedure(node).is_err());

    let (source, result) = deobfuscate(&streams, &only(Passes::RESOLVE))?;
    assert!(source.contains("x = S(1)"), "{source}");
    assert!(!result.translated.contains(&"S".to_string()));
    assert!(result
        .events
        .filter_procedure("S")
        .any(|event| event.kind == EventKind::TranslationFailed));
    Ok(())
}

#[test]
fn test_rename_safety() -> Result<()> {
    let streams = vec![stream(
        vec![],
        vec![global("counter")],
        vec![
            function(
                "Twice",
                &["n"],
                vec![
                    assign("tmp", binary(var("n"), "'+'", var("n"))),
                    assign("Twice", var("tmp")),
                ],
            ),
            sub(
                "Main",
                &[],
                vec![assign("tmp", call("Twice", vec![num(2)])), assign("counter", var("tmp"))],
            ),
        ],
    )];

    let mut deobfuscator = Deobfuscator::new(Module::from_streams(&streams)?, only(Passes::IDENTIFIERS));
    deobfuscator.run()?;
    let module = deobfuscator.module();
    let tree = module.tree();

    let globals: BTreeSet<String> = module
        .variables()
        .names()
        .chain(module.procedures().names())
        .map(str::to_string)
        .collect();
    assert!(!globals.contains("counter"));
    assert!(!globals.contains("Twice"));
    assert!(globals.contains("Main"));

    let mut seen: BTreeSet<String> = BTreeSet::new();
    for (name, node) in module.procedures().iter() {
        let bound: BTreeSet<String> = tree
            .procedure_arguments(node)
            .into_iter()
            .chain(tree.local_variables(node))
            .filter(|local| local != name && !globals.contains(local))
            .collect();
        for local in &bound {
            assert!(local.starts_with('_'), "{local} was not renamed");
            assert!(seen.insert(local.clone()), "{local} is bound in two procedures");
        }
    }
    assert_eq!(seen.len(), 3);
    assert!(module.render().contains("Function "), "{}", module.render());
    Ok(())
}

#[test]
fn test_idempotence_modulo_renaming() -> Result<()> {
    let streams = vec![stream(
        vec![attribute("VB_Name", "ThisDocument")],
        vec![global("counter")],
        vec![
            function("Key", &[], vec![assign("Key", binary(num(10), "'-'", num(3)))]),
            sub(
                "Helper",
                &[],
                vec![assign("counter", binary(call("Key", vec![]), "'+'", num(1)))],
            ),
            sub(
                "AutoOpen",
                &[],
                vec![
                    dim("tmp"),
                    assign("tmp", num(5)),
                    call_stmt("Helper", vec![]),
                    call_stmt("MsgBox", vec![var("counter")]),
                ],
            ),
        ],
    )];

    let mut first = Deobfuscator::new(Module::from_streams(&streams)?, DeobfuscatorConfig::default());
    first.run()?;
    let once = first.module().render();
    assert!(once.contains(" = 8\n"), "{once}");
    assert_eq!(first.module().procedures().len(), 1);

    let module = first.module();
    let tree = module.tree();
    let exported = RawNode::rule(
        "module",
        module.forests().iter().map(|forest| tree.to_raw(*forest)).collect(),
    );

    let mut second = Deobfuscator::new(Module::from_streams(&[exported])?, DeobfuscatorConfig::default());
    let result = second.run()?;
    let twice = second.module().render();

    assert_eq!(normalize_names(&once), normalize_names(&twice));
    assert_eq!(result.stats().statements_removed, 0);
    assert_eq!(result.stats().procedures_removed, 0);
    Ok(())
}

#[test]
fn test_cosmetic_preset_keeps_names() -> Result<()> {
    let streams = vec![stream(
        vec![attribute("VB_Name", "Module1"), attribute("Custom", "kept")],
        vec![],
        vec![sub("Main", &[], vec![assign("x", binary(num(1), "'+'", num(2)))])],
    )];

    let (source, result) = deobfuscate(&streams, &DeobfuscatorConfig::minimal())?;

    assert_eq!(source, "Attribute Custom = \"kept\"\nSub Main()\nx = 3\nEnd Sub\n");
    assert_eq!(result.stats().attributes_removed, 1);
    assert_eq!(result.stats().constants_folded, 1);
    Ok(())
}

fn statement() -> impl Strategy<Value = (usize, Option<i64>, usize)> {
    (0usize..4, proptest::option::of(0i64..100), 0usize..4)
}

const NAMES: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

proptest! {
    #[test]
    fn prop_render_round_trips(
        lines in proptest::collection::vec(("[a-z][a-zA-Z0-9]{0,6}", 0i64..10_000, "[ \t]{1,3}"), 0..12)
    ) {
        let mut stmts = Vec::new();
        let mut expected = String::from("Sub P()\n");
        for (name, value, blank) in &lines {
            let target = r(
                "implicitCallStmt_InStmt",
                vec![r("iCS_S_VariableOrProcedureCall", vec![ident(name)])],
            );
            stmts.push(r(
                "blockStmt",
                vec![r("letStmt", vec![target, t("WS", blank), t("'='", "="), t("WS", blank), num(*value)])],
            ));
            expected.push_str(&format!("{name}{blank}={blank}{value}\n"));
        }
        expected.push_str("End Sub\n");

        let module = Module::from_streams(&[stream(vec![], vec![], vec![sub("P", &[], stmts)])]).unwrap();
        prop_assert_eq!(module.render(), expected);
    }

    #[test]
    fn prop_unread_locals_lose_their_stores(program in proptest::collection::vec(statement(), 1..10)) {
        let mut assigned = BTreeSet::new();
        let mut read = BTreeSet::new();
        let mut stmts = Vec::new();
        for (target, literal, source) in &program {
            let value = match literal {
                Some(value) => num(*value),
                None if assigned.contains(source) => {
                    read.insert(*source);
                    var(NAMES[*source])
                }
                None => num(0),
            };
            assigned.insert(*target);
            stmts.push(assign(NAMES[*target], value));
        }

        let streams = vec![stream(vec![], vec![], vec![sub("P", &[], stmts)])];
        let (source, _) = deobfuscate(&streams, &only(Passes::DEAD_CODE)).unwrap();

        for index in assigned.difference(&read) {
            let store = format!("{} = ", NAMES[*index]);
            prop_assert!(!source.lines().any(|line| line.starts_with(&store)), "{}", source);
        }
    }
}
