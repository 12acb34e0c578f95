//! Parser-shaped record factories shared by the integration tests and benchmarks.
//!
//! Every helper returns the [`RawNode`] the external grammar emits for the construct, so
//! tests exercise exactly the import path real input takes.

#![allow(dead_code)]

use macroscope::tree::RawNode;

pub fn t(name: &str, value: &str) -> RawNode {
    RawNode::terminal(name, value)
}

pub fn r(name: &str, children: Vec<RawNode>) -> RawNode {
    RawNode::rule(name, children)
}

pub fn ws() -> RawNode {
    t("WS", " ")
}

pub fn end_of_line() -> RawNode {
    r("endOfLine", vec![t("NEWLINE", "\n")])
}

pub fn end_of_statement() -> RawNode {
    r("endOfStatement", vec![end_of_line()])
}

pub fn ident(name: &str) -> RawNode {
    r("ambiguousIdentifier", vec![t("IDENTIFIER", name)])
}

// Expressions

pub fn num(value: i64) -> RawNode {
    r("valueStmt", vec![r("literal", vec![t("SHORTLITERAL", &value.to_string())])])
}

pub fn string(value: &str) -> RawNode {
    let text = format!("\"{}\"", value.replace('"', "\"\""));
    r("valueStmt", vec![r("literal", vec![t("STRINGLITERAL", &text)])])
}

pub fn var(name: &str) -> RawNode {
    r(
        "valueStmt",
        vec![r(
            "implicitCallStmt_InStmt",
            vec![r("iCS_S_VariableOrProcedureCall", vec![ident(name)])],
        )],
    )
}

fn args_call(args: Vec<RawNode>) -> RawNode {
    let mut children = Vec::new();
    for (index, arg) in args.into_iter().enumerate() {
        if index > 0 {
            children.push(t("','", ","));
            children.push(ws());
        }
        children.push(r("argCall", vec![arg]));
    }
    r("argsCall", children)
}

pub fn call(name: &str, args: Vec<RawNode>) -> RawNode {
    let mut children = vec![ident(name), t("'('", "(")];
    if !args.is_empty() {
        children.push(args_call(args));
    }
    children.push(t("')'", ")"));
    r(
        "valueStmt",
        vec![r("implicitCallStmt_InStmt", vec![r("iCS_S_ProcedureOrArrayCall", children)])],
    )
}

/// `left op right`, where `op` is the token display name such as `'+'`.
pub fn binary(left: RawNode, op: &str, right: RawNode) -> RawNode {
    let text = op.trim_matches('\'');
    r("valueStmt", vec![left, ws(), t(op, text), ws(), right])
}

pub fn paren(inner: RawNode) -> RawNode {
    r("valueStmt", vec![t("'('", "("), inner, t("')'", ")")])
}

// Statements

pub fn assign(name: &str, value: RawNode) -> RawNode {
    let target = r(
        "implicitCallStmt_InStmt",
        vec![r("iCS_S_VariableOrProcedureCall", vec![ident(name)])],
    );
    r(
        "blockStmt",
        vec![r("letStmt", vec![target, ws(), t("'='", "="), ws(), value])],
    )
}

pub fn call_stmt(name: &str, args: Vec<RawNode>) -> RawNode {
    let mut children = vec![r("certainIdentifier", vec![t("IDENTIFIER", name)])];
    if !args.is_empty() {
        children.push(ws());
        children.push(args_call(args));
    }
    r(
        "blockStmt",
        vec![r(
            "implicitCallStmt_InBlock",
            vec![r("iCS_B_ProcedureCall", children)],
        )],
    )
}

fn variable(name: &str) -> RawNode {
    r(
        "variableStmt",
        vec![
            t("DIM", "Dim"),
            ws(),
            r("variableListStmt", vec![r("variableSubStmt", vec![ident(name)])]),
        ],
    )
}

pub fn dim(name: &str) -> RawNode {
    r("blockStmt", vec![variable(name)])
}

pub fn select_case(value: RawNode, cases: Vec<RawNode>) -> RawNode {
    let mut children = vec![t("SELECT", "Select"), ws(), t("CASE", "Case"), ws(), value, end_of_statement()];
    children.extend(cases);
    children.push(t("END_SELECT", "End Select"));
    r("blockStmt", vec![r("selectCaseStmt", children)])
}

pub fn case(value: RawNode, stmts: Vec<RawNode>) -> RawNode {
    let mut children = vec![t("CASE", "Case"), ws(), r("sC_Cond", vec![value]), end_of_statement()];
    if let Some(block) = block(stmts) {
        children.push(block);
    }
    r("sC_Case", children)
}

pub fn block(stmts: Vec<RawNode>) -> Option<RawNode> {
    if stmts.is_empty() {
        return None;
    }
    let mut children = Vec::new();
    for stmt in stmts {
        children.push(stmt);
        children.push(end_of_statement());
    }
    Some(r("block", children))
}

// Procedures and module sections

fn procedure(kind: &str, name: &str, args: &[&str], stmts: Vec<RawNode>) -> RawNode {
    let (keyword, keyword_text, end, end_text) = if kind == "subStmt" {
        ("SUB", "Sub", "END_SUB", "End Sub")
    } else {
        ("FUNCTION", "Function", "END_FUNCTION", "End Function")
    };

    let mut list = vec![t("'('", "(")];
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            list.push(t("','", ","));
            list.push(ws());
        }
        list.push(r("arg", vec![ident(arg)]));
    }
    list.push(t("')'", ")"));

    let mut children = vec![t(keyword, keyword_text), ws(), ident(name), r("argList", list), end_of_statement()];
    if let Some(block) = block(stmts) {
        children.push(block);
    }
    children.push(t(end, end_text));
    r(kind, children)
}

pub fn sub(name: &str, args: &[&str], stmts: Vec<RawNode>) -> RawNode {
    procedure("subStmt", name, args, stmts)
}

pub fn function(name: &str, args: &[&str], stmts: Vec<RawNode>) -> RawNode {
    procedure("functionStmt", name, args, stmts)
}

pub fn attribute(name: &str, value: &str) -> RawNode {
    let target = r(
        "implicitCallStmt_InStmt",
        vec![r("iCS_S_VariableOrProcedureCall", vec![ident(name)])],
    );
    r(
        "attributeStmt",
        vec![
            t("ATTRIBUTE", "Attribute"),
            ws(),
            target,
            ws(),
            t("'='", "="),
            ws(),
            r("literal", vec![t("STRINGLITERAL", &format!("\"{value}\""))]),
        ],
    )
}

pub fn global(name: &str) -> RawNode {
    variable(name)
}

/// One `startRule` stream holding the three sections.
pub fn stream(attributes: Vec<RawNode>, declarations: Vec<RawNode>, procedures: Vec<RawNode>) -> RawNode {
    let mut attrs = Vec::new();
    for attribute in attributes {
        attrs.push(attribute);
        attrs.push(end_of_line());
    }
    let mut decls = Vec::new();
    for declaration in declarations {
        decls.push(r("moduleDeclarationsElement", vec![declaration]));
        decls.push(end_of_line());
    }
    let mut body = Vec::new();
    for procedure in procedures {
        body.push(r("moduleBodyElement", vec![procedure]));
        body.push(end_of_line());
    }

    r(
        "startRule",
        vec![
            r(
                "module",
                vec![
                    r("moduleAttributes", attrs),
                    r("moduleDeclarations", decls),
                    r("moduleBody", body),
                ],
            ),
            t("EOF", "<EOF>"),
        ],
    )
}

/// Replaces every generated `_x_` / `_xy_` name by a positional placeholder, so two
/// renderings can be compared modulo renaming.
pub fn normalize_names(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut seen: Vec<String> = Vec::new();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let boundary = i == 0 || !(chars[i - 1].is_alphanumeric() || chars[i - 1] == '_');
        if boundary && chars[i] == '_' {
            let letters = chars[i + 1..].iter().take_while(|c| c.is_ascii_alphabetic()).count();
            let end = i + 1 + letters;
            let closed = chars.get(end) == Some(&'_');
            let followed = chars.get(end + 1).map_or(true, |c| !(c.is_alphanumeric() || *c == '_'));
            if (1..=2).contains(&letters) && closed && followed {
                let name: String = chars[i..=end].iter().collect();
                let index = match seen.iter().position(|n| *n == name) {
                    Some(index) => index,
                    None => {
                        seen.push(name);
                        seen.len() - 1
                    }
                };
                out.push_str(&format!("<v{index}>"));
                i = end + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}
