// Copyright 2025 Cornell University
// released under MIT License
// author: Kevin Laeufer <laeufer@cornell.edu>

use std::io::Write;

use crate::logic::{BinOp, Expr, ExprId, Module, ParamDecl, Quant, SigId, SigParent, UnaryOp};

/// Serializes the whole module in declaration order: signatures (with
/// their fields inline), then predicates, then facts.
pub fn serialize_module(out: &mut impl Write, module: &Module) -> std::io::Result<()> {
    for sig_id in module.sig_ids() {
        serialize_sig(out, module, sig_id)?;
    }
    for pred_id in module.pred_ids() {
        let pred = &module[pred_id];
        let visibility = if pred.exported { "" } else { "private " };
        if pred.params.is_empty() {
            writeln!(
                out,
                "{}pred {} {{ {} }}",
                visibility,
                pred.name.display(),
                serialize_expr(module, &pred.body)
            )?;
        } else {
            writeln!(
                out,
                "{}pred {} [{}] {{ {} }}",
                visibility,
                pred.name.display(),
                serialize_decls(module, &pred.params),
                serialize_expr(module, &pred.body)
            )?;
        }
    }
    for fact_id in module.fact_ids() {
        let fact = &module[fact_id];
        writeln!(
            out,
            "fact {} {{ {} }}",
            fact.name,
            serialize_expr(module, &fact.body)
        )?;
    }
    Ok(())
}

pub fn serialize_to_string(module: &Module) -> std::io::Result<String> {
    let mut out = Vec::new();
    serialize_module(&mut out, module)?;
    let out = String::from_utf8(out).expect("serializer emits valid utf-8");
    Ok(out)
}

fn serialize_sig(out: &mut impl Write, module: &Module, sig_id: SigId) -> std::io::Result<()> {
    let sig = &module[sig_id];
    let mut header = String::new();
    if !sig.exported {
        header.push_str("private ");
    }
    if sig.is_abstract {
        header.push_str("abstract ");
    }
    if sig.is_one {
        header.push_str("one ");
    }
    header.push_str("sig ");
    header.push_str(&sig.name.display());
    match &sig.parent {
        SigParent::Top => {}
        SigParent::Extends(parent) => {
            header.push_str(" extends ");
            header.push_str(&module[parent].name.display());
        }
        SigParent::Subset(members) => {
            header.push_str(" in ");
            let names: Vec<String> = members
                .iter()
                .map(|member| module[member].name.display())
                .collect();
            header.push_str(&names.join(" + "));
        }
    }

    let fields = module.fields_of(sig_id);
    if fields.is_empty() {
        writeln!(out, "{header} {{}}")?;
    } else {
        let rendered: Vec<String> = fields
            .iter()
            .map(|f| {
                let field = &module[f];
                let var = if field.variable { "var " } else { "" };
                format!("{var}{}: {}", field.name, serialize_expr(module, &field.value))
            })
            .collect();
        writeln!(out, "{header} {{ {} }}", rendered.join(", "))?;
    }
    Ok(())
}

fn serialize_decls(module: &Module, decls: &[ParamDecl]) -> String {
    decls
        .iter()
        .map(|d| format!("{}: {}", d.names.join(", "), expr_prec(module, d.ty, 0)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn serialize_expr(module: &Module, expr_id: &ExprId) -> String {
    expr_prec(module, *expr_id, 0)
}

// precedence levels, higher binds tighter
const PREC_QUANT: u8 = 0;
const PREC_IMPLIES: u8 = 1;
const PREC_OR: u8 = 2;
const PREC_AND: u8 = 3;
const PREC_UNARY: u8 = 4;
const PREC_COMPARE: u8 = 5;
const PREC_UNION: u8 = 6;
const PREC_PRODUCT: u8 = 7;
const PREC_JOIN: u8 = 8;
const PREC_PRIME: u8 = 9;
const PREC_ATOM: u8 = 10;

fn expr_prec(module: &Module, expr_id: ExprId, min_prec: u8) -> String {
    let (rendered, prec) = render(module, expr_id);
    if prec < min_prec {
        format!("({rendered})")
    } else {
        rendered
    }
}

fn render(module: &Module, expr_id: ExprId) -> (String, u8) {
    match &module[expr_id] {
        Expr::True => ("true".to_string(), PREC_ATOM),
        Expr::False => ("false".to_string(), PREC_ATOM),
        Expr::NoneSet => ("none".to_string(), PREC_ATOM),
        Expr::Sig(sig) => (module[sig].name.display(), PREC_ATOM),
        Expr::Field(field) => (module[field].name.clone(), PREC_ATOM),
        Expr::Var(name) => (name.clone(), PREC_ATOM),
        Expr::Call(pred, args) => {
            let name = module[pred].name.display();
            if args.is_empty() {
                (name, PREC_ATOM)
            } else {
                let args: Vec<String> = args
                    .iter()
                    .map(|a| expr_prec(module, *a, PREC_QUANT))
                    .collect();
                (format!("{name}[{}]", args.join(", ")), PREC_ATOM)
            }
        }
        Expr::Unary(UnaryOp::Not, inner) => (
            format!("!{}", expr_prec(module, *inner, PREC_ATOM)),
            PREC_UNARY,
        ),
        Expr::Unary(UnaryOp::Prime, inner) => (
            format!("{}'", expr_prec(module, *inner, PREC_ATOM)),
            PREC_PRIME,
        ),
        Expr::Unary(op, inner) => {
            let keyword = match op {
                UnaryOp::After => "after",
                UnaryOp::Always => "always",
                UnaryOp::Eventually => "eventually",
                UnaryOp::Historically => "historically",
                UnaryOp::Once => "once",
                UnaryOp::Previous => "previous",
                UnaryOp::Not | UnaryOp::Prime => unreachable!("handled above"),
            };
            (
                format!("{keyword} {}", expr_prec(module, *inner, PREC_COMPARE)),
                PREC_UNARY,
            )
        }
        Expr::Binary(BinOp::Join, lhs, rhs) => {
            let lhs = expr_prec(module, *lhs, PREC_JOIN);
            let rhs = expr_prec(module, *rhs, PREC_PRIME);
            (format!("{lhs}.{rhs}"), PREC_JOIN)
        }
        Expr::Binary(op, lhs, rhs) => {
            let (symbol, prec) = match op {
                BinOp::And => ("&&", PREC_AND),
                BinOp::Or => ("||", PREC_OR),
                BinOp::Implies => ("=>", PREC_IMPLIES),
                BinOp::Equal => ("=", PREC_COMPARE),
                BinOp::In => ("in", PREC_COMPARE),
                BinOp::Product => ("->", PREC_PRODUCT),
                BinOp::ArrowOne => ("-> one", PREC_PRODUCT),
                BinOp::Union => ("+", PREC_UNION),
                BinOp::Until => ("until", PREC_OR),
                BinOp::Since => ("since", PREC_OR),
                BinOp::Release => ("releases", PREC_OR),
                BinOp::Join => unreachable!("handled above"),
            };
            let lhs = expr_prec(module, *lhs, prec);
            let rhs = expr_prec(module, *rhs, prec + 1);
            (format!("{lhs} {symbol} {rhs}"), prec)
        }
        Expr::And(conjuncts) => {
            if conjuncts.is_empty() {
                ("true".to_string(), PREC_ATOM)
            } else {
                let parts: Vec<String> = conjuncts
                    .iter()
                    .map(|c| expr_prec(module, *c, PREC_UNARY))
                    .collect();
                (parts.join(" && "), PREC_AND)
            }
        }
        Expr::Quant(quant, decls, body) => {
            let keyword = match quant {
                Quant::All => "all",
                Quant::Some => "some",
            };
            (
                format!(
                    "{keyword} {} | {}",
                    serialize_decls(module, decls),
                    expr_prec(module, *body, PREC_QUANT)
                ),
                PREC_QUANT,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use insta::Settings;

    use super::*;
    use crate::logic::{PredName, SigName};
    use crate::registry::ActionRegistry;

    fn snap(name: &str, content: String) {
        let mut settings = Settings::clone_current();
        settings.set_snapshot_path(Path::new("../tests/snapshots"));
        settings.bind(|| {
            insta::assert_snapshot!(name, content);
        });
    }

    fn sig(m: &mut Module, name: &str) -> SigId {
        m.add_sig(
            SigName::User(name.to_string()),
            SigParent::Top,
            false,
            false,
            true,
        )
    }

    #[test]
    fn precedence_inserts_parentheses_only_where_needed() {
        let mut m = Module::new();
        let a = m.var("a");
        let b = m.var("b");
        let c = m.var("c");

        // product chains stay flat
        let ab = m.product(a, b);
        let abc = m.product(ab, c);
        assert_eq!(serialize_expr(&m, &abc), "a -> b -> c");

        // a union inside a product is parenthesized
        let bc = m.union(b, c);
        let a_bc = m.product(a, bc);
        assert_eq!(serialize_expr(&m, &a_bc), "a -> (b + c)");

        // negation wraps non-atomic operands
        let eq = m.equal(a, b);
        let neg = m.not(eq);
        assert_eq!(serialize_expr(&m, &neg), "!(a = b)");

        // primes attach to the atom
        let primed = m.prime(a);
        let changed = m.equal(a, primed);
        assert_eq!(serialize_expr(&m, &changed), "a = a'");
    }

    #[test]
    fn conjunction_and_quantifier_rendering() {
        let mut m = Module::new();
        let counter = sig(&mut m, "Counter");
        let a = m.var("a");
        let b = m.var("b");
        let eq = m.equal(a, b);
        let conj = m.and(vec![eq, eq]);
        assert_eq!(serialize_expr(&m, &conj), "a = b && a = b");

        let counter_ref = m.sig_expr(counter);
        let all = m.forall(vec![ParamDecl::new("p", counter_ref)], conj);
        assert_eq!(serialize_expr(&m, &all), "all p: Counter | a = b && a = b");

        let always = m.always(all);
        assert_eq!(
            serialize_expr(&m, &always),
            "always (all p: Counter | a = b && a = b)"
        );
    }

    #[test]
    fn calls_render_with_and_without_arguments() {
        let mut m = Module::new();
        let t = m.expr_true();
        let p0 = m.add_pred(PredName::Event("Reset".to_string()), vec![], t, true);
        let counter = sig(&mut m, "Counter");
        let counter_ref = m.sig_expr(counter);
        let p1 = m.add_pred(
            PredName::Guard("Inc".to_string()),
            vec![ParamDecl::new("p", counter_ref)],
            t,
            false,
        );

        let bare = m.call(p0, vec![]);
        assert_eq!(serialize_expr(&m, &bare), "Reset");
        let x = m.var("x");
        let applied = m.call(p1, vec![x]);
        assert_eq!(serialize_expr(&m, &applied), "guard_Inc[x]");
    }

    #[test]
    fn sig_headers_carry_attributes_and_hierarchy() {
        let mut m = Module::new();
        let root = m.add_sig(SigName::ActionRoot, SigParent::Top, true, false, false);
        m.add_sig(
            SigName::Marker("Inc".to_string()),
            SigParent::Extends(root),
            false,
            true,
            false,
        );
        let counter = sig(&mut m, "Counter");
        let placeholder = m.add_sig(SigName::Placeholder, SigParent::Top, false, true, false);
        m.add_sig(
            SigName::ArgUnion,
            SigParent::Subset(vec![placeholder, counter]),
            false,
            false,
            false,
        );

        let out = serialize_to_string(&m).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "private abstract sig Action {}");
        assert_eq!(lines[1], "private one sig _Inc extends Action {}");
        assert_eq!(lines[2], "sig Counter {}");
        assert_eq!(lines[3], "private one sig Placeholder {}");
        assert_eq!(lines[4], "private sig Arg in Placeholder + Counter {}");
    }

    #[test]
    fn full_theory_for_two_actions() {
        let mut m = Module::new();
        let mut reg = ActionRegistry::new(&mut m);
        let counter = sig(&mut m, "Counter");
        let value = sig(&mut m, "Value");

        let t = m.expr_true();
        reg.register(&mut m, "Reset", vec![], t, &["val"]).unwrap();

        let val = m.var("val");
        let primed = m.prime(val);
        let p = m.var("p");
        let body = m.equal(primed, p);
        let counter_ref = m.sig_expr(counter);
        let value_ref = m.sig_expr(value);
        reg.register(
            &mut m,
            "Inc",
            vec![
                ParamDecl::new("p", counter_ref),
                ParamDecl::new("v", value_ref),
            ],
            body,
            &["val"],
        )
        .unwrap();
        reg.finalize(&mut m);

        snap("two_action_theory", serialize_to_string(&m).unwrap());
    }
}
