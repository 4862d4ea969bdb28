// Copyright 2025 Cornell University
// released under MIT License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::logic::{BinOp, Expr, ExprId, Module, UnaryOp};

/// Rewrites a formula into a semantically equivalent one whose top-level
/// boolean structure is conjunctive: double negation is dropped, negation
/// is pushed through `or` and `implies`, and members of a conjunction are
/// normalized recursively. Everything else passes through unchanged.
pub fn normalize(module: &mut Module, expr: ExprId) -> ExprId {
    match module[expr].clone() {
        Expr::Unary(UnaryOp::Not, inner) => normalize_negation(module, inner),
        Expr::And(conjuncts) => {
            let conjuncts = conjuncts
                .into_iter()
                .map(|c| normalize(module, c))
                .collect();
            module.e(Expr::And(conjuncts))
        }
        Expr::Binary(BinOp::And, lhs, rhs) => {
            let lhs = normalize(module, lhs);
            let rhs = normalize(module, rhs);
            module.e(Expr::Binary(BinOp::And, lhs, rhs))
        }
        _ => expr,
    }
}

fn normalize_negation(module: &mut Module, inner: ExprId) -> ExprId {
    match module[inner].clone() {
        // !!a  =>  a
        Expr::Unary(UnaryOp::Not, e) => normalize(module, e),
        // !(a || b)  =>  !a && !b
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            let not_lhs = module.not(lhs);
            let not_lhs = normalize(module, not_lhs);
            let not_rhs = module.not(rhs);
            let not_rhs = normalize(module, not_rhs);
            module.and(vec![not_lhs, not_rhs])
        }
        // !(a => b)  =>  a && !b
        Expr::Binary(BinOp::Implies, lhs, rhs) => {
            let lhs = normalize(module, lhs);
            let not_rhs = module.not(rhs);
            let not_rhs = normalize(module, not_rhs);
            module.and(vec![lhs, not_rhs])
        }
        _ => module.not(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negated_disjunction_becomes_conjunction() {
        let mut m = Module::new();
        let a = m.var("a");
        let b = m.var("b");
        let x = m.var("x");
        let y = m.var("y");
        let ab = m.equal(a, b);
        let xy = m.equal(x, y);
        let disj = m.or(ab, xy);
        let neg = m.not(disj);

        let norm = normalize(&mut m, neg);
        match &m[norm] {
            Expr::And(cs) => {
                assert_eq!(cs.len(), 2);
                assert_eq!(m[cs[0]], Expr::Unary(UnaryOp::Not, ab));
                assert_eq!(m[cs[1]], Expr::Unary(UnaryOp::Not, xy));
            }
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[test]
    fn double_negation_is_dropped() {
        let mut m = Module::new();
        let a = m.var("a");
        let b = m.var("b");
        let eq = m.equal(a, b);
        let neg = m.not(eq);
        let negneg = m.not(neg);
        assert_eq!(normalize(&mut m, negneg), eq);
    }

    #[test]
    fn negated_implication_keeps_antecedent() {
        let mut m = Module::new();
        let a = m.var("a");
        let b = m.var("b");
        let x = m.var("x");
        let y = m.var("y");
        let ab = m.equal(a, b);
        let xy = m.equal(x, y);
        let imp = m.implies(ab, xy);
        let neg = m.not(imp);

        let norm = normalize(&mut m, neg);
        match &m[norm] {
            Expr::And(cs) => {
                assert_eq!(cs.len(), 2);
                assert_eq!(cs[0], ab);
                assert_eq!(m[cs[1]], Expr::Unary(UnaryOp::Not, xy));
            }
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[test]
    fn non_boolean_nodes_pass_through() {
        let mut m = Module::new();
        let a = m.var("a");
        let always = m.always(a);
        assert_eq!(normalize(&mut m, always), always);
        let t = m.expr_true();
        assert_eq!(normalize(&mut m, t), t);
    }
}
