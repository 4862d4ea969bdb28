// Copyright 2025 Cornell University
// released under MIT License
// author: Kevin Laeufer <laeufer@cornell.edu>

use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};
use rustc_hash::FxHashMap;
use std::ops::Index;

/// Identity of a signature. Synthesized signatures carry a structured key
/// instead of a pre-formatted string; display names are resolved by the
/// serializer and nowhere else.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum SigName {
    /// A user-declared signature.
    User(String),
    /// The abstract root type of all action markers.
    ActionRoot,
    /// The singleton used to pad argument lists to the maximum arity.
    Placeholder,
    /// The union of the placeholder and every action parameter type.
    ArgUnion,
    /// The singleton holding the mutable event witness field.
    EventHolder,
    /// The singleton marker identifying one action.
    Marker(String),
}

impl SigName {
    pub fn display(&self) -> String {
        match self {
            SigName::User(name) => name.clone(),
            SigName::ActionRoot => "Action".to_string(),
            SigName::Placeholder => "Placeholder".to_string(),
            SigName::ArgUnion => "Arg".to_string(),
            SigName::EventHolder => "Events".to_string(),
            SigName::Marker(action) => format!("_{action}"),
        }
    }
}

/// Identity of a predicate.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum PredName {
    User(String),
    /// The state-only part of an action's body.
    Guard(String),
    /// The transition part of an action's body.
    Effect(String),
    /// The generic firing predicate over the event witness.
    Fired,
    /// The zero-argument convenience predicate named after an action.
    Event(String),
}

impl PredName {
    pub fn display(&self) -> String {
        match self {
            PredName::User(name) => name.clone(),
            PredName::Guard(action) => format!("guard_{action}"),
            PredName::Effect(action) => format!("effect_{action}"),
            PredName::Fired => "fired".to_string(),
            PredName::Event(action) => action.clone(),
        }
    }
}

#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct SigId(u32);
entity_impl!(SigId, "sig");

#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct FieldId(u32);
entity_impl!(FieldId, "field");

#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct PredId(u32);
entity_impl!(PredId, "pred");

#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct FactId(u32);
entity_impl!(FactId, "fact");

#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct ExprId(u32);
entity_impl!(ExprId, "expr");

/// Where a signature sits in the type hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigParent {
    /// A top-level signature.
    Top,
    /// An extension (exclusive subtype) of another signature.
    Extends(SigId),
    /// A subset of the union of the listed signatures.
    Subset(Vec<SigId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sig {
    pub name: SigName,
    pub parent: SigParent,
    pub is_abstract: bool,
    pub is_one: bool,
    pub exported: bool,
}

/// A relation declared on a signature. `variable` marks a relation whose
/// value may differ between time steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub owner: SigId,
    pub value: ExprId,
    pub variable: bool,
}

/// A parameter declaration binding one or more names to a type expression.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ParamDecl {
    pub names: Vec<String>,
    pub ty: ExprId,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: ExprId) -> Self {
        Self {
            names: vec![name.into()],
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pred {
    pub name: PredName,
    pub params: Vec<ParamDecl>,
    pub body: ExprId,
    pub exported: bool,
}

/// A standing axiom. Facts hold at every time step of a trace, not just
/// the initial one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub name: String,
    pub body: ExprId,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    /// The next-state value of an expression.
    Prime,
    /// The formula holds in the next state.
    After,
    Always,
    Eventually,
    Historically,
    Once,
    Previous,
}

impl UnaryOp {
    pub fn is_temporal(&self) -> bool {
        !matches!(self, UnaryOp::Not)
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum BinOp {
    And,
    Or,
    Implies,
    Equal,
    /// Set membership.
    In,
    /// Relational join.
    Join,
    /// Cartesian product.
    Product,
    /// Product with a one-multiplicity on the right column (field typing).
    ArrowOne,
    /// Set union.
    Union,
    Until,
    Since,
    Release,
}

impl BinOp {
    pub fn is_temporal(&self) -> bool {
        matches!(self, BinOp::Until | BinOp::Since | BinOp::Release)
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Quant {
    All,
    Some,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Expr {
    // nullary
    True,
    False,
    /// The empty set.
    NoneSet,
    Sig(SigId),
    Field(FieldId),
    Var(String),
    // compound
    Unary(UnaryOp, ExprId),
    Binary(BinOp, ExprId, ExprId),
    /// N-ary conjunction.
    And(Vec<ExprId>),
    Quant(Quant, Vec<ParamDecl>, ExprId),
    Call(PredId, Vec<ExprId>),
}

/// A module of the base logic: the declaration table that user code and
/// the action compiler both insert into, plus the expression arena all
/// declarations reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    sigs: PrimaryMap<SigId, Sig>,
    fields: PrimaryMap<FieldId, Field>,
    preds: PrimaryMap<PredId, Pred>,
    facts: PrimaryMap<FactId, Fact>,
    exprs: PrimaryMap<ExprId, Expr>,
    expr_loc: SecondaryMap<ExprId, (usize, usize, usize)>,
    by_name: FxHashMap<String, SigId>,
    true_id: ExprId,
    false_id: ExprId,
    none_id: ExprId,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    pub fn new() -> Self {
        let mut exprs = PrimaryMap::new();
        let true_id = exprs.push(Expr::True);
        let false_id = exprs.push(Expr::False);
        let none_id = exprs.push(Expr::NoneSet);
        Self {
            sigs: PrimaryMap::new(),
            fields: PrimaryMap::new(),
            preds: PrimaryMap::new(),
            facts: PrimaryMap::new(),
            exprs,
            expr_loc: SecondaryMap::new(),
            by_name: FxHashMap::default(),
            true_id,
            false_id,
            none_id,
        }
    }

    /// add a new expression to the module
    pub fn e(&mut self, expr: Expr) -> ExprId {
        self.exprs.push(expr)
    }

    pub fn expr_true(&self) -> ExprId {
        self.true_id
    }

    pub fn expr_false(&self) -> ExprId {
        self.false_id
    }

    pub fn expr_none(&self) -> ExprId {
        self.none_id
    }

    pub fn add_sig(
        &mut self,
        name: SigName,
        parent: SigParent,
        is_abstract: bool,
        is_one: bool,
        exported: bool,
    ) -> SigId {
        let display = name.display();
        assert!(
            !self.by_name.contains_key(&display),
            "we already have a signature named {display}!",
        );
        let id = self.sigs.push(Sig {
            name,
            parent,
            is_abstract,
            is_one,
            exported,
        });
        self.by_name.insert(display, id);
        id
    }

    pub fn add_field(&mut self, owner: SigId, name: &str, value: ExprId, variable: bool) -> FieldId {
        self.fields.push(Field {
            name: name.to_string(),
            owner,
            value,
            variable,
        })
    }

    pub fn add_pred(
        &mut self,
        name: PredName,
        params: Vec<ParamDecl>,
        body: ExprId,
        exported: bool,
    ) -> PredId {
        self.preds.push(Pred {
            name,
            params,
            body,
            exported,
        })
    }

    pub fn add_fact(&mut self, name: &str, body: ExprId) -> FactId {
        self.facts.push(Fact {
            name: name.to_string(),
            body,
        })
    }

    pub fn lookup_sig(&self, name: &str) -> Option<SigId> {
        self.by_name.get(name).copied()
    }

    pub fn sig_ids(&self) -> Vec<SigId> {
        self.sigs.keys().collect()
    }

    pub fn field_ids(&self) -> Vec<FieldId> {
        self.fields.keys().collect()
    }

    pub fn pred_ids(&self) -> Vec<PredId> {
        self.preds.keys().collect()
    }

    pub fn fact_ids(&self) -> Vec<FactId> {
        self.facts.keys().collect()
    }

    pub fn fields_of(&self, owner: SigId) -> Vec<FieldId> {
        self.fields
            .iter()
            .filter(|(_, f)| f.owner == owner)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn add_expr_loc(&mut self, expr_id: ExprId, start: usize, end: usize, fileid: usize) {
        self.expr_loc[expr_id] = (start, end, fileid);
    }

    pub fn get_expr_loc(&self, expr_id: ExprId) -> Option<(usize, usize, usize)> {
        self.expr_loc.get(expr_id).copied()
    }

    // --- expression combinators ---

    pub fn sig_expr(&mut self, sig: SigId) -> ExprId {
        self.e(Expr::Sig(sig))
    }

    pub fn var(&mut self, name: impl Into<String>) -> ExprId {
        self.e(Expr::Var(name.into()))
    }

    /// N-ary conjunction. Empty input is `true`, a single conjunct is
    /// returned as-is.
    pub fn and(&mut self, conjuncts: Vec<ExprId>) -> ExprId {
        match conjuncts.len() {
            0 => self.true_id,
            1 => conjuncts[0],
            _ => self.e(Expr::And(conjuncts)),
        }
    }

    pub fn or(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.e(Expr::Binary(BinOp::Or, lhs, rhs))
    }

    pub fn not(&mut self, inner: ExprId) -> ExprId {
        self.e(Expr::Unary(UnaryOp::Not, inner))
    }

    pub fn implies(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.e(Expr::Binary(BinOp::Implies, lhs, rhs))
    }

    pub fn equal(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.e(Expr::Binary(BinOp::Equal, lhs, rhs))
    }

    pub fn member(&mut self, elem: ExprId, set: ExprId) -> ExprId {
        self.e(Expr::Binary(BinOp::In, elem, set))
    }

    pub fn join(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.e(Expr::Binary(BinOp::Join, lhs, rhs))
    }

    pub fn product(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.e(Expr::Binary(BinOp::Product, lhs, rhs))
    }

    pub fn arrow_one(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.e(Expr::Binary(BinOp::ArrowOne, lhs, rhs))
    }

    pub fn union(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.e(Expr::Binary(BinOp::Union, lhs, rhs))
    }

    pub fn always(&mut self, inner: ExprId) -> ExprId {
        self.e(Expr::Unary(UnaryOp::Always, inner))
    }

    pub fn prime(&mut self, inner: ExprId) -> ExprId {
        self.e(Expr::Unary(UnaryOp::Prime, inner))
    }

    pub fn call(&mut self, pred: PredId, args: Vec<ExprId>) -> ExprId {
        self.e(Expr::Call(pred, args))
    }

    pub fn forall(&mut self, decls: Vec<ParamDecl>, body: ExprId) -> ExprId {
        self.e(Expr::Quant(Quant::All, decls, body))
    }

    pub fn exists(&mut self, decls: Vec<ParamDecl>, body: ExprId) -> ExprId {
        self.e(Expr::Quant(Quant::Some, decls, body))
    }
}

impl Index<ExprId> for Module {
    type Output = Expr;

    fn index(&self, index: ExprId) -> &Self::Output {
        &self.exprs[index]
    }
}

impl Index<&ExprId> for Module {
    type Output = Expr;

    fn index(&self, index: &ExprId) -> &Self::Output {
        &self.exprs[*index]
    }
}

impl Index<SigId> for Module {
    type Output = Sig;

    fn index(&self, index: SigId) -> &Self::Output {
        &self.sigs[index]
    }
}

impl Index<&SigId> for Module {
    type Output = Sig;

    fn index(&self, index: &SigId) -> &Self::Output {
        &self.sigs[*index]
    }
}

impl Index<FieldId> for Module {
    type Output = Field;

    fn index(&self, index: FieldId) -> &Self::Output {
        &self.fields[index]
    }
}

impl Index<&FieldId> for Module {
    type Output = Field;

    fn index(&self, index: &FieldId) -> &Self::Output {
        &self.fields[*index]
    }
}

impl Index<PredId> for Module {
    type Output = Pred;

    fn index(&self, index: PredId) -> &Self::Output {
        &self.preds[index]
    }
}

impl Index<&PredId> for Module {
    type Output = Pred;

    fn index(&self, index: &PredId) -> &Self::Output {
        &self.preds[*index]
    }
}

impl Index<FactId> for Module {
    type Output = Fact;

    fn index(&self, index: FactId) -> &Self::Output {
        &self.facts[index]
    }
}

impl Index<&FactId> for Module {
    type Output = Fact;

    fn index(&self, index: &FactId) -> &Self::Output {
        &self.facts[*index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_module_with_declarations() {
        let mut m = Module::new();
        let counter = m.add_sig(
            SigName::User("Counter".to_string()),
            SigParent::Top,
            false,
            false,
            true,
        );
        assert_eq!(m.lookup_sig("Counter"), Some(counter));
        assert!(m.lookup_sig("Value").is_none());

        let counter_ref = m.sig_expr(counter);
        let val = m.add_field(counter, "val", counter_ref, true);
        assert_eq!(m.fields_of(counter), vec![val]);
        assert_eq!(m[val].name, "val");

        let body = m.expr_true();
        let p = m.add_pred(PredName::User("inv".to_string()), vec![], body, true);
        assert_eq!(m[p].name.display(), "inv");

        let f = m.add_fact("init", body);
        assert_eq!(m[f].name, "init");
    }

    #[test]
    fn and_collapses_empty_and_singleton() {
        let mut m = Module::new();
        assert_eq!(m.and(vec![]), m.expr_true());

        let x = m.var("x");
        let y = m.var("y");
        let eq = m.equal(x, y);
        assert_eq!(m.and(vec![eq]), eq);

        let both = m.and(vec![eq, eq]);
        assert_eq!(m[both], Expr::And(vec![eq, eq]));
    }

    #[test]
    fn synthesized_names_resolve_at_display_time() {
        assert_eq!(SigName::Marker("Inc".to_string()).display(), "_Inc");
        assert_eq!(SigName::ActionRoot.display(), "Action");
        assert_eq!(PredName::Guard("Inc".to_string()).display(), "guard_Inc");
        assert_eq!(PredName::Effect("Inc".to_string()).display(), "effect_Inc");
        assert_eq!(PredName::Event("Inc".to_string()).display(), "Inc");
        assert_eq!(PredName::Fired.display(), "fired");
    }

    #[test]
    fn temporal_operator_tags() {
        assert!(!UnaryOp::Not.is_temporal());
        for op in [
            UnaryOp::Prime,
            UnaryOp::After,
            UnaryOp::Always,
            UnaryOp::Eventually,
            UnaryOp::Historically,
            UnaryOp::Once,
            UnaryOp::Previous,
        ] {
            assert!(op.is_temporal(), "{op:?} must be temporal");
        }
        for op in [BinOp::Until, BinOp::Since, BinOp::Release] {
            assert!(op.is_temporal(), "{op:?} must be temporal");
        }
        for op in [
            BinOp::And,
            BinOp::Or,
            BinOp::Implies,
            BinOp::Equal,
            BinOp::In,
            BinOp::Join,
            BinOp::Product,
            BinOp::ArrowOne,
            BinOp::Union,
        ] {
            assert!(!op.is_temporal(), "{op:?} must not be temporal");
        }
    }

    #[test]
    fn expr_locations_round_trip() {
        let mut m = Module::new();
        let x = m.var("x");
        m.add_expr_loc(x, 3, 8, 0);
        assert_eq!(m.get_expr_loc(x), Some((3, 8, 0)));
    }
}
