// Copyright 2025 Cornell University
// released under MIT License
// author: Kevin Laeufer <laeufer@cornell.edu>

use log::debug;
use rustc_hash::FxHashMap;

use crate::errors::{Result, TheoryError};
use crate::logic::{
    BinOp, Expr, ExprId, Module, ParamDecl, PredId, PredName, SigId, SigName, SigParent,
};
use crate::normalize::normalize;

/// One registered action: its marker signature, resolved parameters and
/// the two predicates its body was split into. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSignature {
    pub name: String,
    /// The exclusive singleton identifying this action at the logic level.
    pub marker: SigId,
    /// Parameter names with their resolved (simple) types, in declared order.
    pub params: Vec<(String, SigId)>,
    /// Conjunction of the state-only conjuncts of the body.
    pub guard: PredId,
    /// Conjunction of the temporally-qualified conjuncts of the body.
    pub effect: PredId,
    pub guard_conjuncts: Vec<ExprId>,
    pub effect_conjuncts: Vec<ExprId>,
}

impl ActionSignature {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Accumulates action declarations for one module. Created empty, filled
/// by repeated [`register`](ActionRegistry::register) calls, and consumed
/// exactly once by [`finalize`](ActionRegistry::finalize) — the registry
/// is moved into `finalize`, so registering after finalization (or
/// finalizing twice) does not compile.
pub struct ActionRegistry {
    pub(crate) root: SigId,
    pub(crate) actions: Vec<ActionSignature>,
    by_name: FxHashMap<String, usize>,
    /// State component name -> indices of the actions allowed to change it,
    /// in first-mention order.
    pub(crate) modifies: Vec<(String, Vec<usize>)>,
    modifies_index: FxHashMap<String, usize>,
}

impl ActionRegistry {
    /// Creates the registry together with the abstract action root
    /// signature every marker extends.
    pub fn new(module: &mut Module) -> Self {
        let root = module.add_sig(SigName::ActionRoot, SigParent::Top, true, false, false);
        debug!("created abstract action root sig {}", module[root].name.display());
        Self {
            root,
            actions: Vec::new(),
            by_name: FxHashMap::default(),
            modifies: Vec::new(),
            modifies_index: FxHashMap::default(),
        }
    }

    /// Registers one action declaration: validates its parameters, creates
    /// its marker signature, splits the body into guard and effect
    /// predicates and records its modify permissions.
    ///
    /// Validation happens before any module mutation, so a failed
    /// registration leaves no orphaned declarations behind.
    pub fn register(
        &mut self,
        module: &mut Module,
        name: &str,
        params: Vec<ParamDecl>,
        body: ExprId,
        modifies: &[&str],
    ) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(TheoryError::DuplicateAction(name.to_string()));
        }
        let resolved = resolve_params(module, name, &params)?;

        let marker = module.add_sig(
            SigName::Marker(name.to_string()),
            SigParent::Extends(self.root),
            false,
            true,
            false,
        );
        debug!("created marker sig {} for action {name}", module[marker].name.display());

        // split the body into plain-state and transition conjuncts
        let body = normalize(module, body);
        let mut conjuncts = Vec::new();
        flatten_conjuncts(module, body, &mut conjuncts);
        let mut guard_conjuncts = Vec::new();
        let mut effect_conjuncts = Vec::new();
        for c in conjuncts {
            if contains_temporal(module, c) {
                effect_conjuncts.push(c);
            } else {
                guard_conjuncts.push(c);
            }
        }

        let guard_body = module.and(guard_conjuncts.clone());
        let guard = module.add_pred(
            PredName::Guard(name.to_string()),
            params.clone(),
            guard_body,
            false,
        );
        let effect_body = module.and(effect_conjuncts.clone());
        let effect = module.add_pred(
            PredName::Effect(name.to_string()),
            params,
            effect_body,
            false,
        );
        debug!(
            "action {name}: {} guard conjunct(s), {} effect conjunct(s)",
            guard_conjuncts.len(),
            effect_conjuncts.len()
        );

        let index = self.actions.len();
        self.by_name.insert(name.to_string(), index);
        self.actions.push(ActionSignature {
            name: name.to_string(),
            marker,
            params: resolved,
            guard,
            effect,
            guard_conjuncts,
            effect_conjuncts,
        });

        for component in modifies {
            let slot = match self.modifies_index.get(*component) {
                Some(slot) => *slot,
                None => {
                    let slot = self.modifies.len();
                    self.modifies_index.insert(component.to_string(), slot);
                    self.modifies.push((component.to_string(), Vec::new()));
                    slot
                }
            };
            self.modifies[slot].1.push(index);
        }

        Ok(())
    }

    pub fn actions(&self) -> &[ActionSignature] {
        &self.actions
    }

    pub fn get(&self, name: &str) -> Option<&ActionSignature> {
        self.by_name.get(name).map(|i| &self.actions[*i])
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The modified state components with the actions permitted to change
    /// them, in first-mention order.
    pub fn modified_components(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.modifies
            .iter()
            .map(|(name, actions)| (name.as_str(), actions.as_slice()))
    }
}

fn resolve_params(
    module: &Module,
    action: &str,
    params: &[ParamDecl],
) -> Result<Vec<(String, SigId)>> {
    let mut resolved = Vec::with_capacity(params.len());
    for decl in params {
        if decl.names.len() != 1 {
            return Err(TheoryError::GroupedParameter {
                action: action.to_string(),
                param: decl.names.join(", "),
            });
        }
        match &module[decl.ty] {
            Expr::Sig(sig) => resolved.push((decl.names[0].clone(), *sig)),
            _ => {
                return Err(TheoryError::BadParameterType {
                    action: action.to_string(),
                    param: decl.names[0].clone(),
                    ty: decl.ty,
                })
            }
        }
    }
    Ok(resolved)
}

/// Flattens the top-level conjunction structure of a formula, handling
/// both the n-ary and the binary form. Descent stops at the first
/// non-conjunction node, which becomes one conjunct.
pub(crate) fn flatten_conjuncts(module: &Module, expr: ExprId, out: &mut Vec<ExprId>) {
    match &module[expr] {
        Expr::And(conjuncts) => {
            for c in conjuncts {
                flatten_conjuncts(module, *c, out);
            }
        }
        Expr::Binary(BinOp::And, lhs, rhs) => {
            flatten_conjuncts(module, *lhs, out);
            flatten_conjuncts(module, *rhs, out);
        }
        _ => out.push(expr),
    }
}

/// Whole-subtree scan for temporal content. Does not descend into a
/// matched temporal node: its interior is irrelevant once the conjunct is
/// known to be a transition constraint.
pub(crate) fn contains_temporal(module: &Module, expr: ExprId) -> bool {
    match &module[expr] {
        Expr::True | Expr::False | Expr::NoneSet => false,
        Expr::Sig(_) | Expr::Field(_) | Expr::Var(_) => false,
        Expr::Unary(op, inner) => op.is_temporal() || contains_temporal(module, *inner),
        Expr::Binary(op, lhs, rhs) => {
            op.is_temporal()
                || contains_temporal(module, *lhs)
                || contains_temporal(module, *rhs)
        }
        Expr::And(conjuncts) => conjuncts.iter().any(|c| contains_temporal(module, *c)),
        Expr::Quant(_, decls, body) => {
            decls.iter().any(|d| contains_temporal(module, d.ty))
                || contains_temporal(module, *body)
        }
        Expr::Call(_, args) => args.iter().any(|a| contains_temporal(module, *a)),
    }
}
