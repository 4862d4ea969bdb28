// Copyright 2025 Cornell University
// released under MIT License
// author: Kevin Laeufer <laeufer@cornell.edu>

use log::debug;

use crate::logic::{
    Expr, ExprId, FactId, FieldId, Module, ParamDecl, PredId, PredName, SigId, SigName, SigParent,
};
use crate::registry::{ActionRegistry, ActionSignature};

/// Everything the synthesizer inserted into the module, for downstream
/// phases and tests. `event_preds` and `padded_tuples` are parallel to
/// `actions`.
#[derive(Debug, Clone)]
pub struct ActionTheory {
    pub root: SigId,
    pub placeholder: SigId,
    pub arg_union: SigId,
    pub event_holder: SigId,
    pub event_field: FieldId,
    pub fired: PredId,
    pub max_arity: usize,
    pub actions: Vec<ActionSignature>,
    pub event_preds: Vec<PredId>,
    pub padded_tuples: Vec<ExprId>,
    pub firing_axiom: FactId,
    pub frame_axiom: FactId,
}

impl ActionRegistry {
    /// Synthesizes the uniform event encoding, the firing-soundness axiom
    /// and the frame-condition axiom from the completed registry, and
    /// inserts all of it into the module.
    ///
    /// Consumes the registry: once a module's actions are finalized there
    /// is nothing further to register, and a second synthesis pass would
    /// duplicate declarations. Both misuses are move errors.
    pub fn finalize(self, module: &mut Module) -> ActionTheory {
        let root = self.root;
        let placeholder =
            module.add_sig(SigName::Placeholder, SigParent::Top, false, true, false);
        debug!("created placeholder sig {}", module[placeholder].name.display());

        let max_arity = self.actions.iter().map(|a| a.arity()).max().unwrap_or(0);
        debug!("max arity over {} action(s) is {max_arity}", self.actions.len());

        // the union of the placeholder and every parameter type, first
        // occurrence wins
        let mut members = vec![placeholder];
        for action in &self.actions {
            for (_, ty) in &action.params {
                if !members.contains(ty) {
                    members.push(*ty);
                }
            }
        }
        let arg_union = module.add_sig(
            SigName::ArgUnion,
            SigParent::Subset(members),
            false,
            false,
            false,
        );

        // per-action padded tuple types, all of width 1 + max_arity
        let mut codomain = module.expr_none();
        for _ in 0..max_arity {
            let none = module.expr_none();
            codomain = module.product(codomain, none);
        }
        let mut padded_tuples = Vec::with_capacity(self.actions.len());
        for action in &self.actions {
            let mut tuple = module.sig_expr(action.marker);
            for i in 0..max_arity {
                let column = if i < action.arity() {
                    module.sig_expr(action.params[i].1)
                } else {
                    module.sig_expr(placeholder)
                };
                tuple = module.product(tuple, column);
            }
            padded_tuples.push(tuple);
            codomain = module.union(codomain, tuple);
        }

        // the event witness: which action (with which arguments) occurs now
        let event_holder =
            module.add_sig(SigName::EventHolder, SigParent::Top, false, true, false);
        let placeholder_ref = module.sig_expr(placeholder);
        let event_value = module.arrow_one(placeholder_ref, codomain);
        let event_field = module.add_field(event_holder, "event", event_value, true);
        debug!("created event witness field on {}", module[event_holder].name.display());

        let fired = self.synthesize_fired(module, placeholder, arg_union, event_holder, event_field, max_arity);

        let firing_axiom = self.synthesize_firing_axiom(module, placeholder, fired, max_arity);

        let event_preds = self.synthesize_event_preds(module, placeholder, fired, max_arity);

        let frame_axiom = self.synthesize_frame_axiom(module, &event_preds);

        ActionTheory {
            root,
            placeholder,
            arg_union,
            event_holder,
            event_field,
            fired,
            max_arity,
            actions: self.actions,
            event_preds,
            padded_tuples,
            firing_axiom,
            frame_axiom,
        }
    }

    /// `fired[x0..x{M-1}: Arg, a: Action]` holds iff the tuple
    /// `(Placeholder, a, x0, .., x{M-1})` is a current member of the event
    /// witness. With `max_arity` 0 the predicate takes only `a`.
    fn synthesize_fired(
        &self,
        module: &mut Module,
        placeholder: SigId,
        arg_union: SigId,
        event_holder: SigId,
        event_field: FieldId,
        max_arity: usize,
    ) -> PredId {
        let arg_names: Vec<String> = (0..max_arity).map(|i| format!("x{i}")).collect();
        let mut params = Vec::new();
        if max_arity > 0 {
            let arg_ref = module.sig_expr(arg_union);
            params.push(ParamDecl {
                names: arg_names.clone(),
                ty: arg_ref,
            });
        }
        let root_ref = module.sig_expr(self.root);
        params.push(ParamDecl::new("a", root_ref));

        let mut tuple = module.sig_expr(placeholder);
        let action_var = module.var("a");
        tuple = module.product(tuple, action_var);
        for name in &arg_names {
            let v = module.var(name.clone());
            tuple = module.product(tuple, v);
        }
        let holder_ref = module.sig_expr(event_holder);
        let field_ref = module.e(Expr::Field(event_field));
        let witness = module.join(holder_ref, field_ref);
        let body = module.member(tuple, witness);
        let fired = module.add_pred(PredName::Fired, params, body, false);
        debug!("created generic firing predicate with {max_arity} argument column(s)");
        fired
    }

    /// The `fired` call for one action: its own parameters (as variables),
    /// placeholder padding, then its marker.
    fn padded_fired_call(
        &self,
        module: &mut Module,
        action: &ActionSignature,
        placeholder: SigId,
        fired: PredId,
        max_arity: usize,
    ) -> ExprId {
        let mut args = Vec::with_capacity(max_arity + 1);
        for (param, _) in &action.params {
            args.push(module.var(param.clone()));
        }
        for _ in action.arity()..max_arity {
            args.push(module.sig_expr(placeholder));
        }
        let marker_ref = module.sig_expr(action.marker);
        args.push(marker_ref);
        module.call(fired, args)
    }

    /// For every action: firing it implies its guard and its effect, at
    /// every time step. This is the only place the user-declared
    /// predicates are tied to the event witness.
    fn synthesize_firing_axiom(
        &self,
        module: &mut Module,
        placeholder: SigId,
        fired: PredId,
        max_arity: usize,
    ) -> FactId {
        let mut clauses = Vec::with_capacity(self.actions.len());
        for action in &self.actions {
            let antecedent = self.padded_fired_call(module, action, placeholder, fired, max_arity);
            let own_args: Vec<ExprId> = action
                .params
                .iter()
                .map(|(param, _)| module.var(param.clone()))
                .collect();
            let guard_call = module.call(action.guard, own_args.clone());
            let effect_call = module.call(action.effect, own_args);
            let consequent = module.and(vec![guard_call, effect_call]);
            let implication = module.implies(antecedent, consequent);
            let clause = if action.params.is_empty() {
                implication
            } else {
                let decls = action
                    .params
                    .iter()
                    .map(|(param, ty)| {
                        let ty_ref = module.sig_expr(*ty);
                        ParamDecl::new(param.clone(), ty_ref)
                    })
                    .collect();
                module.forall(decls, implication)
            };
            clauses.push(clause);
        }
        let body = module.and(clauses);
        let body = module.always(body);
        debug!("created firing-soundness axiom over {} action(s)", self.actions.len());
        module.add_fact("firing", body)
    }

    /// One exported zero-argument predicate per action, displayed under
    /// the action's own name: "this action is occurring now", with the
    /// action's parameters existentially bound.
    fn synthesize_event_preds(
        &self,
        module: &mut Module,
        placeholder: SigId,
        fired: PredId,
        max_arity: usize,
    ) -> Vec<PredId> {
        let mut event_preds = Vec::with_capacity(self.actions.len());
        for action in &self.actions {
            let call = self.padded_fired_call(module, action, placeholder, fired, max_arity);
            let body = if action.params.is_empty() {
                call
            } else {
                let decls = action
                    .params
                    .iter()
                    .map(|(param, ty)| {
                        let ty_ref = module.sig_expr(*ty);
                        ParamDecl::new(param.clone(), ty_ref)
                    })
                    .collect();
                module.exists(decls, call)
            };
            let pred = module.add_pred(PredName::Event(action.name.clone()), vec![], body, true);
            debug!("created convenience predicate for action {}", action.name);
            event_preds.push(pred);
        }
        event_preds
    }

    /// A state component changes only while an action permitted to modify
    /// it is occurring. Facts hold at every time step, so no `always`
    /// wrapper is needed.
    fn synthesize_frame_axiom(&self, module: &mut Module, event_preds: &[PredId]) -> FactId {
        let mut clauses = Vec::with_capacity(self.modifies.len());
        for (component, permitted) in &self.modifies {
            let current = module.var(component.clone());
            let next = module.var(component.clone());
            let next = module.prime(next);
            let unchanged = module.equal(current, next);
            let changed = module.not(unchanged);
            let disjunction = permitted
                .iter()
                .map(|i| module.call(event_preds[*i], vec![]))
                .collect::<Vec<_>>()
                .into_iter()
                .reduce(|acc, call| module.or(acc, call))
                .expect("a modified component always has at least one permitted action");
            clauses.push(module.implies(changed, disjunction));
        }
        let body = module.and(clauses);
        debug!("created frame condition over {} component(s)", self.modifies.len());
        module.add_fact("frame", body)
    }
}
