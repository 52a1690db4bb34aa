//! Grammar compilation.
//!
//! Turns a declarative [`Grammar`] into a [`StateTable`] in four passes:
//!
//! ```text
//! Grammar
//!   │ (1) assign ids        root present, names unique
//!   │ (2) validate          rule directive combinations, dangling names
//!   │ (3) compile rules     patterns -> Matcher, token names -> TokenType,
//!   │                       combined lists -> synthesized state ids
//!   │ (4) resolve includes  depth-first inline, memoized, cycle-checked,
//!   v                       then fill synthesized combined states
//! StateTable
//! ```
//!
//! Synthesized combined states are memoized by their ordered member list, so
//! every rule declaring the same `combined` list pushes the same state.
//! Their rules are the *resolved* rules of each member, in listed order.

use super::matcher::Matcher;
use super::state_table::{Emit, GroupEmit, Rule, State, StateId, StateRef, StateTable, Transition};
use crate::config::{GroupDef, PUSH_CURRENT, PatternFlags, RuleDef};
use crate::error::{BuildError, RuleConflict};
use crate::{Grammar, TokenType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

const ROOT: &str = "root";
const COMBINED_PREFIX: &str = "__combined_";

/// A compiled rule before include resolution.
enum Pending {
    Rule(Arc<Rule>),
    Include(StateId),
}

/// Name of the state synthesized for `combined(states)`.
pub(crate) fn combined_state_name(states: &[String]) -> String {
    format!("{COMBINED_PREFIX}{}", states.join("__"))
}

#[tracing::instrument(level = "debug", skip_all, fields(lexer = %grammar.config.name))]
pub(crate) fn build(grammar: &Grammar) -> Result<StateTable, BuildError> {
    let mut builder = Builder::new(grammar)?;
    builder.validate()?;

    let mut compiled = Vec::with_capacity(grammar.states.len());
    for state in &grammar.states {
        let mut rules = Vec::with_capacity(state.rules.len());
        for (index, def) in state.rules.iter().enumerate() {
            rules.push(builder.compile_rule(&state.name, index, def)?);
        }
        compiled.push(rules);
    }

    let mut resolved: Vec<Option<Vec<Arc<Rule>>>> = vec![None; compiled.len()];
    let mut visiting = Vec::new();
    for idx in 0..compiled.len() {
        resolve_includes(StateId(idx as u32), &compiled, &builder.names, &mut resolved, &mut visiting)?;
    }

    let mut states: Vec<State> = builder
        .names
        .iter()
        .zip(resolved)
        .map(|(name, rules)| State { name: name.clone(), rules: rules.unwrap_or_default() })
        .collect();

    let mut combined: Vec<(Vec<String>, StateId)> = builder.combined.into_iter().collect();
    combined.sort_by_key(|(_, id)| *id);
    for (members, id) in combined {
        let mut rules = Vec::new();
        for member in &members {
            let member_id = builder.ids[member.as_str()];
            rules.extend(states[member_id.index()].rules.iter().cloned());
        }
        let name = combined_state_name(&members);
        trace!(state = %name, rules = rules.len(), "synthesized combined state");
        debug_assert_eq!(states.len(), id.index());
        states.push(State { name, rules });
    }

    let by_name: HashMap<String, StateId> =
        states.iter().enumerate().map(|(idx, s)| (s.name.clone(), StateId(idx as u32))).collect();
    let root = by_name[ROOT];

    debug!(states = states.len(), declared = grammar.states.len(), "built state table");
    Ok(StateTable { states, by_name, root })
}

struct Builder<'g> {
    grammar: &'g Grammar,
    flags: PatternFlags,
    /// Declared states.
    ids: HashMap<&'g str, StateId>,
    /// Names by id: declared states first, synthesized ones appended on demand.
    names: Vec<String>,
    combined: HashMap<Vec<String>, StateId>,
}

impl<'g> Builder<'g> {
    fn new(grammar: &'g Grammar) -> Result<Self, BuildError> {
        let mut ids = HashMap::with_capacity(grammar.states.len());
        for (idx, state) in grammar.states.iter().enumerate() {
            if ids.insert(state.name.as_str(), StateId(idx as u32)).is_some() {
                return Err(BuildError::DuplicateState(state.name.clone()));
            }
        }
        if !ids.contains_key(ROOT) {
            return Err(BuildError::MissingRootState);
        }

        Ok(Builder {
            grammar,
            flags: grammar.config.flags,
            ids,
            names: grammar.states.iter().map(|s| s.name.clone()).collect(),
            combined: HashMap::new(),
        })
    }

    fn validate(&self) -> Result<(), BuildError> {
        let mut missing: Vec<String> = Vec::new();

        for state in &self.grammar.states {
            for (index, rule) in state.rules.iter().enumerate() {
                if let Some(conflict) = check_rule(rule) {
                    return Err(BuildError::ConflictingRuleAction { state: state.name.clone(), index, conflict });
                }
                for name in referenced_states(rule) {
                    if !self.ids.contains_key(name) && !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                }
            }
        }

        if missing.is_empty() { Ok(()) } else { Err(BuildError::DanglingStateReference { names: missing }) }
    }

    fn compile_rule(&mut self, state: &str, index: usize, def: &RuleDef) -> Result<Pending, BuildError> {
        if let Some(target) = &def.include {
            return Ok(Pending::Include(self.id(target)?));
        }

        let matcher = Matcher::compile(&def.pattern, self.flags).map_err(|message| BuildError::InvalidPattern {
            state: state.to_string(),
            index,
            pattern: def.pattern.clone(),
            message,
        })?;

        let token_type = |name: &str| {
            name.parse::<TokenType>().map_err(|err| BuildError::UnknownTokenType {
                state: state.to_string(),
                index,
                name: err.0,
            })
        };

        let emit = if let Some(kind) = &def.token {
            Emit::Token(token_type(kind)?)
        } else if let Some(groups) = &def.by_groups {
            let mut out = Vec::with_capacity(groups.len());
            for group in groups {
                out.push(match group {
                    GroupDef::Token(kind) => GroupEmit::Token(token_type(kind)?),
                    GroupDef::UsingSelf(using) => GroupEmit::UsingSelf(self.state_ref(using.state.as_deref())?),
                });
            }
            Emit::ByGroups(out)
        } else if let Some(using) = &def.using_self {
            Emit::UsingSelf(self.state_ref(using.state.as_deref())?)
        } else {
            Emit::Nothing
        };

        let transition = if let Some(members) = &def.combined {
            Transition::Push(StateRef::Named(self.combined_state(members)?))
        } else if let Some(target) = &def.push {
            Transition::Push(self.state_ref(Some(target.as_str()))?)
        } else if let Some(depth) = def.pop {
            Transition::Pop(depth.max(1))
        } else {
            Transition::Stay
        };

        Ok(Pending::Rule(Arc::new(Rule { pattern: def.pattern.clone(), matcher, emit, transition })))
    }

    fn id(&self, name: &str) -> Result<StateId, BuildError> {
        self.ids.get(name).copied().ok_or_else(|| BuildError::DanglingStateReference { names: vec![name.to_string()] })
    }

    fn state_ref(&self, name: Option<&str>) -> Result<StateRef, BuildError> {
        match name {
            None | Some("") | Some(PUSH_CURRENT) => Ok(StateRef::Current),
            Some(name) => Ok(StateRef::Named(self.id(name)?)),
        }
    }

    fn combined_state(&mut self, members: &[String]) -> Result<StateId, BuildError> {
        if let Some(&id) = self.combined.get(members) {
            return Ok(id);
        }
        for member in members {
            self.id(member)?;
        }
        let name = combined_state_name(members);
        // a declared state or another member list may already spell this name
        if self.ids.contains_key(name.as_str()) || self.names.contains(&name) {
            return Err(BuildError::DuplicateState(name));
        }

        let id = StateId(self.names.len() as u32);
        self.names.push(name);
        self.combined.insert(members.to_vec(), id);
        Ok(id)
    }
}

/// A rule may carry exactly one of: a token (with push xor pop), an include,
/// a by-groups (with push xor pop), a using-self, or a combined.
fn check_rule(r: &RuleDef) -> Option<RuleConflict> {
    let has_transition = r.push.is_some() || r.pop.is_some();

    if r.pattern.is_empty() && !has_transition && r.include.is_none() && r.combined.is_none() {
        return Some(RuleConflict::Empty);
    }
    if r.push.is_some() && r.pop.is_some() {
        return Some(RuleConflict::PushAndPop);
    }
    if r.token.is_some() {
        if r.include.is_some() {
            return Some(RuleConflict::TokenAndInclude);
        }
        if r.by_groups.is_some() {
            return Some(RuleConflict::TokenAndByGroups);
        }
    }
    if r.include.is_some() {
        if r.by_groups.is_some() {
            return Some(RuleConflict::IncludeAndByGroups);
        }
        if has_transition {
            return Some(RuleConflict::IncludeAndTransition);
        }
        if r.using_self.is_some() {
            return Some(RuleConflict::IncludeAndUsingSelf);
        }
    }
    if r.combined.is_some() && (has_transition || r.include.is_some()) {
        return Some(RuleConflict::CombinedAndDirective);
    }
    if r.using_self.is_some() && (r.token.is_some() || r.by_groups.is_some()) {
        return Some(RuleConflict::UsingSelfAndEmitter);
    }
    None
}

/// Every state name a rule refers to, in declaration order.
fn referenced_states(r: &RuleDef) -> Vec<&str> {
    let mut out = Vec::new();
    if let Some(target) = r.push.as_deref() {
        out.push(target);
    }
    if let Some(target) = r.include.as_deref() {
        out.push(target);
    }
    if let Some(members) = &r.combined {
        out.extend(members.iter().map(String::as_str));
    }
    if let Some(target) = r.using_self.as_ref().and_then(|u| u.state.as_deref()) {
        out.push(target);
    }
    if let Some(groups) = &r.by_groups {
        for group in groups {
            if let GroupDef::UsingSelf(using) = group {
                if let Some(target) = using.state.as_deref() {
                    out.push(target);
                }
            }
        }
    }
    out.retain(|name| !name.is_empty() && *name != PUSH_CURRENT);
    out
}

fn resolve_includes(
    id: StateId,
    compiled: &[Vec<Pending>],
    names: &[String],
    resolved: &mut [Option<Vec<Arc<Rule>>>],
    visiting: &mut Vec<StateId>,
) -> Result<(), BuildError> {
    if resolved[id.index()].is_some() {
        return Ok(());
    }
    if let Some(pos) = visiting.iter().position(|&v| v == id) {
        let mut chain: Vec<String> = visiting[pos..].iter().map(|v| names[v.index()].clone()).collect();
        chain.push(names[id.index()].clone());
        return Err(BuildError::IncludeCycle { chain });
    }

    visiting.push(id);
    let mut rules = Vec::with_capacity(compiled[id.index()].len());
    for pending in &compiled[id.index()] {
        match pending {
            Pending::Rule(rule) => rules.push(Arc::clone(rule)),
            Pending::Include(target) => {
                resolve_includes(*target, compiled, names, resolved, visiting)?;
                rules.extend(resolved[target.index()].iter().flatten().cloned());
            }
        }
    }
    visiting.pop();

    resolved[id.index()] = Some(rules);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroupDef, RuleDef};
    use pretty_assertions::assert_eq;

    fn patterns(table: &StateTable, state: &str) -> Vec<String> {
        let id = table.lookup(state).unwrap();
        table.state(id).rules.iter().map(|r| r.pattern.clone()).collect()
    }

    #[test]
    fn missing_root_is_rejected() {
        let g = Grammar::new("t").state("main", vec![RuleDef::new("a").token("Text")]);
        assert_eq!(build(&g).unwrap_err(), BuildError::MissingRootState);
    }

    #[test]
    fn duplicate_states_are_rejected() {
        let g = Grammar::new("t")
            .state("root", vec![RuleDef::new("a").token("Text")])
            .state("root", vec![RuleDef::new("b").token("Text")]);
        assert_eq!(build(&g).unwrap_err(), BuildError::DuplicateState("root".into()));
    }

    #[test]
    fn every_dangling_name_is_reported_once() {
        let g = Grammar::new("t").state(
            "root",
            vec![
                RuleDef::new("\"").token("String").push("string"),
                RuleDef::include("common"),
                RuleDef::new("'").token("String").push("string"),
                RuleDef::new("#push").token("Text").push(PUSH_CURRENT),
                RuleDef::new("x").combined(["root", "extra"]),
                RuleDef::new("y").using_self("nested"),
                RuleDef::new("(a)(b)").by_groups(vec![GroupDef::token("Text"), GroupDef::using_self("grouped")]),
                RuleDef::new("z").using_self("string"),
            ],
        );
        assert_eq!(
            build(&g).unwrap_err(),
            BuildError::DanglingStateReference {
                names: vec!["string".into(), "common".into(), "extra".into(), "nested".into(), "grouped".into()]
            }
        );
    }

    #[test]
    fn conflicting_directives_are_rejected() {
        let cases = vec![
            (RuleDef::default(), RuleConflict::Empty),
            (RuleDef::new("a").push("root").pop(1), RuleConflict::PushAndPop),
            (RuleDef::include("root").token("Text"), RuleConflict::TokenAndInclude),
            (RuleDef::new("a").token("Text").by_groups(vec![]), RuleConflict::TokenAndByGroups),
            (RuleDef::include("root").by_groups(vec![]), RuleConflict::IncludeAndByGroups),
            (RuleDef::include("root").pop(1), RuleConflict::IncludeAndTransition),
            (RuleDef::new("a").combined(["root"]).push("root"), RuleConflict::CombinedAndDirective),
            (RuleDef::new("a").token("Text").using_current(), RuleConflict::UsingSelfAndEmitter),
        ];

        for (rule, conflict) in cases {
            let g = Grammar::new("t").state("root", vec![RuleDef::new("z").token("Text"), rule]);
            assert_eq!(
                build(&g).unwrap_err(),
                BuildError::ConflictingRuleAction { state: "root".into(), index: 1, conflict }
            );
        }
    }

    #[test]
    fn pattern_and_token_errors_name_the_rule() {
        let g = Grammar::new("t").state("root", vec![RuleDef::new("(").token("Text")]);
        assert!(matches!(
            build(&g).unwrap_err(),
            BuildError::InvalidPattern { ref state, index: 0, ref pattern, .. } if state == "root" && pattern == "("
        ));

        let g = Grammar::new("t").state("root", vec![RuleDef::new("a").token("Sparkly")]);
        assert_eq!(
            build(&g).unwrap_err(),
            BuildError::UnknownTokenType { state: "root".into(), index: 0, name: "Sparkly".into() }
        );

        let g = Grammar::new("t")
            .state("root", vec![RuleDef::new("a").by_groups(vec![GroupDef::token("Nope")])]);
        assert!(matches!(build(&g).unwrap_err(), BuildError::UnknownTokenType { .. }));
    }

    #[test]
    fn includes_are_inlined_transitively_in_order() {
        let g = Grammar::new("t")
            .state("root", vec![RuleDef::include("a")])
            .state(
                "a",
                vec![RuleDef::include("b"), RuleDef::new("a1").token("Text"), RuleDef::new("a2").token("Text")],
            )
            .state("b", vec![RuleDef::include("c"), RuleDef::new("b1").token("Text")])
            .state("c", vec![RuleDef::new("c1").token("Text"), RuleDef::new("c2").token("Text")]);

        let table = build(&g).unwrap();
        assert_eq!(patterns(&table, "a"), ["c1", "c2", "b1", "a1", "a2"]);
        assert_eq!(patterns(&table, "root"), ["c1", "c2", "b1", "a1", "a2"]);
        assert_eq!(patterns(&table, "c"), ["c1", "c2"]);
    }

    #[test]
    fn include_cycles_are_rejected() {
        let g = Grammar::new("t")
            .state("root", vec![RuleDef::include("a")])
            .state("a", vec![RuleDef::include("b")])
            .state("b", vec![RuleDef::new("x").token("Text"), RuleDef::include("a")]);
        assert_eq!(
            build(&g).unwrap_err(),
            BuildError::IncludeCycle { chain: vec!["a".into(), "b".into(), "a".into()] }
        );

        let g = Grammar::new("t").state("root", vec![RuleDef::include("root")]);
        assert_eq!(build(&g).unwrap_err(), BuildError::IncludeCycle { chain: vec!["root".into(), "root".into()] });
    }

    #[test]
    fn combined_states_are_synthesized_once() {
        let g = Grammar::new("t")
            .state(
                "root",
                vec![
                    RuleDef::new("x").token("Text").combined(["x", "y"]),
                    RuleDef::new("z").token("Text").combined(["x", "y"]),
                ],
            )
            .state("x", vec![RuleDef::include("w"), RuleDef::new("x1").token("Text")])
            .state("y", vec![RuleDef::new("y1").token("Text").pop(1)])
            .state("w", vec![RuleDef::new("w1").token("Text")]);

        let table = build(&g).unwrap();
        let combined = table.lookup("__combined_x__y").unwrap();
        assert_eq!(patterns(&table, "__combined_x__y"), ["w1", "x1", "y1"]);
        assert_eq!(table.states.len(), 5);

        let root = table.state(table.root());
        for rule in &root.rules {
            assert_eq!(rule.transition, Transition::Push(StateRef::Named(combined)));
        }
    }

    #[test]
    fn combined_names_never_alias() {
        // both member lists join to "__combined_a__b__c"
        let g = Grammar::new("t")
            .state(
                "root",
                vec![
                    RuleDef::new("1").combined(["a__b", "c"]),
                    RuleDef::new("2").combined(["a", "b__c"]),
                ],
            )
            .state("a", vec![RuleDef::new("a").token("Keyword")])
            .state("a__b", vec![RuleDef::new("x").token("Keyword")])
            .state("b__c", vec![RuleDef::new("y").token("Keyword")])
            .state("c", vec![RuleDef::new("c").token("Keyword")]);
        assert_eq!(build(&g).unwrap_err(), BuildError::DuplicateState("__combined_a__b__c".into()));

        let g = Grammar::new("t")
            .state("root", vec![RuleDef::new("1").combined(["x", "y"])])
            .state("x", vec![RuleDef::new("x").token("Text")])
            .state("y", vec![RuleDef::new("y").token("Text")])
            .state("__combined_x__y", vec![RuleDef::new("z").token("Text")]);
        assert_eq!(build(&g).unwrap_err(), BuildError::DuplicateState("__combined_x__y".into()));
    }

    #[test]
    fn push_targets_and_pop_depths_compile() {
        let g = Grammar::new("t")
            .state(
                "root",
                vec![
                    RuleDef::new("a").token("Text").push("s"),
                    RuleDef::new("b").token("Text").push(PUSH_CURRENT),
                    RuleDef::new("c").token("Text").pop(0),
                    RuleDef::new("").pop(2),
                    RuleDef::new("d").using_self("s"),
                ],
            )
            .state("s", vec![RuleDef::new(".").token("Text")]);

        let table = build(&g).unwrap();
        let s = table.lookup("s").unwrap();
        let rules = &table.state(table.root()).rules;
        assert_eq!(rules[0].transition, Transition::Push(StateRef::Named(s)));
        assert_eq!(rules[1].transition, Transition::Push(StateRef::Current));
        assert_eq!(rules[2].transition, Transition::Pop(1));
        assert_eq!(rules[3].transition, Transition::Pop(2));
        assert_eq!(rules[3].emit, Emit::Nothing);
        assert_eq!(rules[4].emit, Emit::UsingSelf(StateRef::Named(s)));
    }
}
