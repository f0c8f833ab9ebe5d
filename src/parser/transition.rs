use core::fmt;
use core::str::FromStr;

use alloc::string::String;
use alloc::vec::Vec;

use crate::errors::{Result, RudepError};
use crate::model::Model;
use crate::parser::state::ParserState;
use crate::parser::tree::DependencyTree;

/// Arc added by a transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArcKind {
    /// `head(lambda) = beta`
    Left,

    /// `head(beta) = lambda`
    Right,

    /// No arc.
    No,
}

/// Cursor movement following the arc.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListOp {
    /// `lambda = beta`, `beta += 1`
    Shift,

    /// Removes `lambda` from further consideration, then passes.
    Reduce,

    /// Moves `lambda` to the nearest non-reduced token on its left.
    Pass,
}

/// A transition of the list-based system.
///
/// Rendered as `L_R_<label>`, `L_P_<label>`, `R_S_<label>`, `R_P_<label>`,
/// `N_S`, `N_R` or `N_P`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    arc: ArcKind,
    list: ListOp,
    deprel: String,
}

impl Transition {
    /// Creates an arc transition.
    ///
    /// # Errors
    ///
    /// Left arcs can only reduce or pass, right arcs only shift or pass, and
    /// the label must not be empty.
    pub fn arc<S>(arc: ArcKind, list: ListOp, deprel: S) -> Result<Self>
    where
        S: Into<String>,
    {
        let deprel = deprel.into();
        let valid = match arc {
            ArcKind::Left => list != ListOp::Shift,
            ArcKind::Right => list != ListOp::Reduce,
            ArcKind::No => false,
        };
        if !valid {
            return Err(RudepError::invalid_argument("invalid arc transition"));
        }
        if deprel.is_empty() {
            return Err(RudepError::invalid_argument("arc label must not be empty"));
        }
        Ok(Self { arc, list, deprel })
    }

    /// Creates a transition without an arc.
    pub fn no_arc(list: ListOp) -> Self {
        Self {
            arc: ArcKind::No,
            list,
            deprel: String::new(),
        }
    }

    /// Creates `N_S`.
    pub fn shift() -> Self {
        Self::no_arc(ListOp::Shift)
    }

    /// Gets the arc kind.
    #[inline(always)]
    pub const fn arc_kind(&self) -> ArcKind {
        self.arc
    }

    /// Gets the list operation.
    #[inline(always)]
    pub const fn list_op(&self) -> ListOp {
        self.list
    }

    /// Gets the dependency label; empty without an arc.
    #[inline(always)]
    pub fn deprel(&self) -> &str {
        &self.deprel
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let arc = match self.arc {
            ArcKind::Left => 'L',
            ArcKind::Right => 'R',
            ArcKind::No => 'N',
        };
        let list = match self.list {
            ListOp::Shift => 'S',
            ListOp::Reduce => 'R',
            ListOp::Pass => 'P',
        };
        if self.arc == ArcKind::No {
            write!(f, "{arc}_{list}")
        } else {
            write!(f, "{arc}_{list}_{}", self.deprel)
        }
    }
}

impl FromStr for Transition {
    type Err = RudepError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RudepError::model(format!("invalid transition label: {s}"));
        let bytes = s.as_bytes();
        if bytes.len() < 3 || bytes[1] != b'_' {
            return Err(invalid());
        }
        let list = match bytes[2] {
            b'S' => ListOp::Shift,
            b'R' => ListOp::Reduce,
            b'P' => ListOp::Pass,
            _ => return Err(invalid()),
        };
        match (bytes[0], &s[3..]) {
            (b'N', "") => Ok(Self::no_arc(list)),
            (b'L', rest) if rest.len() > 1 && rest.starts_with('_') => {
                Self::arc(ArcKind::Left, list, &rest[1..]).map_err(|_| invalid())
            }
            (b'R', rest) if rest.len() > 1 && rest.starts_with('_') => {
                Self::arc(ArcKind::Right, list, &rest[1..]).map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    }
}

/// Transitions of a model's labels, indexed like the labels.
#[derive(Clone, Debug)]
pub struct TransitionTable {
    transitions: Vec<Transition>,
}

impl TransitionTable {
    /// Parses every label of `model`.
    ///
    /// # Errors
    ///
    /// A label that is not a transition fails with [`RudepError::Model`].
    pub fn new(model: &Model) -> Result<Self> {
        let transitions = model
            .labels()
            .labels()
            .iter()
            .map(|label| label.parse())
            .collect::<Result<_>>()?;
        Ok(Self { transitions })
    }

    /// Gets the transition of a label index.
    #[inline(always)]
    pub fn get(&self, label: usize) -> Option<&Transition> {
        self.transitions.get(label)
    }

    /// Returns the number of transitions.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns `true` if the table is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Returns `true` if `id` has a gold arc with any token after `beta`.
fn has_relation_after(gold: &DependencyTree, id: usize, beta: usize) -> bool {
    gold.head_id(id).is_some_and(|h| h > beta)
        || (beta + 1..gold.len()).any(|k| gold.head_id(k) == Some(id))
}

/// Returns `true` if `id` has a gold arc with a non-reduced token before `lambda`.
fn has_relation_before(state: &ParserState<'_>, gold: &DependencyTree, id: usize) -> bool {
    (0..state.lambda()).any(|k| {
        !state.is_reduced(k) && (gold.head_id(k) == Some(id) || gold.head_id(id) == Some(k))
    })
}

/// Derives the transition leading towards `gold` from the current state.
///
/// Arcs of `gold` that can no longer be added in `state` are skipped, so the
/// result is valid on states that already diverged from the gold tree.
pub fn oracle(state: &ParserState<'_>, gold: &DependencyTree) -> Transition {
    let lambda = state.lambda();
    let beta = state.beta();

    if let Some(head) = gold.head(lambda).filter(|h| h.id == beta) {
        let list = if has_relation_after(gold, lambda, beta) {
            ListOp::Pass
        } else {
            ListOp::Reduce
        };
        let t = Transition {
            arc: ArcKind::Left,
            list,
            deprel: head.label.clone(),
        };
        if state.is_valid(&t) {
            return t;
        }
    }
    if let Some(head) = gold.head(beta).filter(|h| h.id == lambda) {
        let list = if has_relation_before(state, gold, beta) {
            ListOp::Pass
        } else {
            ListOp::Shift
        };
        let t = Transition {
            arc: ArcKind::Right,
            list,
            deprel: head.label.clone(),
        };
        if state.is_valid(&t) {
            return t;
        }
    }

    if !has_relation_before(state, gold, beta) {
        return Transition::no_arc(ListOp::Shift);
    }
    let t = Transition::no_arc(ListOp::Reduce);
    if state.is_valid(&t) && !has_relation_after(gold, lambda, beta) {
        return t;
    }
    Transition::no_arc(ListOp::Pass)
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloc::string::ToString;

    use crate::parser::state::{Sentence, Token};

    #[test]
    fn test_label_format() {
        for label in ["L_R_det", "L_P_nsubj", "R_S_obj", "R_P_root", "N_S", "N_R", "N_P"] {
            let t: Transition = label.parse().unwrap();
            assert_eq!(label, t.to_string());
        }
        let t: Transition = "L_P_compound_prt".parse().unwrap();
        assert_eq!(ArcKind::Left, t.arc_kind());
        assert_eq!(ListOp::Pass, t.list_op());
        assert_eq!("compound_prt", t.deprel());
    }

    #[test]
    fn test_invalid_labels() {
        for label in ["", "N", "N_X", "N_S_det", "L_S_det", "R_R_det", "L_R", "L_R_", "X_S", "LxR_det"] {
            assert!(
                matches!(label.parse::<Transition>(), Err(RudepError::Model(_))),
                "{label}"
            );
        }
    }

    fn sentence(pos: &[&str], heads: &[(usize, &str)]) -> Sentence {
        let tokens = pos.iter().map(|p| Token::new(p.to_lowercase(), *p)).collect();
        let heads = heads.iter().map(|&(h, l)| (h, l.to_string())).collect();
        Sentence::with_gold(tokens, heads).unwrap()
    }

    fn follow_oracle(mut sentence: Sentence) -> (DependencyTree, Vec<String>) {
        let gold = sentence.take_gold().unwrap();
        let mut state = ParserState::new(&sentence);
        let mut labels = vec![];
        while !state.is_terminal() {
            let t = oracle(&state, &gold);
            assert!(state.is_valid(&t), "{t}");
            labels.push(t.to_string());
            state.apply(&t, 0.0);
        }
        assert_eq!(gold.len(), state.tree().count_matches(&gold) + 1);
        (state.into_tree(), labels)
    }

    #[test]
    fn test_oracle_projective() {
        let s = sentence(
            &["DT", "NN", "VB", "DT", "NN"],
            &[(2, "det"), (3, "nsubj"), (0, "root"), (5, "det"), (3, "obj")],
        );
        let (_, labels) = follow_oracle(s);
        assert_eq!(
            vec!["N_S", "L_R_det", "N_S", "L_R_nsubj", "R_S_root", "N_S", "L_R_det", "R_S_obj"],
            labels
        );
    }

    #[test]
    fn test_oracle_non_projective() {
        // the arc 1 -> 3 crosses 2 -> 4
        let s = sentence(
            &["A", "B", "C", "D"],
            &[(0, "root"), (1, "x"), (1, "y"), (2, "z")],
        );
        let (tree, _) = follow_oracle(s);
        assert_eq!(vec![3, 4], tree.non_projective_arcs());
    }

    #[test]
    fn test_oracle_after_divergence() {
        let mut s = sentence(&["DT", "NN", "VB"], &[(2, "det"), (3, "nsubj"), (0, "root")]);
        let gold = s.take_gold().unwrap();
        let mut state = ParserState::new(&s);
        state.apply(&Transition::shift(), 0.0);
        // 2 gets a wrong label and 1 is passed over before its head
        state.apply(&"N_S".parse().unwrap(), 0.0);
        state.apply(&"L_P_dep".parse().unwrap(), 0.0);
        while !state.is_terminal() {
            let t = oracle(&state, &gold);
            assert!(state.is_valid(&t), "{t}");
            state.apply(&t, 0.0);
        }
        assert_eq!(Some(3), state.tree().head_id(2));
        assert_eq!(Some(0), state.tree().head_id(3));
    }
}
