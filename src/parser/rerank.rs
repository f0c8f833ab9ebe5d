use alloc::string::String;

use hashbrown::HashSet;

use crate::model::{sort_predictions, Prediction};
use crate::parser::state::ParserState;
use crate::parser::transition::{ArcKind, TransitionTable};

/// Structural constraints applied to the ranked decisions of every step.
pub trait Reranker {
    /// Adjusts the scores of `predictions`, which are ranked by descending
    /// score, and re-ranks them.
    fn rerank(
        &self,
        state: &ParserState<'_>,
        transitions: &TransitionTable,
        predictions: &mut [Prediction],
    );

    /// Returns `true` if token `id` must not become a head.
    fn is_not_head(&self, _state: &ParserState<'_>, _id: usize) -> bool {
        false
    }
}

/// Leaves the ranking as is.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRerank;

impl Reranker for NoRerank {
    fn rerank(&self, _: &ParserState<'_>, _: &TransitionTable, _: &mut [Prediction]) {}
}

/// Allows at most one dependent per head for each of the given labels.
///
/// An arc whose head already has a dependent with the same label is demoted
/// to a score of `-1`.
#[derive(Clone, Debug, Default)]
pub struct UniqueLabels {
    labels: HashSet<String>,
}

impl UniqueLabels {
    /// Creates a reranker for the given dependency labels.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

impl Reranker for UniqueLabels {
    fn rerank(
        &self,
        state: &ParserState<'_>,
        transitions: &TransitionTable,
        predictions: &mut [Prediction],
    ) {
        let mut changed = false;
        for p in predictions.iter_mut() {
            let Some(t) = transitions.get(p.label) else {
                continue;
            };
            let head = match t.arc_kind() {
                ArcKind::Left => state.beta(),
                ArcKind::Right => state.lambda(),
                ArcKind::No => continue,
            };
            if !self.labels.contains(t.deprel()) {
                continue;
            }
            let taken = state
                .tree()
                .heads()
                .iter()
                .flatten()
                .any(|h| h.id == head && h.label == t.deprel());
            if taken && p.score > -1.0 {
                p.score = -1.0;
                changed = true;
            }
        }
        if changed {
            sort_predictions(predictions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::Model;
    use crate::parser::state::{Sentence, Token};

    #[test]
    fn test_unique_labels_demotes_second_subject() {
        let mut model = Model::new();
        for label in ["R_S_nsubj", "L_R_nsubj", "N_S", "L_R_obj"] {
            model.add_label(label);
        }
        let table = TransitionTable::new(&model).unwrap();
        let sentence = Sentence::new(vec![
            Token::new("a", "NN"),
            Token::new("b", "NN"),
            Token::new("c", "VB"),
        ]);
        let mut state = ParserState::new(&sentence);
        state.apply(&"N_S".parse().unwrap(), 0.0);
        state.apply(&"N_S".parse().unwrap(), 0.0);
        state.apply(&"L_P_nsubj".parse().unwrap(), 0.0);
        // lambda = 1, beta = 3: 3 already heads a subject
        assert_eq!((1, 3), (state.lambda(), state.beta()));

        let mut predictions = vec![
            Prediction::new(1, 3.0),
            Prediction::new(3, 2.0),
            Prediction::new(0, 1.0),
            Prediction::new(2, 0.5),
        ];
        UniqueLabels::new(["nsubj"]).rerank(&state, &table, &mut predictions);
        let labels: Vec<_> = predictions.iter().map(|p| p.label).collect();
        assert_eq!(vec![3, 0, 2, 1], labels);
        assert_eq!(-1.0, predictions[3].score);

        let mut unchanged = vec![Prediction::new(1, 3.0), Prediction::new(2, 1.0)];
        NoRerank.rerank(&state, &table, &mut unchanged);
        assert_eq!(vec![Prediction::new(1, 3.0), Prediction::new(2, 1.0)], unchanged);
        assert!(!NoRerank.is_not_head(&state, 0));
    }
}
