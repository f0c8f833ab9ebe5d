//! Transition-based dependency parsing with selectional branching.

mod branch;
mod rerank;
mod search;
mod state;
mod transition;
mod tree;

#[cfg(feature = "train")]
mod trainer;

use alloc::vec::Vec;

use crate::errors::Result;
use crate::feature::StringFeatureVector;
use crate::model::{Model, Prediction};
use crate::space::{StringInstance, TrainSpace};

pub use branch::Branch;
pub use rerank::{NoRerank, Reranker, UniqueLabels};
pub use search::{best_derivation, BranchSearch, Derivation};
pub use state::{ParserState, Sentence, Status, Token, ROOT_FORM, ROOT_LABEL, ROOT_POS};
pub use transition::{oracle, ArcKind, ListOp, Transition, TransitionTable};
pub use tree::{DependencyTree, Head};

#[cfg(feature = "train")]
pub use trainer::ParserTrainer;

/// Turns a parser state into the features of the decision at its cursors.
pub trait FeatureExtractor {
    /// Extracts the features of `state`.
    fn extract(&self, state: &ParserState<'_>) -> StringFeatureVector;
}

impl<F> FeatureExtractor for F
where
    F: Fn(&ParserState<'_>) -> StringFeatureVector,
{
    fn extract(&self, state: &ParserState<'_>) -> StringFeatureVector {
        self(state)
    }
}

/// How decisions are taken during a derivation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    /// Follows the oracle and records its decisions.
    Collect,

    /// Follows the model, records the oracle's decisions and keeps the
    /// derivation closest to the gold tree.
    Bootstrap,

    /// Follows the model.
    Decode,
}

/// Decision taken at one step of a derivation.
struct Step {
    transition: Transition,
    score: f64,
}

/// Dependency parser driving a [`Model`] whose labels are transitions.
pub struct Parser<E, R = NoRerank> {
    extractor: E,
    reranker: R,
    beam_size: usize,
    margin: f64,
}

impl<E> Parser<E>
where
    E: FeatureExtractor,
{
    /// Creates a greedy parser without re-ranking.
    pub const fn new(extractor: E) -> Self {
        Self {
            extractor,
            reranker: NoRerank,
            beam_size: 1,
            margin: 0.5,
        }
    }
}

impl<E, R> Parser<E, R>
where
    E: FeatureExtractor,
    R: Reranker,
{
    /// Replaces the re-ranker.
    pub fn reranker<R2>(self, reranker: R2) -> Parser<E, R2>
    where
        R2: Reranker,
    {
        Parser {
            extractor: self.extractor,
            reranker,
            beam_size: self.beam_size,
            margin: self.margin,
        }
    }

    /// Sets the number of derivations explored per sentence.
    ///
    /// # Errors
    ///
    /// `beam_size` must be at least 1.
    pub fn beam_size(mut self, beam_size: usize) -> Result<Self> {
        BranchSearch::new(beam_size, self.margin)?;
        self.beam_size = beam_size;
        Ok(self)
    }

    /// Sets the score margin under which the runner-up decision is explored.
    ///
    /// # Errors
    ///
    /// `margin` must not be negative.
    pub fn margin(mut self, margin: f64) -> Result<Self> {
        BranchSearch::new(self.beam_size, margin)?;
        self.margin = margin;
        Ok(self)
    }

    /// Gets the feature extractor.
    #[inline(always)]
    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Parses a sentence with the model.
    ///
    /// With a beam size above 1 the alternatives are explored and the
    /// derivation with the highest score is returned. Gold arcs attached to
    /// the sentence are ignored.
    ///
    /// # Errors
    ///
    /// Fails if a label of the model is not a transition.
    pub fn parse(&self, model: &Model, sentence: &Sentence) -> Result<DependencyTree> {
        let search = BranchSearch::new(self.beam_size, self.margin)?;
        let derivation = self.run(Some(model), sentence, None, Mode::Decode, search)?;
        Ok(derivation.tree)
    }

    /// Follows the oracle on a sentence with gold arcs and adds one instance
    /// per decision to `space`.
    ///
    /// The gold tree is moved out of the sentence. Sentences without gold
    /// arcs are skipped.
    ///
    /// # Errors
    ///
    /// Fails if the search cannot be set up with the parser's margin.
    pub fn collect(&self, sentence: &mut Sentence, space: &mut TrainSpace) -> Result<Option<DependencyTree>> {
        let Some(gold) = sentence.take_gold() else {
            return Ok(None);
        };
        let search = BranchSearch::new(1, self.margin)?;
        let derivation = self.run(None, sentence, Some(&gold), Mode::Collect, search)?;
        let (tree, instances) = derivation.into_parts();
        for instance in instances {
            space.add_instance(instance);
        }
        Ok(Some(tree))
    }

    /// Parses a sentence with gold arcs using the model and branching, and
    /// adds the oracle's decisions along the derivation closest to gold to
    /// `space`.
    ///
    /// # Errors
    ///
    /// Fails if a label of the model is not a transition.
    pub fn bootstrap(
        &self,
        model: &Model,
        sentence: &mut Sentence,
        space: &mut TrainSpace,
    ) -> Result<Option<DependencyTree>> {
        let search = BranchSearch::new(self.beam_size, self.margin)?;
        self.bootstrap_with(model, sentence, space, search)
    }

    pub(crate) fn bootstrap_with(
        &self,
        model: &Model,
        sentence: &mut Sentence,
        space: &mut TrainSpace,
        search: BranchSearch,
    ) -> Result<Option<DependencyTree>> {
        let Some(gold) = sentence.take_gold() else {
            return Ok(None);
        };
        let derivation = self.run(Some(model), sentence, Some(&gold), Mode::Bootstrap, search)?;
        let (tree, instances) = derivation.into_parts();
        for instance in instances {
            space.add_instance(instance);
        }
        Ok(Some(tree))
    }

    /// Runs the first derivation, then every retained branch, and returns the
    /// best derivation.
    fn run(
        &self,
        model: Option<&Model>,
        sentence: &Sentence,
        gold: Option<&DependencyTree>,
        mode: Mode,
        mut search: BranchSearch,
    ) -> Result<Derivation> {
        let table = match model {
            Some(model) => TransitionTable::new(model)?,
            None => TransitionTable::new(&Model::new())?,
        };

        let first = self.derive(
            model,
            &table,
            ParserState::new(sentence),
            gold,
            mode,
            Some(&mut search),
            vec![],
        );
        let mut derivations = vec![first];

        search.trim_states();
        if !search.is_empty() {
            log::debug!("exploring {} branches", search.len());
        }
        while let Some(branch) = search.next_branch() {
            let mut state = ParserState::new(sentence);
            state.restore(branch);
            let prediction = branch.prediction();
            let Some(transition) = table.get(prediction.label) else {
                continue;
            };
            let mut instances = vec![];
            if mode != Mode::Decode {
                // the branch point saw the same state as the first derivation
                let end = (branch.n_transitions() + 1).min(derivations[0].instances.len());
                instances.extend_from_slice(&derivations[0].instances[..end]);
            }
            state.apply(transition, prediction.score);
            derivations.push(self.derive(model, &table, state, gold, mode, None, instances));
        }

        let best = best_derivation(&derivations, gold).unwrap_or(0);
        Ok(derivations.swap_remove(best))
    }

    /// Continues a derivation until the state is terminal.
    #[allow(clippy::too_many_arguments)]
    fn derive(
        &self,
        model: Option<&Model>,
        table: &TransitionTable,
        mut state: ParserState<'_>,
        gold: Option<&DependencyTree>,
        mode: Mode,
        mut search: Option<&mut BranchSearch>,
        mut instances: Vec<StringInstance>,
    ) -> Derivation {
        while !state.is_terminal() {
            let features = self.extractor.extract(&state);
            let oracle_step = gold.map(|gold| oracle(&state, gold));
            let step = match (mode, model, oracle_step.as_ref()) {
                (Mode::Collect, _, Some(t)) | (_, None, Some(t)) => Step {
                    transition: t.clone(),
                    score: 0.0,
                },
                (_, Some(model), _) => {
                    self.predict(model, table, &state, &features, search.as_deref_mut())
                }
                (_, None, None) => Step {
                    transition: Transition::shift(),
                    score: 0.0,
                },
            };
            if mode != Mode::Decode {
                if let Some(t) = oracle_step {
                    instances.push(StringInstance::new(t.to_string(), features));
                }
            }
            state.apply(&step.transition, step.score);
        }

        if let Some(model) = model {
            self.repair_orphans(model, table, &mut state);
        }
        if let Some(cycle) = state.tree().find_cycle() {
            log::warn!("derivation contains a cycle: {:?}", cycle);
        }
        let score = state.score();
        Derivation::new(state.into_tree(), score, instances)
    }

    /// Ranks the decisions, skips invalid ones and records the runner-up as a
    /// branch when it is close to the best decision.
    fn predict(
        &self,
        model: &Model,
        table: &TransitionTable,
        state: &ParserState<'_>,
        features: &StringFeatureVector,
        search: Option<&mut BranchSearch>,
    ) -> Step {
        let x = model.to_sparse(features);
        let mut predictions = model.predictions(&x);
        self.reranker.rerank(state, table, &mut predictions);

        let mut valid = predictions.iter().filter_map(|p| {
            let t = table.get(p.label)?;
            self.is_allowed(state, t).then_some((p, t))
        });
        let Some((&best, transition)) = valid.next() else {
            return Step {
                transition: Transition::shift(),
                score: 0.0,
            };
        };
        if let Some(search) = search {
            if let Some((&second, _)) = valid.next() {
                if search.is_ambiguous(best, second) {
                    search.add(state.snapshot(second));
                }
            }
        }
        Step {
            transition: transition.clone(),
            score: best.score,
        }
    }

    fn is_allowed(&self, state: &ParserState<'_>, transition: &Transition) -> bool {
        if !state.is_valid(transition) {
            return false;
        }
        let head = match transition.arc_kind() {
            ArcKind::Left => state.beta(),
            ArcKind::Right => state.lambda(),
            ArcKind::No => return true,
        };
        !self.reranker.is_not_head(state, head)
    }

    /// Attaches every headless token to the best-scoring head that keeps the
    /// arcs acyclic, or to the root.
    fn repair_orphans(&self, model: &Model, table: &TransitionTable, state: &mut ParserState<'_>) {
        let n = state.tokens().len();
        for id in 1..n {
            if state.tree().has_head(id) {
                continue;
            }
            let mut best: Option<(usize, Prediction)> = None;
            for dist in 1..n {
                let left = id.checked_sub(dist);
                let right = Some(id + dist).filter(|&h| h < n);
                for head in [left, right].into_iter().flatten() {
                    if state.tree().is_ancestor(id, head) || self.reranker.is_not_head(state, head) {
                        continue;
                    }
                    let (lambda, beta, kind) = if head < id {
                        (head, id, ArcKind::Right)
                    } else {
                        (id, head, ArcKind::Left)
                    };
                    state.set_cursors(lambda, beta);
                    let features = self.extractor.extract(state);
                    let x = model.to_sparse(&features);
                    let candidate = model
                        .predictions(&x)
                        .into_iter()
                        .find(|p| table.get(p.label).is_some_and(|t| t.arc_kind() == kind));
                    if let Some(p) = candidate {
                        if best.map_or(true, |(_, b)| p.score > b.score) {
                            best = Some((head, p));
                        }
                    }
                }
            }
            let (head, label) = match best.and_then(|(h, p)| table.get(p.label).map(|t| (h, t))) {
                Some((head, t)) => (head, t.deprel()),
                None => (0, ROOT_LABEL),
            };
            log::debug!("attached orphan {} to {} as {}", id, head, label);
            state.tree_mut().set_head(id, head, label);
        }
        state.set_cursors(n.saturating_sub(1), n);
    }
}
