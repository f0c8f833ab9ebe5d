use core::time::Duration;
use std::time::Instant;

use alloc::vec::Vec;

use crate::errors::{Result, RudepError};
use crate::model::Model;
use crate::parallel::collect_shards;
use crate::parser::search::BranchSearch;
use crate::parser::state::Sentence;
use crate::parser::{FeatureExtractor, Parser, Reranker};
use crate::space::TrainSpace;
use crate::trainer::{parse_value, Trainer};

/// Trains a transition model in rounds.
///
/// The first round collects the oracle's decisions and trains a model on
/// them. Every further round parses the training sentences with the current
/// model, collects the oracle's decisions along the derivation closest to
/// gold and trains a new model on those.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Clone, Debug)]
pub struct ParserTrainer {
    trainer: Trainer,
    rounds: Vec<usize>,
    beam_size: usize,
    margin: f64,
    n_threads: usize,
    timeout: Option<Duration>,
}

impl ParserTrainer {
    /// Creates a trainer with one round of 10 passes and greedy bootstrapping.
    pub fn new() -> Self {
        Self {
            trainer: Trainer::new(),
            rounds: vec![10],
            beam_size: 1,
            margin: 0.5,
            n_threads: 1,
            timeout: None,
        }
    }

    /// Replaces the classifier trainer. Its iteration count is overridden by
    /// the rounds.
    pub fn trainer(mut self, trainer: Trainer) -> Self {
        self.trainer = trainer;
        self
    }

    /// Sets the number of passes of each round.
    ///
    /// # Errors
    ///
    /// At least one round is required and every round needs a pass.
    pub fn rounds(mut self, rounds: Vec<usize>) -> Result<Self> {
        if rounds.is_empty() || rounds.contains(&0) {
            return Err(RudepError::invalid_argument(
                "rounds must be non-empty with at least one pass each",
            ));
        }
        self.rounds = rounds;
        Ok(self)
    }

    /// Sets the beam size used while bootstrapping.
    ///
    /// # Errors
    ///
    /// `beam_size` must be at least 1.
    pub fn beam_size(mut self, beam_size: usize) -> Result<Self> {
        BranchSearch::new(beam_size, self.margin)?;
        self.beam_size = beam_size;
        Ok(self)
    }

    /// Sets the branching margin used while bootstrapping.
    ///
    /// # Errors
    ///
    /// `margin` must not be negative.
    pub fn margin(mut self, margin: f64) -> Result<Self> {
        BranchSearch::new(self.beam_size, margin)?;
        self.margin = margin;
        Ok(self)
    }

    /// Sets the number of collection workers.
    ///
    /// # Errors
    ///
    /// `n_threads` must be at least 1.
    pub fn n_threads(mut self, n_threads: usize) -> Result<Self> {
        if n_threads == 0 {
            return Err(RudepError::invalid_argument("n_threads must not be 0"));
        }
        self.n_threads = n_threads;
        Ok(self)
    }

    /// Sets the time limit of each collection round.
    ///
    /// Once it elapses, sentences not yet started are dropped and the round
    /// fails after the sentences in progress finish.
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets a parameter by name.
    ///
    /// Adds `beam`, `margin`, `rounds` (comma-separated passes) and `timeout`
    /// (seconds) to the names of [`Trainer::set`]. `threads` sets both the
    /// collection workers and the solver threads.
    ///
    /// # Errors
    ///
    /// Unknown names fail with [`RudepError::UnknownConfig`], unparsable or
    /// out-of-range values with [`RudepError::InvalidArgument`].
    pub fn set(mut self, name: &str, value: &str) -> Result<Self> {
        match name {
            "beam" => self.beam_size(parse_value(value)?),
            "margin" => self.margin(parse_value(value)?),
            "rounds" => {
                let rounds = value
                    .split(',')
                    .map(|r| parse_value(r.trim()))
                    .collect::<Result<Vec<_>>>()?;
                self.rounds(rounds)
            }
            "timeout" => {
                let secs: f64 = parse_value(value)?;
                let timeout = Duration::try_from_secs_f64(secs)
                    .map_err(|_| RudepError::invalid_argument("timeout must be >= 0"))?;
                Ok(self.timeout(Some(timeout)))
            }
            "threads" => {
                self.trainer = self.trainer.set(name, value)?;
                self.n_threads(parse_value(value)?)
            }
            _ => {
                self.trainer = self.trainer.set(name, value)?;
                Ok(self)
            }
        }
    }

    /// Trains a model for `parser` on sentences with gold arcs.
    ///
    /// Sentences without gold arcs contribute nothing.
    ///
    /// # Errors
    ///
    /// Fails when a collection worker fails or times out, or when the solver
    /// fails.
    pub fn train<E, R>(&self, parser: &Parser<E, R>, sentences: &[Sentence]) -> Result<Model>
    where
        E: FeatureExtractor + Sync,
        R: Reranker + Sync,
    {
        let mut model: Option<Model> = None;
        for (round, &passes) in self.rounds.iter().enumerate() {
            let start = Instant::now();
            let space = match &model {
                None => self.collect_round(sentences, |sentence, space| {
                    parser.collect(sentence, space).map(|_| ())
                })?,
                Some(model) => self.collect_round(sentences, |sentence, space| {
                    let search = BranchSearch::new(self.beam_size, self.margin)?;
                    parser
                        .bootstrap_with(model, sentence, space, search)
                        .map(|_| ())
                })?,
            };
            log::info!(
                "round {}/{}: {} instances collected in {:?}",
                round + 1,
                self.rounds.len(),
                space.len(),
                start.elapsed(),
            );
            let trainer = self.trainer.clone().iterations(passes)?;
            model = Some(trainer.build_and_train(space)?);
        }
        model.ok_or(RudepError::invalid_argument("rounds must not be empty"))
    }

    /// Runs `f` on every sentence over the workers and merges the spaces in
    /// sentence order.
    ///
    /// Every sentence is its own shard, so a timeout cancels all sentences
    /// not yet started and waits for at most one sentence per worker.
    fn collect_round<F>(&self, sentences: &[Sentence], f: F) -> Result<TrainSpace>
    where
        F: Fn(&mut Sentence, &mut TrainSpace) -> Result<()> + Sync,
    {
        let shards = sentences.to_vec();
        let spaces = collect_shards(shards, self.n_threads, self.timeout, |mut sentence| {
            let mut space = TrainSpace::new();
            f(&mut sentence, &mut space)?;
            Ok(space)
        })?;
        let mut merged = TrainSpace::new();
        for space in spaces {
            merged.append(space);
        }
        Ok(merged)
    }
}

impl Default for ParserTrainer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use crate::feature::StringFeatureVector;
    use crate::parser::{DependencyTree, ParserState};
    use crate::test_utils::{toy_features, toy_sentences};

    fn slow_features(state: &ParserState<'_>) -> StringFeatureVector {
        thread::sleep(Duration::from_millis(20));
        toy_features(state)
    }

    fn labeled_accuracy(model: &Model, sentences: &[Sentence]) -> f64 {
        let parser = Parser::new(toy_features);
        let mut matched = 0;
        let mut total = 0;
        for sentence in sentences {
            let gold: &DependencyTree = sentence.gold().unwrap();
            let tree = parser.parse(model, sentence).unwrap();
            matched += tree.count_matches(gold);
            total += sentence.len() - 1;
        }
        matched as f64 / total as f64
    }

    fn trainer() -> ParserTrainer {
        ParserTrainer::new()
            .set("alpha", "0.1")
            .unwrap()
            .set("rounds", "20")
            .unwrap()
    }

    #[test_log::test]
    fn test_collect_round_fits_training_data() {
        let sentences = toy_sentences();
        let parser = Parser::new(toy_features);
        let model = trainer().train(&parser, &sentences).unwrap();
        assert_eq!(1.0, labeled_accuracy(&model, &sentences));
        for label in ["N_S", "L_R_det", "L_R_amod", "L_R_nsubj", "R_S_root", "R_S_obj"] {
            assert!(model.label_index(label).is_some(), "{label}");
        }
    }

    #[test_log::test]
    fn test_workers_do_not_change_the_model() {
        let sentences = toy_sentences();
        let parser = Parser::new(toy_features);
        let single = trainer().train(&parser, &sentences).unwrap();
        let sharded = trainer()
            .n_threads(3)
            .unwrap()
            .train(&parser, &sentences)
            .unwrap();
        assert_eq!(single, sharded);
    }

    #[test_log::test]
    fn test_bootstrap_rounds() {
        let sentences = toy_sentences();
        let parser = Parser::new(toy_features);
        let model = trainer()
            .set("rounds", "20, 10")
            .unwrap()
            .set("beam", "2")
            .unwrap()
            .set("margin", "1.0")
            .unwrap()
            .train(&parser, &sentences)
            .unwrap();
        assert_eq!(1.0, labeled_accuracy(&model, &sentences));
    }

    #[test_log::test]
    fn test_timeout_bounds_collection() {
        // several seconds of work when run to completion
        let sentences: Vec<_> = (0..7).flat_map(|_| toy_sentences()).collect();
        let parser = Parser::new(slow_features);
        let start = Instant::now();
        let res = trainer()
            .n_threads(2)
            .unwrap()
            .set("timeout", "0.05")
            .unwrap()
            .train(&parser, &sentences);
        assert!(matches!(res, Err(RudepError::Worker(_))));
        assert!(start.elapsed() < Duration::from_millis(1500), "{:?}", start.elapsed());
    }

    #[test]
    fn test_set_by_name() {
        let t = ParserTrainer::new()
            .set("threads", "4")
            .unwrap()
            .set("timeout", "1.5")
            .unwrap();
        assert_eq!(4, t.n_threads);
        assert_eq!(Some(Duration::from_millis(1500)), t.timeout);

        assert!(ParserTrainer::new().set("rounds", "10,0").is_err());
        assert!(ParserTrainer::new().set("rounds", "").is_err());
        assert!(ParserTrainer::new().set("beam", "0").is_err());
        assert!(ParserTrainer::new().set("timeout", "-1").is_err());
        assert!(matches!(
            ParserTrainer::new().set("width", "3"),
            Err(RudepError::UnknownConfig(_))
        ));
    }
}
