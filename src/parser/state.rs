use alloc::string::String;
use alloc::vec::Vec;

use crate::errors::{Result, RudepError};
use crate::model::Prediction;
use crate::parser::branch::Branch;
use crate::parser::transition::{ArcKind, ListOp, Transition};
use crate::parser::tree::DependencyTree;

/// Form and lemma of the artificial root.
pub const ROOT_FORM: &str = "<root>";

/// Part-of-speech tag of the artificial root.
pub const ROOT_POS: &str = "<root>";

/// Label used when a token is attached to the root by the fallback repair.
pub const ROOT_LABEL: &str = "root";

/// A token of the input sentence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    form: String,
    lemma: String,
    pos: String,
}

impl Token {
    /// Creates a token whose lemma is its form.
    pub fn new<F, P>(form: F, pos: P) -> Self
    where
        F: Into<String>,
        P: Into<String>,
    {
        let form = form.into();
        Self {
            lemma: form.clone(),
            form,
            pos: pos.into(),
        }
    }

    /// Sets the lemma.
    pub fn with_lemma<L>(mut self, lemma: L) -> Self
    where
        L: Into<String>,
    {
        self.lemma = lemma.into();
        self
    }

    /// Gets the surface form.
    #[inline(always)]
    pub fn form(&self) -> &str {
        &self.form
    }

    /// Gets the lemma.
    #[inline(always)]
    pub fn lemma(&self) -> &str {
        &self.lemma
    }

    /// Gets the part-of-speech tag.
    #[inline(always)]
    pub fn pos(&self) -> &str {
        &self.pos
    }

    fn root() -> Self {
        Self::new(ROOT_FORM, ROOT_POS)
    }
}

/// A sentence with the root token at id 0 and optional gold arcs.
#[derive(Clone, Debug, PartialEq)]
pub struct Sentence {
    tokens: Vec<Token>,
    gold: Option<DependencyTree>,
}

impl Sentence {
    /// Creates a sentence; the root token is prepended.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut all = Vec::with_capacity(tokens.len() + 1);
        all.push(Token::root());
        all.extend(tokens);
        Self {
            tokens: all,
            gold: None,
        }
    }

    /// Creates a sentence with gold `(head id, label)` pairs, one per token.
    ///
    /// Head ids count the root as 0 and the first token as 1.
    ///
    /// # Errors
    ///
    /// Every token needs a head inside the sentence, other than itself, with
    /// a non-empty label.
    pub fn with_gold(tokens: Vec<Token>, heads: Vec<(usize, String)>) -> Result<Self> {
        if tokens.len() != heads.len() {
            return Err(RudepError::invalid_argument(
                "one gold head is required per token",
            ));
        }
        let mut sentence = Self::new(tokens);
        let mut gold = DependencyTree::new(sentence.len());
        for (i, (head, label)) in heads.into_iter().enumerate() {
            let id = i + 1;
            if head >= sentence.len() || head == id {
                return Err(RudepError::invalid_argument("gold head out of range"));
            }
            if label.is_empty() {
                return Err(RudepError::invalid_argument("gold label must not be empty"));
            }
            gold.set_head(id, head, label);
        }
        sentence.gold = Some(gold);
        Ok(sentence)
    }

    /// Returns the number of tokens including the root.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if the sentence has no token besides the root.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.tokens.len() <= 1
    }

    /// Gets the tokens, root first.
    #[inline(always)]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Gets the gold tree, if any is attached.
    #[inline(always)]
    pub fn gold(&self) -> Option<&DependencyTree> {
        self.gold.as_ref()
    }

    /// Moves the gold tree out of the sentence.
    pub fn take_gold(&mut self) -> Option<DependencyTree> {
        self.gold.take()
    }
}

/// Status of a derivation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// Transitions remain to be applied.
    Active,

    /// `beta` passed the last token.
    Terminal,
}

/// Live state of a derivation over one sentence.
#[derive(Clone, Debug)]
pub struct ParserState<'a> {
    tokens: &'a [Token],
    tree: DependencyTree,
    lambda: usize,
    beta: usize,
    n_transitions: usize,
    score: f64,
    reduced: Vec<bool>,
}

impl<'a> ParserState<'a> {
    /// Creates the initial state with `lambda` on the root and `beta` on the
    /// first token.
    pub fn new(sentence: &'a Sentence) -> Self {
        let n = sentence.len();
        Self {
            tokens: sentence.tokens(),
            tree: DependencyTree::new(n),
            lambda: 0,
            beta: 1,
            n_transitions: 0,
            score: 0.0,
            reduced: vec![false; n],
        }
    }

    /// Gets the tokens, root first.
    #[inline(always)]
    pub fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    /// Gets a token by id.
    #[inline(always)]
    pub fn token(&self, id: usize) -> Option<&'a Token> {
        self.tokens.get(id)
    }

    /// Gets the arcs built so far.
    #[inline(always)]
    pub fn tree(&self) -> &DependencyTree {
        &self.tree
    }

    /// Consumes the state and returns its arcs.
    pub fn into_tree(self) -> DependencyTree {
        self.tree
    }

    /// Gets the left cursor.
    #[inline(always)]
    pub const fn lambda(&self) -> usize {
        self.lambda
    }

    /// Gets the right cursor.
    #[inline(always)]
    pub const fn beta(&self) -> usize {
        self.beta
    }

    /// Gets the number of applied transitions.
    #[inline(always)]
    pub const fn n_transitions(&self) -> usize {
        self.n_transitions
    }

    /// Gets the summed score of the applied transitions.
    #[inline(always)]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Returns `true` if the token was reduced.
    #[inline(always)]
    pub fn is_reduced(&self, id: usize) -> bool {
        self.reduced.get(id).copied().unwrap_or(false)
    }

    /// Gets the status.
    #[inline(always)]
    pub fn status(&self) -> Status {
        if self.beta >= self.tokens.len() {
            Status::Terminal
        } else {
            Status::Active
        }
    }

    /// Returns `true` if no transition remains.
    #[inline(always)]
    pub fn is_terminal(&self) -> bool {
        self.status() == Status::Terminal
    }

    /// Returns `true` if `transition` keeps the arcs a forest in this state.
    pub fn is_valid(&self, transition: &Transition) -> bool {
        if self.is_terminal() {
            return false;
        }
        let arc_ok = match transition.arc_kind() {
            ArcKind::Left => {
                self.lambda != 0
                    && !self.tree.has_head(self.lambda)
                    && !self.tree.is_ancestor(self.lambda, self.beta)
            }
            ArcKind::Right => {
                !self.tree.has_head(self.beta) && !self.tree.is_ancestor(self.beta, self.lambda)
            }
            ArcKind::No => true,
        };
        let list_ok = match transition.list_op() {
            ListOp::Reduce => {
                self.lambda != 0
                    && (transition.arc_kind() == ArcKind::Left || self.tree.has_head(self.lambda))
            }
            ListOp::Shift | ListOp::Pass => true,
        };
        arc_ok && list_ok
    }

    /// Applies a transition and adds its score.
    ///
    /// Validity is not checked; see [`ParserState::is_valid`].
    pub fn apply(&mut self, transition: &Transition, score: f64) {
        match transition.arc_kind() {
            ArcKind::Left => self
                .tree
                .set_head(self.lambda, self.beta, transition.deprel()),
            ArcKind::Right => self
                .tree
                .set_head(self.beta, self.lambda, transition.deprel()),
            ArcKind::No => (),
        }
        match transition.list_op() {
            ListOp::Shift => self.shift(),
            ListOp::Reduce => {
                self.reduced[self.lambda] = true;
                self.pass();
            }
            ListOp::Pass => self.pass(),
        }
        self.n_transitions += 1;
        self.score += score;
    }

    fn shift(&mut self) {
        self.lambda = self.beta;
        self.beta += 1;
    }

    fn pass(&mut self) {
        match (0..self.lambda).rev().find(|&k| !self.reduced[k]) {
            Some(k) => self.lambda = k,
            None => self.shift(),
        }
    }

    /// Points the cursors at a pair of tokens, as the head repair does.
    pub(crate) fn set_cursors(&mut self, lambda: usize, beta: usize) {
        self.lambda = lambda;
        self.beta = beta;
    }

    pub(crate) fn tree_mut(&mut self) -> &mut DependencyTree {
        &mut self.tree
    }

    /// Takes a snapshot to resume from with `prediction` applied.
    pub fn snapshot(&self, prediction: Prediction) -> Branch {
        Branch {
            lambda: self.lambda,
            beta: self.beta,
            n_transitions: self.n_transitions,
            score: self.score,
            reduced: self.reduced.clone(),
            tree: self.tree.clone(),
            prediction,
        }
    }

    /// Restores the cursors, counters and arcs of a snapshot.
    pub fn restore(&mut self, branch: &Branch) {
        self.lambda = branch.lambda;
        self.beta = branch.beta;
        self.n_transitions = branch.n_transitions;
        self.score = branch.score;
        self.reduced.clone_from(&branch.reduced);
        self.tree.clone_from(&branch.tree);
    }
}
