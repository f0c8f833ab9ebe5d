use alloc::string::ToString;
use alloc::vec::Vec;

use crate::feature::StringFeatureVector;
use crate::model::Model;
use crate::parser::{ParserState, Sentence, Token};
use crate::space::{Instance, StringInstance, TrainSpace};

/// Two instances per label: one with a shared feature and one with a second
/// feature of its own. Every instance carries a feature unique to its label.
pub fn separable_instances(labels: &[&str]) -> (Model, Vec<Instance>) {
    let mut space = TrainSpace::new();
    for &label in labels {
        let mut x = StringFeatureVector::new();
        x.push("w", label);
        x.push("s", "shared");
        space.add_instance(StringInstance::new(label, x));

        let mut x = StringFeatureVector::new();
        x.push("w", label);
        x.push("x", label);
        space.add_instance(StringInstance::new(label, x));
    }
    let (model, instances) = space.build(0, 0);
    (model, instances.instances().to_vec())
}

/// Fraction of instances whose best prediction is the gold label.
pub fn accuracy(model: &Model, instances: &[Instance]) -> f64 {
    let correct = instances
        .iter()
        .filter(|x| model.predict_best(&x.features).map(|p| p.label) == Some(x.label))
        .count();
    correct as f64 / instances.len() as f64
}

/// Cursor forms and tags, the tag pair and whether `lambda` has a head.
pub fn toy_features(state: &ParserState<'_>) -> StringFeatureVector {
    let mut x = StringFeatureVector::new();
    let lambda = state.token(state.lambda());
    let beta = state.token(state.beta());
    if let Some(t) = lambda {
        x.push("l.form", t.form());
        x.push("l.pos", t.pos());
    }
    if let Some(t) = beta {
        x.push("b.form", t.form());
        x.push("b.pos", t.pos());
    }
    if let (Some(l), Some(b)) = (lambda, beta) {
        x.push("pair", format!("{}_{}", l.pos(), b.pos()));
    }
    x.push("l.head", state.tree().has_head(state.lambda()).to_string());
    x
}

/// Builds a sentence from `form/TAG/head/label` items.
pub fn sentence(items: &str) -> Sentence {
    let mut tokens = vec![];
    let mut heads = vec![];
    for item in items.split_whitespace() {
        let parts: Vec<_> = item.split('/').collect();
        tokens.push(Token::new(parts[0], parts[1]));
        heads.push((parts[2].parse().unwrap(), parts[3].to_string()));
    }
    Sentence::with_gold(tokens, heads).unwrap()
}

/// Projective sentences over a small determiner/adjective/noun/verb grammar.
pub fn toy_sentences() -> Vec<Sentence> {
    [
        "the/DT/2/det dog/NN/3/nsubj barks/VB/0/root",
        "a/DT/2/det cat/NN/3/nsubj sees/VB/0/root the/DT/5/det dog/NN/3/obj",
        "cats/NN/2/nsubj chase/VB/0/root mice/NN/2/obj",
        "the/DT/3/det big/JJ/3/amod dog/NN/4/nsubj sleeps/VB/0/root",
        "dogs/NN/2/nsubj like/VB/0/root the/DT/5/det small/JJ/5/amod cat/NN/2/obj",
        "a/DT/3/det small/JJ/3/amod bird/NN/4/nsubj eats/VB/0/root seeds/NN/4/obj",
    ]
    .into_iter()
    .map(sentence)
    .collect()
}
