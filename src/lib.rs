//! # rudep
//!
//! Transition-based dependency parsing with selectional branching, driven by
//! online multiclass linear classifiers, in pure Rust
#![cfg_attr(
    feature = "train",
    doc = r#"
## Examples

```rust
use rudep::parser::{Parser, ParserState, ParserTrainer, Sentence, Token};
use rudep::StringFeatureVector;

// The tag pair under the cursors is enough for this toy grammar.
fn features(state: &ParserState<'_>) -> StringFeatureVector {
    let pos = |id| state.token(id).map_or("-", |t| t.pos());
    let mut x = StringFeatureVector::new();
    x.push("pair", format!("{}_{}", pos(state.lambda()), pos(state.beta())));
    x
}

let train = vec![
    Sentence::with_gold(
        vec![Token::new("the", "DT"), Token::new("dog", "NN"), Token::new("barks", "VB")],
        vec![(2, "det".into()), (3, "nsubj".into()), (0, "root".into())],
    )?,
];

let parser = Parser::new(features);
let model = ParserTrainer::new()
    .set("alpha", "0.1")?
    .set("rounds", "20")?
    .train(&parser, &train)?;

let sentence = Sentence::new(vec![
    Token::new("a", "DT"),
    Token::new("cat", "NN"),
    Token::new("sleeps", "VB"),
]);
let tree = parser.parse(&model, &sentence)?;

assert_eq!(Some(2), tree.head_id(1));
assert_eq!(Some(3), tree.head_id(2));
assert_eq!(Some(0), tree.head_id(3));
# Ok::<(), rudep::RudepError>(())
```
"#
)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate alloc;

mod dictionary;
pub mod errors;
mod feature;
mod math;
mod model;
pub mod parser;
mod space;
mod vector;

#[cfg(feature = "train")]
pub mod parallel;
#[cfg(feature = "train")]
pub mod solvers;
#[cfg(feature = "train")]
mod trainer;

#[cfg(test)]
mod test_utils;

pub use dictionary::{FeatureDictionary, LabelDictionary};
pub use errors::{Result, RudepError};
pub use feature::{Feature, SparseFeatureVector, StringFeature, StringFeatureVector};
pub use model::{sort_predictions, Model, Prediction};
pub use space::{Instance, InstanceSet, StringInstance, TrainSpace};
pub use vector::WeightMatrix;

#[cfg(feature = "train")]
pub use solvers::Loss;
#[cfg(feature = "train")]
pub use trainer::{Algorithm, Trainer};
