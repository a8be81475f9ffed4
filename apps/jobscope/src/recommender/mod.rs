// Content-based recommender: TF-IDF index, cosine ranking, term-overlap explanations.

pub mod handlers;
pub mod index;
pub mod query;
pub mod sparse;
pub mod tokenize;
pub mod train;
pub mod vectorizer;

pub use index::RecommenderIndex;
pub use query::Recommendation;
pub use train::run_train_stage;
pub use vectorizer::DEFAULT_MAX_FEATURES;
