// Job matching: filter, score and order the corpus against a query and an
// optional resume prediction. Everything here except handlers is pure.

pub mod engine;
pub mod handlers;
pub mod locations;
pub mod query;
