pub mod agreement;
pub mod consensus;
pub mod coverage;
pub mod domain;
pub mod pipeline;
pub mod strategy;
pub mod validator;

#[cfg(test)]
mod fixtures;
