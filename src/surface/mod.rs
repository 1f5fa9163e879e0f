pub mod edit;
pub mod model;

#[cfg(test)]
pub mod fixtures;
