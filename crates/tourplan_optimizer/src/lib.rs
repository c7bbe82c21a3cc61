mod acceptor;
pub mod export;
pub mod json;
pub mod problem;
mod selector;
pub mod solver;
mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
