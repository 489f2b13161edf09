pub mod aggregate;
pub mod chesscom;
pub mod config;
pub mod db;
pub mod models;
pub mod normalize;
pub mod ops;
pub mod rating;
pub mod store;

#[cfg(test)]
pub mod test_utils;
