pub mod best_insertion;
pub mod recreate_context;
