pub mod collect;
pub mod filter;
pub mod modify;
pub mod undefined_lengths;
pub mod validate;
