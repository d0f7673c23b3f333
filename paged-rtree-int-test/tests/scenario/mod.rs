//! End-to-end scenarios over the public tree API.

mod configuration_test;
mod grid_test;
mod split_test;
