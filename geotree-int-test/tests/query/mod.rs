mod grid_test;
mod nearest_test;
mod predicate_test;
