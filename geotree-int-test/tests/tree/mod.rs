mod concurrency_test;
mod insert_test;
mod remove_test;
