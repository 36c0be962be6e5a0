mod code_test;
mod common;
mod health_test;
