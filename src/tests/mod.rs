pub mod support;

mod resolver;
