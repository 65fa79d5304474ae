pub mod clv;
