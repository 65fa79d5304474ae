pub mod pipeline;
pub mod prepayment;
