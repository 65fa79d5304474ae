pub mod risk_matrix;
