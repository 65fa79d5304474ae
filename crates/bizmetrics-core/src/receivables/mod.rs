pub mod aging;
