pub mod decomposition;
