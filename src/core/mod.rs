pub mod duplicate;
pub mod image;
pub mod scanner;
pub mod scatter;
pub mod signature;
