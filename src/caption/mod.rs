pub mod aspect;
pub mod assemble;
pub mod engine;
pub mod enhance;
pub mod normalize;
pub mod polish;
