pub mod caption;
pub mod huggingface;
pub mod lazy;
pub mod local;
pub mod media;
pub mod ocr;
