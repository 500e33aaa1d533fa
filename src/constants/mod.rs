pub mod books;
pub mod prompts;
pub mod structures;
