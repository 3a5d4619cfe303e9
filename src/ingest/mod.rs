//! Turns a classified inbound message into the prompt handed to the completion service.

pub mod audio;
pub mod text;

pub use audio::{ AudioIngest, TRANSCRIPTION_UNAVAILABLE };
