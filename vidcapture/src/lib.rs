/*!
    Bounded camera capture into in-memory containers, with JPEG thumbnails,
    a blob queue for the artifacts and concatenation of stored clips.
*/

pub mod capture;
pub mod cli;
pub mod concat;
pub mod config;
pub mod error;
pub mod export;
pub mod queue;

#[cfg(test)]
mod fixtures;
