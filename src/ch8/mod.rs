pub mod audio;
pub mod config;
pub mod disp;
pub mod error;
pub mod input;
pub mod instruct;
pub mod interp;
pub mod mem;
pub mod pace;
pub mod preset;
pub mod quirk;
pub mod rom;
pub mod run;
pub mod stats;
pub mod vm;
