mod basic;
mod download;
mod list;
mod remove;
mod utils;
