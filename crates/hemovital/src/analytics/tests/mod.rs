mod common;
mod forecast;
mod matching;
