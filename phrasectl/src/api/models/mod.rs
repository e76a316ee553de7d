//! Request and response bodies for the API.

pub mod run;
