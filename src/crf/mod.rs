#![allow(non_snake_case)]

pub mod crf1d;
pub mod lbfgs;
pub mod model;
pub mod tagger;
pub mod trainer;
