pub mod dataset;
pub mod decompose;
pub mod discretization;
pub mod indicators;
pub mod lagging;
pub mod metadata;
pub mod ohlcv;
pub mod patterns;
pub mod rolling;
pub mod spline;
pub mod targets;
