pub mod bar;
pub mod dataset_info;
pub mod frame;
pub mod ohlcv;
pub mod series;
pub mod timeframe;
